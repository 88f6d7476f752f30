use super::{GridSpec, PatternRows, TableTarget};
use crate::error::FolioError;
use crate::model::{normalize_ws, Row};
use crate::render::{GridTable, PageRenderer};
use tracing::debug;

/// Delegate to the renderer's grid detection and pick one candidate over
/// all target pages.
pub(crate) fn standard_grid(
    renderer: &dyn PageRenderer,
    target: &TableTarget,
    spec: &GridSpec,
) -> Result<PatternRows, FolioError> {
    let keywords: &[String] = if spec.header_keywords.is_empty() {
        &target.headers
    } else {
        &spec.header_keywords
    };

    let mut candidates: Vec<(usize, GridTable)> = Vec::new();
    for &page in &target.pages {
        for grid in renderer.grid_tables(page, spec.clip.as_ref())? {
            candidates.push((page, grid));
        }
    }
    debug!(target = %target.id, candidates = candidates.len(), "grid candidates");

    let (page, grid) = select_candidate(candidates, keywords).ok_or_else(|| {
        FolioError::NoGridMatch {
            pages: target.pages.clone(),
        }
    })?;

    let headers: Vec<String> = grid.header_row().iter().map(|h| normalize_ws(h)).collect();
    let skip = usize::from(spec.skip_header_row);
    let rows = grid
        .cells
        .into_iter()
        .skip(skip)
        .map(|cells| Row::new(cells.iter().map(|c| normalize_ws(c)).collect()))
        .filter(|row| !row.is_blank())
        .collect();

    Ok(PatternRows {
        rows,
        headers: Some(headers),
        pages: vec![page],
    })
}

/// Number of keywords found (case-insensitive substring) in the candidate's
/// header row.
pub fn header_score(grid: &GridTable, keywords: &[String]) -> usize {
    let header = grid.header_row().join(" ").to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty() && header.contains(&k.trim().to_lowercase()))
        .count()
}

/// Highest positive score wins; ties go to the first encountered. Without
/// keywords the first candidate is taken.
pub fn select_candidate<T>(
    candidates: Vec<(T, GridTable)>,
    keywords: &[String],
) -> Option<(T, GridTable)> {
    if keywords.is_empty() {
        return candidates.into_iter().next();
    }
    let mut best: Option<(usize, (T, GridTable))> = None;
    for candidate in candidates {
        let score = header_score(&candidate.1, keywords);
        if score == 0 {
            continue;
        }
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}
