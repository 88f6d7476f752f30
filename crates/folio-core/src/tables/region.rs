//! Coordinate-window patterns: text_region, split_column, multipage_text_region.

use super::transform::merge_continuation_rows;
use super::{single_page, ColumnModel, MultipageSpec, PatternRows, RegionSpec, SplitColumnSpec, TableTarget};
use crate::config::ColumnLayout;
use crate::error::FolioError;
use crate::layout::cluster::{cluster_rows, spans_in_region, SpanRow};
use crate::layout::spans::page_spans;
use crate::model::{normalize_ws, BBox, Row, TextSpan};
use crate::render::PageRenderer;
use std::cmp::Ordering;
use tracing::debug;

/// A clustered row and the top-Y it was clustered at.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub top: f32,
    pub row: Row,
}

pub(crate) fn text_region(
    renderer: &dyn PageRenderer,
    target: &TableTarget,
    spec: &RegionSpec,
    default_tolerance: f32,
) -> Result<PatternRows, FolioError> {
    let page = single_page(target, spec.page)?;
    let spans = region_spans(renderer, page, &spec.region)?;
    let tolerance = spec.y_tolerance.unwrap_or(default_tolerance);
    let rows = rows_from_spans(spans, &spec.columns, tolerance, &target.headers)
        .into_iter()
        .map(|p| p.row)
        .collect();
    Ok(PatternRows {
        rows,
        headers: None,
        pages: vec![page],
    })
}

/// Sub-tables read in declared order and concatenated, whatever their
/// absolute position on the page.
pub(crate) fn split_column(
    renderer: &dyn PageRenderer,
    target: &TableTarget,
    spec: &SplitColumnSpec,
    default_tolerance: f32,
) -> Result<PatternRows, FolioError> {
    let mut rows = Vec::new();
    let mut pages: Vec<usize> = Vec::new();
    for (index, region) in spec.regions.iter().enumerate() {
        let page = single_page(target, region.page)?;
        let spans = region_spans(renderer, page, &region.region)?;
        let tolerance = region.y_tolerance.unwrap_or(default_tolerance);
        let before = rows.len();
        rows.extend(
            rows_from_spans(spans, &region.columns, tolerance, &target.headers)
                .into_iter()
                .map(|p| p.row),
        );
        debug!(target = %target.id, region = index, rows = rows.len() - before, "read sub-table");
        if !pages.contains(&page) {
            pages.push(page);
        }
    }
    if spec.merge_continuation_rows {
        rows = merge_continuation_rows(rows);
    }
    pages.sort_unstable();
    Ok(PatternRows {
        rows,
        headers: None,
        pages,
    })
}

/// One window per page, each clustered on its own, then ordered by page and
/// then by row top.
pub(crate) fn multipage(
    renderer: &dyn PageRenderer,
    target: &TableTarget,
    spec: &MultipageSpec,
    default_tolerance: f32,
) -> Result<PatternRows, FolioError> {
    let tolerance = spec.y_tolerance.unwrap_or(default_tolerance);
    let mut keyed: Vec<(PageKey, Row)> = Vec::new();
    let mut pages: Vec<usize> = Vec::new();

    for window in &spec.regions {
        let spans = region_spans(renderer, window.page, &window.region)?;
        for placed in rows_from_spans(spans, &spec.columns, tolerance, &target.headers) {
            keyed.push((page_key(window.page, placed.top), placed.row));
        }
        if !pages.contains(&window.page) {
            pages.push(window.page);
        }
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    pages.sort_unstable();
    Ok(PatternRows {
        rows: keyed.into_iter().map(|(_, row)| row).collect(),
        headers: None,
        pages,
    })
}

/// Sort key for a row across pages: page first, then top Y.
#[derive(Debug, Clone, Copy)]
pub struct PageKey {
    pub page: usize,
    pub top: f32,
}

impl PartialEq for PageKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PageKey {}

impl PartialOrd for PageKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PageKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.page
            .cmp(&other.page)
            .then(self.top.total_cmp(&other.top))
    }
}

pub fn page_key(page: usize, top: f32) -> PageKey {
    PageKey { page, top }
}

fn region_spans(
    renderer: &dyn PageRenderer,
    page: usize,
    region: &BBox,
) -> Result<Vec<TextSpan>, FolioError> {
    let rendered = renderer.page_spans(page)?;
    let spans = page_spans(page, rendered, &ColumnLayout::default());
    Ok(spans_in_region(&spans, region))
}

/// Cluster spans into rows and cut them into cells.
///
/// With explicit boundaries a row is dropped as a repeated header when more
/// than half of its non-empty cells equal a configured header (ignoring case).
pub fn rows_from_spans(
    spans: Vec<TextSpan>,
    columns: &ColumnModel,
    tolerance: f32,
    headers: &[String],
) -> Vec<PlacedRow> {
    cluster_rows(spans, tolerance)
        .into_iter()
        .filter_map(|span_row| {
            let row = Row::with_offset(assign_columns(&span_row, columns), span_row.left());
            if row.is_blank() {
                return None;
            }
            if columns.has_boundaries() && is_header_row(&row, headers) {
                debug!(row = ?row.cells, "dropping repeated header row");
                return None;
            }
            Some(PlacedRow {
                top: span_row.top(),
                row,
            })
        })
        .collect()
}

pub fn assign_columns(row: &SpanRow, columns: &ColumnModel) -> Vec<String> {
    let column_count = match columns {
        ColumnModel::Unsegmented => return vec![normalize_ws(&row.text())],
        ColumnModel::Split(_) => 2,
        ColumnModel::Boundaries(bounds) => bounds.len() + 1,
    };

    let mut cells: Vec<Vec<&str>> = vec![Vec::new(); column_count];
    for span in &row.spans {
        let index = match columns {
            ColumnModel::Split(x) => usize::from(span.bbox.x_min >= *x),
            ColumnModel::Boundaries(bounds) => bounds.iter().filter(|&&b| span.bbox.x_min >= b).count(),
            ColumnModel::Unsegmented => 0,
        };
        cells[index].push(span.text.as_str());
    }
    cells.into_iter().map(|parts| normalize_ws(&parts.join(" "))).collect()
}

pub fn is_header_row(row: &Row, headers: &[String]) -> bool {
    if headers.is_empty() {
        return false;
    }
    let non_empty: Vec<&str> = row
        .cells
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    let matching = non_empty
        .iter()
        .filter(|cell| headers.iter().any(|h| h.trim().eq_ignore_ascii_case(cell)))
        .count();
    matching * 2 > non_empty.len()
}
