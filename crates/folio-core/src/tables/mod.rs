//! Table pattern engine: declarative targets, one dispatch site.

pub mod calculated;
pub mod category;
pub mod formula;
pub mod grid;
pub mod reference;
pub mod region;
pub mod transform;

pub use category::{classify_categories, CategoryConfig};
pub use transform::TableTransform;

use crate::config::{read_structured, ExtractionConfig};
use crate::error::FolioError;
use crate::model::{BBox, Provenance, RawTable, Row};
use crate::render::PageRenderer;
use crate::report::ExtractionWarning;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file of table targets: `[[tables]]` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetFile {
    #[serde(default)]
    pub tables: Vec<TableTarget>,
}

/// One configured table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableTarget {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Source pages, 1-based. Patterns that read one page use the first.
    #[serde(default)]
    pub pages: Vec<usize>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub expected_rows: Option<usize>,
    #[serde(default)]
    pub headers: Vec<String>,
    pub pattern: TablePattern,
    #[serde(default)]
    pub transforms: Vec<TableTransform>,
    #[serde(default)]
    pub categories: Option<CategoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern_type", rename_all = "snake_case")]
pub enum TablePattern {
    Calculated(CalculatedSpec),
    Reference(ReferenceSpec),
    TextRegion(RegionSpec),
    SplitColumn(SplitColumnSpec),
    MultipageTextRegion(MultipageSpec),
    StandardGrid(GridSpec),
}

impl TablePattern {
    pub fn name(&self) -> &'static str {
        match self {
            TablePattern::Calculated(_) => "calculated",
            TablePattern::Reference(_) => "reference",
            TablePattern::TextRegion(_) => "text_region",
            TablePattern::SplitColumn(_) => "split_column",
            TablePattern::MultipageTextRegion(_) => "multipage_text_region",
            TablePattern::StandardGrid(_) => "standard_grid",
        }
    }
}

/// Rows computed from a formula over an inclusive integer range, or
/// expanded from `(from..=to) -> value` lookup pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatedSpec {
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub range: Option<(i64, i64)>,
    #[serde(default)]
    pub lookup: Vec<LookupPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupPair {
    pub from: i64,
    pub to: i64,
    pub value: String,
}

/// Pre-captured rows, inline or from a spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub workbook: Option<WorkbookSource>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookSource {
    pub path: PathBuf,
    pub sheet: String,
    /// 0-based first data row.
    #[serde(default)]
    pub start_row: usize,
}

/// How a clustered row is cut into cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnModel {
    /// One cell per row.
    #[default]
    Unsegmented,
    /// `n` ascending x boundaries give `n + 1` columns.
    Boundaries(Vec<f32>),
    /// Two columns around one x.
    Split(f32),
}

impl ColumnModel {
    pub fn has_boundaries(&self) -> bool {
        matches!(self, ColumnModel::Boundaries(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    /// Defaults to the target's first page.
    #[serde(default)]
    pub page: Option<usize>,
    pub region: BBox,
    #[serde(default)]
    pub columns: ColumnModel,
    #[serde(default)]
    pub y_tolerance: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitColumnSpec {
    /// Sub-table windows, read in declared order.
    pub regions: Vec<RegionSpec>,
    #[serde(default)]
    pub merge_continuation_rows: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageWindow {
    pub page: usize,
    pub region: BBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipageSpec {
    pub regions: Vec<PageWindow>,
    #[serde(default)]
    pub columns: ColumnModel,
    #[serde(default)]
    pub y_tolerance: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    #[serde(default)]
    pub clip: Option<BBox>,
    /// Keywords scored against each candidate's first row. Defaults to the
    /// target's headers.
    #[serde(default)]
    pub header_keywords: Vec<String>,
    /// Drop the candidate's first row from the data rows.
    #[serde(default = "default_true")]
    pub skip_header_row: bool,
}

fn default_true() -> bool {
    true
}

/// One extracted table plus target metadata and non-fatal findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOutcome {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    pub table: RawTable,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,
}

/// Rows produced by one pattern, before transforms.
pub(crate) struct PatternRows {
    pub rows: Vec<Row>,
    pub headers: Option<Vec<String>>,
    pub pages: Vec<usize>,
}

impl PatternRows {
    fn new(rows: Vec<Row>) -> Self {
        PatternRows {
            rows,
            headers: None,
            pages: Vec::new(),
        }
    }
}

/// Extract one target. This is the only place patterns are dispatched.
pub fn extract_table(
    renderer: &dyn PageRenderer,
    target: &TableTarget,
    config: &ExtractionConfig,
) -> Result<TableOutcome, FolioError> {
    let tolerance = config.table_y_tolerance;
    let (extracted, provenance) = match &target.pattern {
        TablePattern::Calculated(spec) => {
            (PatternRows::new(calculated::rows(spec)?), Provenance::Calculated)
        }
        TablePattern::Reference(spec) => (
            PatternRows::new(reference::rows(spec)?),
            Provenance::Reference {
                note: spec.note.clone(),
            },
        ),
        TablePattern::TextRegion(spec) => {
            let out = region::text_region(renderer, target, spec, tolerance)?;
            let pages = out.pages.clone();
            (out, extracted("text_region", pages))
        }
        TablePattern::SplitColumn(spec) => {
            let out = region::split_column(renderer, target, spec, tolerance)?;
            let pages = out.pages.clone();
            (out, extracted("split_column", pages))
        }
        TablePattern::MultipageTextRegion(spec) => {
            let out = region::multipage(renderer, target, spec, tolerance)?;
            let pages = out.pages.clone();
            (out, extracted("multipage_text_region", pages))
        }
        TablePattern::StandardGrid(spec) => {
            let out = grid::standard_grid(renderer, target, spec)?;
            let pages = out.pages.clone();
            (out, extracted("standard_grid", pages))
        }
    };

    let rows = transform::apply_transforms(&target.transforms, extracted.rows)?;
    let headers = if target.headers.is_empty() {
        extracted.headers.unwrap_or_default()
    } else {
        target.headers.clone()
    };

    let mut table = RawTable::new(headers, rows, provenance);
    if let Some(cfg) = &target.categories {
        table.categories = classify_categories(&table.rows, cfg);
    }

    let mut warnings = Vec::new();
    if let Some(expected) = target.expected_rows {
        if expected != table.rows.len() {
            warn!(
                target = %target.id,
                expected,
                actual = table.rows.len(),
                "row count mismatch"
            );
            warnings.push(ExtractionWarning::count_mismatch(
                Some(&target.id),
                "rows",
                expected,
                table.rows.len(),
            ));
        }
    }

    debug!(
        target = %target.id,
        pattern = target.pattern.name(),
        rows = table.rows.len(),
        categories = table.categories.len(),
        "extracted table"
    );

    Ok(TableOutcome {
        id: target.id.clone(),
        name: target.name.clone(),
        category: target.category.clone(),
        priority: target.priority,
        table,
        warnings,
    })
}

fn extracted(pattern: &str, pages: Vec<usize>) -> Provenance {
    Provenance::Extracted {
        pattern: pattern.to_string(),
        pages,
    }
}

/// Page a single-page pattern reads: its own `page`, else the target's first.
pub(crate) fn single_page(target: &TableTarget, page: Option<usize>) -> Result<usize, FolioError> {
    page.or_else(|| target.pages.first().copied()).ok_or_else(|| {
        FolioError::Config(format!(
            "table '{}': {} needs a page",
            target.id,
            target.pattern.name()
        ))
    })
}

/// Load and validate a target file (TOML or JSON by extension). Relative
/// workbook paths are resolved against the file's directory.
pub fn load_targets(path: &Path) -> Result<Vec<TableTarget>, FolioError> {
    let file: TargetFile = read_structured(path)?;
    let base = path.parent().unwrap_or(Path::new(""));
    let targets: Vec<TableTarget> = file
        .tables
        .into_iter()
        .map(|t| resolve_paths(t, base))
        .collect();
    validate_targets(&targets)?;
    Ok(targets)
}

/// Parse and validate targets from a TOML string.
pub fn parse_targets_str(toml_src: &str) -> Result<Vec<TableTarget>, FolioError> {
    let file: TargetFile = toml::from_str(toml_src)?;
    validate_targets(&file.tables)?;
    Ok(file.tables)
}

fn resolve_paths(mut target: TableTarget, base: &Path) -> TableTarget {
    if let TablePattern::Reference(ReferenceSpec {
        workbook: Some(wb), ..
    }) = &mut target.pattern
    {
        if wb.path.is_relative() {
            wb.path = base.join(&wb.path);
        }
    }
    target
}

pub fn validate_targets(targets: &[TableTarget]) -> Result<(), FolioError> {
    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert(target.id.as_str()) {
            return Err(FolioError::Config(format!(
                "duplicate table id '{}'",
                target.id
            )));
        }
        validate_target(target)?;
    }
    Ok(())
}

/// Check that a target is complete enough to run. Failures are configuration
/// errors and are never skipped.
pub fn validate_target(target: &TableTarget) -> Result<(), FolioError> {
    let id = &target.id;
    let fail = |msg: String| Err(FolioError::Config(format!("table '{id}': {msg}")));

    if id.trim().is_empty() {
        return Err(FolioError::Config("table id must not be empty".into()));
    }
    if target.pages.contains(&0) {
        return fail("pages are 1-based".into());
    }

    match &target.pattern {
        TablePattern::Calculated(spec) => {
            let has_formula = spec.formula.is_some();
            if has_formula == !spec.lookup.is_empty() {
                return fail("calculated needs exactly one of formula or lookup".into());
            }
            if let Some(src) = &spec.formula {
                let Some((start, end)) = spec.range else {
                    return fail("calculated formula needs a range".into());
                };
                if start > end {
                    return fail(format!("range start {start} is after end {end}"));
                }
                if let Err(e) = formula::Formula::parse(src) {
                    return fail(e.to_string());
                }
            }
            for pair in &spec.lookup {
                if pair.from > pair.to {
                    return fail(format!("lookup range {}..{} is reversed", pair.from, pair.to));
                }
            }
        }
        TablePattern::Reference(spec) => {
            if spec.rows.is_empty() && spec.workbook.is_none() {
                return fail("reference needs inline rows or a workbook".into());
            }
        }
        TablePattern::TextRegion(spec) => {
            single_page(target, spec.page)?;
            validate_region(target, spec)?;
        }
        TablePattern::SplitColumn(spec) => {
            if spec.regions.is_empty() {
                return fail("split_column needs at least one region".into());
            }
            for region in &spec.regions {
                single_page(target, region.page)?;
                validate_region(target, region)?;
            }
        }
        TablePattern::MultipageTextRegion(spec) => {
            if spec.regions.is_empty() {
                return fail("multipage_text_region needs at least one region".into());
            }
            for window in &spec.regions {
                if window.page == 0 {
                    return fail("pages are 1-based".into());
                }
                check_bbox(target, &window.region)?;
            }
            validate_columns(target, &spec.columns)?;
            check_y_tolerance(target, spec.y_tolerance)?;
        }
        TablePattern::StandardGrid(spec) => {
            if target.pages.is_empty() {
                return fail("standard_grid needs pages".into());
            }
            if let Some(clip) = &spec.clip {
                check_bbox(target, clip)?;
            }
        }
    }

    for t in &target.transforms {
        t.validate().map_err(|msg| FolioError::Config(format!("table '{id}': {msg}")))?;
    }
    Ok(())
}

fn validate_region(target: &TableTarget, spec: &RegionSpec) -> Result<(), FolioError> {
    check_bbox(target, &spec.region)?;
    validate_columns(target, &spec.columns)?;
    check_y_tolerance(target, spec.y_tolerance)
}

fn check_bbox(target: &TableTarget, bbox: &BBox) -> Result<(), FolioError> {
    if bbox.is_well_formed() {
        Ok(())
    } else {
        Err(FolioError::Config(format!(
            "table '{}': region {:?} is empty or inverted",
            target.id, bbox
        )))
    }
}

fn validate_columns(target: &TableTarget, columns: &ColumnModel) -> Result<(), FolioError> {
    if let ColumnModel::Boundaries(bounds) = columns {
        if bounds.is_empty() || bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FolioError::Config(format!(
                "table '{}': column boundaries must be non-empty and strictly ascending",
                target.id
            )));
        }
    }
    Ok(())
}

fn check_y_tolerance(target: &TableTarget, tol: Option<f32>) -> Result<(), FolioError> {
    match tol {
        Some(t) if !(t.is_finite() && t > 0.0) => Err(FolioError::Config(format!(
            "table '{}': y_tolerance must be positive",
            target.id
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGETS: &str = r#"
[[tables]]
id = "xp"
name = "Experience by level"
category = "progression"
priority = 1
expected_rows = 30
headers = ["Level", "XP"]
pattern = { pattern_type = "calculated", formula = "x * 15", range = [1, 30] }

[[tables]]
id = "treasure"
name = "Treasure"
pages = [12]
headers = ["d100", "Item"]
transforms = [{ op = "skip_rows", count = 1 }]

[tables.pattern]
pattern_type = "text_region"
region = { x_min = 50.0, y_min = 100.0, x_max = 560.0, y_max = 700.0 }
columns = { boundaries = [120.0] }
"#;

    #[test]
    fn test_parse_targets() {
        let targets = parse_targets_str(TARGETS).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].pattern.name(), "calculated");
        assert_eq!(targets[0].expected_rows, Some(30));
        match &targets[1].pattern {
            TablePattern::TextRegion(spec) => {
                assert_eq!(spec.columns, ColumnModel::Boundaries(vec![120.0]));
                assert_eq!(spec.page, None);
            }
            other => panic!("unexpected pattern {other:?}"),
        }
        assert_eq!(targets[1].transforms, vec![TableTransform::SkipRows { count: 1 }]);
    }

    #[test]
    fn test_unknown_pattern_type_is_config_error() {
        let src = r#"
[[tables]]
id = "bad"
pattern = { pattern_type = "lattice" }
"#;
        let err = parse_targets_str(src).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_region_without_page_rejected() {
        let src = r#"
[[tables]]
id = "nopage"
pattern = { pattern_type = "text_region", region = { x_min = 0.0, y_min = 0.0, x_max = 10.0, y_max = 10.0 } }
"#;
        let err = parse_targets_str(src).unwrap_err();
        assert!(matches!(err, FolioError::Config(msg) if msg.contains("needs a page")));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let src = r#"
[[tables]]
id = "a"
pattern = { pattern_type = "reference", rows = [["1"]] }

[[tables]]
id = "a"
pattern = { pattern_type = "reference", rows = [["2"]] }
"#;
        assert!(parse_targets_str(src).is_err());
    }

    #[test]
    fn test_boundaries_must_ascend() {
        let src = r#"
[[tables]]
id = "cols"
pages = [3]
pattern = { pattern_type = "text_region", region = { x_min = 0.0, y_min = 0.0, x_max = 10.0, y_max = 10.0 }, columns = { boundaries = [200.0, 100.0] } }
"#;
        assert!(parse_targets_str(src).is_err());
    }

    #[test]
    fn test_bad_formula_rejected_at_validation() {
        let src = r#"
[[tables]]
id = "f"
pattern = { pattern_type = "calculated", formula = "x ^ 2", range = [1, 3] }
"#;
        let err = parse_targets_str(src).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_targets_resolves_workbook_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.toml");
        std::fs::write(
            &path,
            r#"
[[tables]]
id = "ref"
pattern = { pattern_type = "reference", workbook = { path = "data/ref.xlsx", sheet = "Sheet1" } }
"#,
        )
        .unwrap();
        let targets = load_targets(&path).unwrap();
        match &targets[0].pattern {
            TablePattern::Reference(spec) => {
                let wb = spec.workbook.as_ref().unwrap();
                assert_eq!(wb.path, dir.path().join("data/ref.xlsx"));
                assert_eq!(wb.start_row, 0);
            }
            other => panic!("unexpected pattern {other:?}"),
        }
    }
}
