use serde::Serialize;

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Fewer (or more) records/rows than the configured expectation.
    CountMismatch,
    /// Lines discarded before the first confirmed record boundary.
    DiscardedPreamble,
    /// A nameless continuation fragment with no predecessor to merge into.
    OrphanFragment,
}

/// Non-fatal extraction finding. The partial result is still returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub kind: WarningKind,
    pub message: String,
}

impl ExtractionWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        ExtractionWarning {
            target: None,
            kind,
            message: message.into(),
        }
    }

    pub fn count_mismatch(target: Option<&str>, what: &str, expected: usize, actual: usize) -> Self {
        let message = format!("expected {expected} {what}, extracted {actual}");
        ExtractionWarning {
            target: target.map(str::to_string),
            kind: WarningKind::CountMismatch,
            message,
        }
    }
}

/// Per-run success/warning/failure counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub report_schema_version: String,
    pub successes: usize,
    pub warnings: usize,
    pub failures: usize,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            report_schema_version: REPORT_SCHEMA_VERSION.to_string(),
            successes: 0,
            warnings: 0,
            failures: 0,
        }
    }
}

impl RunReport {
    pub fn tally(successes: usize, warnings: &[ExtractionWarning], failures: usize) -> Self {
        RunReport {
            successes,
            warnings: warnings.len(),
            failures,
            ..Default::default()
        }
    }
}
