use crate::config::ExtractionConfig;
use crate::error::FolioError;
use crate::render::PageRenderer;
use crate::report::{ExtractionWarning, RunReport};
use crate::tables::{extract_table, validate_targets, TableOutcome, TableTarget};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Log and skip a failing target instead of aborting the batch.
    pub skip_failures: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetFailure {
    pub id: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub tables: Vec<TableOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TargetFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,
    pub report: RunReport,
}

/// Extract every target in order.
///
/// All targets are validated up front; a configuration error aborts in both
/// modes. In strict mode the first extraction error is returned. With
/// `skip_failures` the target is recorded as a failure and the rest run.
pub fn extract_tables(
    renderer: &dyn PageRenderer,
    targets: &[TableTarget],
    config: &ExtractionConfig,
    options: BatchOptions,
) -> Result<BatchOutcome, FolioError> {
    validate_targets(targets)?;

    let mut tables = Vec::with_capacity(targets.len());
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    for target in targets {
        match extract_table(renderer, target, config) {
            Ok(outcome) => {
                warnings.extend(outcome.warnings.iter().cloned());
                tables.push(outcome);
            }
            Err(e) if e.is_config() || !options.skip_failures => {
                return Err(FolioError::for_target(&target.id, e));
            }
            Err(e) => {
                warn!(target = %target.id, error = %e, "skipping failed table");
                failures.push(TargetFailure {
                    id: target.id.clone(),
                    name: target.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let report = RunReport::tally(tables.len(), &warnings, failures.len());
    info!(
        tables = report.successes,
        warnings = report.warnings,
        failures = report.failures,
        "table batch finished"
    );

    Ok(BatchOutcome {
        tables,
        failures,
        warnings,
        report,
    })
}
