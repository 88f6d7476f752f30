use folio_core::batch::{extract_tables, BatchOptions};
use folio_core::error::FolioError;
use folio_core::tables::{load_targets, TableTarget};
use std::path::PathBuf;

use crate::output;

pub struct TableArgs {
    pub input_file: PathBuf,
    pub targets: PathBuf,
    pub only: Vec<String>,
    pub skip_failures: bool,
    pub config: Option<PathBuf>,
    pub output: String,
    pub out: Option<PathBuf>,
}

pub fn run(args: TableArgs) -> Result<(), FolioError> {
    let config = super::load_extraction_config(args.config.as_deref(), None)?;
    let targets = select(load_targets(&args.targets)?, &args.only)?;
    let renderer = super::open_renderer(&args.input_file)?;

    let outcome = extract_tables(
        renderer.as_ref(),
        &targets,
        &config,
        BatchOptions {
            skip_failures: args.skip_failures,
        },
    )?;

    match (&args.out, args.output.as_str()) {
        (Some(path), _) => {
            output::json::write(path, &outcome)?;
            eprintln!(
                "Extracted {} table(s), written to {}",
                outcome.report.successes,
                path.display()
            );
        }
        (None, "json") => output::json::print(&outcome)?,
        (None, _) => output::table::print_tables(&outcome),
    }

    for w in &outcome.warnings {
        eprintln!("  warning: {}", w.message);
    }
    for f in &outcome.failures {
        eprintln!("  failed: {} ({})", f.id, f.error);
    }
    Ok(())
}

/// Keep only the `--only` ids, in file order. Unknown ids are an error.
fn select(targets: Vec<TableTarget>, only: &[String]) -> Result<Vec<TableTarget>, FolioError> {
    if only.is_empty() {
        return Ok(targets);
    }
    if let Some(missing) = only.iter().find(|id| !targets.iter().any(|t| &t.id == *id)) {
        return Err(FolioError::Config(format!("no table target with id '{missing}'")));
    }
    Ok(targets
        .into_iter()
        .filter(|t| only.contains(&t.id))
        .collect())
}
