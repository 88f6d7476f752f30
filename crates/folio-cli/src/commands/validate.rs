use folio_core::config::load_config;
use folio_core::error::FolioError;
use folio_core::tables::load_targets;
use std::path::Path;

pub fn run(targets: Option<&Path>, config: Option<&Path>) -> Result<(), FolioError> {
    if let Some(path) = config {
        let cfg = load_config(path)?;
        println!("Config '{}' is valid.", path.display());
        println!("  Profile: {} ({} signature(s))", cfg.profile.name, cfg.profile.signatures.len());
        match cfg.columns.split_x {
            Some(x) => println!("  Columns: split at x={x}"),
            None => println!("  Columns: single"),
        }
    }

    if let Some(path) = targets {
        let targets = load_targets(path)?;
        println!("Target file '{}' is valid.", path.display());
        println!("  Tables: {}", targets.len());
        for t in &targets {
            println!("  {:<24} {}", t.id, t.pattern.name());
        }

        // Not errors, but likely mistakes.
        let mut warnings = Vec::new();
        for t in &targets {
            if t.expected_rows.is_none() {
                warnings.push(format!("table '{}' has no expected_rows; count checks are off", t.id));
            }
            if t.categories.is_some() && t.headers.len() == 1 {
                warnings.push(format!(
                    "table '{}' has a single header column; category rows need at least two",
                    t.id
                ));
            }
        }
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in &warnings {
                println!("  - {}", w);
            }
        }
    }
    Ok(())
}
