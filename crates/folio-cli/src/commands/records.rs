use folio_core::config::builtin;
use folio_core::error::FolioError;
use folio_core::records::extract_records;
use std::path::PathBuf;

use crate::output;

/// Profile used when neither `--profile` nor the config supplies signatures.
const DEFAULT_PROFILE: &str = "creature";

pub struct RecordArgs {
    pub input_file: PathBuf,
    pub profile: Option<String>,
    pub config: Option<PathBuf>,
    pub pages: Option<String>,
    pub raw: bool,
    pub output: String,
    pub out: Option<PathBuf>,
}

pub fn run(args: RecordArgs) -> Result<(), FolioError> {
    let mut config = super::load_extraction_config(args.config.as_deref(), args.profile.as_deref())?;
    if config.profile.signatures.is_empty() {
        config.profile = builtin::load_profile(DEFAULT_PROFILE)?;
    }

    let renderer = super::open_renderer(&args.input_file)?;
    let pages = super::resolve_pages(renderer.as_ref(), args.pages.as_deref())?;
    let run = extract_records(renderer.as_ref(), &pages, &config)?;

    for w in &run.warnings {
        eprintln!("  warning: {}", w.message);
    }

    if args.raw {
        match (&args.out, args.output.as_str()) {
            (Some(path), _) => output::json::write(path, &run)?,
            (None, "json") => output::json::print(&run)?,
            (None, _) => output::table::print_raw_records(&run),
        }
    } else {
        let segmented = run.segmented(&config.profile);
        match (&args.out, args.output.as_str()) {
            (Some(path), _) => output::json::write(path, &segmented)?,
            (None, "json") => output::json::print(&segmented)?,
            (None, _) => output::table::print_records(&segmented.records),
        }
    }

    if let Some(path) = &args.out {
        eprintln!(
            "Extracted {} record(s) with profile '{}', written to {}",
            run.records.len(),
            run.profile,
            path.display()
        );
    }
    Ok(())
}
