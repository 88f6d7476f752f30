use folio_core::error::FolioError;
use folio_core::layout::logical_lines;
use std::path::Path;

use crate::output;

pub fn run(
    input_file: &Path,
    pages: Option<&str>,
    config: Option<&Path>,
    output_format: &str,
) -> Result<(), FolioError> {
    let config = super::load_extraction_config(config, None)?;
    let renderer = super::open_renderer(input_file)?;
    let pages = super::resolve_pages(renderer.as_ref(), pages)?;
    let lines = logical_lines(renderer.as_ref(), &pages, &config)?;

    match output_format {
        "json" => output::json::print(&lines)?,
        _ => output::table::print_lines(&lines),
    }
    Ok(())
}
