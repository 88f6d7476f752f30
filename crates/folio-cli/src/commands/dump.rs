use folio_core::error::FolioError;
use folio_core::render::span_dump::SpanDump;
use std::path::Path;

use crate::output;

pub fn run(input_file: &Path, pages: Option<&str>, out: &Path) -> Result<(), FolioError> {
    let renderer = super::open_renderer(input_file)?;
    let pages = super::resolve_pages(renderer.as_ref(), pages)?;
    let dump = SpanDump::capture(renderer.as_ref(), &pages)?;
    output::json::write(out, &dump)?;

    let spans: usize = dump.pages.iter().map(|p| p.spans.len()).sum();
    eprintln!(
        "Captured {} span(s) from {} page(s) with {}, written to {}",
        spans,
        dump.pages.len(),
        renderer.backend_name(),
        out.display()
    );
    Ok(())
}
