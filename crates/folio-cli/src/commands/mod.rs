pub mod dump;
pub mod lines;
pub mod profiles;
pub mod records;
pub mod tables;
pub mod validate;

use folio_core::config::{builtin, load_config, validate_config, ExtractionConfig};
use folio_core::error::FolioError;
use folio_core::render::pdftohtml::PdftohtmlRenderer;
use folio_core::render::span_dump::SpanDumpRenderer;
use folio_core::render::{page_range, PageRenderer};
use std::path::Path;
use tracing::debug;

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Open the input: a `.json` file is replayed as a span dump, anything else
/// is rendered as a PDF with pdftohtml.
pub fn open_renderer(input: &Path) -> Result<Box<dyn PageRenderer>, FolioError> {
    let renderer: Box<dyn PageRenderer> = if is_json(input) {
        Box::new(SpanDumpRenderer::load(input)?)
    } else {
        let pdf_bytes = std::fs::read(input)?;
        Box::new(PdftohtmlRenderer::open(&pdf_bytes)?)
    };
    debug!(
        input = %input.display(),
        backend = renderer.backend_name(),
        pages = renderer.page_count(),
        "opened input"
    );
    Ok(renderer)
}

/// Resolve `--pages` ("7" or "7-12") against the document.
pub fn resolve_pages(
    renderer: &dyn PageRenderer,
    spec: Option<&str>,
) -> Result<Vec<usize>, FolioError> {
    let Some(spec) = spec else {
        return page_range(renderer, None, None);
    };
    let (first, last) = match spec.split_once('-') {
        Some((a, b)) => (parse_page(a)?, parse_page(b)?),
        None => {
            let page = parse_page(spec)?;
            (page, page)
        }
    };
    page_range(renderer, Some(first), Some(last))
}

fn parse_page(text: &str) -> Result<usize, FolioError> {
    text.trim()
        .parse()
        .map_err(|_| FolioError::Config(format!("invalid page number '{}'", text.trim())))
}

/// Config from `--config` (or defaults), with `--profile` swapped in if given.
pub fn load_extraction_config(
    config: Option<&Path>,
    profile: Option<&str>,
) -> Result<ExtractionConfig, FolioError> {
    let mut cfg = match config {
        Some(path) => load_config(path)?,
        None => ExtractionConfig::default(),
    };
    if let Some(name) = profile {
        cfg.profile = builtin::load_profile(name)?;
    }
    validate_config(&cfg)?;
    Ok(cfg)
}
