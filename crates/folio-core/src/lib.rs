pub mod batch;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod records;
pub mod render;
pub mod report;
pub mod tables;

pub use batch::{extract_tables, BatchOptions, BatchOutcome, TargetFailure};
pub use config::ExtractionConfig;
pub use error::FolioError;
pub use records::{extract_records, RecordRun, SegmentedRecord};
pub use render::PageRenderer;
pub use tables::{extract_table, TableOutcome, TableTarget};

use render::pdftohtml::PdftohtmlRenderer;
use render::page_range;

/// Main API entry point: run the record path over every page of a PDF.
///
/// The document handle lives for the duration of the call only.
pub fn extract_pdf_records(
    pdf_bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<RecordRun, FolioError> {
    config::validate_config(config)?;
    let renderer = PdftohtmlRenderer::open(pdf_bytes)?;
    let pages = page_range(&renderer, None, None)?;
    extract_records(&renderer, &pages, config)
}

/// Extract a batch of table targets from a PDF.
pub fn extract_pdf_tables(
    pdf_bytes: &[u8],
    targets: &[TableTarget],
    config: &ExtractionConfig,
    options: BatchOptions,
) -> Result<BatchOutcome, FolioError> {
    config::validate_config(config)?;
    let renderer = PdftohtmlRenderer::open(pdf_bytes)?;
    extract_tables(&renderer, targets, config, options)
}
