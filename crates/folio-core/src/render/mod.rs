pub mod pdftohtml;
pub mod span_dump;

use crate::error::FolioError;
use crate::model::{BBox, StyleFlags};
use serde::{Deserialize, Serialize};

/// A span as the rendering backend reports it, before reading order exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSpan {
    pub text: String,
    pub font: String,
    pub size: f32,
    #[serde(default)]
    pub style: StyleFlags,
    pub bbox: BBox,
}

/// A cell matrix found by a backend's native grid detection. The first row
/// is the header row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridTable {
    #[serde(default)]
    pub bbox: Option<BBox>,
    pub cells: Vec<Vec<String>>,
}

impl GridTable {
    pub fn header_row(&self) -> &[String] {
        self.cells.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Trait for document rendering backends. Pages are 1-based.
///
/// A renderer is one open document handle. It is deliberately not `Sync`:
/// each extraction run opens its own.
pub trait PageRenderer {
    fn page_count(&self) -> usize;

    /// Spans of one page in backend order.
    fn page_spans(&self, page: usize) -> Result<Vec<RenderedSpan>, FolioError>;

    /// Plain text of one page, top to bottom.
    fn page_text(&self, page: usize) -> Result<String, FolioError> {
        let mut spans = self.page_spans(page)?;
        spans.sort_by(|a, b| {
            a.bbox
                .y_min
                .total_cmp(&b.bbox.y_min)
                .then(a.bbox.x_min.total_cmp(&b.bbox.x_min))
        });
        let mut out = String::new();
        let mut last_y: Option<f32> = None;
        for span in &spans {
            if let Some(y) = last_y {
                let sep = if (span.bbox.y_min - y).abs() > span.size / 2.0 {
                    '\n'
                } else {
                    ' '
                };
                out.push(sep);
            }
            out.push_str(span.text.trim());
            last_y = Some(span.bbox.y_min);
        }
        Ok(out)
    }

    /// Native grid-table detection, optionally clipped to a region.
    fn grid_tables(
        &self,
        _page: usize,
        _clip: Option<&BBox>,
    ) -> Result<Vec<GridTable>, FolioError> {
        Err(FolioError::GridUnsupported {
            backend: self.backend_name().to_string(),
        })
    }

    /// Name of this rendering backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

pub(crate) fn check_page(page: usize, page_count: usize) -> Result<(), FolioError> {
    if page == 0 || page > page_count {
        Err(FolioError::PageOutOfRange { page, page_count })
    } else {
        Ok(())
    }
}

/// Inclusive 1-based page range, clamped to the document.
pub fn page_range(
    renderer: &dyn PageRenderer,
    first: Option<usize>,
    last: Option<usize>,
) -> Result<Vec<usize>, FolioError> {
    let count = renderer.page_count();
    let first = first.unwrap_or(1);
    let last = last.unwrap_or(count);
    check_page(first, count)?;
    check_page(last, count)?;
    if first > last {
        return Err(FolioError::Config(format!(
            "page range {first}-{last} is empty"
        )));
    }
    Ok((first..=last).collect())
}
