//! Span and line layer: reading order, line merging and Y-clustering.

pub mod cluster;
pub mod lines;
pub mod spans;

pub use cluster::{cluster_rows, SpanRow};
pub use lines::{lines_by_page, merge_lines};
pub use spans::collect_spans;

use crate::config::ExtractionConfig;
use crate::error::FolioError;
use crate::model::LogicalLine;
use crate::render::PageRenderer;

/// Render `pages` and merge them into logical lines in reading order.
pub fn logical_lines(
    renderer: &dyn PageRenderer,
    pages: &[usize],
    config: &ExtractionConfig,
) -> Result<Vec<LogicalLine>, FolioError> {
    let spans = collect_spans(renderer, pages, &config.columns, config.lines.y_tolerance)?;
    Ok(merge_lines(&spans, &config.lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, StyleFlags};
    use crate::render::span_dump::{DumpPage, SpanDump, SpanDumpRenderer};
    use crate::render::RenderedSpan;

    fn bold(text: &str, x: f32, y: f32) -> RenderedSpan {
        RenderedSpan {
            text: text.into(),
            font: "Serif-Bold".into(),
            size: 13.0,
            style: StyleFlags::BOLD,
            bbox: BBox::new(x, y, x + 25.0, y + 13.0),
        }
    }

    #[test]
    fn test_fragments_with_jittered_tops_form_one_line() {
        let renderer = SpanDumpRenderer::new(SpanDump {
            pages: vec![DumpPage {
                number: 1,
                spans: vec![
                    bold("Gob", 50.0, 100.0),
                    bold("lin", 80.0, 100.5),
                    bold("Warrior", 110.0, 100.0),
                ],
                ..Default::default()
            }],
        })
        .unwrap();
        let lines = logical_lines(&renderer, &[1], &ExtractionConfig::default()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Gob lin Warrior");
        assert_eq!(lines[0].bbox.x_min, 50.0);
    }
}
