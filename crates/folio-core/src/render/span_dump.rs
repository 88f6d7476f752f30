use crate::error::FolioError;
use crate::model::BBox;
use crate::render::{check_page, GridTable, PageRenderer, RenderedSpan};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pre-rendered pages stored as JSON: spans plus optional grid tables.
///
/// Lets fixtures and other renderers' output be replayed through the engine
/// without any PDF tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanDump {
    pub pages: Vec<DumpPage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpPage {
    /// 1-based page number.
    pub number: usize,
    #[serde(default)]
    pub spans: Vec<RenderedSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grid_tables: Vec<GridTable>,
}

impl SpanDump {
    /// Capture pages from any renderer.
    pub fn capture(renderer: &dyn PageRenderer, pages: &[usize]) -> Result<Self, FolioError> {
        let mut out = Vec::with_capacity(pages.len());
        for &number in pages {
            let grid_tables = match renderer.grid_tables(number, None) {
                Ok(tables) => tables,
                Err(FolioError::GridUnsupported { .. }) => Vec::new(),
                Err(e) => return Err(e),
            };
            out.push(DumpPage {
                number,
                spans: renderer.page_spans(number)?,
                grid_tables,
            });
        }
        Ok(SpanDump { pages: out })
    }
}

/// Renderer over a [`SpanDump`]. Page numbers missing from the dump render
/// as empty pages.
pub struct SpanDumpRenderer {
    dump: SpanDump,
    page_count: usize,
}

impl SpanDumpRenderer {
    pub fn new(dump: SpanDump) -> Result<Self, FolioError> {
        if dump.pages.iter().any(|p| p.number == 0) {
            return Err(FolioError::RenderOutput(
                "span dump page numbers are 1-based".into(),
            ));
        }
        let page_count = dump.pages.iter().map(|p| p.number).max().unwrap_or(0);
        Ok(SpanDumpRenderer { dump, page_count })
    }

    pub fn from_json(json: &str) -> Result<Self, FolioError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, FolioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn page(&self, number: usize) -> Result<Option<&DumpPage>, FolioError> {
        check_page(number, self.page_count)?;
        Ok(self.dump.pages.iter().find(|p| p.number == number))
    }
}

impl PageRenderer for SpanDumpRenderer {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_spans(&self, page: usize) -> Result<Vec<RenderedSpan>, FolioError> {
        Ok(self
            .page(page)?
            .map(|p| p.spans.clone())
            .unwrap_or_default())
    }

    fn grid_tables(&self, page: usize, clip: Option<&BBox>) -> Result<Vec<GridTable>, FolioError> {
        let tables = self
            .page(page)?
            .map(|p| p.grid_tables.clone())
            .unwrap_or_default();
        Ok(tables
            .into_iter()
            .filter(|t| match (clip, &t.bbox) {
                (Some(clip), Some(bbox)) => clip.contains_center_of(bbox),
                _ => true,
            })
            .collect())
    }

    fn backend_name(&self) -> &str {
        "span-dump"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "pages": [
            { "number": 1, "spans": [
                { "text": "Goblin", "font": "Serif-Bold", "size": 13.0,
                  "style": { "bold": true },
                  "bbox": { "x_min": 50.0, "y_min": 100.0, "x_max": 110.0, "y_max": 114.0 } }
            ] },
            { "number": 3, "grid_tables": [
                { "bbox": { "x_min": 0.0, "y_min": 0.0, "x_max": 100.0, "y_max": 100.0 },
                  "cells": [["Level", "XP"], ["1", "0"]] },
                { "cells": [["Name", "Cost"]] }
            ] }
        ]
    }"#;

    #[test]
    fn test_load_dump() {
        let r = SpanDumpRenderer::from_json(DUMP).unwrap();
        assert_eq!(r.page_count(), 3);
        let spans = r.page_spans(1).unwrap();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].style.bold);
        assert!(!spans[0].style.italic);
        assert!(r.page_spans(2).unwrap().is_empty());
        assert!(r.page_spans(4).is_err());
    }

    #[test]
    fn test_grid_tables_clipped() {
        let r = SpanDumpRenderer::from_json(DUMP).unwrap();
        assert_eq!(r.grid_tables(3, None).unwrap().len(), 2);
        let clip = BBox::new(200.0, 200.0, 300.0, 300.0);
        let clipped = r.grid_tables(3, Some(&clip)).unwrap();
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped[0].header_row(), ["Name", "Cost"]);
    }

    #[test]
    fn test_capture_round_trips_spans() {
        let r = SpanDumpRenderer::from_json(DUMP).unwrap();
        let dump = SpanDump::capture(&r, &[1, 2]).unwrap();
        assert_eq!(dump.pages.len(), 2);
        assert_eq!(dump.pages[0].spans[0].text, "Goblin");
    }
}
