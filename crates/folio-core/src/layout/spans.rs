use crate::config::ColumnLayout;
use crate::error::FolioError;
use crate::model::TextSpan;
use crate::render::{PageRenderer, RenderedSpan};
use std::cmp::Ordering;
use tracing::debug;

/// Render `pages` and return their spans in canonical reading order.
///
/// Blank spans are dropped and span text is trimmed. Pages are rendered in
/// ascending order regardless of the order they are given in. Spans whose
/// tops lie within `y_tolerance` of a row's topmost span share that row and
/// are read left to right.
pub fn collect_spans(
    renderer: &dyn PageRenderer,
    pages: &[usize],
    columns: &ColumnLayout,
    y_tolerance: f32,
) -> Result<Vec<TextSpan>, FolioError> {
    let mut ordered: Vec<usize> = pages.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut spans = Vec::new();
    for page in ordered {
        let rendered = renderer.page_spans(page)?;
        let before = spans.len();
        spans.extend(page_spans(page, rendered, columns));
        debug!(page, spans = spans.len() - before, "collected spans");
    }
    sort_reading_order(&mut spans, y_tolerance);
    Ok(spans)
}

/// Attach page and column to one page's rendered spans.
pub fn page_spans(
    page: usize,
    rendered: Vec<RenderedSpan>,
    columns: &ColumnLayout,
) -> Vec<TextSpan> {
    let split = columns.split_for(page);
    rendered
        .into_iter()
        .filter_map(|s| {
            let text = s.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(TextSpan {
                text: text.to_string(),
                column: column_for(s.bbox.x_min, split),
                font: s.font,
                size: s.size,
                style: s.style,
                bbox: s.bbox,
                page,
            })
        })
        .collect()
}

/// Column index of a span starting at `x`. Without a split everything is column 0.
pub fn column_for(x: f32, split: Option<f32>) -> usize {
    match split {
        Some(mid) if x >= mid => 1,
        _ => 0,
    }
}

/// Stable sort into rows by (page, column, top y), then by left x within
/// each row.
///
/// A row is anchored at its topmost span and takes every following span on
/// the same page and column whose top is at most `y_tolerance` below it.
pub fn sort_reading_order(spans: &mut [TextSpan], y_tolerance: f32) {
    spans.sort_by(reading_order);

    let mut start = 0;
    while start < spans.len() {
        let anchor = &spans[start];
        let len = spans[start..]
            .iter()
            .take_while(|s| same_row(anchor, s, y_tolerance))
            .count();
        spans[start..start + len].sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));
        start += len;
    }
}

fn same_row(anchor: &TextSpan, span: &TextSpan, y_tolerance: f32) -> bool {
    anchor.page == span.page
        && anchor.column == span.column
        && span.bbox.y_min - anchor.bbox.y_min <= y_tolerance
}

fn reading_order(a: &TextSpan, b: &TextSpan) -> Ordering {
    a.page
        .cmp(&b.page)
        .then(a.column.cmp(&b.column))
        .then(a.bbox.y_min.total_cmp(&b.bbox.y_min))
        .then(a.bbox.x_min.total_cmp(&b.bbox.x_min))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSplit;
    use crate::model::{BBox, StyleFlags};
    use crate::render::span_dump::{DumpPage, SpanDump, SpanDumpRenderer};
    use proptest::prelude::*;

    fn rendered(text: &str, x: f32, y: f32) -> RenderedSpan {
        RenderedSpan {
            text: text.into(),
            font: "Body".into(),
            size: 9.0,
            style: StyleFlags::PLAIN,
            bbox: BBox::new(x, y, x + 30.0, y + 9.0),
        }
    }

    #[test]
    fn test_single_column_is_zero() {
        let spans = page_spans(
            1,
            vec![rendered("a", 10.0, 10.0), rendered("b", 400.0, 10.0)],
            &ColumnLayout::default(),
        );
        assert!(spans.iter().all(|s| s.column == 0));
    }

    #[test]
    fn test_two_column_order() {
        let layout = ColumnLayout::two_column(300.0);
        let mut spans = page_spans(
            1,
            vec![
                rendered("right-top", 320.0, 10.0),
                rendered("left-bottom", 20.0, 500.0),
                rendered("left-top", 20.0, 10.0),
            ],
            &layout,
        );
        sort_reading_order(&mut spans, 2.0);
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["left-top", "left-bottom", "right-top"]);
    }

    #[test]
    fn test_page_specific_split() {
        let layout = ColumnLayout {
            split_x: Some(300.0),
            page_splits: vec![PageSplit { page: 2, x: 200.0 }],
        };
        let p1 = page_spans(1, vec![rendered("a", 250.0, 10.0)], &layout);
        let p2 = page_spans(2, vec![rendered("a", 250.0, 10.0)], &layout);
        assert_eq!(p1[0].column, 0);
        assert_eq!(p2[0].column, 1);
    }

    #[test]
    fn test_blank_spans_dropped_and_trimmed() {
        let spans = page_spans(
            1,
            vec![rendered("   ", 10.0, 10.0), rendered("  Goblin ", 10.0, 20.0)],
            &ColumnLayout::default(),
        );
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Goblin");
    }

    fn one_page(spans: Vec<RenderedSpan>) -> SpanDumpRenderer {
        SpanDumpRenderer::new(SpanDump {
            pages: vec![DumpPage {
                number: 1,
                spans,
                ..Default::default()
            }],
        })
        .unwrap()
    }

    fn texts(spans: &[TextSpan]) -> Vec<&str> {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_jittered_row_reads_left_to_right() {
        let renderer = one_page(vec![
            rendered("Gob", 50.0, 100.0),
            rendered("lin", 80.0, 100.5),
            rendered("Warrior", 110.0, 100.0),
        ]);
        let spans = collect_spans(&renderer, &[1], &ColumnLayout::default(), 2.0).unwrap();
        assert_eq!(texts(&spans), vec!["Gob", "lin", "Warrior"]);
    }

    #[test]
    fn test_value_above_its_label_still_follows_it() {
        let renderer = one_page(vec![
            rendered("Armor Class", 50.0, 131.0),
            rendered("13 (natural armor)", 110.0, 130.0),
            rendered("Hit Points", 50.0, 143.0),
            rendered("11 (2d8 + 2)", 110.0, 142.0),
        ]);
        let spans = collect_spans(&renderer, &[1], &ColumnLayout::default(), 2.0).unwrap();
        assert_eq!(
            texts(&spans),
            vec!["Armor Class", "13 (natural armor)", "Hit Points", "11 (2d8 + 2)"]
        );
    }

    #[test]
    fn test_rows_beyond_tolerance_stay_apart() {
        let mut spans = page_spans(
            1,
            vec![rendered("below", 10.0, 103.0), rendered("above", 90.0, 100.0)],
            &ColumnLayout::default(),
        );
        sort_reading_order(&mut spans, 2.0);
        assert_eq!(texts(&spans), vec!["above", "below"]);
    }

    #[test]
    fn test_rows_do_not_chain_past_the_anchor() {
        // 101.5 is within tolerance of 100 but 103 is not, even though it is
        // within tolerance of 101.5.
        let mut spans = page_spans(
            1,
            vec![
                rendered("c", 10.0, 103.0),
                rendered("b", 50.0, 101.5),
                rendered("a", 90.0, 100.0),
            ],
            &ColumnLayout::default(),
        );
        sort_reading_order(&mut spans, 2.0);
        assert_eq!(texts(&spans), vec!["b", "a", "c"]);
    }

    proptest! {
        #[test]
        fn prop_jittered_row_sorts_by_x(
            jitter in proptest::collection::vec(0.0f32..=2.0, 1..12)
        ) {
            let raw: Vec<RenderedSpan> = jitter
                .iter()
                .enumerate()
                .rev()
                .map(|(i, dy)| rendered(&format!("w{i}"), 40.0 * i as f32, 100.0 + dy))
                .collect();
            let mut spans = page_spans(1, raw, &ColumnLayout::default());
            sort_reading_order(&mut spans, 2.0);
            let expected: Vec<String> = (0..jitter.len()).map(|i| format!("w{i}")).collect();
            let got: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
