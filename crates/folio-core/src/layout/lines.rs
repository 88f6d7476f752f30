use crate::config::LineMergeConfig;
use crate::model::{LogicalLine, TextSpan};

/// Fold spans (already in reading order) into logical lines.
///
/// A span continues the current line iff it is on the same page and column,
/// its top is within `y_tolerance` of the previous span, it uses the same
/// font name, and its size is within `size_tolerance`. Line text is the span
/// texts joined by single spaces.
pub fn merge_lines(spans: &[TextSpan], cfg: &LineMergeConfig) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::new();

    for span in spans {
        match lines.last_mut() {
            Some(line) if continues(line, span, cfg) => line.push_span(span.clone()),
            _ => lines.push(LogicalLine::from_span(span.clone())),
        }
    }

    lines
}

fn continues(line: &LogicalLine, span: &TextSpan, cfg: &LineMergeConfig) -> bool {
    let Some(prev) = line.last_span() else {
        return false;
    };
    prev.page == span.page
        && prev.column == span.column
        && (span.bbox.y_min - prev.bbox.y_min).abs() <= cfg.y_tolerance
        && prev.font == span.font
        && (span.size - prev.size).abs() <= cfg.size_tolerance
}

/// Group lines by page, preserving order. Pages without lines are omitted.
pub fn lines_by_page(lines: Vec<LogicalLine>) -> Vec<(usize, Vec<LogicalLine>)> {
    let mut out: Vec<(usize, Vec<LogicalLine>)> = Vec::new();
    for line in lines {
        match out.last_mut() {
            Some((page, group)) if *page == line.page => group.push(line),
            _ => out.push((line.page, vec![line])),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, StyleFlags};
    use proptest::prelude::*;

    fn span(text: &str, font: &str, size: f32, x: f32, y: f32) -> TextSpan {
        TextSpan {
            text: text.into(),
            font: font.into(),
            size,
            style: StyleFlags::PLAIN,
            bbox: BBox::new(x, y, x + 10.0 * text.len() as f32, y + size),
            page: 1,
            column: 0,
        }
    }

    #[test]
    fn test_fragmented_word_is_repaired() {
        let spans = vec![
            span("Gob", "Serif-Bold", 13.0, 50.0, 100.0),
            span("lin", "Serif-Bold", 13.0, 80.0, 100.5),
            span("Warrior", "Serif-Bold", 13.0, 110.0, 100.0),
        ];
        let lines = merge_lines(&spans, &LineMergeConfig::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Gob lin Warrior");
        assert_eq!(lines[0].bbox.x_min, 50.0);
        assert_eq!(lines[0].bbox.x_max, 180.0);
        assert_eq!(lines[0].spans.len(), 3);
    }

    #[test]
    fn test_y_beyond_tolerance_starts_new_line() {
        let spans = vec![
            span("one", "Body", 9.0, 50.0, 100.0),
            span("two", "Body", 9.0, 50.0, 102.5),
        ];
        let lines = merge_lines(&spans, &LineMergeConfig::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_font_change_starts_new_line() {
        let spans = vec![
            span("Armor Class", "Body-Bold", 9.0, 50.0, 100.0),
            span("15", "Body", 9.0, 110.0, 100.0),
        ];
        let lines = merge_lines(&spans, &LineMergeConfig::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Armor Class");
    }

    #[test]
    fn test_size_tolerance() {
        let spans = vec![
            span("a", "Body", 9.0, 50.0, 100.0),
            span("b", "Body", 9.4, 60.0, 100.0),
            span("c", "Body", 10.0, 70.0, 100.0),
        ];
        let lines = merge_lines(&spans, &LineMergeConfig::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "a b");
    }

    #[test]
    fn test_column_change_starts_new_line() {
        let mut right = span("b", "Body", 9.0, 320.0, 100.0);
        right.column = 1;
        let spans = vec![span("a", "Body", 9.0, 50.0, 100.0), right];
        assert_eq!(merge_lines(&spans, &LineMergeConfig::default()).len(), 2);
    }

    #[test]
    fn test_lines_by_page() {
        let mut second = span("b", "Body", 9.0, 50.0, 100.0);
        second.page = 2;
        let lines = merge_lines(
            &[span("a", "Body", 9.0, 50.0, 100.0), second],
            &LineMergeConfig::default(),
        );
        let grouped = lines_by_page(lines);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[1].0, 2);
    }

    proptest! {
        #[test]
        fn prop_same_row_spans_join_with_single_spaces(
            words in proptest::collection::vec("[A-Za-z]{1,8}", 1..12)
        ) {
            let spans: Vec<TextSpan> = words
                .iter()
                .enumerate()
                .map(|(i, w)| span(w, "Body", 9.0, 20.0 * i as f32, 100.0))
                .collect();
            let lines = merge_lines(&spans, &LineMergeConfig::default());
            prop_assert_eq!(lines.len(), 1);
            prop_assert_eq!(&lines[0].text, &words.join(" "));
        }

        #[test]
        fn prop_merge_is_deterministic(
            ys in proptest::collection::vec(0.0f32..400.0, 1..30)
        ) {
            let spans: Vec<TextSpan> = ys
                .iter()
                .enumerate()
                .map(|(i, y)| span("w", "Body", 9.0, (i % 5) as f32 * 30.0, *y))
                .collect();
            let a = merge_lines(&spans, &LineMergeConfig::default());
            let b = merge_lines(&spans, &LineMergeConfig::default());
            prop_assert_eq!(
                serde_json::to_string(&a).unwrap(),
                serde_json::to_string(&b).unwrap()
            );
        }
    }
}
