use crate::model::{BBox, TextSpan};
use std::collections::BTreeMap;

/// Spans that share one rounded top-Y key, ordered by ascending x.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRow {
    pub key: i64,
    pub spans: Vec<TextSpan>,
}

impl SpanRow {
    pub fn top(&self) -> f32 {
        self.spans
            .iter()
            .map(|s| s.bbox.y_min)
            .fold(f32::INFINITY, f32::min)
    }

    pub fn left(&self) -> f32 {
        self.spans.first().map(|s| s.bbox.x_min).unwrap_or(0.0)
    }

    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Row key: top-Y rounded to the nearest multiple of `tolerance`.
pub fn y_key(y: f32, tolerance: f32) -> i64 {
    (y / tolerance).round() as i64
}

/// Group spans into rows by rounded top-Y, top to bottom.
pub fn cluster_rows(spans: Vec<TextSpan>, tolerance: f32) -> Vec<SpanRow> {
    let mut groups: BTreeMap<i64, Vec<TextSpan>> = BTreeMap::new();
    for span in spans {
        groups
            .entry(y_key(span.bbox.y_min, tolerance))
            .or_default()
            .push(span);
    }

    groups
        .into_iter()
        .map(|(key, mut spans)| {
            spans.sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));
            SpanRow { key, spans }
        })
        .collect()
}

/// Spans whose centre lies inside `region`.
pub fn spans_in_region(spans: &[TextSpan], region: &BBox) -> Vec<TextSpan> {
    spans
        .iter()
        .filter(|s| region.contains_center_of(&s.bbox))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StyleFlags;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan {
            text: text.into(),
            font: "Body".into(),
            size: 9.0,
            style: StyleFlags::PLAIN,
            bbox: BBox::new(x, y, x + 20.0, y + 9.0),
            page: 1,
            column: 0,
        }
    }

    #[test]
    fn test_y_key_rounds_to_tolerance_multiple() {
        assert_eq!(y_key(100.0, 3.0), 33);
        assert_eq!(y_key(101.4, 3.0), 34);
        assert_eq!(y_key(98.6, 3.0), 33);
    }

    #[test]
    fn test_cluster_rows_orders_by_y_then_x() {
        let rows = cluster_rows(
            vec![
                span("b2", 80.0, 120.0),
                span("a2", 80.0, 100.4),
                span("a1", 10.0, 99.8),
                span("b1", 10.0, 120.3),
            ],
            3.0,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(), "a1 a2");
        assert_eq!(rows[1].text(), "b1 b2");
        assert_eq!(rows[0].left(), 10.0);
    }

    #[test]
    fn test_spans_in_region_uses_centre() {
        let region = BBox::new(0.0, 0.0, 50.0, 50.0);
        let inside = span("in", 30.0, 10.0); // centre x = 40
        let outside = span("out", 45.0, 10.0); // centre x = 55
        let kept = spans_in_region(&[inside, outside], &region);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "in");
    }
}
