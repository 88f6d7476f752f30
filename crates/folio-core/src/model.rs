use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Axis-aligned box in page coordinates, origin top-left, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        BBox {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center_x(&self) -> f32 {
        (self.x_min + self.x_max) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y_min + self.y_max) / 2.0
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// True if the centre of `other` lies inside this box (edges inclusive).
    pub fn contains_center_of(&self, other: &BBox) -> bool {
        let (cx, cy) = (other.center_x(), other.center_y());
        cx >= self.x_min && cx <= self.x_max && cy >= self.y_min && cy <= self.y_max
    }

    pub fn is_well_formed(&self) -> bool {
        self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.x_max.is_finite()
            && self.y_max.is_finite()
            && self.x_max > self.x_min
            && self.y_max > self.y_min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleFlags {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl StyleFlags {
    pub const PLAIN: StyleFlags = StyleFlags {
        bold: false,
        italic: false,
    };
    pub const BOLD: StyleFlags = StyleFlags {
        bold: true,
        italic: false,
    };
    pub const ITALIC: StyleFlags = StyleFlags {
        bold: false,
        italic: true,
    };
    pub const BOLD_ITALIC: StyleFlags = StyleFlags {
        bold: true,
        italic: true,
    };
}

impl fmt::Display for StyleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.bold, self.italic) {
            (true, true) => write!(f, "bold+italic"),
            (true, false) => write!(f, "bold"),
            (false, true) => write!(f, "italic"),
            (false, false) => write!(f, "plain"),
        }
    }
}

/// The atomic rendered unit after reading-order assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub style: StyleFlags,
    pub bbox: BBox,
    pub page: usize,
    pub column: usize,
}

/// One visual line: same-style spans folded together by the line merger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalLine {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub style: StyleFlags,
    pub bbox: BBox,
    pub page: usize,
    pub column: usize,
    #[serde(skip)]
    pub spans: Vec<TextSpan>,
}

impl LogicalLine {
    pub fn from_span(span: TextSpan) -> Self {
        LogicalLine {
            text: span.text.clone(),
            font: span.font.clone(),
            size: span.size,
            style: span.style,
            bbox: span.bbox,
            page: span.page,
            column: span.column,
            spans: vec![span],
        }
    }

    pub fn push_span(&mut self, span: TextSpan) {
        self.text.push(' ');
        self.text.push_str(&span.text);
        self.bbox = self.bbox.union(&span.bbox);
        self.spans.push(span);
    }

    pub fn last_span(&self) -> Option<&TextSpan> {
        self.spans.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Open,
    Closed,
}

/// A content line of a record, tagged with the section marker in force.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordLine {
    #[serde(flatten)]
    pub line: LogicalLine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// A domain entity under construction (or finalized) on the record path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub name: Option<String>,
    /// Monotonic non-decreasing.
    pub pages: Vec<usize>,
    pub lines: Vec<RecordLine>,
    pub sections: Vec<String>,
    pub state: RecordState,
    /// Number of continuation fragments stitched into this record.
    pub merged_fragments: usize,
}

impl RawRecord {
    pub fn open(name: impl Into<String>, page: usize) -> Self {
        RawRecord {
            name: Some(name.into()),
            pages: vec![page],
            lines: Vec::new(),
            sections: Vec::new(),
            state: RecordState::Open,
            merged_fragments: 0,
        }
    }

    /// A nameless fragment: the top of a page before its first boundary.
    pub fn fragment(page: usize) -> Self {
        RawRecord {
            name: None,
            pages: vec![page],
            lines: Vec::new(),
            sections: Vec::new(),
            state: RecordState::Open,
            merged_fragments: 0,
        }
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.state == RecordState::Open
    }

    pub fn close(&mut self) {
        self.state = RecordState::Closed;
    }

    pub fn note_page(&mut self, page: usize) {
        if self.pages.last().map_or(true, |&last| page > last) {
            self.pages.push(page);
        }
    }

    pub fn push_line(&mut self, line: LogicalLine, section: Option<&str>) {
        self.note_page(line.page);
        self.lines.push(RecordLine {
            line,
            section: section.map(str::to_string),
        });
    }

    pub fn mark_section(&mut self, marker: &str) {
        if !self.sections.iter().any(|s| s == marker) {
            self.sections.push(marker.to_string());
        }
    }

    /// Current section tag: the section of the last content line.
    pub fn current_section(&self) -> Option<&str> {
        self.lines.last().and_then(|l| l.section.as_deref())
    }

    pub fn content_chars(&self) -> usize {
        self.lines.iter().map(|l| l.line.text.chars().count()).sum()
    }

    /// Characters before the first section marker.
    pub fn header_chars(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.section.is_none())
            .map(|l| l.line.text.chars().count())
            .sum()
    }

    /// Characters under any section marker.
    pub fn body_chars(&self) -> usize {
        self.content_chars() - self.header_chars()
    }

    /// Append another record's content: lines concatenated, pages extended.
    /// Lines the other record read before its first section marker continue
    /// the section currently in force here.
    pub fn absorb(&mut self, other: RawRecord) {
        for page in other.pages {
            self.note_page(page);
        }
        for marker in &other.sections {
            self.mark_section(marker);
        }
        let inherited = self.current_section().map(str::to_string);
        self.lines.extend(other.lines.into_iter().map(|mut l| {
            if l.section.is_none() {
                l.section = inherited.clone();
            }
            l
        }));
        self.merged_fragments += 1 + other.merged_fragments;
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Named accumulator for one labelled field inside a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldBuffer {
    pub label: String,
    fragments: Vec<String>,
}

impl FieldBuffer {
    pub fn new(label: impl Into<String>) -> Self {
        FieldBuffer {
            label: label.into(),
            fragments: Vec::new(),
        }
    }

    pub fn push(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.trim().is_empty())
    }

    /// Whitespace-normalized concatenation of every consumed fragment.
    pub fn value(&self) -> String {
        normalize_ws(&self.fragments.join(" "))
    }
}

impl Serialize for FieldBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("FieldBuffer", 2)?;
        st.serialize_field("label", &self.label)?;
        st.serialize_field("value", &self.value())?;
        st.end()
    }
}

/// One table row. Serializes as a plain list of cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Row {
    pub cells: Vec<String>,
    /// Left edge of the row's first span, when the row came from geometry.
    #[serde(skip)]
    pub x_offset: Option<f32>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Row {
            cells,
            x_offset: None,
        }
    }

    pub fn with_offset(cells: Vec<String>, x_offset: f32) -> Self {
        Row {
            cells,
            x_offset: Some(x_offset),
        }
    }

    pub fn first_cell(&self) -> &str {
        self.cells.first().map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    Extracted { pattern: String, pages: Vec<usize> },
    Calculated,
    Reference { note: Option<String> },
}

/// A grouping row and the data rows attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub name: String,
    pub row_index: usize,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryGroup>,
    pub provenance: Provenance,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Row>, provenance: Provenance) -> Self {
        RawTable {
            headers,
            rows,
            categories: Vec::new(),
            provenance,
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategoryGroup> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn cell_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|r| r.cells.clone()).collect()
    }
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, page: usize) -> LogicalLine {
        LogicalLine::from_span(TextSpan {
            text: text.into(),
            font: "Body".into(),
            size: 9.0,
            style: StyleFlags::PLAIN,
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            page,
            column: 0,
        })
    }

    #[test]
    fn test_bbox_union() {
        let a = BBox::new(10.0, 20.0, 30.0, 25.0);
        let b = BBox::new(5.0, 21.0, 40.0, 24.0);
        assert_eq!(a.union(&b), BBox::new(5.0, 20.0, 40.0, 25.0));
    }

    #[test]
    fn test_record_pages_monotonic() {
        let mut rec = RawRecord::open("Goblin", 3);
        rec.push_line(line("a", 3), None);
        rec.push_line(line("b", 4), None);
        rec.push_line(line("c", 4), None);
        rec.note_page(2);
        assert_eq!(rec.pages, vec![3, 4]);
    }

    #[test]
    fn test_absorb_extends_pages_and_lines() {
        let mut a = RawRecord::open("Goblin", 3);
        a.push_line(line("Small humanoid", 3), None);
        let mut b = RawRecord::fragment(4);
        b.push_line(line("Armor Class 15", 4), None);
        a.absorb(b);
        assert_eq!(a.pages, vec![3, 4]);
        assert_eq!(a.lines.len(), 2);
        assert_eq!(a.merged_fragments, 1);
    }

    #[test]
    fn test_absorbed_lines_continue_current_section() {
        let mut a = RawRecord::open("Wolf", 1);
        a.push_line(line("Actions", 1), Some("Actions"));
        let mut b = RawRecord::fragment(2);
        b.push_line(line("Bite. Melee", 2), None);
        a.absorb(b);
        assert_eq!(a.lines[1].section.as_deref(), Some("Actions"));
    }

    #[test]
    fn test_header_and_body_chars() {
        let mut rec = RawRecord::open("Wolf", 1);
        rec.push_line(line("abcd", 1), None);
        rec.push_line(line("efghij", 1), Some("Actions"));
        assert_eq!(rec.header_chars(), 4);
        assert_eq!(rec.body_chars(), 6);
    }

    #[test]
    fn test_field_buffer_value_normalizes_whitespace() {
        let mut f = FieldBuffer::new("Speed");
        f.push("  30 ft.,");
        f.push("climb   30 ft. ");
        assert_eq!(f.value(), "30 ft., climb 30 ft.");
    }

    #[test]
    fn test_row_serializes_as_cells() {
        let row = Row::with_offset(vec!["1".into(), "15".into()], 42.0);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"["1","15"]"#);
    }
}
