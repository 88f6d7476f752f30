use super::signature::{RoleSet, SignatureTable};
use crate::config::{clean_label, RecordProfile, Role};
use crate::model::{normalize_ws, FieldBuffer, LogicalLine, RawRecord, RecordLine};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static SENTENCE_CAPITAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]["')\u{201D}\u{2019}]*\s+[A-Z]"#).expect("sentence regex is valid")
});

/// A named item inside a record (trait, action, "At Higher Levels.").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub description: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedRecord {
    pub name: Option<String>,
    pub pages: Vec<usize>,
    /// The confirming line ("Small humanoid (goblinoid), neutral evil").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub sections: Vec<String>,
    pub fields: Vec<FieldBuffer>,
    pub sub_entries: Vec<SubEntry>,
    /// Text outside every field and sub-entry.
    pub body: String,
    pub body_paragraphs: Vec<String>,
    /// Label-signature lines that matched no configured label.
    pub unknown_labels: usize,
}

impl SegmentedRecord {
    pub fn field(&self, label: &str) -> Option<&FieldBuffer> {
        self.fields
            .iter()
            .find(|f| f.label.eq_ignore_ascii_case(label))
    }

    pub fn sub_entry(&self, name: &str) -> Option<&SubEntry> {
        self.sub_entries.iter().find(|s| s.name == name)
    }
}

/// Counts visual rows as lines arrive: a line more than half its size below
/// the current row top starts a new row.
#[derive(Debug, Clone, Copy)]
struct RowTracker {
    page: usize,
    column: usize,
    top: f32,
    rows: usize,
}

impl RowTracker {
    fn start(line: &LogicalLine) -> Self {
        RowTracker {
            page: line.page,
            column: line.column,
            top: line.bbox.y_min,
            rows: 1,
        }
    }

    fn advance(&mut self, line: &LogicalLine) -> usize {
        let same_row = line.page == self.page
            && line.column == self.column
            && (line.bbox.y_min - self.top).abs() <= line.size / 2.0;
        if !same_row {
            self.page = line.page;
            self.column = line.column;
            self.top = line.bbox.y_min;
            self.rows += 1;
        }
        self.rows
    }
}

enum Active {
    None,
    Field { index: usize, rows: RowTracker },
    /// A row of several labels ("STR DEX CON ..."), values distributed by x.
    LabelRow {
        anchors: Vec<(usize, f32)>,
        rows: RowTracker,
    },
    SubEntry(usize),
}

struct Segmenter<'a> {
    profile: &'a RecordProfile,
    fields: Vec<FieldBuffer>,
    sub_entries: Vec<SubEntry>,
    descriptions: Vec<Vec<String>>,
    body: Vec<String>,
    subtitle: Option<String>,
    unknown_labels: usize,
    active: Active,
}

/// Recover labelled fields, sub-entries and free body text from one record.
pub fn segment_record(
    record: &RawRecord,
    profile: &RecordProfile,
    signatures: &SignatureTable,
) -> SegmentedRecord {
    let lines: Vec<&LogicalLine> = record.lines.iter().map(|l| &l.line).collect();
    let roles: Vec<RoleSet> = lines.iter().map(|l| signatures.roles(l)).collect();

    let mut seg = Segmenter {
        profile,
        fields: Vec::new(),
        sub_entries: Vec::new(),
        descriptions: Vec::new(),
        body: Vec::new(),
        subtitle: None,
        unknown_labels: 0,
        active: Active::None,
    };

    let mut i = 0;
    while i < lines.len() {
        i = seg.consume(&record.lines, &lines, &roles, i);
    }
    seg.finish(record)
}

impl<'a> Segmenter<'a> {
    /// Handle the line at `i`; returns the index of the next unconsumed line.
    fn consume(
        &mut self,
        record_lines: &[RecordLine],
        lines: &[&LogicalLine],
        roles: &[RoleSet],
        i: usize,
    ) -> usize {
        let line = lines[i];
        let role = roles[i];

        if is_marker_line(&record_lines[i], self.profile) {
            self.active = Active::None;
            return i + 1;
        }

        if self.subtitle.is_none()
            && self.fields.is_empty()
            && self.sub_entries.is_empty()
            && self.body.is_empty()
            && role.contains(Role::Confirm)
        {
            self.subtitle = Some(normalize_ws(&line.text));
            return i + 1;
        }

        // Sub-entry emphasis is checked before labels: bold+italic may also
        // satisfy a loose label signature.
        if role.contains(Role::SubEntry) {
            if let Some((name, next)) = self.sub_entry_name(lines, roles, i) {
                self.sub_entries.push(SubEntry {
                    name,
                    section: record_lines[i].section.clone(),
                    description: String::new(),
                    paragraphs: Vec::new(),
                });
                self.descriptions.push(Vec::new());
                self.active = Active::SubEntry(self.sub_entries.len() - 1);
                return next;
            }
        }

        if role.contains(Role::Label) {
            if let Some(anchors) = self.label_row(line) {
                self.active = Active::LabelRow {
                    anchors,
                    rows: RowTracker::start(line),
                };
                return i + 1;
            }

            let (text, next) = self.repair_label(lines, roles, i);
            if let Some(label) = self.profile.match_label(&text) {
                let index = self.field_index(label);
                self.active = Active::Field {
                    index,
                    rows: RowTracker::start(line),
                };
                return next;
            }

            if !matches!(self.active, Active::SubEntry(_)) {
                self.unknown_labels += 1;
                self.active = Active::None;
                return i + 1;
            }
        }

        self.content(line);
        i + 1
    }

    fn content(&mut self, line: &LogicalLine) {
        let max_rows = self.profile.max_field_rows;
        match &mut self.active {
            Active::Field { index, rows } => {
                let row = rows.advance(line);
                let field = &mut self.fields[*index];
                let over = max_rows.is_some_and(|max| row > max);
                if over && !has_open_paren(&field.value()) {
                    self.active = Active::None;
                    self.body.push(line.text.clone());
                } else {
                    field.push(&line.text);
                }
            }
            Active::LabelRow { anchors, rows } => {
                if rows.advance(line) > 2 {
                    self.active = Active::None;
                    self.body.push(line.text.clone());
                    return;
                }
                for (token, x) in token_centers(line) {
                    if let Some(&(index, _)) = anchors
                        .iter()
                        .min_by(|a, b| (a.1 - x).abs().total_cmp(&(b.1 - x).abs()))
                    {
                        self.fields[index].push(token);
                    }
                }
            }
            Active::SubEntry(index) => self.descriptions[*index].push(line.text.clone()),
            Active::None => self.body.push(line.text.clone()),
        }
    }

    /// Greedily join following short bold fragments while the text still
    /// starts a known label ("Hit" + "Points").
    fn repair_label(&self, lines: &[&LogicalLine], roles: &[RoleSet], i: usize) -> (String, usize) {
        let mut text = clean_label(&lines[i].text);
        let mut next = i + 1;
        while next < lines.len() && self.is_label_fragment(lines[next], roles[next]) {
            let joined = format!("{} {}", text, clean_label(&lines[next].text));
            if !self.profile.is_label_prefix(&joined) {
                break;
            }
            text = joined;
            next += 1;
        }
        (text, next)
    }

    fn is_label_fragment(&self, line: &LogicalLine, role: RoleSet) -> bool {
        let text = clean_label(&line.text);
        role.contains(Role::Label)
            && !text.is_empty()
            && text.chars().count() <= self.profile.max_label_fragment_chars
            && text.chars().all(|c| c.is_alphanumeric() || c.is_whitespace())
    }

    /// A line of two or more labels, each anchored at its x centre.
    fn label_row(&mut self, line: &LogicalLine) -> Option<Vec<(usize, f32)>> {
        let tokens = token_centers(line);
        if tokens.len() < 2 {
            return None;
        }
        let mut labels = Vec::with_capacity(tokens.len());
        for (token, x) in tokens {
            labels.push((self.profile.match_label(token)?.to_string(), x));
        }
        Some(
            labels
                .into_iter()
                .map(|(label, x)| (self.field_index(&label), x))
                .collect(),
        )
    }

    /// Sub-entry name: consecutive emphasis lines (at most three) up to one
    /// ending in a terminator.
    fn sub_entry_name(
        &self,
        lines: &[&LogicalLine],
        roles: &[RoleSet],
        i: usize,
    ) -> Option<(String, usize)> {
        let terminators = &self.profile.sub_entry_terminators;
        let mut parts: Vec<&str> = Vec::new();
        let mut j = i;
        while j < lines.len() && j - i < 3 && roles[j].contains(Role::SubEntry) {
            let text = lines[j].text.trim();
            parts.push(text);
            j += 1;
            if text.ends_with(|c: char| terminators.contains(c)) {
                let name = normalize_ws(&parts.join(" "));
                let name = name.trim_end_matches(|c: char| terminators.contains(c)).trim();
                if name.is_empty() {
                    return None;
                }
                return Some((name.to_string(), j));
            }
        }
        None
    }

    fn field_index(&mut self, label: &str) -> usize {
        match self.fields.iter().position(|f| f.label == label) {
            Some(index) => index,
            None => {
                self.fields.push(FieldBuffer::new(label));
                self.fields.len() - 1
            }
        }
    }

    fn finish(self, record: &RawRecord) -> SegmentedRecord {
        let profile = self.profile;
        let sub_entries = self
            .sub_entries
            .into_iter()
            .zip(self.descriptions)
            .map(|(mut entry, parts)| {
                entry.description = normalize_ws(&parts.join(" "));
                entry.paragraphs = split_paragraphs(&entry.description, profile);
                entry
            })
            .collect();
        let body = normalize_ws(&self.body.join(" "));
        SegmentedRecord {
            name: record.name.clone(),
            pages: record.pages.clone(),
            subtitle: self.subtitle,
            sections: record.sections.clone(),
            fields: self.fields,
            sub_entries,
            body_paragraphs: split_paragraphs(&body, profile),
            body,
            unknown_labels: self.unknown_labels,
        }
    }
}

fn is_marker_line(line: &RecordLine, profile: &RecordProfile) -> bool {
    match (profile.match_section_marker(&line.line.text), line.section.as_deref()) {
        (Some(marker), Some(section)) => marker == section,
        _ => false,
    }
}

fn has_open_paren(text: &str) -> bool {
    text.matches('(').count() > text.matches(')').count()
}

/// Whitespace-separated tokens with their estimated x centres, apportioning
/// each span's width by character offset.
fn token_centers(line: &LogicalLine) -> Vec<(&str, f32)> {
    let mut out = Vec::new();
    for span in &line.spans {
        let total = span.text.chars().count().max(1) as f32;
        let mut cursor = 0;
        for token in span.text.split_whitespace() {
            let start = span.text[cursor..]
                .find(token)
                .map_or(cursor, |p| p + cursor);
            cursor = start + token.len();
            let before = span.text[..start].chars().count() as f32;
            let mid = before + token.chars().count() as f32 / 2.0;
            out.push((token, span.bbox.x_min + span.bbox.width() * mid / total));
        }
    }
    out
}

/// Sentence-level split: a boundary is terminal punctuation followed by
/// whitespace and a capital letter.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_CAPITAL_RE.find_iter(text) {
        let cut = m.end() - 1;
        let sentence = text[start..cut].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = cut;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Group sentences into paragraphs. A new paragraph starts at a sentence
/// opening with a transition word, or when the current one would exceed
/// `max_paragraph_chars`.
pub fn split_paragraphs(text: &str, profile: &RecordProfile) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        let too_long = current.chars().count() + 1 + sentence.chars().count()
            > profile.max_paragraph_chars;
        if !current.is_empty()
            && (too_long || opens_with_transition(sentence, &profile.transition_words))
        {
            paragraphs.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn opens_with_transition(sentence: &str, words: &[String]) -> bool {
    let first = sentence
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches(|c: char| !c.is_alphanumeric());
    words.iter().any(|w| w.eq_ignore_ascii_case(first))
}
