use super::signature::{RoleSet, SignatureTable};
use crate::config::{RecordProfile, Role};
use crate::model::{normalize_ws, LogicalLine, RawRecord};
use tracing::trace;

/// A record name may wrap onto at most this many header-font lines.
const MAX_NAME_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum DetectorState {
    /// No record open yet; lines are preamble.
    Scanning,
    Open(RawRecord),
}

/// Result of scanning one page: records closed on it and the state at its end.
#[derive(Debug, Clone, PartialEq)]
pub struct PageScan {
    pub finalized: Vec<RawRecord>,
    pub state: DetectorState,
    pub discarded_lines: usize,
}

/// Signature + lookahead state machine over one profile.
pub struct BoundaryDetector<'a> {
    profile: &'a RecordProfile,
    signatures: SignatureTable,
    vocabulary: Vec<String>,
}

impl<'a> BoundaryDetector<'a> {
    pub fn new(profile: &'a RecordProfile) -> Self {
        BoundaryDetector {
            profile,
            signatures: SignatureTable::new(&profile.signatures),
            vocabulary: profile
                .confirm_vocabulary
                .iter()
                .map(|v| v.to_lowercase())
                .collect(),
        }
    }

    pub fn profile(&self) -> &RecordProfile {
        self.profile
    }

    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    pub fn is_candidate(&self, line: &LogicalLine, roles: RoleSet) -> bool {
        roles.contains(Role::RecordHeader)
            && !self.profile.is_denylisted(&line.text)
            && !clean_name(&line.text).is_empty()
    }

    /// Confirm signature plus, when a vocabulary is configured, one of its
    /// tokens as a whole word.
    pub fn is_confirmation(&self, line: &LogicalLine, roles: RoleSet) -> bool {
        if !roles.contains(Role::Confirm) {
            return false;
        }
        if self.vocabulary.is_empty() {
            return true;
        }
        let lower = line.text.to_lowercase();
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| self.vocabulary.iter().any(|v| v == word))
    }

    /// Run the state machine over one page's lines.
    ///
    /// `next_page_head` is the start of the following page; the lookahead
    /// window may run into it so a header on the last line of a page can be
    /// confirmed by the first lines of the next.
    pub fn scan_page(
        &self,
        lines: &[LogicalLine],
        next_page_head: &[LogicalLine],
        state: DetectorState,
    ) -> PageScan {
        let roles = self.signatures.roles_for(lines);
        let head = &next_page_head[..next_page_head.len().min(self.profile.lookahead_lines)];
        let head_roles = self.signatures.roles_for(head);

        let mut state = state;
        let mut finalized = Vec::new();
        let mut discarded_lines = 0;
        let mut i = 0;

        while i < lines.len() {
            if let Some(name_end) = self.confirmed_boundary(lines, &roles, i, head, &head_roles) {
                let name = clean_name(
                    &lines[i..name_end]
                        .iter()
                        .map(|l| l.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                let opened = DetectorState::Open(RawRecord::open(name, lines[i].page));
                if let DetectorState::Open(prev) = std::mem::replace(&mut state, opened) {
                    finalize(prev, &mut finalized);
                }
                i = name_end;
                continue;
            }

            match &mut state {
                DetectorState::Scanning => discarded_lines += 1,
                DetectorState::Open(rec) => self.accumulate(rec, &lines[i]),
            }
            i += 1;
        }

        PageScan {
            finalized,
            state,
            discarded_lines,
        }
    }

    /// If `lines[i]` opens a confirmed record, the exclusive end of its name lines.
    fn confirmed_boundary(
        &self,
        lines: &[LogicalLine],
        roles: &[RoleSet],
        i: usize,
        head: &[LogicalLine],
        head_roles: &[RoleSet],
    ) -> Option<usize> {
        let candidate = &lines[i];
        if !self.is_candidate(candidate, roles[i]) {
            return None;
        }

        let mut end = i + 1;
        while end < lines.len()
            && end - i < MAX_NAME_LINES
            && self.continues_name(&lines[end - 1], &lines[end], roles[end])
        {
            end += 1;
        }
        let name_last = &lines[end - 1];

        let window = lines[end..]
            .iter()
            .zip(roles[end..].iter().copied())
            .chain(head.iter().zip(head_roles.iter().copied()))
            .take(self.profile.lookahead_lines);

        for (line, line_roles) in window {
            let same_flow = line.page == name_last.page && line.column == name_last.column;
            if same_flow && line.bbox.y_min - name_last.bbox.y_max > self.profile.lookahead_max_gap
            {
                break;
            }
            if self.is_confirmation(line, line_roles) {
                return Some(end);
            }
            // The nearer header owns any confirmation further down.
            if self.is_candidate(line, line_roles) {
                break;
            }
        }

        trace!(
            page = candidate.page,
            text = %candidate.text,
            "header candidate not confirmed, folded into content"
        );
        None
    }

    /// A wrapped record name: same font, directly below, same flow.
    fn continues_name(&self, prev: &LogicalLine, next: &LogicalLine, roles: RoleSet) -> bool {
        self.is_candidate(next, roles)
            && next.page == prev.page
            && next.column == prev.column
            && next.font == prev.font
            && next.bbox.y_min - prev.bbox.y_max <= prev.size / 2.0
    }

    fn accumulate(&self, rec: &mut RawRecord, line: &LogicalLine) {
        if let Some(marker) = self.profile.match_section_marker(&line.text) {
            rec.mark_section(marker);
            rec.push_line(line.clone(), Some(marker));
            return;
        }
        let section = rec.current_section().map(str::to_string);
        rec.push_line(line.clone(), section.as_deref());
    }
}

/// Close a record and emit it. Empty nameless fragments are dropped.
pub(crate) fn finalize(mut rec: RawRecord, out: &mut Vec<RawRecord>) {
    if !rec.is_named() && rec.lines.is_empty() {
        return;
    }
    rec.close();
    out.push(rec);
}

/// Record name from its trigger line(s): whitespace-normalized, trailing
/// punctuation and footnote marks removed.
pub fn clean_name(text: &str) -> String {
    normalize_ws(text)
        .trim_end_matches([':', '.', ',', ';', '*', '†', '‡'])
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignatureDef;
    use crate::model::{BBox, RecordState, StyleFlags, TextSpan};

    fn profile() -> RecordProfile {
        let sig = |role, bold, italic, min: Option<f32>, max: Option<f32>| SignatureDef {
            role,
            font: None,
            min_size: min,
            max_size: max,
            bold: Some(bold),
            italic: Some(italic),
        };
        RecordProfile {
            name: "test".into(),
            signatures: vec![
                sig(Role::RecordHeader, true, false, Some(12.0), None),
                sig(Role::Confirm, false, true, None, Some(11.0)),
                sig(Role::Label, true, false, None, Some(11.0)),
            ],
            lookahead_lines: 3,
            lookahead_max_gap: 40.0,
            confirm_vocabulary: vec!["Small".into(), "Medium".into()],
            labels: vec!["Armor Class".into()],
            section_markers: vec!["Actions".into()],
            ..Default::default()
        }
    }

    fn line(text: &str, style: StyleFlags, size: f32, page: usize, y: f32) -> LogicalLine {
        LogicalLine::from_span(TextSpan {
            text: text.into(),
            font: format!("Serif-{style}"),
            size,
            style,
            bbox: BBox::new(50.0, y, 250.0, y + size),
            page,
            column: 0,
        })
    }

    fn header(text: &str, page: usize, y: f32) -> LogicalLine {
        line(text, StyleFlags::BOLD, 13.0, page, y)
    }

    fn confirm(text: &str, page: usize, y: f32) -> LogicalLine {
        line(text, StyleFlags::ITALIC, 9.0, page, y)
    }

    fn body(text: &str, page: usize, y: f32) -> LogicalLine {
        line(text, StyleFlags::PLAIN, 9.0, page, y)
    }

    fn open_record(scan: &PageScan) -> &RawRecord {
        match &scan.state {
            DetectorState::Open(rec) => rec,
            DetectorState::Scanning => panic!("expected an open record"),
        }
    }

    #[test]
    fn test_confirmed_header_opens_record() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            header("Goblin", 1, 100.0),
            confirm("Small humanoid (goblinoid), neutral evil", 1, 116.0),
            line("Armor Class", StyleFlags::BOLD, 9.0, 1, 130.0),
            body("15 (leather armor, shield)", 1, 130.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Scanning);
        assert!(scan.finalized.is_empty());
        assert_eq!(scan.discarded_lines, 0);
        let rec = open_record(&scan);
        assert_eq!(rec.name.as_deref(), Some("Goblin"));
        assert_eq!(rec.lines.len(), 3);
        assert_eq!(rec.pages, vec![1]);
    }

    #[test]
    fn test_unconfirmed_header_never_opens_record() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            header("Goblin", 1, 100.0),
            body("Goblins are small, black-hearted humanoids.", 1, 116.0),
            body("They lair in caves.", 1, 128.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Scanning);
        assert_eq!(scan.state, DetectorState::Scanning);
        assert_eq!(scan.discarded_lines, 3);
    }

    #[test]
    fn test_unconfirmed_candidate_folds_into_open_record() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            header("Pack Tactics", 1, 300.0),
            body("The wolf has advantage on attack rolls.", 1, 316.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Open(RawRecord::open("Wolf", 1)));
        let rec = open_record(&scan);
        assert_eq!(rec.name.as_deref(), Some("Wolf"));
        assert_eq!(rec.lines.len(), 2);
        assert_eq!(rec.lines[0].line.text, "Pack Tactics");
    }

    #[test]
    fn test_confirmation_beyond_gap_is_ignored() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            header("Goblin", 1, 100.0),
            confirm("Small humanoid", 1, 170.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Scanning);
        assert_eq!(scan.state, DetectorState::Scanning);
    }

    #[test]
    fn test_confirmation_without_vocabulary_token_is_ignored() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            header("Goblin", 1, 100.0),
            confirm("Smallish remarks in italics", 1, 116.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Scanning);
        assert_eq!(scan.state, DetectorState::Scanning);
    }

    #[test]
    fn test_lookahead_crosses_into_next_page() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let page1 = vec![body("end of the wolf", 1, 700.0), header("Goblin", 1, 760.0)];
        let page2 = vec![confirm("Small humanoid (goblinoid)", 2, 40.0)];
        let scan = detector.scan_page(&page1, &page2, DetectorState::Open(RawRecord::open("Wolf", 1)));
        assert_eq!(scan.finalized.len(), 1);
        assert_eq!(scan.finalized[0].name.as_deref(), Some("Wolf"));
        assert_eq!(scan.finalized[0].state, RecordState::Closed);
        let rec = open_record(&scan);
        assert_eq!(rec.name.as_deref(), Some("Goblin"));
        assert!(rec.lines.is_empty());
    }

    #[test]
    fn test_nearer_header_owns_confirmation() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            header("Goblins", 1, 100.0),
            body("Goblins are small humanoids.", 1, 116.0),
            header("Goblin Boss", 1, 140.0),
            confirm("Small humanoid (goblinoid)", 1, 156.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Scanning);
        assert_eq!(scan.discarded_lines, 2);
        assert_eq!(open_record(&scan).name.as_deref(), Some("Goblin Boss"));
    }

    #[test]
    fn test_wrapped_name_joins_lines() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            header("Adult Red", 1, 100.0),
            header("Dragon", 1, 115.0),
            confirm("Huge dragon, Medium build", 1, 131.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Scanning);
        assert_eq!(open_record(&scan).name.as_deref(), Some("Adult Red Dragon"));
    }

    #[test]
    fn test_section_markers_tag_following_lines() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![
            body("Speed 30 ft.", 1, 100.0),
            header("Actions", 1, 120.0),
            body("Bite. Melee Weapon Attack", 1, 140.0),
        ];
        let scan = detector.scan_page(&lines, &[], DetectorState::Open(RawRecord::open("Wolf", 1)));
        let rec = open_record(&scan);
        assert_eq!(rec.sections, vec!["Actions".to_string()]);
        assert_eq!(rec.lines[0].section, None);
        assert_eq!(rec.lines[1].section.as_deref(), Some("Actions"));
        assert_eq!(rec.lines[2].section.as_deref(), Some("Actions"));
    }

    #[test]
    fn test_empty_fragment_is_dropped_on_boundary() {
        let p = profile();
        let detector = BoundaryDetector::new(&p);
        let lines = vec![header("Goblin", 2, 40.0), confirm("Small humanoid", 2, 56.0)];
        let scan = detector.scan_page(&lines, &[], DetectorState::Open(RawRecord::fragment(2)));
        assert!(scan.finalized.is_empty());
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Goblin   Boss* "), "Goblin Boss");
        assert_eq!(clean_name("Fireball."), "Fireball");
    }
}
