//! Stitching of record fragments split by page breaks.
//!
//! Pass 1 threads a [`ScanAccumulator`] through a fold over pages: a named
//! record that ends a page with too little content is carried into the next
//! page's scan instead of being finalized. Pass 2 ([`merge_records`]) runs
//! over the full finalized list and resolves nameless fragments.

use super::boundary::{finalize, BoundaryDetector, DetectorState};
use crate::config::RecordProfile;
use crate::model::{LogicalLine, RawRecord};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanAccumulator {
    pub finalized: Vec<RawRecord>,
    pub carry: Option<RawRecord>,
    pub discarded_lines: usize,
    pub pages_seen: usize,
}

impl ScanAccumulator {
    /// Scan one page, starting from the carried record if any.
    ///
    /// The first page of a run starts in SCANNING; every later page without a
    /// carry starts with an open nameless fragment.
    pub fn step(
        mut self,
        detector: &BoundaryDetector<'_>,
        page: usize,
        lines: &[LogicalLine],
        next_page_head: &[LogicalLine],
    ) -> Self {
        let state = match self.carry.take() {
            Some(rec) => DetectorState::Open(rec),
            None if self.pages_seen == 0 => DetectorState::Scanning,
            None => DetectorState::Open(RawRecord::fragment(page)),
        };

        let scan = detector.scan_page(lines, next_page_head, state);
        debug!(
            page,
            lines = lines.len(),
            finalized = scan.finalized.len(),
            "scanned page"
        );
        self.finalized.extend(scan.finalized);
        self.discarded_lines += scan.discarded_lines;
        self.pages_seen += 1;

        if let DetectorState::Open(rec) = scan.state {
            if should_carry(&rec, detector.profile()) {
                debug!(page, name = ?rec.name, "carrying short record into next page");
                self.carry = Some(rec);
            } else {
                finalize(rec, &mut self.finalized);
            }
        }
        self
    }

    /// End of range: whatever is still carried is finalized.
    pub fn finish(mut self) -> Self {
        if let Some(rec) = self.carry.take() {
            finalize(rec, &mut self.finalized);
        }
        self
    }
}

fn should_carry(rec: &RawRecord, profile: &RecordProfile) -> bool {
    rec.is_named() && rec.content_chars() < profile.carry_min_chars
}

/// Pass 1 over pages grouped as `(page, lines)` in ascending order.
pub fn scan_pages(
    pages: &[(usize, Vec<LogicalLine>)],
    detector: &BoundaryDetector<'_>,
) -> ScanAccumulator {
    pages
        .iter()
        .enumerate()
        .fold(ScanAccumulator::default(), |acc, (idx, (page, lines))| {
            let next_head = pages
                .get(idx + 1)
                .map(|(_, next)| next.as_slice())
                .unwrap_or(&[]);
            acc.step(detector, *page, lines, next_head)
        })
        .finish()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<RawRecord>,
    /// Leading nameless fragments with no predecessor.
    pub dropped_fragments: usize,
    pub dropped_lines: usize,
}

/// Pass 2: forward rule, then backward rule.
///
/// Forward: a named record whose header and body are both below threshold
/// absorbs an immediately following nameless record. Backward: every
/// remaining nameless record is appended to its predecessor.
pub fn merge_records(records: Vec<RawRecord>, profile: &RecordProfile) -> MergeOutcome {
    let mut forward: Vec<RawRecord> = Vec::with_capacity(records.len());
    let mut iter = records.into_iter().peekable();
    while let Some(mut rec) = iter.next() {
        let next_is_fragment = iter.peek().is_some_and(|next| !next.is_named());
        if rec.is_named() && is_minimal(&rec, profile) && next_is_fragment {
            if let Some(next) = iter.next() {
                rec.absorb(next);
            }
        }
        forward.push(rec);
    }

    let mut outcome = MergeOutcome::default();
    for rec in forward {
        if rec.is_named() {
            outcome.records.push(rec);
            continue;
        }
        match outcome.records.last_mut() {
            Some(prev) => prev.absorb(rec),
            None => {
                outcome.dropped_fragments += 1;
                outcome.dropped_lines += rec.lines.len();
            }
        }
    }
    outcome
}

fn is_minimal(rec: &RawRecord, profile: &RecordProfile) -> bool {
    rec.header_chars() < profile.min_header_chars && rec.body_chars() < profile.min_body_chars
}
