//! Record path: boundary detection, continuation merge, field segmentation.

pub mod boundary;
pub mod continuation;
pub mod fields;
pub mod signature;

pub use boundary::{BoundaryDetector, DetectorState, PageScan};
pub use continuation::{merge_records, scan_pages, MergeOutcome, ScanAccumulator};
pub use fields::{segment_record, SegmentedRecord, SubEntry};
pub use signature::{RoleSet, SignatureTable};

use crate::config::{ExtractionConfig, RecordProfile};
use crate::error::FolioError;
use crate::layout::{lines_by_page, logical_lines};
use crate::model::{LogicalLine, RawRecord};
use crate::render::PageRenderer;
use crate::report::{ExtractionWarning, WarningKind};
use serde::Serialize;
use tracing::{info, warn};

/// Output of one record-path run over a page range.
#[derive(Debug, Clone, Serialize)]
pub struct RecordRun {
    pub profile: String,
    pub pages: Vec<usize>,
    pub records: Vec<RawRecord>,
    /// Lines before the first confirmed boundary of the range.
    pub preamble_lines: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,
}

impl RecordRun {
    /// Segment every record into fields and sub-entries.
    pub fn segment(&self, profile: &RecordProfile) -> Vec<SegmentedRecord> {
        let signatures = SignatureTable::new(&profile.signatures);
        self.records
            .iter()
            .map(|r| segment_record(r, profile, &signatures))
            .collect()
    }

    /// Segmented records together with the run's pages and warnings.
    pub fn segmented(&self, profile: &RecordProfile) -> SegmentedRun {
        SegmentedRun {
            profile: self.profile.clone(),
            pages: self.pages.clone(),
            records: self.segment(profile),
            preamble_lines: self.preamble_lines,
            warnings: self.warnings.clone(),
        }
    }
}

/// A [`RecordRun`] after field segmentation.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentedRun {
    pub profile: String,
    pub pages: Vec<usize>,
    pub records: Vec<SegmentedRecord>,
    pub preamble_lines: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,
}

/// Render `pages`, merge lines and detect records with the configured profile.
pub fn extract_records(
    renderer: &dyn PageRenderer,
    pages: &[usize],
    config: &ExtractionConfig,
) -> Result<RecordRun, FolioError> {
    if config.profile.signatures.is_empty() {
        return Err(FolioError::Config(format!(
            "profile '{}' has no signatures; the record path needs at least a header and a confirm signature",
            config.profile.name
        )));
    }
    let lines = logical_lines(renderer, pages, config)?;
    let mut run = detect_records(lines, &config.profile);
    run.pages = pages.to_vec();
    Ok(run)
}

/// The record path over already merged lines (in reading order).
pub fn detect_records(lines: Vec<LogicalLine>, profile: &RecordProfile) -> RecordRun {
    let pages = lines_by_page(lines);
    let detector = BoundaryDetector::new(profile);

    let scanned = scan_pages(&pages, &detector);
    let merged = merge_records(scanned.finalized, profile);

    let mut warnings = Vec::new();
    if scanned.discarded_lines > 0 {
        warn!(lines = scanned.discarded_lines, "discarded preamble before first record");
        warnings.push(ExtractionWarning::new(
            WarningKind::DiscardedPreamble,
            format!(
                "{} line(s) before the first record were discarded",
                scanned.discarded_lines
            ),
        ));
    }
    if merged.dropped_fragments > 0 {
        warn!(
            fragments = merged.dropped_fragments,
            lines = merged.dropped_lines,
            "dropped leading continuation fragment"
        );
        warnings.push(ExtractionWarning::new(
            WarningKind::OrphanFragment,
            format!(
                "{} leading fragment(s) ({} line(s)) had no record to continue",
                merged.dropped_fragments, merged.dropped_lines
            ),
        ));
    }
    if let Some(expected) = profile.expected_records {
        if expected != merged.records.len() {
            warn!(
                expected,
                actual = merged.records.len(),
                profile = %profile.name,
                "record count mismatch"
            );
            warnings.push(ExtractionWarning::count_mismatch(
                None,
                "records",
                expected,
                merged.records.len(),
            ));
        }
    }

    info!(
        profile = %profile.name,
        records = merged.records.len(),
        "record extraction finished"
    );

    RecordRun {
        profile: profile.name.clone(),
        pages: pages.iter().map(|(p, _)| *p).collect(),
        records: merged.records,
        preamble_lines: scanned.discarded_lines,
        warnings,
    }
}
