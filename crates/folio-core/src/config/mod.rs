pub mod builtin;

use crate::error::FolioError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Immutable settings for one extraction run. Passed by reference to every
/// pass; nothing in the engine keeps configuration in global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub lines: LineMergeConfig,
    pub columns: ColumnLayout,
    /// Y tolerance for table row clustering when a target does not set its own.
    pub table_y_tolerance: f32,
    pub profile: RecordProfile,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            lines: LineMergeConfig::default(),
            columns: ColumnLayout::default(),
            table_y_tolerance: 3.0,
            profile: RecordProfile::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineMergeConfig {
    pub y_tolerance: f32,
    pub size_tolerance: f32,
}

impl Default for LineMergeConfig {
    fn default() -> Self {
        LineMergeConfig {
            y_tolerance: 2.0,
            size_tolerance: 0.5,
        }
    }
}

/// Column model for reading order. No split means a single column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub split_x: Option<f32>,
    pub page_splits: Vec<PageSplit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSplit {
    pub page: usize,
    pub x: f32,
}

impl ColumnLayout {
    pub fn two_column(split_x: f32) -> Self {
        ColumnLayout {
            split_x: Some(split_x),
            page_splits: Vec::new(),
        }
    }

    /// Split point in force for `page`: a page-specific one wins.
    pub fn split_for(&self, page: usize) -> Option<f32> {
        self.page_splits
            .iter()
            .find(|s| s.page == page)
            .map(|s| s.x)
            .or(self.split_x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Record name line (creature/spell name).
    RecordHeader,
    /// Secondary line that confirms a header candidate.
    Confirm,
    /// Field label ("Armor Class", "Range").
    Label,
    /// Named sub-entry inside a record ("Pack Tactics.").
    SubEntry,
}

/// One row of the declarative signature table. Unset attributes match anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureDef {
    pub role: Role,
    /// Case-insensitive substring of the font name.
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub min_size: Option<f32>,
    #[serde(default)]
    pub max_size: Option<f32>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
}

/// Everything that makes one record type (creatures, spells, ...) detectable.
///
/// The numeric thresholds are tuned against one document family; they are
/// data, not constants, so other layouts can be configured without code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordProfile {
    pub name: String,
    pub signatures: Vec<SignatureDef>,
    /// How many lines after a header candidate may confirm it.
    pub lookahead_lines: usize,
    /// Maximum vertical gap between candidate and confirming line.
    pub lookahead_max_gap: f32,
    /// A named record shorter than this at a page end is carried to the next page.
    pub carry_min_chars: usize,
    pub min_header_chars: usize,
    pub min_body_chars: usize,
    /// Header-font lines that never start a record (field labels, section headers).
    pub denylist: Vec<String>,
    /// Tokens a confirming line must contain (any one, whole word).
    pub confirm_vocabulary: Vec<String>,
    pub labels: Vec<String>,
    pub section_markers: Vec<String>,
    /// Characters a sub-entry name must end with.
    pub sub_entry_terminators: String,
    /// Sentence openers that start a new description paragraph.
    pub transition_words: Vec<String>,
    pub max_paragraph_chars: usize,
    /// Close a field after this many visual rows; remaining text goes to the body.
    pub max_field_rows: Option<usize>,
    pub max_label_fragment_chars: usize,
    pub expected_records: Option<usize>,
}

impl Default for RecordProfile {
    fn default() -> Self {
        RecordProfile {
            name: "default".to_string(),
            signatures: Vec::new(),
            lookahead_lines: 4,
            lookahead_max_gap: 60.0,
            carry_min_chars: 40,
            min_header_chars: 40,
            min_body_chars: 40,
            denylist: Vec::new(),
            confirm_vocabulary: Vec::new(),
            labels: Vec::new(),
            section_markers: Vec::new(),
            sub_entry_terminators: ".:".to_string(),
            transition_words: Vec::new(),
            max_paragraph_chars: 600,
            max_field_rows: None,
            max_label_fragment_chars: 24,
            expected_records: None,
        }
    }
}

impl RecordProfile {
    pub fn has_role(&self, role: Role) -> bool {
        self.signatures.iter().any(|s| s.role == role)
    }

    /// The configured label matching `text`, ignoring case and trailing `:`/`.`.
    pub fn match_label(&self, text: &str) -> Option<&str> {
        let key = clean_label(text);
        self.labels
            .iter()
            .find(|l| l.eq_ignore_ascii_case(&key))
            .map(String::as_str)
    }

    /// True if `text` is the start of at least one configured label.
    pub fn is_label_prefix(&self, text: &str) -> bool {
        let key = clean_label(text).to_lowercase();
        !key.is_empty()
            && self
                .labels
                .iter()
                .any(|l| l.to_lowercase().starts_with(&key))
    }

    pub fn match_section_marker(&self, text: &str) -> Option<&str> {
        let key = clean_label(text);
        self.section_markers
            .iter()
            .find(|m| m.eq_ignore_ascii_case(&key))
            .map(String::as_str)
    }

    pub fn is_denylisted(&self, text: &str) -> bool {
        let key = clean_label(text);
        self.denylist.iter().any(|d| d.eq_ignore_ascii_case(&key))
            || self.match_label(text).is_some()
            || self.match_section_marker(text).is_some()
    }
}

/// Trim whitespace and trailing label punctuation.
pub fn clean_label(text: &str) -> String {
    crate::model::normalize_ws(text)
        .trim_end_matches([':', '.'])
        .trim()
        .to_string()
}

/// Load an extraction config from a TOML or JSON file.
pub fn load_config(path: &Path) -> Result<ExtractionConfig, FolioError> {
    let config: ExtractionConfig = read_structured(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse an extraction config from a TOML string.
pub fn parse_config_str(toml_src: &str) -> Result<ExtractionConfig, FolioError> {
    let config: ExtractionConfig = toml::from_str(toml_src)?;
    validate_config(&config)?;
    Ok(config)
}

/// Deserialize a TOML or JSON file, chosen by extension (TOML by default).
pub fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T, FolioError> {
    let content = std::fs::read_to_string(path).map_err(|e| FolioError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let parsed = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| FolioError::ConfigLoad {
        path: path.to_path_buf(),
        reason,
    })
}

/// Validate that a config is usable before any extraction runs.
pub fn validate_config(config: &ExtractionConfig) -> Result<(), FolioError> {
    check_tolerance("lines.y_tolerance", config.lines.y_tolerance)?;
    check_tolerance("lines.size_tolerance", config.lines.size_tolerance)?;
    if !(config.table_y_tolerance.is_finite() && config.table_y_tolerance > 0.0) {
        return Err(FolioError::Config(format!(
            "table_y_tolerance must be positive, got {}",
            config.table_y_tolerance
        )));
    }
    if let Some(x) = config.columns.split_x {
        check_tolerance("columns.split_x", x)?;
    }
    for split in &config.columns.page_splits {
        if split.page == 0 {
            return Err(FolioError::Config(
                "columns.page_splits: pages are 1-based".into(),
            ));
        }
        check_tolerance("columns.page_splits.x", split.x)?;
    }
    validate_profile(&config.profile)
}

/// Validate a record profile. An empty signature table is allowed (the
/// record path is then simply unused); a partial one is not.
pub fn validate_profile(profile: &RecordProfile) -> Result<(), FolioError> {
    if profile.signatures.is_empty() {
        return Ok(());
    }

    for role in [Role::RecordHeader, Role::Confirm] {
        if !profile.has_role(role) {
            return Err(FolioError::Config(format!(
                "profile '{}' has no {:?} signature",
                profile.name, role
            )));
        }
    }

    if profile.lookahead_lines == 0 {
        return Err(FolioError::Config(format!(
            "profile '{}': lookahead_lines must be at least 1",
            profile.name
        )));
    }
    check_tolerance("profile.lookahead_max_gap", profile.lookahead_max_gap)?;

    if profile.max_paragraph_chars == 0 {
        return Err(FolioError::Config(format!(
            "profile '{}': max_paragraph_chars must be positive",
            profile.name
        )));
    }

    if profile.max_field_rows == Some(0) {
        return Err(FolioError::Config(format!(
            "profile '{}': max_field_rows must be positive when set",
            profile.name
        )));
    }

    for sig in &profile.signatures {
        if let (Some(min), Some(max)) = (sig.min_size, sig.max_size) {
            if min > max {
                return Err(FolioError::Config(format!(
                    "profile '{}': {:?} signature has min_size {} > max_size {}",
                    profile.name, sig.role, min, max
                )));
            }
        }
    }

    if profile.has_role(Role::Label) && profile.labels.is_empty() {
        return Err(FolioError::Config(format!(
            "profile '{}' has a label signature but no labels",
            profile.name
        )));
    }

    Ok(())
}

fn check_tolerance(name: &str, value: f32) -> Result<(), FolioError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FolioError::Config(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}
