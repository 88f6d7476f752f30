use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("pdftohtml not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftohtmlNotFound,

    #[error("pdftohtml failed with exit code {code}: {stderr}")]
    PdftohtmlFailed { code: i32, stderr: String },

    #[error("malformed renderer output: {0}")]
    RenderOutput(String),

    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("renderer '{backend}' does not support grid table detection")]
    GridUnsupported { backend: String },

    #[error("no grid table on page(s) {pages:?} matched the configured headers")]
    NoGridMatch { pages: Vec<usize> },

    #[error("formula error: {0}")]
    Formula(String),

    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("table '{target}' failed: {source}")]
    Target {
        target: String,
        #[source]
        source: Box<FolioError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FolioError {
    /// Configuration errors are programming errors: they abort a batch in
    /// every mode.
    pub fn is_config(&self) -> bool {
        match self {
            FolioError::Config(_) | FolioError::ConfigLoad { .. } | FolioError::Toml(_) => true,
            FolioError::Target { source, .. } => source.is_config(),
            _ => false,
        }
    }

    pub(crate) fn for_target(target: &str, err: FolioError) -> FolioError {
        FolioError::Target {
            target: target.to_string(),
            source: Box::new(err),
        }
    }
}
