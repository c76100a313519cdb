use thiserror::Error;

/// Why a road network could not be installed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("road network source {source_url} unavailable: {reason}")]
    SourceUnavailable { source_url: String, reason: String },

    #[error("invalid road network source url: {0}")]
    InvalidSourceUrl(String),

    #[error("road network payload could not be parsed: {0}")]
    Parse(String),

    #[error("road network contains no line features ({skipped} skipped)")]
    NoLineFeatures { skipped: usize },
}

impl LoadError {
    /// Source errors only warrant a banner; the payload itself was never seen.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::Parse(_) | LoadError::NoLineFeatures { .. })
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Parse(e.to_string())
    }
}
