//! Error types for page analysis.

/// Errors raised while analyzing a page.
///
/// Content and service problems are normally recovered inside the crate and
/// only show up in the report. `DimensionMismatch`, `Config` and
/// `InvalidUrl` abort the current analysis call.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The page has fewer words than the usability floor.
    #[error("insufficient content: {words} words")]
    InsufficientContent { words: usize },

    /// The embedding backend could not be reached or kept failing.
    #[error("embedding service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An embedding payload failed the repair grammar check.
    #[error("malformed embedding data: {0}")]
    MalformedEmbeddingData(String),

    /// Two embeddings of different lengths were compared.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// No usable content tree was found.
    #[error("content extraction failed: {0}")]
    ExtractionFailure(String),

    /// The configuration can never produce a working analysis.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The page URL cannot be parsed, so links cannot be resolved.
    #[error("invalid page URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AnalysisError {
    /// Whether this error must abort the analysis instead of degrading it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::DimensionMismatch { .. }
                | AnalysisError::Config(_)
                | AnalysisError::InvalidUrl { .. }
        )
    }

    /// Short machine-readable name used in error report records.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientContent { .. } => "insufficient_content",
            AnalysisError::ServiceUnavailable(_) => "service_unavailable",
            AnalysisError::MalformedEmbeddingData(_) => "malformed_embedding_data",
            AnalysisError::DimensionMismatch { .. } => "dimension_mismatch",
            AnalysisError::ExtractionFailure(_) => "extraction_failure",
            AnalysisError::Config(_) => "config",
            AnalysisError::InvalidUrl { .. } => "invalid_url",
            AnalysisError::Io(_) => "io",
            AnalysisError::Json(_) => "json",
            AnalysisError::Http(_) => "http",
        }
    }
}

/// Result alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(AnalysisError::DimensionMismatch { left: 3, right: 4 }.is_fatal());
        assert!(AnalysisError::Config("bad".to_string()).is_fatal());
        assert!(!AnalysisError::ServiceUnavailable("down".to_string()).is_fatal());
        assert!(!AnalysisError::InsufficientContent { words: 2 }.is_fatal());
    }

    #[test]
    fn test_display() {
        let err = AnalysisError::DimensionMismatch { left: 768, right: 384 };
        assert_eq!(err.to_string(), "embedding dimension mismatch: 768 vs 384");
        assert_eq!(err.kind(), "dimension_mismatch");
    }
}
