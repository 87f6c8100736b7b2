use std::path::PathBuf;

use thiserror::Error;

/// Errors from the model lifecycle: configuration, training, inference and
/// persistence.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The wrapper is not configured for the requested operation, e.g.
    /// training on a loaded wrapper without an embeddings service.
    #[error("invalid model configuration: {0}")]
    Configuration(String),

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Inference or persistence was requested before `train` or `load`.
    #[error("could not find a model, call train or load first")]
    ModelNotFound,

    /// One of the three persisted artifacts is missing from the model
    /// directory.
    #[error("missing model artifact: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// A malformed line in an embeddings vector file.
    #[error("embeddings error: {0}")]
    Embeddings(String),

    /// Corpus-layer failure.
    #[error(transparent)]
    Corpus(#[from] scriba_core::CorpusError),

    /// ML backend failure.
    #[error("ML backend error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Artifact serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_missing_names_the_path() {
        let err = ModelError::ArtifactMissing(PathBuf::from("models/ner/config.json"));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModelError>();
    }
}
