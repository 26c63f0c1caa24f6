//! Error types for LangSift

use std::fmt;

/// Result type alias using LangSift's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Why a rebuild attempt did not produce a usable artifact
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildReason {
    /// No class survived the minimum-sample filter
    NoViableClasses,
    /// The corpus source failed to produce training data
    Corpus(String),
    /// Training itself failed
    Training(String),
    /// The trained artifact could not be persisted
    Persist(String),
    /// Training exceeded the caller-specified deadline (seconds)
    Timeout(u64),
    /// The freshly rebuilt artifact still failed to load
    ArtifactUnusable(String),
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoViableClasses => write!(f, "no class met the minimum sample count"),
            Self::Corpus(msg) => write!(f, "corpus unavailable: {msg}"),
            Self::Training(msg) => write!(f, "training failed: {msg}"),
            Self::Persist(msg) => write!(f, "artifact persist failed: {msg}"),
            Self::Timeout(secs) => write!(f, "training exceeded {secs}s deadline"),
            Self::ArtifactUnusable(msg) => write!(f, "rebuilt artifact unusable: {msg}"),
        }
    }
}

/// Core error type for LangSift operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model catalogue missing or malformed
    #[error("registry unreadable: {0}")]
    RegistryUnreadable(String),

    /// Requested model id absent from the registry
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Artifact file present but unparseable or internally inconsistent
    #[error("artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// Rebuilding the artifact from the corpus failed
    #[error("rebuild failed: {0}")]
    RebuildFailed(RebuildReason),

    /// Single-item prediction errors
    #[error("inference error: {0}")]
    Inference(String),

    /// Model fitting errors
    #[error("training error: {0}")]
    Training(String),

    /// Corpus loading errors
    #[error("corpus error: {0}")]
    Corpus(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new registry error
    pub fn registry_unreadable(msg: impl Into<String>) -> Self {
        Self::RegistryUnreadable(msg.into())
    }

    /// Create a new model-not-found error
    pub fn model_not_found(id: impl Into<String>) -> Self {
        Self::ModelNotFound(id.into())
    }

    /// Create a new artifact corruption error
    pub fn artifact_corrupt(msg: impl Into<String>) -> Self {
        Self::ArtifactCorrupt(msg.into())
    }

    /// Create a new rebuild failure
    pub fn rebuild(reason: RebuildReason) -> Self {
        Self::RebuildFailed(reason)
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new training error
    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    /// Create a new corpus error
    pub fn corpus(msg: impl Into<String>) -> Self {
        Self::Corpus(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_reason_messages_are_lowercase() {
        let err = Error::rebuild(RebuildReason::Timeout(30));
        assert_eq!(err.to_string(), "rebuild failed: training exceeded 30s deadline");

        let err = Error::rebuild(RebuildReason::NoViableClasses);
        assert!(err.to_string().contains("minimum sample count"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
