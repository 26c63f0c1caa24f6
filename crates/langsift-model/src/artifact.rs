//! Serialized model artifacts
//!
//! An artifact is the durable form of one trained model: the classifier,
//! the vectorizer it was trained against, the ordered class labels, and
//! the measured performance. Two on-disk shapes exist:
//!
//! - the current bundle, a JSON mapping with keys `model`, `vectorizer`,
//!   `classes`, and `performance`;
//! - the legacy shape, a bare serialized classifier from before the
//!   vectorizer was persisted alongside the model. Loading one requires
//!   reconstructing the preprocessor from raw training data.
//!
//! [`StoredArtifact`] is the discriminator between the two; callers
//! never sniff key names themselves.

use crate::classifier::Classifier;
use crate::vectorizer::TfidfVectorizer;
use langsift_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Metrics measured on the held-out split when the artifact was built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub accuracy: f64,
    pub f1_score: f64,
    pub n_features: usize,
    pub n_classes: usize,
}

/// The current artifact shape: classifier plus its preprocessor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub model: Classifier,
    pub vectorizer: TfidfVectorizer,
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceReport>,
}

impl ArtifactBundle {
    /// Assemble a bundle; class labels are taken from the classifier
    pub fn new(
        model: Classifier,
        vectorizer: TfidfVectorizer,
        performance: Option<PerformanceReport>,
    ) -> Self {
        let classes = model.classes().to_vec();
        Self {
            model,
            vectorizer,
            classes,
            performance,
        }
    }

    /// Check internal consistency.
    ///
    /// A bundle whose vectorizer and classifier disagree on the feature
    /// space, or whose class list diverges from the classifier's, is a
    /// corruption condition.
    pub fn validate(&self) -> Result<()> {
        if self.classes != self.model.classes() {
            return Err(Error::artifact_corrupt(
                "bundle class list does not match the classifier's classes",
            ));
        }
        if self.vectorizer.n_features() != self.model.n_features() as usize {
            return Err(Error::artifact_corrupt(format!(
                "vectorizer produces {} features but the classifier expects {}",
                self.vectorizer.n_features(),
                self.model.n_features()
            )));
        }
        Ok(())
    }

    /// Persist as JSON via write-then-rename, returning bytes written.
    ///
    /// The rename makes the replacement atomic: readers observe either
    /// the previous artifact or the complete new one, never a torn file.
    pub fn write_atomic(&self, path: &Path) -> Result<u64> {
        let data = serde_json::to_vec(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &data)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), bytes = data.len(), "persisted artifact");
        Ok(data.len() as u64)
    }
}

/// Discriminated on-disk artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredArtifact {
    /// Current shape with the vectorizer persisted alongside the model
    Bundle(ArtifactBundle),
    /// Pre-bundle shape: classifier only, preprocessor must be refitted
    Legacy(Classifier),
}

impl StoredArtifact {
    /// Read an artifact file.
    ///
    /// Returns `Ok(None)` when the file does not exist. A file that
    /// exists but does not parse as either shape is `ArtifactCorrupt`.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map(Some).map_err(|e| {
            Error::artifact_corrupt(format!("{}: {e}", path.display()))
        })
    }
}
