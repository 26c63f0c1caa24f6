//! Artifact rebuilding
//!
//! Rebuilds a (classifier, vectorizer) artifact from the raw corpus:
//! filter thin classes, split, train, evaluate, persist atomically,
//! then record the measured metrics in the registry. Training is
//! CPU-bound and runs on the blocking pool, optionally under a
//! deadline; a timed-out task keeps running detached but nothing it
//! produces is persisted.

use crate::registry::{ModelDescriptor, RegistryStore};
use chrono::Utc;
use langsift_core::{Error, RebuildReason, Result};
use langsift_data::CorpusSource;
use langsift_model::artifact::{ArtifactBundle, PerformanceReport};
use langsift_model::TfidfVectorizer;
use langsift_train::{TrainedModel, Trainer, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Settings for the corpus-to-artifact pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildConfig {
    /// Classes with fewer samples than this are dropped before training
    #[serde(default = "default_min_samples_per_class")]
    pub min_samples_per_class: usize,

    /// Fraction of each class held out for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed for the stratified split
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Deadline for the training phase; `None` means unbounded
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Vectorizer and per-kind classifier settings
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            min_samples_per_class: default_min_samples_per_class(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            timeout_secs: None,
            training: TrainingConfig::default(),
        }
    }
}

fn default_min_samples_per_class() -> usize {
    200
}

fn default_test_fraction() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

impl RebuildConfig {
    fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Rebuilds artifacts from the corpus and records them in the registry
pub struct Rebuilder {
    source: Arc<dyn CorpusSource>,
    store: Arc<RegistryStore>,
    config: RebuildConfig,
}

impl Rebuilder {
    /// Create a rebuilder over a corpus source and registry store
    pub fn new(
        source: Arc<dyn CorpusSource>,
        store: Arc<RegistryStore>,
        config: RebuildConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// The settings this rebuilder runs with
    pub fn config(&self) -> &RebuildConfig {
        &self.config
    }

    /// Rebuild the artifact for `descriptor` from raw training data.
    ///
    /// On success the artifact file has been atomically replaced and the
    /// registry carries the descriptor with freshly measured metrics.
    /// Any failure surfaces as `RebuildFailed` and leaves no partial
    /// artifact behind.
    pub async fn rebuild(&self, descriptor: &ModelDescriptor) -> Result<ArtifactBundle> {
        info!(
            model_id = %descriptor.id,
            kind = %descriptor.kind,
            source = %self.source.describe(),
            "rebuilding model artifact"
        );

        let corpus = self
            .source
            .load()
            .await
            .map_err(|e| Error::rebuild(RebuildReason::Corpus(e.to_string())))?;

        let mut training = self.config.training.clone();
        training.kind = descriptor.kind;
        let trainer = Trainer::new(training);
        let min_samples = self.config.min_samples_per_class;
        let test_fraction = self.config.test_fraction;
        let seed = self.config.seed;

        let trained: TrainedModel = self
            .with_deadline(tokio::task::spawn_blocking(move || {
                let filtered = corpus.filter_min_samples(min_samples);
                if filtered.is_empty() {
                    return Err(Error::rebuild(RebuildReason::NoViableClasses));
                }
                let split = filtered
                    .stratified_split(test_fraction, seed)
                    .map_err(|e| Error::rebuild(RebuildReason::Training(e.to_string())))?;
                trainer
                    .train(&split)
                    .map_err(|e| Error::rebuild(RebuildReason::Training(e.to_string())))
            }))
            .await?;

        let performance = PerformanceReport {
            accuracy: trained.evaluation.accuracy,
            f1_score: trained.evaluation.f1_score,
            n_features: trained.vectorizer.n_features(),
            n_classes: trained.classifier.classes().len(),
        };
        let bundle = ArtifactBundle::new(trained.classifier, trained.vectorizer, Some(performance));

        if let Some(parent) = descriptor.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::rebuild(RebuildReason::Persist(e.to_string())))?;
            }
        }
        let bytes = bundle
            .write_atomic(&descriptor.file_path)
            .map_err(|e| Error::rebuild(RebuildReason::Persist(e.to_string())))?;

        let mut updated = descriptor.clone();
        updated.accuracy = round4(trained.evaluation.accuracy);
        updated.f1_score = round4(trained.evaluation.f1_score);
        updated.file_size_mb = round1(bytes as f64 / (1024.0 * 1024.0));
        updated.created_at = Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        updated.is_active = true;
        self.store.upsert(updated).await?;

        info!(
            model_id = %descriptor.id,
            accuracy = trained.evaluation.accuracy,
            f1_score = trained.evaluation.f1_score,
            bytes,
            "model artifact rebuilt"
        );
        Ok(bundle)
    }

    /// Reconstruct the preprocessor for a legacy artifact.
    ///
    /// Runs the same corpus filter and seeded split as a full rebuild
    /// and fits only the vectorizer on the train half; for an unchanged
    /// corpus this reproduces the feature space the legacy classifier
    /// was trained on.
    pub async fn refit_preprocessor(&self) -> Result<TfidfVectorizer> {
        info!(source = %self.source.describe(), "reconstructing preprocessor from training data");

        let corpus = self
            .source
            .load()
            .await
            .map_err(|e| Error::rebuild(RebuildReason::Corpus(e.to_string())))?;

        let vectorizer_config = self.config.training.vectorizer.clone();
        let min_samples = self.config.min_samples_per_class;
        let test_fraction = self.config.test_fraction;
        let seed = self.config.seed;

        self.with_deadline(tokio::task::spawn_blocking(move || {
            let filtered = corpus.filter_min_samples(min_samples);
            if filtered.is_empty() {
                return Err(Error::rebuild(RebuildReason::NoViableClasses));
            }
            let split = filtered
                .stratified_split(test_fraction, seed)
                .map_err(|e| Error::rebuild(RebuildReason::Training(e.to_string())))?;
            TfidfVectorizer::fit(vectorizer_config, &split.train_texts())
                .map_err(|e| Error::rebuild(RebuildReason::Training(e.to_string())))
        }))
        .await
    }

    /// Make sure the default model exists; safe to call on every start.
    ///
    /// - no registry file: create it around `template` and rebuild
    /// - registry exists, default artifact present: nothing to do
    /// - registry exists, artifact missing: rebuild the default
    ///
    /// Returns whether a rebuild actually ran. A malformed registry
    /// file is never overwritten; it propagates as `RegistryUnreadable`.
    pub async fn ensure_default(&self, template: &ModelDescriptor) -> Result<bool> {
        match self.store.try_load().await? {
            Some(registry) => match registry.default_descriptor() {
                Some(descriptor) => {
                    if descriptor.file_path.exists() {
                        info!(model_id = %descriptor.id, "default model artifact already present");
                        return Ok(false);
                    }
                    let descriptor = descriptor.clone();
                    warn!(model_id = %descriptor.id, "default model artifact missing, rebuilding");
                    self.rebuild(&descriptor).await.map(|_| true)
                }
                None => {
                    info!(model_id = %template.id, "registry is empty, building the default model");
                    self.rebuild(template).await.map(|_| true)
                }
            },
            None => {
                info!(
                    registry = %self.store.path().display(),
                    model_id = %template.id,
                    "no registry found, building the default model"
                );
                self.rebuild(template).await.map(|_| true)
            }
        }
    }

    async fn with_deadline<T>(&self, handle: tokio::task::JoinHandle<Result<T>>) -> Result<T> {
        let joined = match self.config.timeout() {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "training exceeded its deadline");
                    return Err(Error::rebuild(RebuildReason::Timeout(limit.as_secs())));
                }
            },
            None => handle.await,
        };
        joined.map_err(|e| {
            Error::rebuild(RebuildReason::Training(format!("training task failed: {e}")))
        })?
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_rounding_matches_registry_precision() {
        assert_eq!(round4(0.987_654_3), 0.9877);
        assert_eq!(round1(12.34), 12.3);
        assert_eq!(round1(0.04), 0.0);
    }

    #[test]
    fn config_defaults_mirror_the_serving_pipeline() {
        let config = RebuildConfig::default();
        assert_eq!(config.min_samples_per_class, 200);
        assert_eq!(config.test_fraction, 0.1);
        assert_eq!(config.seed, 42);
        assert!(config.timeout().is_none());
    }
}
