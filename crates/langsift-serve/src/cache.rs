//! Model cache and loader
//!
//! Loads artifacts from disk on demand and memoizes them as shared
//! handles. Loading is serialized per model id: concurrent requests for
//! the same id coalesce behind one loader while requests for different
//! ids proceed in parallel. A missing or corrupt artifact triggers
//! exactly one rebuild attempt before the load fails.

use crate::rebuild::Rebuilder;
use crate::registry::{ModelDescriptor, RegistryStore};
use langsift_core::{Error, ModelKind, RebuildReason, Result};
use langsift_model::{Classifier, StoredArtifact, TfidfVectorizer};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// A model ready to serve: classifier plus the matching preprocessor
#[derive(Debug)]
pub struct LoadedModel {
    id: String,
    kind: ModelKind,
    classifier: Classifier,
    vectorizer: TfidfVectorizer,
}

impl LoadedModel {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Class labels in the classifier's native order
    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }
}

/// Memoizing loader keyed by model id
pub struct ModelCache {
    store: Arc<RegistryStore>,
    rebuilder: Arc<Rebuilder>,
    loaded: RwLock<HashMap<String, Arc<LoadedModel>>>,
    // one loading lock per model id; the map itself is only held long
    // enough to clone the entry
    locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ModelCache {
    pub fn new(store: Arc<RegistryStore>, rebuilder: Arc<Rebuilder>) -> Self {
        Self {
            store,
            rebuilder,
            loaded: RwLock::new(HashMap::new()),
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a ready-to-serve model by id, loading it if necessary.
    ///
    /// Repeated calls for the same id return the same shared handle.
    /// When the artifact is absent or unreadable the cache rebuilds it
    /// once; a second failure after that rebuild surfaces as
    /// `RebuildFailed` rather than another attempt.
    pub async fn get(&self, id: &str) -> Result<Arc<LoadedModel>> {
        if let Some(model) = self.loaded.read().await.get(id) {
            debug!(model_id = id, "model cache hit");
            return Ok(Arc::clone(model));
        }

        let load_lock = self.lock_for(id);
        let _guard = load_lock.lock().await;

        // A concurrent caller may have finished loading while this one
        // waited on the per-id lock.
        if let Some(model) = self.loaded.read().await.get(id) {
            debug!(model_id = id, "model loaded while waiting");
            return Ok(Arc::clone(model));
        }

        let registry = self.store.load().await?;
        let descriptor = registry
            .find(id)
            .ok_or_else(|| Error::model_not_found(id))?
            .clone();

        let model = self.load_with_recovery(&descriptor).await?;
        self.loaded
            .write()
            .await
            .insert(id.to_string(), Arc::clone(&model));
        info!(model_id = id, kind = %model.kind(), "model loaded into cache");
        Ok(model)
    }

    /// Drop a cached model so the next `get` reloads it from disk
    pub async fn invalidate(&self, id: &str) -> bool {
        self.loaded.write().await.remove(id).is_some()
    }

    /// Drop every cached model
    pub async fn clear(&self) {
        self.loaded.write().await.clear();
    }

    /// Ids currently held in the cache
    pub async fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loaded.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    async fn load_with_recovery(&self, descriptor: &ModelDescriptor) -> Result<Arc<LoadedModel>> {
        match self.try_load(descriptor).await {
            Ok(Some(model)) => return Ok(Arc::new(model)),
            Ok(None) => {
                info!(
                    model_id = %descriptor.id,
                    path = %descriptor.file_path.display(),
                    "artifact missing, rebuilding"
                );
            }
            Err(Error::ArtifactCorrupt(detail)) => {
                warn!(model_id = %descriptor.id, %detail, "artifact unreadable, rebuilding");
            }
            Err(e) => return Err(e),
        }

        self.rebuilder.rebuild(descriptor).await?;

        match self.try_load(descriptor).await {
            Ok(Some(model)) => Ok(Arc::new(model)),
            Ok(None) => Err(Error::rebuild(RebuildReason::ArtifactUnusable(
                "artifact still missing after rebuild".to_string(),
            ))),
            Err(e) => Err(Error::rebuild(RebuildReason::ArtifactUnusable(
                e.to_string(),
            ))),
        }
    }

    /// Load the artifact behind a descriptor, if one exists on disk.
    ///
    /// A legacy artifact carries no vectorizer; its preprocessor is
    /// reconstructed from the training corpus and accepted only when
    /// the feature spaces line up.
    async fn try_load(&self, descriptor: &ModelDescriptor) -> Result<Option<LoadedModel>> {
        let stored = match StoredArtifact::read(&descriptor.file_path)? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        match stored {
            StoredArtifact::Bundle(bundle) => {
                bundle.validate()?;
                if bundle.model.kind() != descriptor.kind {
                    return Err(Error::artifact_corrupt(format!(
                        "artifact for '{}' holds a {} model but the registry says {}",
                        descriptor.id,
                        bundle.model.kind(),
                        descriptor.kind
                    )));
                }
                Ok(Some(LoadedModel {
                    id: descriptor.id.clone(),
                    kind: descriptor.kind,
                    classifier: bundle.model,
                    vectorizer: bundle.vectorizer,
                }))
            }
            StoredArtifact::Legacy(classifier) => {
                warn!(
                    model_id = %descriptor.id,
                    "legacy artifact without a vectorizer, reconstructing preprocessor"
                );
                if classifier.kind() != descriptor.kind {
                    return Err(Error::artifact_corrupt(format!(
                        "artifact for '{}' holds a {} model but the registry says {}",
                        descriptor.id,
                        classifier.kind(),
                        descriptor.kind
                    )));
                }
                let vectorizer = self.rebuilder.refit_preprocessor().await?;
                if vectorizer.n_features() != classifier.n_features() as usize {
                    return Err(Error::artifact_corrupt(format!(
                        "reconstructed preprocessor produces {} features but the legacy \
                         classifier expects {}",
                        vectorizer.n_features(),
                        classifier.n_features()
                    )));
                }
                Ok(Some(LoadedModel {
                    id: descriptor.id.clone(),
                    kind: descriptor.kind,
                    classifier,
                    vectorizer,
                }))
            }
        }
    }
}
