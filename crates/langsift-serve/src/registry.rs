//! The model registry: a JSON catalogue of trained artifacts
//!
//! The registry file is the single source of truth for which models
//! exist, where their artifacts live, and which one is the default.
//! All mutation goes through [`RegistryStore`], which serializes
//! writers and replaces the file atomically so concurrent readers
//! never observe a torn catalogue.

use langsift_core::{Error, ModelKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Catalogue entry describing one trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique stable identifier
    pub id: String,

    /// Human-readable display name
    pub name: String,

    /// Classifier kind stored in the artifact
    #[serde(rename = "type")]
    pub kind: ModelKind,

    /// Where the artifact file lives
    pub file_path: PathBuf,

    /// Held-out accuracy measured when the artifact was built
    #[serde(default)]
    pub accuracy: f64,

    /// Held-out weighted F1 measured when the artifact was built
    #[serde(default)]
    pub f1_score: f64,

    /// Artifact size on disk
    #[serde(default)]
    pub file_size_mb: f64,

    /// Build timestamp, `YYYY-MM-DDTHH:MM:SS`
    #[serde(default)]
    pub created_at: String,

    /// Inactive entries are kept for audit but excluded from selection
    #[serde(default = "default_is_active")]
    pub is_active: bool,

    /// Free-text description
    #[serde(default)]
    pub description: String,
}

fn default_is_active() -> bool {
    true
}

impl ModelDescriptor {
    /// Create a descriptor with empty metrics; measured values are
    /// filled in by the rebuilder after training.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ModelKind,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            file_path: file_path.into(),
            accuracy: 0.0,
            f1_score: 0.0,
            file_size_mb: 0.0,
            created_at: String::new(),
            is_active: true,
            description: String::new(),
        }
    }

    /// Attach a free-text description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The full catalogue plus the default selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model_id: Option<String>,
}

impl Registry {
    /// Look up a descriptor by id
    pub fn find(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Descriptors eligible for selection
    pub fn active_models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter().filter(|m| m.is_active)
    }

    /// The descriptor the default id points at
    pub fn default_descriptor(&self) -> Option<&ModelDescriptor> {
        self.default_model_id.as_deref().and_then(|id| self.find(id))
    }

    /// Check catalogue invariants: unique ids, and a default that
    /// references an existing descriptor exactly when the catalogue is
    /// non-empty.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for descriptor in &self.models {
            if !seen.insert(descriptor.id.as_str()) {
                return Err(Error::registry_unreadable(format!(
                    "duplicate model id '{}'",
                    descriptor.id
                )));
            }
        }
        match (&self.default_model_id, self.models.is_empty()) {
            (Some(id), false) if self.find(id).is_none() => Err(Error::registry_unreadable(
                format!("default_model_id '{id}' references no descriptor"),
            )),
            (Some(id), true) => Err(Error::registry_unreadable(format!(
                "default_model_id '{id}' set on an empty registry"
            ))),
            (None, false) => Err(Error::registry_unreadable(
                "non-empty registry has no default_model_id",
            )),
            _ => Ok(()),
        }
    }
}

/// File-backed registry access with serialized writers
pub struct RegistryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RegistryStore {
    /// Create a store over the registry file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the registry file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the registry; a missing file and a malformed file are both
    /// `RegistryUnreadable`.
    pub async fn load(&self) -> Result<Registry> {
        self.try_load().await?.ok_or_else(|| {
            Error::registry_unreadable(format!("{} does not exist", self.path.display()))
        })
    }

    /// Read the registry, distinguishing a missing file (`Ok(None)`,
    /// first boot) from a malformed one (error, never overwritten).
    pub async fn try_load(&self) -> Result<Option<Registry>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::registry_unreadable(format!(
                    "{}: {e}",
                    self.path.display()
                )))
            }
        };
        let registry: Registry = serde_json::from_slice(&data).map_err(|e| {
            Error::registry_unreadable(format!("{}: {e}", self.path.display()))
        })?;
        registry.validate()?;
        Ok(Some(registry))
    }

    /// Validate and persist the registry atomically
    pub async fn save(&self, registry: &Registry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_locked(registry)
    }

    /// Insert or replace a descriptor.
    ///
    /// The first descriptor ever inserted becomes the default.
    pub async fn upsert(&self, descriptor: ModelDescriptor) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.try_load().await?.unwrap_or_default();

        let id = descriptor.id.clone();
        match registry.models.iter_mut().find(|m| m.id == id) {
            Some(existing) => *existing = descriptor,
            None => registry.models.push(descriptor),
        }
        if registry.default_model_id.is_none() {
            registry.default_model_id = Some(id.clone());
        }
        self.save_locked(&registry)?;
        info!(model_id = %id, "registry descriptor upserted");
        Ok(())
    }

    /// Remove a descriptor by id.
    ///
    /// Removing the default reassigns it to a remaining active entry
    /// (any remaining entry if none are active); the default is cleared
    /// only when the registry empties.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.load().await?;

        let before = registry.models.len();
        registry.models.retain(|m| m.id != id);
        if registry.models.len() == before {
            return Err(Error::model_not_found(id));
        }

        if registry.default_model_id.as_deref() == Some(id) {
            let new_default = registry
                .active_models()
                .next()
                .or_else(|| registry.models.first())
                .map(|m| m.id.clone());
            registry.default_model_id = new_default;
            debug!(
                removed = id,
                new_default = registry.default_model_id.as_deref().unwrap_or("<none>"),
                "default model reassigned"
            );
        }
        self.save_locked(&registry)?;
        info!(model_id = id, "registry descriptor removed");
        Ok(())
    }

    /// Point the default at an existing descriptor
    pub async fn set_default(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.load().await?;
        if registry.find(id).is_none() {
            return Err(Error::model_not_found(id));
        }
        registry.default_model_id = Some(id.to_string());
        self.save_locked(&registry)
    }

    fn save_locked(&self, registry: &Registry) -> Result<()> {
        registry.validate()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(registry)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &data)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), models = registry.models.len(), "registry saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(id: &str) -> ModelDescriptor {
        ModelDescriptor::new(
            id,
            format!("Model {id}"),
            ModelKind::LogisticRegression,
            format!("/tmp/{id}.json"),
        )
    }

    fn store_in(dir: &TempDir) -> RegistryStore {
        RegistryStore::new(dir.path().join("registry.json"))
    }

    #[tokio::test]
    async fn missing_file_is_distinguishable_from_malformed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.try_load().await.unwrap().is_none());
        assert!(matches!(
            store.load().await.unwrap_err(),
            Error::RegistryUnreadable(_)
        ));

        std::fs::write(store.path(), b"{ broken").unwrap();
        assert!(matches!(
            store.try_load().await.unwrap_err(),
            Error::RegistryUnreadable(_)
        ));
    }

    #[tokio::test]
    async fn first_upsert_becomes_the_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.upsert(descriptor("m1")).await.unwrap();
        let registry = store.load().await.unwrap();
        assert_eq!(registry.default_model_id.as_deref(), Some("m1"));
        assert_eq!(registry.models.len(), 1);

        // replacing does not duplicate
        store.upsert(descriptor("m1")).await.unwrap();
        assert_eq!(store.load().await.unwrap().models.len(), 1);
    }

    #[tokio::test]
    async fn removing_the_default_reassigns_to_an_active_entry() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.upsert(descriptor("m1")).await.unwrap();
        let mut inactive = descriptor("m2");
        inactive.is_active = false;
        store.upsert(inactive).await.unwrap();
        store.upsert(descriptor("m3")).await.unwrap();

        store.remove("m1").await.unwrap();
        let registry = store.load().await.unwrap();
        assert_eq!(registry.default_model_id.as_deref(), Some("m3"));

        // with only the inactive entry left, it still becomes default
        store.remove("m3").await.unwrap();
        let registry = store.load().await.unwrap();
        assert_eq!(registry.default_model_id.as_deref(), Some("m2"));

        // removing the last entry clears the default
        store.remove("m2").await.unwrap();
        let registry = store.load().await.unwrap();
        assert!(registry.default_model_id.is_none());
        assert!(registry.models.is_empty());
    }

    #[tokio::test]
    async fn removing_an_unknown_id_is_model_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(descriptor("m1")).await.unwrap();

        assert!(matches!(
            store.remove("ghost").await.unwrap_err(),
            Error::ModelNotFound(_)
        ));
    }

    #[tokio::test]
    async fn invariant_violations_never_reach_disk() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let invalid = Registry {
            models: vec![descriptor("m1")],
            default_model_id: Some("ghost".to_string()),
        };
        assert!(store.save(&invalid).await.is_err());
        assert!(store.try_load().await.unwrap().is_none());

        let duplicate = Registry {
            models: vec![descriptor("m1"), descriptor("m1")],
            default_model_id: Some("m1".to_string()),
        };
        assert!(store.save(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn registry_file_uses_the_wire_field_names() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(descriptor("m1")).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value["models"][0];
        assert_eq!(entry["type"], serde_json::json!("logistic_regression"));
        assert!(entry.get("kind").is_none());
        assert_eq!(value["default_model_id"], serde_json::json!("m1"));
    }

    #[tokio::test]
    async fn set_default_requires_an_existing_descriptor() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(descriptor("m1")).await.unwrap();
        store.upsert(descriptor("m2")).await.unwrap();

        store.set_default("m2").await.unwrap();
        assert_eq!(
            store.load().await.unwrap().default_model_id.as_deref(),
            Some("m2")
        );
        assert!(store.set_default("ghost").await.is_err());
    }
}
