//! Server configuration

use anyhow::Context;
use langsift_core::ModelKind;
use langsift_data::{CorpusSource, HubSource, JsonlSource};
use langsift_serve::{ModelDescriptor, RebuildConfig, RegistryStore, UploadPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path of the model catalogue file
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Directory where model artifacts are written
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Where training data comes from
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Corpus-to-artifact pipeline settings
    #[serde(default)]
    pub rebuild: RebuildConfig,

    /// Upload size cap in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Model bootstrapped when the catalogue is empty or missing
    #[serde(default)]
    pub default_model: DefaultModelConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config: Self = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("reading config file {config_path}"))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("parsing config file {config_path}"))?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(registry) = &cli.registry {
            config.registry_path = registry.clone();
        }

        if let Some(models_dir) = &cli.models_dir {
            config.models_dir = models_dir.clone();
        }

        Ok(config)
    }

    pub fn registry_store(&self) -> RegistryStore {
        RegistryStore::new(&self.registry_path)
    }

    pub fn corpus_source(&self) -> Arc<dyn CorpusSource> {
        match &self.corpus {
            CorpusConfig::Jsonl { path } => Arc::new(JsonlSource::new(path)),
            CorpusConfig::Huggingface { repo, filename } => {
                Arc::new(HubSource::new(repo.clone(), filename.clone()))
            }
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.max_upload_mb * 1024 * 1024)
    }

    /// Descriptor for the bootstrap model, artifact placed under
    /// `models_dir` as `<id>.json`
    pub fn default_descriptor(&self) -> ModelDescriptor {
        ModelDescriptor::new(
            self.default_model.id.as_str(),
            self.default_model.name.as_str(),
            self.default_model.kind,
            self.models_dir
                .join(format!("{}.json", self.default_model.id)),
        )
        .with_description(self.default_model.description.as_str())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            models_dir: default_models_dir(),
            corpus: CorpusConfig::default(),
            rebuild: RebuildConfig::default(),
            max_upload_mb: default_max_upload_mb(),
            default_model: DefaultModelConfig::default(),
        }
    }
}

/// Training-data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CorpusConfig {
    /// Newline-delimited JSON file on local disk
    Jsonl { path: PathBuf },

    /// File inside a Hugging Face dataset repository
    Huggingface {
        repo: String,
        #[serde(default = "default_corpus_filename")]
        filename: String,
    },
}

impl CorpusConfig {
    pub fn describe(&self) -> String {
        match self {
            Self::Jsonl { path } => format!("jsonl:{}", path.display()),
            Self::Huggingface { repo, filename } => format!("hub:{repo}/{filename}"),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self::Huggingface {
            repo: "christopher/rosetta-code".to_string(),
            filename: default_corpus_filename(),
        }
    }
}

/// Identity of the model built when none exists yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultModelConfig {
    #[serde(default = "default_model_id")]
    pub id: String,

    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_model_kind")]
    pub kind: ModelKind,

    #[serde(default = "default_model_description")]
    pub description: String,
}

impl Default for DefaultModelConfig {
    fn default() -> Self {
        Self {
            id: default_model_id(),
            name: default_model_name(),
            kind: default_model_kind(),
            description: default_model_description(),
        }
    }
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("./models/registry.json")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_max_upload_mb() -> u64 {
    10
}

fn default_corpus_filename() -> String {
    "data/train.jsonl".to_string()
}

fn default_model_id() -> String {
    "lr_baseline_001".to_string()
}

fn default_model_name() -> String {
    "LR Baseline".to_string()
}

fn default_model_kind() -> ModelKind {
    ModelKind::LogisticRegression
}

fn default_model_description() -> String {
    "Auto-generated TF-IDF logistic regression baseline".to_string()
}
