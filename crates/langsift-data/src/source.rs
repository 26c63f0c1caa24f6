//! Corpus sources
//!
//! The rebuild pipeline pulls raw training data through the
//! [`CorpusSource`] seam so that serving code never cares whether the
//! corpus lives in a local JSONL file or a Hugging Face dataset repo.

use crate::corpus::{CodeSample, Corpus};
use async_trait::async_trait;
use langsift_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Something that can produce the full labeled corpus
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Load every sample the source holds
    async fn load(&self) -> Result<Corpus>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Line-delimited JSON corpus file, one sample object per line
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    /// Create a source reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CorpusSource for JsonlSource {
    async fn load(&self) -> Result<Corpus> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::corpus(format!("failed to read {}: {e}", self.path.display()))
        })?;

        let mut samples = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let sample: CodeSample = serde_json::from_str(line).map_err(|e| {
                Error::corpus(format!(
                    "{} line {}: {e}",
                    self.path.display(),
                    number + 1
                ))
            })?;
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(Error::corpus(format!(
                "{} contains no samples",
                self.path.display()
            )));
        }

        info!(
            path = %self.path.display(),
            samples = samples.len(),
            "loaded corpus from jsonl file"
        );
        Ok(Corpus::new(samples))
    }

    fn describe(&self) -> String {
        format!("jsonl file {}", self.path.display())
    }
}

/// Corpus file fetched from a Hugging Face dataset repository.
///
/// The file is downloaded once through the hub cache and copied into
/// LangSift's own cache directory; later loads read the local copy.
pub struct HubSource {
    repo: String,
    filename: String,
    cache_dir: PathBuf,
}

impl HubSource {
    /// Fetch `filename` from the dataset repo `repo`
    pub fn new(repo: impl Into<String>, filename: impl Into<String>) -> Self {
        let cache_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cache/langsift/corpus");

        Self {
            repo: repo.into(),
            filename: filename.into(),
            cache_dir,
        }
    }

    /// Override the local cache directory
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    fn cached_path(&self) -> PathBuf {
        // Flatten repo and file paths into one cache file name.
        let repo_part = self.repo.replace('/', "--");
        let file_part = self.filename.replace('/', "--");
        self.cache_dir.join(format!("{repo_part}--{file_part}"))
    }

    fn download(&self) -> Result<PathBuf> {
        info!(repo = %self.repo, file = %self.filename, "downloading corpus from hugging face");

        let api = hf_hub::api::sync::Api::new().map_err(|e| {
            Error::corpus(format!("failed to initialize hugging face api: {e}"))
        })?;
        let repo = api.repo(hf_hub::Repo::new(
            self.repo.clone(),
            hf_hub::RepoType::Dataset,
        ));
        let downloaded = repo.get(&self.filename).map_err(|e| {
            Error::corpus(format!(
                "failed to download {} from {}: {e}",
                self.filename, self.repo
            ))
        })?;

        std::fs::create_dir_all(&self.cache_dir)?;
        let destination = self.cached_path();
        std::fs::copy(&downloaded, &destination)?;
        debug!(path = %destination.display(), "corpus copied into local cache");
        Ok(destination)
    }
}

#[async_trait]
impl CorpusSource for HubSource {
    async fn load(&self) -> Result<Corpus> {
        let cached = self.cached_path();
        let path = if cached.exists() {
            debug!(path = %cached.display(), "corpus cache hit");
            cached
        } else {
            self.download()?
        };
        read_jsonl(&path).await
    }

    fn describe(&self) -> String {
        format!("hugging face dataset {} ({})", self.repo, self.filename)
    }
}

async fn read_jsonl(path: &Path) -> Result<Corpus> {
    JsonlSource::new(path).load().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_corpus_file(path: &Path) {
        let lines = [
            r#"{"language": "Rust", "code": "fn main() {}"}"#,
            r#"{"language": "Python", "code": "def main(): pass"}"#,
            "",
            r#"{"language_name": "Go", "code": "func main() {}"}"#,
        ];
        std::fs::write(path, lines.join("\n")).unwrap();
    }

    #[tokio::test]
    async fn jsonl_source_reads_samples_and_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.jsonl");
        write_corpus_file(&path);

        let corpus = JsonlSource::new(&path).load().await.unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.classes(), vec!["Go", "Python", "Rust"]);
    }

    #[tokio::test]
    async fn malformed_line_reports_its_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.jsonl");
        std::fs::write(&path, "{\"language\": \"Rust\", \"code\": \"ok\"}\nnot json\n").unwrap();

        let err = JsonlSource::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn missing_file_is_a_corpus_error() {
        let err = JsonlSource::new("/nonexistent/corpus.jsonl")
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Corpus(_)));
    }

    #[tokio::test]
    async fn hub_source_prefers_the_local_cache() {
        let dir = TempDir::new().unwrap();
        let source = HubSource::new("someone/rosetta-code", "data/train.jsonl")
            .with_cache_dir(dir.path());

        // The cache file name is flat even when the repo path is nested.
        let cached = source.cached_path();
        assert_eq!(cached.parent().unwrap(), dir.path());
        write_corpus_file(&cached);

        // No network: the pre-seeded cache file satisfies the load.
        let corpus = source.load().await.unwrap();
        assert_eq!(corpus.len(), 3);
    }
}
