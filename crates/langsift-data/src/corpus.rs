//! Training corpus types and deterministic splitting

use langsift_core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// One labeled training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSample {
    /// Language label, e.g. "Rust" or "Python"
    #[serde(alias = "language_name")]
    pub language: String,

    /// Raw source text
    pub code: String,
}

impl CodeSample {
    /// Create a new labeled example
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
        }
    }
}

/// A labeled corpus of code snippets
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    samples: Vec<CodeSample>,
}

impl Corpus {
    /// Wrap a sample collection
    pub fn new(samples: Vec<CodeSample>) -> Self {
        Self { samples }
    }

    /// All samples in insertion order
    pub fn samples(&self) -> &[CodeSample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the corpus holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample count per language, sorted by language
    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.language.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Sorted unique language labels
    pub fn classes(&self) -> Vec<String> {
        self.class_counts().into_keys().collect()
    }

    /// Drop every class with fewer than `min_samples` examples.
    ///
    /// Underrepresented classes are removed entirely, never merged.
    pub fn filter_min_samples(self, min_samples: usize) -> Corpus {
        let counts = self.class_counts();
        let total_classes = counts.len();
        let before = self.samples.len();

        let samples: Vec<CodeSample> = self
            .samples
            .into_iter()
            .filter(|sample| counts[&sample.language] >= min_samples)
            .collect();

        let corpus = Corpus::new(samples);
        info!(
            samples_before = before,
            samples_after = corpus.len(),
            classes_before = total_classes,
            classes_after = corpus.classes().len(),
            min_samples,
            "filtered corpus by minimum class size"
        );
        corpus
    }

    /// Seeded stratified split into train and test halves.
    ///
    /// Each class contributes `test_fraction` of its samples (at least
    /// one, and at least one stays in train) to the test half. The same
    /// corpus, fraction, and seed always produce the same split.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
        if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
            return Err(Error::config(format!(
                "test_fraction must be in (0, 1), got {test_fraction}"
            )));
        }
        if self.is_empty() {
            return Err(Error::corpus("cannot split an empty corpus"));
        }

        // Group indices per class in sorted class order for determinism.
        let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, sample) in self.samples.iter().enumerate() {
            by_class.entry(&sample.language).or_default().push(index);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();
        for (language, mut indices) in by_class {
            if indices.len() < 2 {
                return Err(Error::corpus(format!(
                    "class '{language}' has {} sample(s), need at least 2 to split",
                    indices.len()
                )));
            }
            indices.shuffle(&mut rng);
            let n_test = ((indices.len() as f64 * test_fraction).round() as usize)
                .clamp(1, indices.len() - 1);
            for (position, index) in indices.into_iter().enumerate() {
                if position < n_test {
                    test.push(self.samples[index].clone());
                } else {
                    train.push(self.samples[index].clone());
                }
            }
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok(TrainTestSplit { train, test })
    }
}

/// The two halves of a stratified split
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<CodeSample>,
    pub test: Vec<CodeSample>,
}

impl TrainTestSplit {
    /// Training texts, borrowed in order
    pub fn train_texts(&self) -> Vec<String> {
        self.train.iter().map(|s| s.code.clone()).collect()
    }

    /// Sorted unique labels across both halves
    pub fn classes(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .train
            .iter()
            .chain(self.test.iter())
            .map(|s| s.language.clone())
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }
}
