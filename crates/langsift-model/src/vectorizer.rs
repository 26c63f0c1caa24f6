//! TF-IDF feature extraction
//!
//! Turns raw source-code text into L2-normalized sparse TF-IDF vectors:
//! - word tokens of two or more word characters, optionally lowercased
//! - unigrams through `ngram_max`-grams, joined with a single space
//! - document-frequency pruning (`min_df`, `max_df_ratio`) and a
//!   most-frequent-terms cap (`max_features`)
//! - smoothed IDF: `ln((1 + n) / (1 + df)) + 1`
//!
//! Fitting is deterministic: the vocabulary is assigned indices in
//! lexicographic term order, so the same corpus always produces the
//! same feature space.

use crate::sparse::SparseVector;
use langsift_core::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Word tokens: two or more word characters between boundaries
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

fn token_regex() -> Regex {
    Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex")
}

/// Settings controlling tokenization and vocabulary selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Lowercase text before tokenization
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,

    /// Largest n-gram length to extract (1 = unigrams only)
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    /// Drop terms appearing in fewer than this many documents
    #[serde(default = "default_min_df")]
    pub min_df: usize,

    /// Drop terms appearing in more than this fraction of documents
    #[serde(default = "default_max_df_ratio")]
    pub max_df_ratio: f64,

    /// Keep at most this many terms, preferring the most frequent
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Tokens removed before n-gram construction
    #[serde(default)]
    pub stop_words: Vec<String>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            lowercase: default_lowercase(),
            ngram_max: default_ngram_max(),
            min_df: default_min_df(),
            max_df_ratio: default_max_df_ratio(),
            max_features: default_max_features(),
            stop_words: Vec::new(),
        }
    }
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_max() -> usize {
    2 // unigrams and bigrams
}

fn default_min_df() -> usize {
    2
}

fn default_max_df_ratio() -> f64 {
    0.95
}

fn default_max_features() -> usize {
    5000
}

/// A fitted TF-IDF vectorizer
///
/// Serialized inside every artifact bundle so that serving transforms
/// text in exactly the feature space the classifier was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: HashMap<String, u32>,
    idf: Vec<f32>,
    #[serde(skip, default = "token_regex")]
    token_re: Regex,
}

impl TfidfVectorizer {
    /// Learn a vocabulary and IDF table from training documents.
    ///
    /// Fails when no documents are given or when pruning leaves the
    /// vocabulary empty.
    pub fn fit(config: VectorizerConfig, documents: &[String]) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::training("cannot fit vectorizer on zero documents"));
        }
        if config.ngram_max == 0 {
            return Err(Error::config("ngram_max must be at least 1"));
        }

        let token_re = token_regex();
        let stop_words: HashSet<&str> = config.stop_words.iter().map(String::as_str).collect();

        // Corpus-wide term counts and per-term document frequency.
        let mut term_counts: HashMap<String, u64> = HashMap::new();
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        for document in documents {
            let terms = extract_terms(&token_re, &config, &stop_words, document);
            let mut seen: HashSet<&str> = HashSet::new();
            for term in &terms {
                *term_counts.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term) {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }

        let n_docs = documents.len();
        let max_doc_count = config.max_df_ratio * n_docs as f64;
        let mut kept: Vec<(&String, u64, u32)> = doc_freq
            .iter()
            .filter(|(_, df)| **df as usize >= config.min_df && **df as f64 <= max_doc_count)
            .map(|(term, df)| (term, term_counts[term], *df))
            .collect();

        if kept.len() > config.max_features {
            // Most frequent terms win; lexicographic order breaks ties.
            kept.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            kept.truncate(config.max_features);
        }
        kept.sort_unstable_by(|a, b| a.0.cmp(b.0));

        if kept.is_empty() {
            return Err(Error::training(
                "vocabulary is empty after document-frequency pruning",
            ));
        }

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (index, (term, _, df)) in kept.iter().enumerate() {
            vocabulary.insert((*term).clone(), index as u32);
            idf.push((((1 + n_docs) as f32) / ((1 + df) as f32)).ln() + 1.0);
        }

        debug!(
            terms = vocabulary.len(),
            documents = n_docs,
            "fitted tf-idf vocabulary"
        );

        Ok(Self {
            config,
            vocabulary,
            idf,
            token_re,
        })
    }

    /// Transform one text into an L2-normalized TF-IDF vector.
    ///
    /// Text containing no known terms maps to the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let stop_words: HashSet<&str> =
            self.config.stop_words.iter().map(String::as_str).collect();
        let terms = extract_terms(&self.token_re, &self.config, &stop_words, text);

        let mut counts: HashMap<u32, f32> = HashMap::new();
        for term in &terms {
            if let Some(&index) = self.vocabulary.get(term.as_str()) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let pairs = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index as usize]))
            .collect();
        let mut vector = SparseVector::from_pairs(self.n_features() as u32, pairs);
        vector.l2_normalize();
        vector
    }

    /// Size of the learned feature space
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Index assigned to a term, if it survived fitting
    pub fn term_index(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }

    /// The settings this vectorizer was fitted with
    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }
}

/// Tokenize one document into unigrams through `ngram_max`-grams
fn extract_terms(
    token_re: &Regex,
    config: &VectorizerConfig,
    stop_words: &HashSet<&str>,
    text: &str,
) -> Vec<String> {
    let lowered;
    let text = if config.lowercase {
        lowered = text.to_lowercase();
        &lowered
    } else {
        text
    };

    let tokens: Vec<&str> = token_re
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| !stop_words.contains(token))
        .collect();

    let mut terms = Vec::with_capacity(tokens.len() * config.ngram_max);
    for n in 1..=config.ngram_max {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn loose_config() -> VectorizerConfig {
        VectorizerConfig {
            min_df: 1,
            ..VectorizerConfig::default()
        }
    }

    #[test]
    fn vocabulary_indices_follow_lexicographic_order() {
        let vectorizer = TfidfVectorizer::fit(
            VectorizerConfig {
                ngram_max: 1,
                ..loose_config()
            },
            &docs(&["fn main", "let main"]),
        )
        .unwrap();

        assert_eq!(vectorizer.term_index("fn"), Some(0));
        assert_eq!(vectorizer.term_index("let"), Some(1));
        assert_eq!(vectorizer.term_index("main"), Some(2));
    }

    #[test]
    fn bigrams_are_extracted_alongside_unigrams() {
        let vectorizer =
            TfidfVectorizer::fit(loose_config(), &docs(&["def hello world"])).unwrap();
        assert!(vectorizer.term_index("def hello").is_some());
        assert!(vectorizer.term_index("hello world").is_some());
        assert!(vectorizer.term_index("def").is_some());
    }

    #[test]
    fn min_df_prunes_rare_terms() {
        let vectorizer = TfidfVectorizer::fit(
            VectorizerConfig {
                ngram_max: 1,
                min_df: 2,
                ..VectorizerConfig::default()
            },
            &docs(&["shared unique1", "shared unique2"]),
        )
        .unwrap();
        assert!(vectorizer.term_index("shared").is_some());
        assert!(vectorizer.term_index("unique1").is_none());
    }

    #[test]
    fn max_df_prunes_ubiquitous_terms() {
        let vectorizer = TfidfVectorizer::fit(
            VectorizerConfig {
                ngram_max: 1,
                min_df: 1,
                max_df_ratio: 0.5,
                ..VectorizerConfig::default()
            },
            &docs(&["everywhere alpha", "everywhere beta", "everywhere gamma", "alpha delta"]),
        )
        .unwrap();
        assert!(vectorizer.term_index("everywhere").is_none());
        assert!(vectorizer.term_index("alpha").is_some());
    }

    #[test]
    fn max_features_keeps_most_frequent_terms() {
        let vectorizer = TfidfVectorizer::fit(
            VectorizerConfig {
                ngram_max: 1,
                min_df: 1,
                max_features: 1,
                ..VectorizerConfig::default()
            },
            &docs(&["common common rare", "common other"]),
        )
        .unwrap();
        assert_eq!(vectorizer.n_features(), 1);
        assert!(vectorizer.term_index("common").is_some());
    }

    #[test]
    fn stop_words_are_removed_before_ngrams() {
        let vectorizer = TfidfVectorizer::fit(
            VectorizerConfig {
                min_df: 1,
                stop_words: vec!["the".to_string()],
                ..VectorizerConfig::default()
            },
            &docs(&["print the value"]),
        )
        .unwrap();
        assert!(vectorizer.term_index("the").is_none());
        // Bigram bridges the removed stop word.
        assert!(vectorizer.term_index("print value").is_some());
    }

    #[test]
    fn transform_produces_unit_norm_vectors() {
        let vectorizer =
            TfidfVectorizer::fit(loose_config(), &docs(&["fn main loop", "let x loop"])).unwrap();
        let vector = vectorizer.transform("fn main");
        assert!((vector.l2_norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unseen_text_maps_to_zero_vector() {
        let vectorizer = TfidfVectorizer::fit(loose_config(), &docs(&["fn main"])).unwrap();
        let vector = vectorizer.transform("SELECT whatever FROM elsewhere");
        assert!(vector.is_empty());
        assert_eq!(vector.dim() as usize, vectorizer.n_features());
    }

    #[test]
    fn fitting_zero_documents_fails() {
        let err = TfidfVectorizer::fit(VectorizerConfig::default(), &[]).unwrap_err();
        assert!(err.to_string().contains("zero documents"));
    }

    #[test]
    fn serialization_preserves_the_feature_space() {
        let vectorizer =
            TfidfVectorizer::fit(loose_config(), &docs(&["fn main loop", "let x loop"])).unwrap();
        let json = serde_json::to_string(&vectorizer).unwrap();
        let restored: TfidfVectorizer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.n_features(), vectorizer.n_features());
        assert_eq!(restored.transform("fn main loop"), vectorizer.transform("fn main loop"));
    }
}
