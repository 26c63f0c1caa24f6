//! Core types for LangSift

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kinds of classifier LangSift can train and serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Multinomial logistic regression; the only kind that exposes probabilities
    LogisticRegression,
    /// Ensemble of randomized decision trees with majority voting
    RandomForest,
    /// One-vs-rest linear support vector machine
    Svm,
}

impl ModelKind {
    /// Stable identifier used in registry and artifact files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogisticRegression => "logistic_regression",
            Self::RandomForest => "random_forest",
            Self::Svm => "svm",
        }
    }

    /// Whether this kind can attach per-class probabilities to predictions
    pub fn supports_probabilities(&self) -> bool {
        matches!(self, Self::LogisticRegression)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked guess in a prediction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPrediction {
    /// Predicted language label
    pub language: String,

    /// Probability assigned to that label
    pub confidence: f32,
}

impl TopPrediction {
    /// Create a new ranked guess
    pub fn new(language: impl Into<String>, confidence: f32) -> Self {
        Self {
            language: language.into(),
            confidence,
        }
    }
}

/// Outcome of classifying a single text snippet
///
/// Inference never surfaces an error to its caller; failures are captured
/// into this structure with `success = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Winning language label; absent when the prediction failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_language: Option<String>,

    /// Wall-clock seconds spent producing this result
    pub processing_time: f64,

    /// Whether a prediction was produced
    pub success: bool,

    /// Up to the three most confident labels, best first; only present
    /// when the model kind exposes probabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_predictions: Option<Vec<TopPrediction>>,

    /// Full label-to-probability map; present together with
    /// `top_predictions`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_probabilities: Option<BTreeMap<String, f32>>,

    /// Failure description when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    /// Create a successful result carrying only the winning label
    pub fn success(language: impl Into<String>, processing_time: f64) -> Self {
        Self {
            predicted_language: Some(language.into()),
            processing_time,
            success: true,
            top_predictions: None,
            all_probabilities: None,
            error: None,
        }
    }

    /// Create a failed result carrying the error text
    pub fn failure(error: impl Into<String>, processing_time: f64) -> Self {
        Self {
            predicted_language: None,
            processing_time,
            success: false,
            top_predictions: None,
            all_probabilities: None,
            error: Some(error.into()),
        }
    }

    /// Attach ranked confidences and the full probability map
    pub fn with_probabilities(
        mut self,
        top: Vec<TopPrediction>,
        all: BTreeMap<String, f32>,
    ) -> Self {
        self.top_predictions = Some(top);
        self.all_probabilities = Some(all);
        self
    }
}
