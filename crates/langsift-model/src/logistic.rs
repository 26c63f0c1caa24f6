//! Multinomial logistic regression
//!
//! Trained with seeded stochastic gradient descent over sparse TF-IDF
//! rows. This is the one classifier kind that exposes calibrated
//! per-class probabilities (the softmax of its decision scores).

use crate::classifier::{argmax, validate_training_inputs};
use crate::sparse::SparseVector;
use langsift_core::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Training settings for [`LogisticRegression`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Passes over the shuffled training set
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Initial step size, decayed per epoch
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// L2 penalty applied to touched weights
    #[serde(default = "default_l2")]
    pub l2: f32,

    /// Seed for the shuffling RNG
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            l2: default_l2(),
            seed: default_seed(),
        }
    }
}

fn default_epochs() -> usize {
    30
}

fn default_learning_rate() -> f32 {
    0.5
}

fn default_l2() -> f32 {
    1e-4
}

fn default_seed() -> u64 {
    42
}

/// A fitted multinomial logistic regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub(crate) classes: Vec<String>,
    pub(crate) n_features: u32,
    pub(crate) weights: Vec<Vec<f32>>,
    pub(crate) intercepts: Vec<f32>,
}

impl LogisticRegression {
    /// Fit on sparse rows and class indices into `classes`
    pub fn fit(
        params: &LogisticParams,
        features: &[SparseVector],
        labels: &[usize],
        classes: Vec<String>,
    ) -> Result<Self> {
        let n_features = validate_training_inputs(features, labels, &classes)?;
        let n_classes = classes.len();

        let mut weights = vec![vec![0.0_f32; n_features as usize]; n_classes];
        let mut intercepts = vec![0.0_f32; n_classes];
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut order: Vec<usize> = (0..features.len()).collect();

        for epoch in 0..params.epochs {
            order.shuffle(&mut rng);
            let eta = params.learning_rate / (1.0 + epoch as f32);

            for &sample in &order {
                let x = &features[sample];
                let target = labels[sample];
                let scores: Vec<f32> = (0..n_classes)
                    .map(|class| x.dot_dense(&weights[class]) + intercepts[class])
                    .collect();
                let probs = softmax(&scores);

                for class in 0..n_classes {
                    let gradient = probs[class] - if class == target { 1.0 } else { 0.0 };
                    intercepts[class] -= eta * gradient;
                    let row = &mut weights[class];
                    for (index, value) in x.iter() {
                        let weight = &mut row[index as usize];
                        *weight -= eta * (gradient * value + params.l2 * *weight);
                    }
                }
            }
        }

        debug!(
            classes = n_classes,
            features = n_features,
            epochs = params.epochs,
            "fitted logistic regression"
        );

        Ok(Self {
            classes,
            n_features,
            weights,
            intercepts,
        })
    }

    /// Per-class decision scores (pre-softmax)
    pub fn decision_scores(&self, features: &SparseVector) -> Vec<f32> {
        (0..self.classes.len())
            .map(|class| features.dot_dense(&self.weights[class]) + self.intercepts[class])
            .collect()
    }

    /// Index of the winning class
    pub fn predict_index(&self, features: &SparseVector) -> usize {
        argmax(&self.decision_scores(features))
    }

    /// Per-class probabilities; non-negative and summing to one
    pub fn probabilities(&self, features: &SparseVector) -> Vec<f32> {
        softmax(&self.decision_scores(features))
    }

    /// Class labels in training order (lexicographic)
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Dimensionality of the feature space this model was trained on
    pub fn n_features(&self) -> u32 {
        self.n_features
    }
}

/// Numerically stable softmax over raw scores
pub(crate) fn softmax(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
