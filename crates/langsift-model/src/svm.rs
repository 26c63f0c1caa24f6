//! One-vs-rest linear support vector machine
//!
//! Hinge-loss SGD, one binary separator per class, winner by largest
//! margin. Like the forest, this kind exposes no probability surface;
//! its decision values are uncalibrated margins.

use crate::classifier::{argmax, validate_training_inputs};
use crate::sparse::SparseVector;
use langsift_core::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Training settings for [`LinearSvm`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmParams {
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

impl Default for SvmParams {
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
    0.3
}

fn default_l2() -> f32 {
    1e-4
}

fn default_seed() -> u64 {
    42
}

/// A fitted one-vs-rest linear SVM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvm {
    pub(crate) classes: Vec<String>,
    pub(crate) n_features: u32,
    pub(crate) weights: Vec<Vec<f32>>,
    pub(crate) intercepts: Vec<f32>,
}

impl LinearSvm {
    /// Fit on sparse rows and class indices into `classes`
    pub fn fit(
        params: &SvmParams,
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
                for class in 0..n_classes {
                    let target = if labels[sample] == class { 1.0 } else { -1.0 };
                    let row = &mut weights[class];
                    let margin = target * (x.dot_dense(row) + intercepts[class]);
                    if margin < 1.0 {
                        for (index, value) in x.iter() {
                            let weight = &mut row[index as usize];
                            *weight -= eta * (params.l2 * *weight - target * value);
                        }
                        intercepts[class] += eta * target;
                    } else {
                        for (index, _) in x.iter() {
                            let weight = &mut row[index as usize];
                            *weight -= eta * params.l2 * *weight;
                        }
                    }
                }
            }
        }

        debug!(
            classes = n_classes,
            features = n_features,
            epochs = params.epochs,
            "fitted linear svm"
        );

        Ok(Self {
            classes,
            n_features,
            weights,
            intercepts,
        })
    }

    /// Per-class margins
    pub fn decision_scores(&self, features: &SparseVector) -> Vec<f32> {
        (0..self.classes.len())
            .map(|class| features.dot_dense(&self.weights[class]) + self.intercepts[class])
            .collect()
    }

    /// Index of the class with the largest margin
    pub fn predict_index(&self, features: &SparseVector) -> usize {
        argmax(&self.decision_scores(features))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_training_set() -> (Vec<SparseVector>, Vec<usize>, Vec<String>) {
        let features = vec![
            SparseVector::from_pairs(2, vec![(0, 1.0)]),
            SparseVector::from_pairs(2, vec![(0, 0.8)]),
            SparseVector::from_pairs(2, vec![(1, 1.0)]),
            SparseVector::from_pairs(2, vec![(1, 0.9)]),
        ];
        (features, vec![0, 0, 1, 1], vec!["go".to_string(), "rust".to_string()])
    }

    #[test]
    fn separable_classes_are_learned() {
        let (features, labels, classes) = toy_training_set();
        let model = LinearSvm::fit(&SvmParams::default(), &features, &labels, classes).unwrap();

        assert_eq!(model.predict_index(&SparseVector::from_pairs(2, vec![(0, 1.0)])), 0);
        assert_eq!(model.predict_index(&SparseVector::from_pairs(2, vec![(1, 1.0)])), 1);
    }

    #[test]
    fn same_seed_trains_identical_models() {
        let (features, labels, classes) = toy_training_set();
        let params = SvmParams::default();
        let a = LinearSvm::fit(&params, &features, &labels, classes.clone()).unwrap();
        let b = LinearSvm::fit(&params, &features, &labels, classes).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.intercepts, b.intercepts);
    }
}
