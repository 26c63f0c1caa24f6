//! Random forest over sparse TF-IDF rows
//!
//! Seeded bootstrap sampling, random feature candidates per node, gini
//! splits on term presence, majority voting across trees. Mirrors the
//! serving contract of the logistic model except that no probability
//! surface is exposed for this kind.

use crate::classifier::{argmax_counts, validate_training_inputs};
use crate::sparse::SparseVector;
use langsift_core::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MIN_GINI_GAIN: f64 = 1e-7;

/// Training settings for [`RandomForest`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    #[serde(default = "default_trees")]
    pub trees: usize,

    /// Maximum tree depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Nodes with fewer samples become leaves
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    /// Seed for bootstrap and feature sampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: default_trees(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            seed: default_seed(),
        }
    }
}

fn default_trees() -> usize {
    50
}

fn default_max_depth() -> usize {
    16
}

fn default_min_samples_split() -> usize {
    2
}

fn default_seed() -> u64 {
    42
}

/// One decision node; samples route left when the feature value is at
/// or below the threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        class: u32,
    },
    Split {
        feature: u32,
        threshold: f32,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, features: &SparseVector) -> u32 {
        let mut node = self;
        loop {
            match node {
                Self::Leaf { class } => return *class,
                Self::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features.get(*feature) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// A fitted random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub(crate) classes: Vec<String>,
    pub(crate) n_features: u32,
    trees: Vec<TreeNode>,
}

impl RandomForest {
    /// Fit on sparse rows and class indices into `classes`
    pub fn fit(
        params: &ForestParams,
        features: &[SparseVector],
        labels: &[usize],
        classes: Vec<String>,
    ) -> Result<Self> {
        let n_features = validate_training_inputs(features, labels, &classes)?;
        let n_classes = classes.len();
        let n_samples = features.len();
        // sqrt(n_features) candidates per node, the usual forest heuristic
        let candidates = ((n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features as usize);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.trees);
        for _ in 0..params.trees {
            let bootstrap: Vec<usize> =
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            trees.push(grow_tree(
                features, labels, n_classes, n_features, candidates, params, &bootstrap, 0,
                &mut rng,
            ));
        }

        debug!(
            trees = trees.len(),
            classes = n_classes,
            features = n_features,
            "fitted random forest"
        );

        Ok(Self {
            classes,
            n_features,
            trees,
        })
    }

    /// Index of the class winning the majority vote
    pub fn predict_index(&self, features: &SparseVector) -> usize {
        let mut votes = vec![0_usize; self.classes.len()];
        for tree in &self.trees {
            votes[tree.predict(features) as usize] += 1;
        }
        argmax_counts(&votes)
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

#[allow(clippy::too_many_arguments)]
fn grow_tree(
    features: &[SparseVector],
    labels: &[usize],
    n_classes: usize,
    n_features: u32,
    candidates: usize,
    params: &ForestParams,
    samples: &[usize],
    depth: usize,
    rng: &mut StdRng,
) -> TreeNode {
    let counts = class_counts(labels, samples, n_classes);
    let majority = argmax_counts(&counts) as u32;

    if depth >= params.max_depth
        || samples.len() < params.min_samples_split
        || is_pure(&counts)
    {
        return TreeNode::Leaf { class: majority };
    }

    let parent_gini = gini(&counts, samples.len());
    let mut best: Option<(u32, f64)> = None;
    for index in rand::seq::index::sample(rng, n_features as usize, candidates) {
        let feature = index as u32;
        let mut left = vec![0_usize; n_classes];
        let mut left_total = 0;
        for &sample in samples {
            if features[sample].get(feature) <= 0.0 {
                left[labels[sample]] += 1;
                left_total += 1;
            }
        }
        let right_total = samples.len() - left_total;
        if left_total == 0 || right_total == 0 {
            continue;
        }
        let right: Vec<usize> = counts.iter().zip(&left).map(|(c, l)| c - l).collect();
        let weighted = (left_total as f64 * gini(&left, left_total)
            + right_total as f64 * gini(&right, right_total))
            / samples.len() as f64;
        let gain = parent_gini - weighted;
        if gain > MIN_GINI_GAIN && best.map_or(true, |(_, g)| gain > g) {
            best = Some((feature, gain));
        }
    }

    let Some((feature, _)) = best else {
        return TreeNode::Leaf { class: majority };
    };

    let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
        .iter()
        .copied()
        .partition(|&sample| features[sample].get(feature) <= 0.0);

    TreeNode::Split {
        feature,
        threshold: 0.0,
        left: Box::new(grow_tree(
            features,
            labels,
            n_classes,
            n_features,
            candidates,
            params,
            &left_samples,
            depth + 1,
            rng,
        )),
        right: Box::new(grow_tree(
            features,
            labels,
            n_classes,
            n_features,
            candidates,
            params,
            &right_samples,
            depth + 1,
            rng,
        )),
    }
}

fn class_counts(labels: &[usize], samples: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0_usize; n_classes];
    for &sample in samples {
        counts[labels[sample]] += 1;
    }
    counts
}

fn is_pure(counts: &[usize]) -> bool {
    counts.iter().filter(|c| **c > 0).count() <= 1
}

fn gini(counts: &[usize], total: usize) -> f64 {
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}
