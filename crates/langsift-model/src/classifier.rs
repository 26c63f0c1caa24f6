//! The closed set of classifier kinds LangSift trains and serves
//!
//! Serving code never branches on model internals; it goes through
//! [`Classifier`], which carries the kind tag into the serialized
//! artifact (`"kind"` discriminator) and normalizes the predict and
//! probability surfaces across kinds.

use crate::forest::RandomForest;
use crate::logistic::LogisticRegression;
use crate::sparse::SparseVector;
use crate::svm::LinearSvm;
use langsift_core::{Error, ModelKind, Result};
use serde::{Deserialize, Serialize};

/// A fitted classifier of any supported kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    Svm(LinearSvm),
}

impl Classifier {
    /// Which kind of model this is
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::LogisticRegression(_) => ModelKind::LogisticRegression,
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::Svm(_) => ModelKind::Svm,
        }
    }

    /// Class labels in training order (lexicographic)
    pub fn classes(&self) -> &[String] {
        match self {
            Self::LogisticRegression(model) => model.classes(),
            Self::RandomForest(model) => model.classes(),
            Self::Svm(model) => model.classes(),
        }
    }

    /// Dimensionality of the feature space this model was trained on
    pub fn n_features(&self) -> u32 {
        match self {
            Self::LogisticRegression(model) => model.n_features(),
            Self::RandomForest(model) => model.n_features(),
            Self::Svm(model) => model.n_features(),
        }
    }

    /// Whether [`Classifier::probabilities`] returns values for this kind
    pub fn supports_probabilities(&self) -> bool {
        self.kind().supports_probabilities()
    }

    /// Predict the winning class label.
    ///
    /// Ties in the underlying scores resolve to the earliest class in
    /// training order.
    pub fn predict(&self, features: &SparseVector) -> Result<&str> {
        self.check_dimensions(features)?;
        let index = match self {
            Self::LogisticRegression(model) => model.predict_index(features),
            Self::RandomForest(model) => model.predict_index(features),
            Self::Svm(model) => model.predict_index(features),
        };
        Ok(self.classes()[index].as_str())
    }

    /// Per-class probabilities aligned with [`Classifier::classes`].
    ///
    /// Returns `None` for kinds without a probability surface.
    pub fn probabilities(&self, features: &SparseVector) -> Result<Option<Vec<f32>>> {
        self.check_dimensions(features)?;
        Ok(match self {
            Self::LogisticRegression(model) => Some(model.probabilities(features)),
            Self::RandomForest(_) | Self::Svm(_) => None,
        })
    }

    fn check_dimensions(&self, features: &SparseVector) -> Result<()> {
        if features.dim() != self.n_features() {
            return Err(Error::inference(format!(
                "feature dimension {} does not match model dimension {}",
                features.dim(),
                self.n_features()
            )));
        }
        Ok(())
    }
}

/// Validate the shared shape of training inputs, returning the feature
/// dimension.
///
/// Class labels must be unique and sorted: that ordering is the native
/// ordering every downstream tie-break and probability vector aligns to.
pub(crate) fn validate_training_inputs(
    features: &[SparseVector],
    labels: &[usize],
    classes: &[String],
) -> Result<u32> {
    if features.is_empty() {
        return Err(Error::training("no training samples"));
    }
    if labels.len() != features.len() {
        return Err(Error::training(format!(
            "{} samples but {} labels",
            features.len(),
            labels.len()
        )));
    }
    if classes.is_empty() {
        return Err(Error::training("no class labels"));
    }
    if !classes.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(Error::training("class labels must be unique and sorted"));
    }
    if let Some(bad) = labels.iter().find(|label| **label >= classes.len()) {
        return Err(Error::training(format!(
            "label index {bad} out of range for {} classes",
            classes.len()
        )));
    }
    let dim = features[0].dim();
    if dim == 0 {
        return Err(Error::training("feature space is empty"));
    }
    if features.iter().any(|f| f.dim() != dim) {
        return Err(Error::training("inconsistent feature dimensions"));
    }
    Ok(dim)
}

/// First index holding the maximum score
pub(crate) fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (index, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = index;
        }
    }
    best
}

/// First index holding the maximum count
pub(crate) fn argmax_counts(counts: &[usize]) -> usize {
    let mut best = 0;
    for (index, count) in counts.iter().enumerate().skip(1) {
        if *count > counts[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logistic::LogisticParams;

    fn trained_logistic() -> Classifier {
        let features = vec![
            SparseVector::from_pairs(2, vec![(0, 1.0)]),
            SparseVector::from_pairs(2, vec![(1, 1.0)]),
        ];
        let model = LogisticRegression::fit(
            &LogisticParams::default(),
            &features,
            &[0, 1],
            vec!["go".to_string(), "rust".to_string()],
        )
        .unwrap();
        Classifier::LogisticRegression(model)
    }

    fn uniform_logistic(classes: &[&str]) -> Classifier {
        // All-zero weights give exactly equal scores for every class.
        Classifier::LogisticRegression(LogisticRegression {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            n_features: 2,
            weights: vec![vec![0.0; 2]; classes.len()],
            intercepts: vec![0.0; classes.len()],
        })
    }

    #[test]
    fn serialized_form_carries_the_kind_tag() {
        let classifier = trained_logistic();
        let value = serde_json::to_value(&classifier).unwrap();
        assert_eq!(value["kind"], serde_json::json!("logistic_regression"));

        let restored: Classifier = serde_json::from_value(value).unwrap();
        assert_eq!(restored.kind(), ModelKind::LogisticRegression);
        let probe = SparseVector::from_pairs(2, vec![(1, 1.0)]);
        assert_eq!(restored.predict(&probe).unwrap(), classifier.predict(&probe).unwrap());
    }

    #[test]
    fn dimension_mismatch_is_an_inference_error() {
        let classifier = trained_logistic();
        let err = classifier.predict(&SparseVector::empty(5)).unwrap_err();
        assert!(err.to_string().contains("inference error"));
    }

    #[test]
    fn exact_ties_resolve_to_the_earliest_class() {
        let classifier = uniform_logistic(&["ada", "cobol", "fortran"]);
        let probe = SparseVector::from_pairs(2, vec![(0, 1.0)]);
        assert_eq!(classifier.predict(&probe).unwrap(), "ada");

        let probs = classifier.probabilities(&probe).unwrap().unwrap();
        for p in &probs {
            assert!((p - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn forest_and_svm_expose_no_probabilities() {
        let features = vec![
            SparseVector::from_pairs(2, vec![(0, 1.0)]),
            SparseVector::from_pairs(2, vec![(1, 1.0)]),
        ];
        let classes = vec!["go".to_string(), "rust".to_string()];

        let forest = Classifier::RandomForest(
            RandomForest::fit(&Default::default(), &features, &[0, 1], classes.clone()).unwrap(),
        );
        let svm = Classifier::Svm(
            LinearSvm::fit(&Default::default(), &features, &[0, 1], classes).unwrap(),
        );

        let probe = SparseVector::from_pairs(2, vec![(0, 1.0)]);
        assert!(forest.probabilities(&probe).unwrap().is_none());
        assert!(svm.probabilities(&probe).unwrap().is_none());
        assert!(!forest.supports_probabilities());
        assert!(!svm.supports_probabilities());
    }

    #[test]
    fn unsorted_class_labels_are_rejected() {
        let features = vec![SparseVector::from_pairs(2, vec![(0, 1.0)])];
        let err = validate_training_inputs(
            &features,
            &[0],
            &["rust".to_string(), "go".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("sorted"));
    }
}
