//! Model training
//!
//! One `Trainer` run owns the whole fit: learn the vocabulary on the
//! train half only (the held-out half must stay unseen), fit the
//! configured classifier kind, then measure accuracy and weighted F1
//! on the held-out half. The returned pair is what gets persisted as
//! an artifact.

use crate::evaluator::{evaluate, Evaluation};
use langsift_core::{Error, ModelKind, Result};
use langsift_data::TrainTestSplit;
use langsift_model::forest::{ForestParams, RandomForest};
use langsift_model::logistic::{LogisticParams, LogisticRegression};
use langsift_model::svm::{LinearSvm, SvmParams};
use langsift_model::vectorizer::VectorizerConfig;
use langsift_model::{Classifier, SparseVector, TfidfVectorizer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Everything a training run needs to know
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Which classifier kind to fit
    #[serde(default = "default_kind")]
    pub kind: ModelKind,

    /// Feature-extraction settings
    #[serde(default)]
    pub vectorizer: VectorizerConfig,

    /// Settings used when `kind` is logistic regression
    #[serde(default)]
    pub logistic: LogisticParams,

    /// Settings used when `kind` is random forest
    #[serde(default)]
    pub forest: ForestParams,

    /// Settings used when `kind` is SVM
    #[serde(default)]
    pub svm: SvmParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            vectorizer: VectorizerConfig::default(),
            logistic: LogisticParams::default(),
            forest: ForestParams::default(),
            svm: SvmParams::default(),
        }
    }
}

fn default_kind() -> ModelKind {
    ModelKind::LogisticRegression
}

/// A fitted (vectorizer, classifier) pair plus its held-out metrics
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub vectorizer: TfidfVectorizer,
    pub classifier: Classifier,
    pub evaluation: Evaluation,
}

/// Fits models from stratified splits
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// Create a trainer with the given configuration
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// The configuration this trainer runs with
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit the vectorizer and classifier, then evaluate on the test half
    pub fn train(&self, split: &TrainTestSplit) -> Result<TrainedModel> {
        let classes = split.classes();
        if classes.is_empty() {
            return Err(Error::training("split contains no classes"));
        }
        let class_index: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(index, label)| (label.as_str(), index))
            .collect();

        let train_texts = split.train_texts();
        let vectorizer = TfidfVectorizer::fit(self.config.vectorizer.clone(), &train_texts)?;

        let train_x: Vec<SparseVector> = split
            .train
            .iter()
            .map(|sample| vectorizer.transform(&sample.code))
            .collect();
        let train_y: Vec<usize> = split
            .train
            .iter()
            .map(|sample| class_index[sample.language.as_str()])
            .collect();

        let classifier = match self.config.kind {
            ModelKind::LogisticRegression => Classifier::LogisticRegression(
                LogisticRegression::fit(&self.config.logistic, &train_x, &train_y, classes.clone())?,
            ),
            ModelKind::RandomForest => Classifier::RandomForest(RandomForest::fit(
                &self.config.forest,
                &train_x,
                &train_y,
                classes.clone(),
            )?),
            ModelKind::Svm => Classifier::Svm(LinearSvm::fit(
                &self.config.svm,
                &train_x,
                &train_y,
                classes.clone(),
            )?),
        };

        let mut truth = Vec::with_capacity(split.test.len());
        let mut predicted = Vec::with_capacity(split.test.len());
        for sample in &split.test {
            let features = vectorizer.transform(&sample.code);
            let label = classifier.predict(&features)?;
            predicted.push(class_index[label]);
            truth.push(class_index[sample.language.as_str()]);
        }
        let evaluation = evaluate(&truth, &predicted, classes.len())?;

        info!(
            kind = %self.config.kind,
            classes = classes.len(),
            features = vectorizer.n_features(),
            train_samples = split.train.len(),
            test_samples = split.test.len(),
            accuracy = evaluation.accuracy,
            f1_score = evaluation.f1_score,
            "trained model"
        );

        Ok(TrainedModel {
            vectorizer,
            classifier,
            evaluation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use langsift_data::{CodeSample, Corpus};

    fn separable_corpus() -> Corpus {
        let mut samples = Vec::new();
        for i in 0..12 {
            samples.push(CodeSample::new(
                "Python",
                format!("def func{i}():\n    print('value {i}')\n    return {i}"),
            ));
            samples.push(CodeSample::new(
                "Rust",
                format!("fn func{i}() -> u32 {{ println!(\"value {i}\"); {i} }}"),
            ));
        }
        Corpus::new(samples)
    }

    fn small_config(kind: ModelKind) -> TrainingConfig {
        TrainingConfig {
            kind,
            vectorizer: VectorizerConfig {
                min_df: 1,
                ..VectorizerConfig::default()
            },
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn every_kind_learns_a_separable_corpus() {
        let split = separable_corpus().stratified_split(0.25, 42).unwrap();

        for kind in [ModelKind::LogisticRegression, ModelKind::RandomForest, ModelKind::Svm] {
            let trained = Trainer::new(small_config(kind)).train(&split).unwrap();
            assert_eq!(trained.classifier.kind(), kind);
            assert_eq!(
                trained.classifier.n_features() as usize,
                trained.vectorizer.n_features()
            );
            assert!(
                trained.evaluation.accuracy > 0.9,
                "{kind} accuracy was {}",
                trained.evaluation.accuracy
            );
        }
    }

    #[test]
    fn class_labels_are_sorted_lexicographically() {
        let split = separable_corpus().stratified_split(0.25, 42).unwrap();
        let trained = Trainer::new(small_config(ModelKind::LogisticRegression))
            .train(&split)
            .unwrap();
        assert_eq!(trained.classifier.classes(), ["Python", "Rust"]);
    }

    #[test]
    fn identical_inputs_reproduce_the_identical_model() {
        let split = separable_corpus().stratified_split(0.25, 42).unwrap();
        let config = small_config(ModelKind::LogisticRegression);

        let a = Trainer::new(config.clone()).train(&split).unwrap();
        let b = Trainer::new(config).train(&split).unwrap();
        assert_eq!(
            serde_json::to_string(&a.classifier).unwrap(),
            serde_json::to_string(&b.classifier).unwrap()
        );
        assert_eq!(a.evaluation, b.evaluation);
    }
}
