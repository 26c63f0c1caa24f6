//! Inference over a loaded model
//!
//! Wraps one [`LoadedModel`] and turns raw text into a
//! [`PredictionResult`]. Prediction never returns an error and never
//! panics: any internal failure comes back as a result with
//! `success = false` and the failure message in `error`.

use crate::cache::LoadedModel;
use langsift_core::{PredictionResult, TopPrediction};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// How many ranked guesses a prediction carries
const TOP_PREDICTIONS: usize = 3;

/// Stateless prediction front end over a cached model
pub struct InferenceService {
    model: Arc<LoadedModel>,
}

impl InferenceService {
    pub fn new(model: Arc<LoadedModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<LoadedModel> {
        &self.model
    }

    /// Classify `text`, reporting wall-clock processing time.
    ///
    /// Kinds without calibrated probabilities return only the predicted
    /// label; the ranked and per-class probability fields stay absent.
    pub fn predict(&self, text: &str) -> PredictionResult {
        let started = Instant::now();
        let features = self.model.vectorizer().transform(text);

        let label = match self.model.classifier().predict(&features) {
            Ok(label) => label.to_string(),
            Err(e) => {
                warn!(model_id = self.model.id(), error = %e, "prediction failed");
                return PredictionResult::failure(e.to_string(), elapsed_secs(started));
            }
        };

        let probabilities = match self.model.classifier().probabilities(&features) {
            Ok(probabilities) => probabilities,
            Err(e) => {
                warn!(model_id = self.model.id(), error = %e, "probability estimation failed");
                return PredictionResult::failure(e.to_string(), elapsed_secs(started));
            }
        };

        let result = PredictionResult::success(label, elapsed_secs(started));
        match probabilities {
            Some(probabilities) => {
                let (top, all) = rank_probabilities(self.model.classes(), &probabilities);
                result.with_probabilities(top, all)
            }
            None => result,
        }
    }
}

/// Rank class probabilities into the top guesses plus the full map.
///
/// Sorting is stable and descending, so equal probabilities keep the
/// classifier's native class order.
pub fn rank_probabilities(
    classes: &[String],
    probabilities: &[f32],
) -> (Vec<TopPrediction>, BTreeMap<String, f32>) {
    let mut ranked: Vec<TopPrediction> = classes
        .iter()
        .zip(probabilities)
        .map(|(class, &p)| TopPrediction::new(class.clone(), p))
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(TOP_PREDICTIONS);

    let all = classes
        .iter()
        .zip(probabilities)
        .map(|(class, &p)| (class.clone(), p))
        .collect();
    (ranked, all)
}

fn elapsed_secs(started: Instant) -> f64 {
    started.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descending_and_keeps_three() {
        let classes = vec![
            "Go".to_string(),
            "Python".to_string(),
            "Ruby".to_string(),
            "Rust".to_string(),
        ];
        let (top, all) = rank_probabilities(&classes, &[0.1, 0.6, 0.05, 0.25]);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].language, "Python");
        assert_eq!(top[1].language, "Rust");
        assert_eq!(top[2].language, "Go");
        assert_eq!(all.len(), 4);
        assert!((all["Ruby"] - 0.05).abs() < 1e-6);
    }

    #[test]
    fn ranked_guesses_keep_their_class_alignment() {
        let classes = vec![
            "Python".to_string(),
            "JavaScript".to_string(),
            "Go".to_string(),
        ];
        let (top, _) = rank_probabilities(&classes, &[0.7, 0.2, 0.1]);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].language, "Python");
        assert!((top[0].confidence - 0.7).abs() < 1e-6);
        assert_eq!(top[1].language, "JavaScript");
        assert!((top[1].confidence - 0.2).abs() < 1e-6);
        assert_eq!(top[2].language, "Go");
        assert!((top[2].confidence - 0.1).abs() < 1e-6);
    }

    #[test]
    fn equal_probabilities_keep_native_class_order() {
        let classes = vec!["ada".to_string(), "basic".to_string(), "cobol".to_string()];
        let (top, _) = rank_probabilities(&classes, &[0.25, 0.5, 0.25]);

        assert_eq!(top[0].language, "basic");
        assert_eq!(top[1].language, "ada");
        assert_eq!(top[2].language, "cobol");
    }

    #[test]
    fn fewer_classes_than_the_cutoff() {
        let classes = vec!["Python".to_string(), "Rust".to_string()];
        let (top, all) = rank_probabilities(&classes, &[0.3, 0.7]);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].language, "Rust");
        assert_eq!(all.len(), 2);
    }
}
