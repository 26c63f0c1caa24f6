//! Held-out evaluation metrics
//!
//! Accuracy plus support-weighted precision, recall, and F1. Classes
//! that are never predicted (or never occur) contribute zero rather
//! than poisoning the averages with divisions by zero.

use langsift_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Metrics measured against a held-out split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Compare predicted class indices against the truth.
///
/// Both slices hold indices below `n_classes`; precision/recall/F1 are
/// averaged weighted by each class's true support.
pub fn evaluate(truth: &[usize], predicted: &[usize], n_classes: usize) -> Result<Evaluation> {
    if truth.is_empty() {
        return Err(Error::training("cannot evaluate on zero samples"));
    }
    if truth.len() != predicted.len() {
        return Err(Error::training(format!(
            "{} truth labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.iter().chain(predicted).any(|label| *label >= n_classes) {
        return Err(Error::training("label index out of range"));
    }

    let mut true_positive = vec![0_usize; n_classes];
    let mut false_positive = vec![0_usize; n_classes];
    let mut false_negative = vec![0_usize; n_classes];
    let mut correct = 0_usize;
    for (&actual, &guess) in truth.iter().zip(predicted) {
        if actual == guess {
            correct += 1;
            true_positive[actual] += 1;
        } else {
            false_positive[guess] += 1;
            false_negative[actual] += 1;
        }
    }

    let total = truth.len() as f64;
    let mut precision = 0.0;
    let mut recall = 0.0;
    let mut f1_score = 0.0;
    for class in 0..n_classes {
        let support = (true_positive[class] + false_negative[class]) as f64;
        if support == 0.0 {
            continue;
        }
        let weight = support / total;
        let p = ratio(true_positive[class], true_positive[class] + false_positive[class]);
        let r = ratio(true_positive[class], true_positive[class] + false_negative[class]);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        precision += weight * p;
        recall += weight * r;
        f1_score += weight * f;
    }

    Ok(Evaluation {
        accuracy: correct as f64 / total,
        precision,
        recall,
        f1_score,
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
