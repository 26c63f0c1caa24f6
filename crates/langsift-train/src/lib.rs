//! LangSift Train
//!
//! Turns a stratified corpus split into a fitted (vectorizer,
//! classifier) pair with measured held-out metrics. The vectorizer is
//! always fitted on the train half only; accuracy and weighted F1 come
//! from the untouched test half and are the only performance numbers
//! that ever reach the registry.

pub mod evaluator;
pub mod trainer;

pub use evaluator::{evaluate, Evaluation};
pub use trainer::{TrainedModel, Trainer, TrainingConfig};
