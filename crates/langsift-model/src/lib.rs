//! LangSift Model
//!
//! Feature extraction and classification for programming-language
//! identification.
//!
//! The pipeline is classical and fully deterministic:
//! - TF-IDF over word 1-2-grams turns source text into sparse vectors
//! - a closed set of classifier kinds (logistic regression, random
//!   forest, linear SVM) maps vectors to language labels
//! - trained pairs persist as versioned JSON artifacts with atomic
//!   replacement on disk
//!
//! Everything here runs on CPU with no runtime model downloads.

pub mod artifact;
pub mod classifier;
pub mod forest;
pub mod logistic;
pub mod sparse;
pub mod svm;
pub mod vectorizer;

pub use artifact::{ArtifactBundle, PerformanceReport, StoredArtifact};
pub use classifier::Classifier;
pub use forest::{ForestParams, RandomForest};
pub use logistic::{LogisticParams, LogisticRegression};
pub use sparse::SparseVector;
pub use svm::{LinearSvm, SvmParams};
pub use vectorizer::{TfidfVectorizer, VectorizerConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::artifact::{ArtifactBundle, PerformanceReport, StoredArtifact};
    pub use crate::classifier::Classifier;
    pub use crate::sparse::SparseVector;
    pub use crate::vectorizer::{TfidfVectorizer, VectorizerConfig};
}
