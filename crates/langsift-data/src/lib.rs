//! LangSift Data
//!
//! Training-data plumbing: corpus types, corpus sources (local JSONL
//! files and Hugging Face dataset repos), minimum-sample class
//! filtering, and seeded stratified train/test splitting.
//!
//! Everything is deterministic under a fixed seed so that rebuilding a
//! model from the same corpus always reproduces the same artifact.

pub mod corpus;
pub mod source;

pub use corpus::{CodeSample, Corpus, TrainTestSplit};
pub use source::{CorpusSource, HubSource, JsonlSource};
