//! Sparse feature vectors produced by the vectorizer

use serde::{Deserialize, Serialize};

/// A sparse row vector over a fixed feature space.
///
/// Indices are strictly increasing and every stored value is non-zero
/// in practice (TF-IDF weights of present terms). Positions that are
/// not stored read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
    dim: u32,
}

impl SparseVector {
    /// Create an empty vector over a `dim`-dimensional feature space
    pub fn empty(dim: u32) -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
            dim,
        }
    }

    /// Build from (index, value) pairs; pairs are sorted by index.
    ///
    /// Indices must be unique and below `dim`.
    pub fn from_pairs(dim: u32, mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_unstable_by_key(|(index, _)| *index);
        debug_assert!(pairs.iter().all(|(index, _)| *index < dim));
        let (indices, values) = pairs.into_iter().unzip();
        Self {
            indices,
            values,
            dim,
        }
    }

    /// Dimensionality of the feature space this vector lives in
    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// Number of stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Whether no entry is stored
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate stored entries in index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at `index`, zero when not stored
    pub fn get(&self, index: u32) -> f32 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Dot product against a dense weight row of at least `dim` entries
    pub fn dot_dense(&self, dense: &[f32]) -> f32 {
        self.iter().map(|(index, value)| dense[index as usize] * value).sum()
    }

    /// Euclidean norm of the stored entries
    pub fn l2_norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Scale in place to unit Euclidean norm; zero vectors stay zero
    pub fn l2_normalize(&mut self) {
        let norm = self.l2_norm();
        if norm > 0.0 {
            for value in &mut self.values {
                *value /= norm;
            }
        }
    }
}
