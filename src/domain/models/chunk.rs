//! Chunk domain model: an indexed passage with a dense and sparse vector (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata duplicated onto each chunk for filter speed (author/year/title).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
}

/// A sparse weight vector: `token_id -> positive weight`. Only nonzero
/// entries are stored; the invariant "no zero or negative weights" is
/// enforced by `insert`/`from_pairs`, never by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SparseVector {
    weights: HashMap<u32, f32>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f32)>) -> Self {
        let mut v = Self::new();
        for (tok, w) in pairs {
            v.insert(tok, w);
        }
        v
    }

    /// Inserts a weight, silently dropping non-positive entries so the
    /// sparse-storage soundness invariant (§8) always holds.
    pub fn insert(&mut self, token_id: u32, weight: f32) {
        if weight > 0.0 {
            self.weights.insert(token_id, weight);
        } else {
            self.weights.remove(&token_id);
        }
    }

    pub fn get(&self, token_id: u32) -> Option<f32> {
        self.weights.get(&token_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.weights.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// True if every stored weight is strictly positive and the nonzero
    /// count is within `vocab_size` (§8 sparse storage soundness).
    pub fn is_sound(&self, vocab_size: usize) -> bool {
        self.weights.len() <= vocab_size && self.weights.values().all(|w| *w > 0.0)
    }
}

/// A dense embedding vector, L2-normalized at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DenseVector(Vec<f32>);

impl DenseVector {
    /// Normalizes `values` to unit L2 norm. A zero vector stays zero.
    pub fn normalized(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            Self(values.into_iter().map(|v| v / norm).collect())
        } else {
            Self(values)
        }
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Cosine similarity. Both vectors are assumed unit-normalized, so this
    /// reduces to a dot product; falls back to the full formula if not.
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum();
        let norm_a: f32 = self.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b: f32 = other.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
            0.0
        } else {
            (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
        }
    }
}

/// An indexed passage belonging to a `Document` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: Uuid,
    pub doc_id: Uuid,
    /// 0-based, dense within the owning document.
    pub chunk_index: u32,
    pub text: String,
    pub dense: DenseVector,
    pub sparse: SparseVector,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(doc_id: Uuid, chunk_index: u32, text: String, dense: DenseVector, sparse: SparseVector, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            doc_id,
            chunk_index,
            text,
            dense,
            sparse,
            metadata,
        }
    }
}
