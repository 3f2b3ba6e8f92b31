//! Embedding vectors and retrieved passages

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata stored next to a vector in the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Source text the vector was computed from
    pub text: String,
}

/// A text embedding ready for querying or upserting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// Vector id
    pub id: Uuid,
    /// Vector values
    pub values: Vec<f32>,
    /// Source metadata
    pub metadata: VectorMetadata,
}

impl EmbeddingVector {
    /// Wrap raw values computed from `text` under a fresh id
    pub fn new(text: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            values,
            metadata: VectorMetadata { text: text.into() },
        }
    }

    /// Number of dimensions
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

/// A passage returned by the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Passage text
    pub text: String,
    /// Similarity score, higher is more similar
    pub score: f32,
}

impl RetrievedPassage {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}
