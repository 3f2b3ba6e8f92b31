//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{EmbeddingVector, RetrievedPassage};

/// Trait for a remote nearest-neighbor index
///
/// Implementations:
/// - `PineconeIndex`: Pinecone data plane
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Find the passages closest to `vector` inside `namespace`.
    ///
    /// Only passage text and score come back; raw vector values are not requested.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<RetrievedPassage>>;

    /// Insert or replace vectors, returning how many were written
    async fn upsert(&self, vectors: &[EmbeddingVector], namespace: &str) -> Result<usize>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
