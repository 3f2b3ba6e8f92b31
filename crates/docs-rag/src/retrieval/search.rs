//! Nearest-neighbor retrieval against the vector index

use std::sync::Arc;

use crate::error::Result;
use crate::providers::VectorStoreProvider;
use crate::types::{EmbeddingVector, RetrievedPassage};

/// Queries one namespace of the vector index
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStoreProvider>,
    namespace: String,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStoreProvider>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Top `top_k` passages for `vector`, best first.
    ///
    /// Equal scores keep the order the index returned them in.
    pub async fn retrieve(
        &self,
        vector: &EmbeddingVector,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let passages = self
            .store
            .query(&vector.values, top_k, &self.namespace)
            .await?;
        let passages = rank(passages, top_k);

        tracing::debug!(
            "Retrieved {} passages from {} (top score: {:?})",
            passages.len(),
            self.store.name(),
            passages.first().map(|p| p.score)
        );
        Ok(passages)
    }
}

/// Stable sort by descending score, then cut to `top_k`
pub fn rank(mut passages: Vec<RetrievedPassage>, top_k: usize) -> Vec<RetrievedPassage> {
    passages.sort_by(|a, b| b.score.total_cmp(&a.score));
    passages.truncate(top_k);
    passages
}
