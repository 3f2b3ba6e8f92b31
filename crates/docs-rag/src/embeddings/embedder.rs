//! Text to vector conversion with shape checks and batching

use futures::future::try_join_all;
use std::future::Future;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::query::collapse_newlines;
use crate::types::EmbeddingVector;

/// Wraps an embedding provider and validates what it returns
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Dimensions every vector from this embedder has
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed one text; newlines are collapsed before the call
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let input = collapse_newlines(text);
        let values = self.provider.embed(&input).await?;

        let expected = self.provider.dimensions();
        if values.len() != expected {
            return Err(Error::Embedding(format!(
                "{} returned {} dimensions, expected {}",
                self.provider.name(),
                values.len(),
                expected
            )));
        }

        Ok(EmbeddingVector::new(input, values))
    }

    /// Embed `texts` in consecutive chunks of at most `batch_size`.
    ///
    /// Texts within a chunk are embedded concurrently. `on_batch_done` is
    /// awaited with each chunk's vectors, in input order, before the next
    /// chunk starts. The first failure aborts the whole run. Returns the
    /// number of vectors produced.
    pub async fn embed_batch<S, F, Fut>(
        &self,
        texts: &[S],
        batch_size: usize,
        mut on_batch_done: F,
    ) -> Result<usize>
    where
        S: AsRef<str>,
        F: FnMut(Vec<EmbeddingVector>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if batch_size == 0 {
            return Err(Error::config("Embedding batch size must be at least 1"));
        }

        let mut produced = 0;
        for (batch_index, chunk) in texts.chunks(batch_size).enumerate() {
            let vectors = try_join_all(chunk.iter().map(|t| self.embed(t.as_ref()))).await?;
            tracing::debug!("Embedded batch {} ({} texts)", batch_index, vectors.len());

            produced += vectors.len();
            on_batch_done(vectors).await?;
        }

        Ok(produced)
    }
}
