//! Process-wide collaborator clients
//!
//! Each client is built on first use and shared afterwards. Concurrent first
//! requests race on a `OnceCell`, so they all end up with the same handle.
//! Building a client never touches the network; missing credentials surface
//! here, before any request is sent.

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::Result;

use super::{
    EmbeddingProvider, LlmProvider, ModerationProvider, OpenAiClient, PineconeIndex,
    VectorStoreProvider,
};

/// The collaborators one request runs against
#[derive(Clone)]
pub struct Providers {
    pub moderation: Arc<dyn ModerationProvider>,
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

/// Lazily-initialized client handles
pub struct ClientRegistry {
    config: Arc<RagConfig>,
    openai: OnceCell<Arc<OpenAiClient>>,
    moderation: OnceCell<Arc<dyn ModerationProvider>>,
    embedding: OnceCell<Arc<dyn EmbeddingProvider>>,
    vector_store: OnceCell<Arc<dyn VectorStoreProvider>>,
    llm: OnceCell<Arc<dyn LlmProvider>>,
}

impl ClientRegistry {
    /// Registry that builds clients from `config` on first use
    pub fn new(config: Arc<RagConfig>) -> Self {
        Self {
            config,
            openai: OnceCell::new(),
            moderation: OnceCell::new(),
            embedding: OnceCell::new(),
            vector_store: OnceCell::new(),
            llm: OnceCell::new(),
        }
    }

    /// Registry with every client already in place
    pub fn with_providers(config: Arc<RagConfig>, providers: Providers) -> Self {
        Self {
            config,
            openai: OnceCell::new(),
            moderation: OnceCell::new_with(Some(providers.moderation)),
            embedding: OnceCell::new_with(Some(providers.embedding)),
            vector_store: OnceCell::new_with(Some(providers.vector_store)),
            llm: OnceCell::new_with(Some(providers.llm)),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Get every client, building missing ones
    pub async fn resolve(&self) -> Result<Providers> {
        let moderation = self
            .moderation
            .get_or_try_init(|| async {
                let client: Arc<dyn ModerationProvider> = self.openai().await?;
                Ok::<_, crate::Error>(client)
            })
            .await?
            .clone();

        let vector_store = self
            .vector_store
            .get_or_try_init(|| async {
                let index = PineconeIndex::new(&self.config.vector_index)?;
                tracing::info!("Using Pinecone index at {}", index.host());
                Ok::<_, crate::Error>(Arc::new(index) as Arc<dyn VectorStoreProvider>)
            })
            .await?
            .clone();

        let llm = self
            .llm
            .get_or_try_init(|| async {
                let client: Arc<dyn LlmProvider> = self.openai().await?;
                Ok::<_, crate::Error>(client)
            })
            .await?
            .clone();

        // last: the ONNX backend may download model files
        let embedding = self
            .embedding
            .get_or_try_init(|| self.build_embedding())
            .await?
            .clone();

        Ok(Providers {
            moderation,
            embedding,
            vector_store,
            llm,
        })
    }

    async fn openai(&self) -> Result<Arc<OpenAiClient>> {
        self.openai
            .get_or_try_init(|| async {
                let client = OpenAiClient::new(&self.config.openai, &self.config.embeddings)?;
                tracing::info!("OpenAI client ready ({})", self.config.openai.base_url);
                Ok::<_, crate::Error>(Arc::new(client))
            })
            .await
            .cloned()
    }

    async fn build_embedding(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.config.embeddings.backend {
            EmbeddingBackend::OpenAi => {
                let client: Arc<dyn EmbeddingProvider> = self.openai().await?;
                Ok(client)
            }
            #[cfg(feature = "onnx")]
            EmbeddingBackend::Onnx => {
                let embedder = crate::embeddings::OnnxEmbedder::new(&self.config.embeddings).await?;
                Ok(Arc::new(embedder))
            }
            #[cfg(not(feature = "onnx"))]
            EmbeddingBackend::Onnx => Err(crate::Error::config(
                "ONNX embedding backend selected but the onnx feature is not enabled",
            )),
        }
    }
}
