//! Provider abstractions for the external collaborators
//!
//! Moderation, embeddings, the vector index and completions each sit behind a
//! trait so the pipeline can run against OpenAI/Pinecone, the local ONNX
//! embedder, or in-process fakes.

pub mod embedding;
pub mod llm;
pub mod moderation;
pub mod openai;
pub mod pinecone;
pub mod registry;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::{CompletionRequest, LlmProvider};
pub use moderation::ModerationProvider;
pub use openai::OpenAiClient;
pub use pinecone::PineconeIndex;
pub use registry::{ClientRegistry, Providers};
pub use vector_store::VectorStoreProvider;
