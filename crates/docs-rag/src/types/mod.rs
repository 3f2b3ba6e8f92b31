//! Core types for the RAG pipeline

pub mod moderation;
pub mod passage;
pub mod query;

pub use moderation::ModerationVerdict;
pub use passage::{EmbeddingVector, RetrievedPassage, VectorMetadata};
pub use query::{Query, QueryRequest};
