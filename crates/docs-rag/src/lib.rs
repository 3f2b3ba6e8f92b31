//! docs-rag: retrieval-augmented documentation assistant
//!
//! A question is sanitized, moderated, embedded, matched against a vector
//! index of documentation sections, packed into a token-budgeted prompt and
//! answered by a streamed chat completion.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod moderation;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{Answer, PipelineStage, RagPipeline};
pub use types::{EmbeddingVector, ModerationVerdict, Query, QueryRequest, RetrievedPassage};
