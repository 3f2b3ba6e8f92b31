//! Embedding generation
//!
//! [`Embedder`] validates and batches calls to any [`EmbeddingProvider`];
//! the local ONNX backend is available with the `onnx` feature.
//!
//! [`EmbeddingProvider`]: crate::providers::EmbeddingProvider

pub mod embedder;
#[cfg(feature = "onnx")]
pub mod onnx_embedder;

pub use embedder::Embedder;
#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;
