//! LLM provider trait for streamed answer generation

use async_trait::async_trait;
use crate::error::Result;
use crate::generation::CompletionStream;

/// A single completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Fully rendered prompt
    pub prompt: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the answer
    pub max_tokens: u32,
    /// Capacity of the chunk channel handed back to the caller
    pub buffer: usize,
}

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OpenAiClient`: OpenAI chat completions with server-sent events
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Start a streamed completion.
    ///
    /// Errors returned here happen before any text is produced; failures after
    /// that arrive as the last item of the stream.
    async fn stream_completion(&self, request: CompletionRequest) -> Result<CompletionStream>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
