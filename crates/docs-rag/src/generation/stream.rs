//! Streamed completions
//!
//! Generated text flows from the provider task to the HTTP body through a
//! bounded channel; when the consumer stops reading, the producer blocks.

use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::providers::{CompletionRequest, LlmProvider};

/// Ordered stream of generated text chunks
pub struct CompletionStream {
    inner: ReceiverStream<Result<String>>,
}

/// Producer half of a [`CompletionStream`]
#[derive(Clone)]
pub struct ChunkSender {
    tx: mpsc::Sender<Result<String>>,
}

impl CompletionStream {
    /// Create a connected sender/stream pair holding at most `buffer` chunks
    pub fn channel(buffer: usize) -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            ChunkSender { tx },
            Self {
                inner: ReceiverStream::new(rx),
            },
        )
    }

    /// Drain the stream into one string, stopping at the first error
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

impl Stream for CompletionStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl ChunkSender {
    /// Forward a chunk; waits while the buffer is full.
    ///
    /// Returns `false` once the consumer is gone.
    pub async fn send(&self, chunk: impl Into<String>) -> bool {
        self.tx.send(Ok(chunk.into())).await.is_ok()
    }

    /// Terminate the stream with an error
    pub async fn fail(&self, error: Error) {
        let _ = self.tx.send(Err(error)).await;
    }

    /// True once the consumer dropped the stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Submits prompts with fixed generation parameters
pub struct CompletionStreamer {
    llm: Arc<dyn LlmProvider>,
    config: GenerationConfig,
}

impl CompletionStreamer {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        Self { llm, config }
    }

    /// Build the provider request for a prompt
    pub fn request_for(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            buffer: self.config.stream_buffer,
        }
    }

    /// Start generating an answer for `prompt`
    pub async fn stream_completion(&self, prompt: &str) -> Result<CompletionStream> {
        tracing::info!(
            "Generating answer with {} (model: {})",
            self.llm.name(),
            self.config.model
        );
        self.llm.stream_completion(self.request_for(prompt)).await
    }
}
