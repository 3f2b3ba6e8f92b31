//! Request orchestration
//!
//! One question moves strictly forward through
//! `Received → Sanitized → Moderated → Embedded → Retrieved → ContextBuilt →
//! PromptBuilt → Streaming → Done`; any stage can end in `Aborted`.
//! Each stage waits only on its own collaborator call.

use futures_util::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::embeddings::Embedder;
use crate::error::Result;
use crate::generation::{CompletionStream, CompletionStreamer, PromptBuilder};
use crate::moderation::ModerationGate;
use crate::providers::ClientRegistry;
use crate::retrieval::{ContextAssembler, Retriever, TokenCounter};
use crate::types::Query;

/// Where a request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Sanitized,
    Moderated,
    Embedded,
    Retrieved,
    ContextBuilt,
    PromptBuilt,
    Streaming,
    Done,
    Aborted,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Sanitized => "sanitized",
            PipelineStage::Moderated => "moderated",
            PipelineStage::Embedded => "embedded",
            PipelineStage::Retrieved => "retrieved",
            PipelineStage::ContextBuilt => "context_built",
            PipelineStage::PromptBuilt => "prompt_built",
            PipelineStage::Streaming => "streaming",
            PipelineStage::Done => "done",
            PipelineStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Answers documentation questions
pub struct RagPipeline {
    registry: Arc<ClientRegistry>,
    token_counter: Arc<dyn TokenCounter>,
}

/// A started answer
pub struct Answer {
    /// Passages placed in the prompt
    pub passages_used: usize,
    /// Tokens counted for the context
    pub context_tokens: usize,
    /// The rendered prompt
    pub prompt: String,
    stream: CompletionStream,
}

impl RagPipeline {
    pub fn new(registry: Arc<ClientRegistry>, token_counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            registry,
            token_counter,
        }
    }

    /// Run every stage up to the start of streaming.
    ///
    /// Input is checked before any client is built, and clients are built
    /// before any network call.
    pub async fn answer(&self, raw: Option<&str>) -> Result<Answer> {
        let mut stage = PipelineStage::Received;
        let result = self.run(raw, &mut stage).await;
        if let Err(e) = &result {
            tracing::info!(
                "Pipeline aborted at stage {} ({})",
                stage,
                if e.is_user_error() { "user error" } else { "application error" }
            );
        }
        result
    }

    async fn run(&self, raw: Option<&str>, stage: &mut PipelineStage) -> Result<Answer> {
        let started = Instant::now();
        let config = self.registry.config();

        let query = Query::parse(raw)?;
        advance(stage, PipelineStage::Sanitized);

        let providers = self.registry.resolve().await?;

        ModerationGate::new(providers.moderation)
            .enforce(query.sanitized())
            .await?;
        advance(stage, PipelineStage::Moderated);

        let vector = Embedder::new(providers.embedding)
            .embed(query.sanitized())
            .await?;
        advance(stage, PipelineStage::Embedded);

        let passages = Retriever::new(providers.vector_store, config.vector_index.namespace.clone())
            .retrieve(&vector, config.vector_index.top_k)
            .await?;
        advance(stage, PipelineStage::Retrieved);

        let context = ContextAssembler::new(self.token_counter.clone(), config.context.token_budget)
            .assemble(&passages);
        tracing::debug!(
            "Context uses {}/{} passages, {} tokens",
            context.included,
            passages.len(),
            context.tokens
        );
        advance(stage, PipelineStage::ContextBuilt);

        let prompt = PromptBuilder::build_prompt(&context.text, query.sanitized());
        advance(stage, PipelineStage::PromptBuilt);

        let stream = CompletionStreamer::new(providers.llm, config.generation.clone())
            .stream_completion(&prompt)
            .await?;
        advance(stage, PipelineStage::Streaming);

        tracing::info!(
            "Streaming answer after {:?} ({} passages in context)",
            started.elapsed(),
            context.included
        );

        Ok(Answer {
            passages_used: context.included,
            context_tokens: context.tokens,
            prompt,
            stream,
        })
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    tracing::debug!("Pipeline stage {} -> {}", stage, next);
    *stage = next;
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Answer")
            .field("passages_used", &self.passages_used)
            .field("context_tokens", &self.context_tokens)
            .field("prompt_len", &self.prompt.len())
            .finish_non_exhaustive()
    }
}

impl Answer {
    /// Chunk stream that logs when the answer finishes or breaks off
    pub fn into_stream(self) -> AnswerStream {
        AnswerStream {
            inner: self.stream,
            chunks: 0,
            finished: false,
        }
    }

    /// Drain the whole answer into a string
    pub async fn collect_text(self) -> Result<String> {
        self.stream.collect_text().await
    }
}

/// Stream of answer chunks
pub struct AnswerStream {
    inner: CompletionStream,
    chunks: usize,
    finished: bool,
}

impl Stream for AnswerStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        let polled = Pin::new(&mut self.inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(_))) => self.chunks += 1,
            Poll::Ready(Some(Err(e))) => {
                tracing::error!(
                    "Answer stream failed after {} chunks (stage {}): {}",
                    self.chunks,
                    PipelineStage::Aborted,
                    e
                );
                self.finished = true;
            }
            Poll::Ready(None) => {
                tracing::info!(
                    "Pipeline stage {} ({} chunks streamed)",
                    PipelineStage::Done,
                    self.chunks
                );
                self.finished = true;
            }
            Poll::Pending => {}
        }
        polled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::error::Error;
    use crate::providers::{
        CompletionRequest, EmbeddingProvider, LlmProvider, ModerationProvider, Providers,
        VectorStoreProvider,
    };
    use crate::retrieval::ApproxTokenCounter;
    use crate::types::{EmbeddingVector, ModerationVerdict, RetrievedPassage};
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Calls(Mutex<Vec<&'static str>>);

    impl Calls {
        fn push(&self, name: &'static str) {
            self.0.lock().push(name);
        }
        fn list(&self) -> Vec<&'static str> {
            self.0.lock().clone()
        }
    }

    struct Fake {
        calls: Arc<Calls>,
        flagged: bool,
        passages: Vec<RetrievedPassage>,
        prompt: Mutex<Option<String>>,
    }

    #[async_trait]
    impl ModerationProvider for Fake {
        async fn moderate(&self, _text: &str) -> Result<ModerationVerdict> {
            self.calls.push("moderate");
            Ok(ModerationVerdict {
                flagged: self.flagged,
                ..Default::default()
            })
        }
        fn name(&self) -> &str {
            "fake"
        }
    }

    #[async_trait]
    impl EmbeddingProvider for Fake {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.push("embed");
            Ok(vec![0.5; 8])
        }
        fn dimensions(&self) -> usize {
            8
        }
        fn name(&self) -> &str {
            "fake"
        }
    }

    #[async_trait]
    impl VectorStoreProvider for Fake {
        async fn query(&self, _v: &[f32], _k: usize, _ns: &str) -> Result<Vec<RetrievedPassage>> {
            self.calls.push("query");
            Ok(self.passages.clone())
        }
        async fn upsert(&self, v: &[EmbeddingVector], _ns: &str) -> Result<usize> {
            Ok(v.len())
        }
        fn name(&self) -> &str {
            "fake"
        }
    }

    #[async_trait]
    impl LlmProvider for Fake {
        async fn stream_completion(&self, request: CompletionRequest) -> Result<CompletionStream> {
            self.calls.push("complete");
            *self.prompt.lock() = Some(request.prompt);
            let (tx, stream) = CompletionStream::channel(request.buffer);
            tokio::spawn(async move {
                for chunk in ["Use ", "`soroban contract invoke`", "."] {
                    if !tx.send(chunk).await {
                        break;
                    }
                }
            });
            Ok(stream)
        }
        fn name(&self) -> &str {
            "fake"
        }
    }

    fn pipeline(fake: Arc<Fake>) -> RagPipeline {
        let providers = Providers {
            moderation: fake.clone(),
            embedding: fake.clone(),
            vector_store: fake.clone(),
            llm: fake,
        };
        let registry = ClientRegistry::with_providers(Arc::new(RagConfig::default()), providers);
        RagPipeline::new(Arc::new(registry), Arc::new(ApproxTokenCounter))
    }

    fn fake(flagged: bool, passages: Vec<RetrievedPassage>) -> Arc<Fake> {
        Arc::new(Fake {
            calls: Arc::new(Calls::default()),
            flagged,
            passages,
            prompt: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let f = fake(false, vec![RetrievedPassage::new("Invoke with the CLI.", 0.9)]);
        let answer = pipeline(f.clone())
            .answer(Some("  How to invoke a smart contract in Soroban?  "))
            .await
            .unwrap();

        assert_eq!(answer.passages_used, 1);
        assert!(answer.prompt.contains("Invoke with the CLI.\n---\n"));
        assert!(answer.prompt.contains("How to invoke a smart contract in Soroban?"));

        let text = answer.collect_text().await.unwrap();
        assert_eq!(text, "Use `soroban contract invoke`.");
        assert_eq!(f.calls.list(), vec!["moderate", "embed", "query", "complete"]);
    }

    #[tokio::test]
    async fn test_blank_question_makes_no_calls() {
        let f = fake(false, vec![]);
        let err = pipeline(f.clone()).answer(Some("   ")).await.err().unwrap();
        assert!(err.is_user_error());
        assert!(f.calls.list().is_empty());
    }

    #[tokio::test]
    async fn test_flagged_question_stops_after_moderation() {
        let f = fake(true, vec![]);
        let err = pipeline(f.clone()).answer(Some("something awful")).await.err().unwrap();
        assert!(matches!(err, Error::User { .. }));
        assert_eq!(f.calls.list(), vec!["moderate"]);
    }

    #[tokio::test]
    async fn test_no_passages_still_answers() {
        let f = fake(false, vec![]);
        let answer = pipeline(f.clone()).answer(Some("What is Soroban?")).await.unwrap();
        assert_eq!(answer.passages_used, 0);
        assert!(answer.prompt.contains("What is Soroban?"));
        assert!(f.prompt.lock().is_some());
    }

    #[tokio::test]
    async fn test_answer_stream_yields_chunks_in_order() {
        let f = fake(false, vec![]);
        let answer = pipeline(f).answer(Some("q")).await.unwrap();
        let chunks: Vec<String> = answer
            .into_stream()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Use ", "`soroban contract invoke`", "."]);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::ContextBuilt.to_string(), "context_built");
        assert_eq!(PipelineStage::Aborted.to_string(), "aborted");
    }
}
