//! In-process collaborators that record every call

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docs_rag::generation::CompletionStream;
use docs_rag::providers::{
    ClientRegistry, CompletionRequest, EmbeddingProvider, LlmProvider, ModerationProvider,
    Providers, VectorStoreProvider,
};
use docs_rag::retrieval::TokenCounter;
use docs_rag::server::{state::AppState, RagServer};
use docs_rag::{EmbeddingVector, Error, ModerationVerdict, RagConfig, Result, RetrievedPassage};

pub const DIMENSIONS: usize = 8;

/// One token per whitespace-separated word
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

pub fn words(n: usize, word: &str) -> String {
    vec![word; n].join(" ")
}

/// How the fake completion behaves
#[derive(Clone)]
pub enum Completion {
    Chunks(Vec<&'static str>),
    /// Some chunks, then a transport failure
    BreaksAfter(Vec<&'static str>),
    /// Provider rejects the request before streaming
    Rejected,
}

pub struct FakeServices {
    pub moderation_calls: AtomicUsize,
    pub embed_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub completion_calls: AtomicUsize,

    pub verdict: Mutex<Result<ModerationVerdict>>,
    pub passages: Vec<RetrievedPassage>,
    pub completion: Completion,

    pub moderated_text: Mutex<Option<String>>,
    pub embedded_text: Mutex<Option<String>>,
    pub prompt: Mutex<Option<String>>,
}

impl FakeServices {
    pub fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            moderation_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
            verdict: Mutex::new(Ok(ModerationVerdict::clean())),
            passages,
            completion: Completion::Chunks(vec!["## Invoking\n", "Run `soroban contract invoke`", "."]),
            moderated_text: Mutex::new(None),
            embedded_text: Mutex::new(None),
            prompt: Mutex::new(None),
        }
    }

    pub fn flagging() -> Self {
        let fake = Self::new(vec![]);
        *fake.verdict.lock() = Ok(ModerationVerdict {
            flagged: true,
            categories: BTreeMap::from([
                ("harassment".to_string(), true),
                ("violence".to_string(), false),
            ]),
            category_scores: BTreeMap::from([
                ("harassment".to_string(), 0.88),
                ("violence".to_string(), 0.03),
            ]),
        });
        fake
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    pub fn downstream_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
            + self.query_calls.load(Ordering::SeqCst)
            + self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.moderation_calls.load(Ordering::SeqCst) + self.downstream_calls()
    }

    pub fn prompt(&self) -> String {
        self.prompt.lock().clone().unwrap_or_default()
    }
}

#[async_trait]
impl ModerationProvider for FakeServices {
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict> {
        self.moderation_calls.fetch_add(1, Ordering::SeqCst);
        *self.moderated_text.lock() = Some(text.to_string());
        match &*self.verdict.lock() {
            Ok(verdict) => Ok(verdict.clone()),
            Err(e) => Err(Error::moderation(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "fake-moderation"
    }
}

#[async_trait]
impl EmbeddingProvider for FakeServices {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        *self.embedded_text.lock() = Some(text.to_string());
        Ok(vec![0.25; DIMENSIONS])
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn name(&self) -> &str {
        "fake-embedding"
    }
}

#[async_trait]
impl VectorStoreProvider for FakeServices {
    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        _namespace: &str,
    ) -> Result<Vec<RetrievedPassage>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, vectors: &[EmbeddingVector], _namespace: &str) -> Result<usize> {
        Ok(vectors.len())
    }

    fn name(&self) -> &str {
        "fake-index"
    }
}

#[async_trait]
impl LlmProvider for FakeServices {
    async fn stream_completion(&self, request: CompletionRequest) -> Result<CompletionStream> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        *self.prompt.lock() = Some(request.prompt.clone());

        let (chunks, breaks) = match &self.completion {
            Completion::Chunks(chunks) => (chunks.clone(), false),
            Completion::BreaksAfter(chunks) => (chunks.clone(), true),
            Completion::Rejected => {
                return Err(Error::llm_with_payload(
                    "Failed to generate completion (HTTP 429)",
                    serde_json::json!({ "error": { "message": "Rate limit reached" } }),
                ))
            }
        };

        let (tx, stream) = CompletionStream::channel(request.buffer);
        tokio::spawn(async move {
            for chunk in chunks {
                if !tx.send(chunk).await {
                    return;
                }
            }
            if breaks {
                tx.fail(Error::llm("Stream error: connection reset")).await;
            }
        });
        Ok(stream)
    }

    fn name(&self) -> &str {
        "fake-llm"
    }
}

pub fn registry(config: RagConfig, fake: &Arc<FakeServices>) -> Arc<ClientRegistry> {
    let providers = Providers {
        moderation: fake.clone(),
        embedding: fake.clone(),
        vector_store: fake.clone(),
        llm: fake.clone(),
    };
    Arc::new(ClientRegistry::with_providers(Arc::new(config), providers))
}

pub fn router_with(config: RagConfig, fake: &Arc<FakeServices>) -> Router {
    let state = AppState::with_registry(registry(config, fake), Arc::new(WordCounter));
    RagServer::with_state(state).router()
}

pub fn router(fake: &Arc<FakeServices>) -> Router {
    router_with(RagConfig::default(), fake)
}
