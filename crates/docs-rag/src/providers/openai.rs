//! OpenAI client for moderation, embeddings and streamed chat completions

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{EmbeddingConfig, OpenAiConfig};
use crate::error::{Error, Result};
use crate::generation::{ChunkSender, CompletionStream, SseDecoder, SseEvent};
use crate::types::ModerationVerdict;

use super::embedding::EmbeddingProvider;
use super::llm::{CompletionRequest, LlmProvider};
use super::moderation::ModerationProvider;

/// OpenAI API client
pub struct OpenAiClient {
    /// HTTP client with auth headers
    client: Client,
    /// API base URL, without trailing slash
    base_url: String,
    moderation_model: String,
    embedding_model: String,
    dimensions: usize,
    /// Per-request timeout for non-streaming calls
    timeout: Duration,
}

impl OpenAiClient {
    /// Create a client; fails if the API key is missing. No request is sent.
    pub fn new(openai: &OpenAiConfig, embeddings: &EmbeddingConfig) -> Result<Self> {
        let api_key = openai.require_api_key()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| Error::config("OPENAI_KEY contains invalid header characters"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            moderation_model: openai.moderation_model.clone(),
            embedding_model: embeddings.model.clone(),
            dimensions: embeddings.dimensions,
            timeout: Duration::from_secs(openai.timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Read an error body, keeping it as JSON when possible
    async fn error_payload(response: reqwest::Response) -> serde_json::Value {
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body))
    }
}

#[derive(Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, Option<bool>>,
    #[serde(default)]
    category_scores: BTreeMap<String, Option<f64>>,
}

impl From<ModerationResult> for ModerationVerdict {
    fn from(result: ModerationResult) -> Self {
        Self {
            flagged: result.flagged,
            categories: result
                .categories
                .into_iter()
                .map(|(name, hit)| (name, hit.unwrap_or(false)))
                .collect(),
            category_scores: result
                .category_scores
                .into_iter()
                .filter_map(|(name, score)| score.map(|s| (name, s)))
                .collect(),
        }
    }
}

/// Decode a moderation response body into a verdict
pub fn parse_moderation(body: &[u8]) -> Result<ModerationVerdict> {
    let response: ModerationResponse = serde_json::from_slice(body)
        .map_err(|e| Error::Moderation(format!("Failed to parse moderation response: {}", e)))?;

    response
        .results
        .into_iter()
        .next()
        .map(ModerationVerdict::from)
        .ok_or_else(|| Error::moderation("No result in moderation response"))
}

#[async_trait]
impl ModerationProvider for OpenAiClient {
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict> {
        let request = ModerationRequest {
            input: text,
            model: &self.moderation_model,
        };

        let response = self
            .client
            .post(self.url("moderations"))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Moderation(format!("Moderation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = Self::error_payload(response).await;
            return Err(Error::Moderation(format!("HTTP {} - {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Moderation(format!("Failed to read moderation response: {}", e)))?;
        parse_moderation(&bytes)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response = self
            .client
            .post(self.url("embeddings"))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = Self::error_payload(response).await;
            return Err(Error::Embedding(format!(
                "Failed to create embedding ({}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::embedding("No embedding in response"))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the text delta from one `data:` payload
pub fn parse_chat_chunk(payload: &str) -> Result<Option<String>> {
    let chunk: ChatChunk = serde_json::from_str(payload)
        .map_err(|e| Error::llm(format!("Malformed completion chunk: {}", e)))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|text| !text.is_empty()))
}

/// Pump an SSE body into the chunk channel until `[DONE]`, error, or a dropped consumer
async fn forward_events<S, B>(mut body: S, tx: ChunkSender)
where
    S: futures_util::Stream<Item = std::result::Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut decoder = SseDecoder::new();

    while let Some(item) = body.next().await {
        let bytes = match item {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Completion stream interrupted: {}", e);
                tx.fail(Error::llm(format!("Stream error: {}", e))).await;
                return;
            }
        };

        for event in decoder.push(bytes.as_ref()) {
            if !forward_event(event, &tx).await {
                return;
            }
        }
    }

    if let Some(event) = decoder.finish() {
        forward_event(event, &tx).await;
    }
}

/// Returns false when forwarding should stop
async fn forward_event(event: SseEvent, tx: &ChunkSender) -> bool {
    match event {
        SseEvent::Done => false,
        SseEvent::Data(payload) => match parse_chat_chunk(&payload) {
            Ok(Some(text)) => tx.send(text).await,
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("{}", e);
                tx.fail(e).await;
                false
            }
        },
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn stream_completion(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let payload = Self::error_payload(response).await;
            return Err(Error::llm_with_payload(
                format!("Failed to generate completion (HTTP {})", status),
                payload,
            ));
        }

        let (tx, stream) = CompletionStream::channel(request.buffer);
        let bytes = response.bytes_stream();
        tokio::spawn(async move {
            forward_events(Box::pin(bytes), tx).await;
        });

        Ok(stream)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Body = futures_util::stream::Iter<
        std::vec::IntoIter<std::result::Result<&'static [u8], reqwest::Error>>,
    >;

    fn body_of(parts: &[&'static str]) -> Body {
        let items: Vec<_> = parts.iter().map(|p| Ok(p.as_bytes())).collect();
        futures_util::stream::iter(items)
    }

    #[test]
    fn test_parse_moderation_flagged() {
        let body = br#"{
            "id": "modr-1",
            "model": "text-moderation-007",
            "results": [{
                "flagged": true,
                "categories": {"violence": true, "hate": false, "illicit": null},
                "category_scores": {"violence": 0.91, "hate": 0.01, "illicit": null}
            }]
        }"#;

        let verdict = parse_moderation(body).unwrap();
        assert!(verdict.flagged);
        assert_eq!(verdict.flagged_categories(), vec!["violence"]);
        assert_eq!(verdict.categories.get("illicit"), Some(&false));
        assert_eq!(verdict.category_scores.get("violence"), Some(&0.91));
        assert!(!verdict.category_scores.contains_key("illicit"));
    }

    #[test]
    fn test_parse_moderation_rejects_malformed() {
        let err = parse_moderation(br#"{"results": []}"#).unwrap_err();
        assert!(matches!(err, Error::Moderation(_)));

        let err = parse_moderation(br#"{"error": {"message": "nope"}}"#).unwrap_err();
        assert!(matches!(err, Error::Moderation(_)));
    }

    #[test]
    fn test_parse_chat_chunk() {
        let text = parse_chat_chunk(r#"{"choices":[{"delta":{"content":"Hello"},"index":0}]}"#).unwrap();
        assert_eq!(text.as_deref(), Some("Hello"));

        let role_only = parse_chat_chunk(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(role_only, None);

        let finish = parse_chat_chunk(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(finish, None);

        assert!(parse_chat_chunk(r#"{"error":{"message":"overloaded"}}"#).is_err());
    }

    #[tokio::test]
    async fn test_forward_events_until_done() {
        let body = body_of(&[
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"## Invoke\"}}]}\n\ndata: {\"choices\":[{\"del",
            "ta\":{\"content\":\" a contract\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]);

        let (tx, stream) = CompletionStream::channel(8);
        forward_events(body, tx).await;
        assert_eq!(stream.collect_text().await.unwrap(), "## Invoke a contract");
    }

    #[tokio::test]
    async fn test_forward_events_malformed_chunk_terminates() {
        let body = body_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n",
            "data: not json\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n",
        ]);

        let (tx, mut stream) = CompletionStream::channel(8);
        forward_events(body, tx).await;

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_new_requires_key() {
        let err = OpenAiClient::new(&OpenAiConfig::default(), &EmbeddingConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
