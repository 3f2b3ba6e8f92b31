//! Pinecone vector index provider
//!
//! Talks to the index data plane directly: `POST /query` for nearest neighbors
//! and `POST /vectors/upsert` for writes.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};
use crate::types::{EmbeddingVector, RetrievedPassage, VectorMetadata};

use super::vector_store::VectorStoreProvider;

/// Pinecone index client
pub struct PineconeIndex {
    client: Client,
    /// Data plane base URL
    host: String,
    index_name: String,
}

impl PineconeIndex {
    /// Create a client for the configured index.
    ///
    /// Fails when the key or index location is missing; no request is sent.
    pub fn new(config: &VectorIndexConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let host = config.resolve_host()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key).map_err(|_| {
                Error::config("PINECONE_API_KEY contains invalid header characters")
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host,
            index_name: config.index_name.clone().unwrap_or_default(),
        })
    }

    /// Data plane base URL
    pub fn host(&self) -> &str {
        &self.host
    }

    async fn check_status(&self, response: reqwest::Response, op: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::VectorDb(format!(
                "Index '{}' not found at {}: {}",
                self.index_name, self.host, body
            )));
        }
        Err(Error::VectorDb(format!("{} failed: HTTP {} - {}", op, status, body)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Convert query matches into passages; a match without text is an error
fn matches_to_passages(matches: Vec<Match>) -> Result<Vec<RetrievedPassage>> {
    matches
        .into_iter()
        .map(|m| {
            let text = m
                .metadata
                .as_ref()
                .and_then(|meta| meta.get("text"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    Error::VectorDb(format!("Match '{}' has no text metadata", m.id))
                })?;
            Ok(RetrievedPassage::new(text, m.score))
        })
        .collect()
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: String,
    values: &'a [f32],
    metadata: &'a VectorMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[async_trait]
impl VectorStoreProvider for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<RetrievedPassage>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace,
        };

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::VectorDb(format!("Query request failed: {}", e)))?;
        let response = self.check_status(response, "Query").await?;

        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorDb(format!("Failed to parse query response: {}", e)))?;

        tracing::debug!(
            "Pinecone returned {} matches from namespace '{}'",
            result.matches.len(),
            namespace
        );
        matches_to_passages(result.matches)
    }

    async fn upsert(&self, vectors: &[EmbeddingVector], namespace: &str) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: vectors
                .iter()
                .map(|v| UpsertVector {
                    id: v.id.to_string(),
                    values: &v.values,
                    metadata: &v.metadata,
                })
                .collect(),
            namespace,
        };

        let response = self
            .client
            .post(format!("{}/vectors/upsert", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::VectorDb(format!("Upsert request failed: {}", e)))?;
        let response = self.check_status(response, "Upsert").await?;

        let result: UpsertResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorDb(format!("Failed to parse upsert response: {}", e)))?;

        tracing::info!(
            "Upserted {} vectors into {}/{}",
            result.upserted_count,
            self.index_name,
            namespace
        );
        Ok(result.upserted_count)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
