//! Configuration for the docs RAG service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_PATH_ENV: &str = "DOCS_RAG_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI credentials (moderation, embeddings, completions)
    pub openai: OpenAiConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector index configuration
    pub vector_index: VectorIndexConfig,
    /// Context assembly configuration
    pub context: ContextConfig,
    /// Completion configuration
    pub generation: GenerationConfig,
}

impl RagConfig {
    /// Load configuration: TOML file from `DOCS_RAG_CONFIG` (if set), then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read configuration from a TOML file; missing sections fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Overlay values from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = get("PINECONE_API_KEY") {
            self.vector_index.api_key = Some(v);
        }
        if let Some(v) = get("PINECONE_INDEX") {
            self.vector_index.index_name = Some(v);
        }
        if let Some(v) = get("PINECONE_ENVIRONMENT") {
            self.vector_index.environment = Some(v);
        }
        if let Some(v) = get("PINECONE_PROJECT_ID") {
            self.vector_index.project_id = Some(v);
        }
        if let Some(v) = get("PINECONE_INDEX_HOST") {
            self.vector_index.index_host = Some(v);
        }
        if let Some(v) = get("PINECONE_NAMESPACE") {
            self.vector_index.namespace = v;
        }
        if let Some(v) = get("EMBEDDING_BACKEND") {
            match v.to_lowercase().as_str() {
                "openai" => self.embeddings.backend = EmbeddingBackend::OpenAi,
                "onnx" if self.embeddings.backend != EmbeddingBackend::Onnx => {
                    let cache_dir = std::mem::take(&mut self.embeddings.cache_dir);
                    self.embeddings = EmbeddingConfig {
                        cache_dir,
                        ..EmbeddingConfig::minilm()
                    };
                }
                "onnx" => {}
                other => tracing::warn!("Ignoring unknown EMBEDDING_BACKEND '{}'", other),
            }
        }
        if let Some(v) = get("CONTEXT_TOKENIZER_PATH") {
            self.context.tokenizer_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            match v.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT '{}'", v),
            }
        }
    }

    /// Check every value a request needs, without touching the network.
    pub fn validate(&self) -> Result<()> {
        self.openai.require_api_key()?;
        if self.embeddings.backend == EmbeddingBackend::Onnx && !cfg!(feature = "onnx") {
            return Err(Error::Config(
                "ONNX embedding backend selected but the onnx feature is not enabled".to_string(),
            ));
        }
        self.vector_index.require_api_key()?;
        self.vector_index.resolve_host()?;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_request_size: 64 * 1024,
        }
    }
}

/// OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (`OPENAI_KEY`)
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Moderation model
    pub moderation_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            moderation_model: "text-moderation-latest".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    /// The API key, or a configuration error naming the missing variable
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config("Missing environment variable OPENAI_KEY"))
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI embeddings API
    #[default]
    OpenAi,
    /// Local ONNX sentence-transformer (requires the `onnx` feature)
    Onnx,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend used for query embeddings
    pub backend: EmbeddingBackend,
    /// Model to use
    pub model: String,
    /// Embedding dimensions (1536 for ada-002, 384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for offline embedding
    pub batch_size: usize,
    /// Maximum sequence length (ONNX backend)
    pub max_length: usize,
    /// Cache directory for ONNX models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::OpenAi,
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            batch_size: 100,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("docs-rag")
                .join("models"),
        }
    }
}

impl EmbeddingConfig {
    /// Settings for the local MiniLM backend
    pub fn minilm() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            ..Self::default()
        }
    }
}

/// Vector index (Pinecone) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// API key (`PINECONE_API_KEY`)
    pub api_key: Option<String>,
    /// Index name (`PINECONE_INDEX`)
    pub index_name: Option<String>,
    /// Environment, e.g. "us-central1-gcp"
    pub environment: Option<String>,
    /// Project id, used with `environment` to derive the index host
    pub project_id: Option<String>,
    /// Full index host; overrides the derived one
    pub index_host: Option<String>,
    /// Namespace queried inside the index
    pub namespace: String,
    /// Number of passages to retrieve per query
    pub top_k: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: None,
            environment: None,
            project_id: None,
            index_host: None,
            namespace: "default".to_string(),
            top_k: 10,
            timeout_secs: 30,
        }
    }
}

impl VectorIndexConfig {
    /// The API key, or a configuration error
    pub fn require_api_key(&self) -> Result<&str> {
        non_empty(&self.api_key)
            .ok_or_else(|| Error::config("Missing environment variable PINECONE_API_KEY"))
    }

    /// Base URL of the index data plane
    pub fn resolve_host(&self) -> Result<String> {
        let index = non_empty(&self.index_name)
            .ok_or_else(|| Error::config("Missing environment variable PINECONE_INDEX"))?;

        if let Some(host) = non_empty(&self.index_host) {
            let host = host.trim_end_matches('/');
            return Ok(if host.starts_with("http://") || host.starts_with("https://") {
                host.to_string()
            } else {
                format!("https://{}", host)
            });
        }

        match (non_empty(&self.project_id), non_empty(&self.environment)) {
            (Some(project), Some(env)) => Ok(format!(
                "https://{}-{}.svc.{}.pinecone.io",
                index, project, env
            )),
            _ => Err(Error::config(
                "Pinecone index host is not configured (set PINECONE_INDEX_HOST, or \
                 PINECONE_PROJECT_ID and PINECONE_ENVIRONMENT)",
            )),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Token ceiling for the assembled context
    pub token_budget: usize,
    /// HuggingFace `tokenizer.json` used to count tokens; GPT-3 BPE without it
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: 1500,
            tokenizer_path: None,
        }
    }
}

/// Completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Chat model
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the answer
    pub max_tokens: u32,
    /// Chunks buffered between the provider and the HTTP body
    pub stream_buffer: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            stream_buffer: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn complete_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("OPENAI_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
            ("PINECONE_INDEX", "soroban-docs"),
            ("PINECONE_ENVIRONMENT", "us-central1-gcp"),
            ("PINECONE_PROJECT_ID", "abc123"),
        ])
    }

    fn config_from(env: &HashMap<&'static str, &'static str>) -> RagConfig {
        let mut config = RagConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        config
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.context.token_budget, 1500);
        assert_eq!(config.vector_index.top_k, 10);
        assert_eq!(config.vector_index.namespace, "default");
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.generation.max_tokens, 512);
        assert_eq!(config.generation.temperature, 0.0);
    }

    #[test]
    fn test_env_overlay_validates() {
        let config = config_from(&complete_env());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.vector_index.resolve_host().unwrap(),
            "https://soroban-docs-abc123.svc.us-central1-gcp.pinecone.io"
        );
    }

    #[test]
    fn test_missing_index_name_is_config_error() {
        let mut env = complete_env();
        env.remove("PINECONE_INDEX");
        let err = config_from(&env).validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("PINECONE_INDEX")));
    }

    #[test]
    fn test_blank_openai_key_is_missing() {
        let mut env = complete_env();
        env.insert("OPENAI_KEY", "   ");
        let err = config_from(&env).validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("OPENAI_KEY")));
    }

    #[test]
    fn test_index_host_override() {
        let mut env = complete_env();
        env.remove("PINECONE_ENVIRONMENT");
        env.insert("PINECONE_INDEX_HOST", "docs-xyz.svc.pinecone.io/");
        let config = config_from(&env);
        assert_eq!(
            config.vector_index.resolve_host().unwrap(),
            "https://docs-xyz.svc.pinecone.io"
        );
    }

    #[test]
    fn test_onnx_backend_switches_model() {
        let mut env = complete_env();
        env.insert("EMBEDDING_BACKEND", "ONNX");
        let config = config_from(&env);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Onnx);
        assert_eq!(config.embeddings.model, "all-MiniLM-L6-v2");
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.embeddings.cache_dir, EmbeddingConfig::default().cache_dir);
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[context]
token_budget = 2000

[vector_index]
index_name = "soroban-docs"
namespace = "v2"
"#
        )
        .unwrap();

        let config = RagConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.context.token_budget, 2000);
        assert_eq!(config.vector_index.index_name.as_deref(), Some("soroban-docs"));
        assert_eq!(config.vector_index.namespace, "v2");
        assert_eq!(config.vector_index.top_k, 10);
    }
}
