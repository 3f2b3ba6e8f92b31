//! Local sentence-transformer embeddings on ONNX Runtime
//!
//! Runs all-MiniLM-L6-v2 (384 dimensions) in-process, so ingestion and queries
//! can be embedded without an API key. Model files are fetched from
//! HuggingFace into the cache directory on first use.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

struct Model {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
}

/// ONNX sentence embedder
pub struct OnnxEmbedder {
    model: Arc<Model>,
    dimensions: usize,
    model_name: String,
}

impl OnnxEmbedder {
    /// Load the model, downloading it into `cache_dir` if needed
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Loading ONNX embedder: {}", config.model);

        let model_dir = config.cache_dir.join(&config.model);
        tokio::fs::create_dir_all(&model_dir)
            .await
            .map_err(|e| Error::Config(format!("Failed to create model cache: {}", e)))?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        fetch_artifact(&config.model, "onnx/model.onnx", &model_path).await?;
        fetch_artifact(&config.model, "tokenizer.json", &tokenizer_path).await?;

        let max_length = config.max_length;
        let model = tokio::task::spawn_blocking(move || -> Result<Model> {
            let session = Session::builder()
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.with_intra_threads(4))
                .and_then(|b| b.commit_from_file(&model_path))
                .map_err(|e| Error::Embedding(format!("Failed to load model: {}", e)))?;
            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Embedding(format!("Failed to load tokenizer: {}", e)))?;

            Ok(Model {
                session: Mutex::new(session),
                tokenizer,
                max_length,
            })
        })
        .await
        .map_err(|e| Error::Internal(format!("Model loading task failed: {}", e)))??;

        tracing::info!("ONNX embedder ready ({} dimensions)", config.dimensions);

        Ok(Self {
            model: Arc::new(model),
            dimensions: config.dimensions,
            model_name: config.model.clone(),
        })
    }

    /// Embed several texts in one inference call
    pub async fn embed_many(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model.clone();
        tokio::task::spawn_blocking(move || model.infer(&texts))
            .await
            .map_err(|e| Error::Internal(format!("Embedding task failed: {}", e)))?
    }
}

impl Model {
    fn infer(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch = texts.len();
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("Tokenization failed: {}", e)))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut input_ids = vec![0i64; batch * seq_len];
        let mut attention_mask = vec![0i64; batch * seq_len];
        let mut token_type_ids = vec![0i64; batch * seq_len];

        for (row, encoding) in encodings.iter().enumerate() {
            let offset = row * seq_len;
            let ids = encoding.get_ids().iter().take(seq_len);
            let mask = encoding.get_attention_mask().iter();
            let types = encoding.get_type_ids().iter();
            for (col, ((id, m), t)) in ids.zip(mask).zip(types).enumerate() {
                input_ids[offset + col] = *id as i64;
                attention_mask[offset + col] = *m as i64;
                token_type_ids[offset + col] = *t as i64;
            }
        }

        let shape = vec![batch, seq_len];
        let tensor = |data: Vec<i64>, label: &str| {
            Tensor::from_array((shape.clone(), data.into_boxed_slice()))
                .map(|t| t.into_dyn())
                .map_err(|e| Error::Embedding(format!("Failed to build {} tensor: {}", label, e)))
        };
        let inputs = vec![
            ("input_ids", tensor(input_ids, "input_ids")?),
            ("attention_mask", tensor(attention_mask.clone(), "attention_mask")?),
            ("token_type_ids", tensor(token_type_ids, "token_type_ids")?),
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| Error::Embedding(format!("Inference failed: {}", e)))?;

        let named: Vec<_> = outputs.iter().collect();
        let hidden = named
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| named.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::embedding("Model produced no output"))?;
        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Embedding(format!("Failed to read output tensor: {}", e)))?;

        let hidden_size = shape.iter().nth(2).map(|&d| d as usize).unwrap_or(0);
        if hidden_size == 0 {
            return Err(Error::embedding("Output tensor has no hidden dimension"));
        }

        Ok(mean_pool(data, &attention_mask, batch, seq_len, hidden_size))
    }
}

/// Attention-masked mean over the sequence axis, then L2 normalization
fn mean_pool(
    hidden: &[f32],
    mask: &[i64],
    batch: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    (0..batch)
        .map(|row| {
            let mut pooled = vec![0.0f32; hidden_size];
            let mut weight = 0.0f32;

            for pos in 0..seq_len {
                let m = mask[row * seq_len + pos] as f32;
                if m == 0.0 {
                    continue;
                }
                let start = (row * seq_len + pos) * hidden_size;
                if let Some(token) = hidden.get(start..start + hidden_size) {
                    for (acc, v) in pooled.iter_mut().zip(token) {
                        *acc += v * m;
                    }
                    weight += m;
                }
            }

            if weight > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= weight);
            }
            let norm = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= norm);
            }
            pooled
        })
        .collect()
}

/// Download `file` of a sentence-transformers model unless already cached
async fn fetch_artifact(model: &str, file: &str, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Ok(());
    }

    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model, file
    );
    tracing::info!("Downloading {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Embedding(format!("Failed to download {}: {}", file, e)))?;
    if !response.status().is_success() {
        return Err(Error::Embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Embedding(format!("Failed to read {}: {}", file, e)))?;
    tokio::fs::write(dest, &bytes).await?;

    tracing::info!("Saved {} ({} bytes)", dest.display(), bytes.len());
    Ok(())
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_many(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
