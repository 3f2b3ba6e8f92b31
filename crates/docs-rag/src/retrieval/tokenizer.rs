//! Token counting for context budgeting

use std::path::Path;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tokenizers::Tokenizer;

use crate::config::ContextConfig;
use crate::error::{Error, Result};

/// Counts tokens the way the completion model would
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Exact counts from a HuggingFace `tokenizer.json`
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            Error::Config(format!("Failed to load tokenizer {}: {}", path.display(), e))
        })?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                tracing::warn!("Tokenization failed, falling back to estimate: {}", e);
                ApproxTokenCounter.count(text)
            }
        }
    }
}

/// Exact counts with the GPT-3 BPE vocabulary (`r50k_base`)
pub struct Gpt3TokenCounter {
    bpe: CoreBPE,
}

impl Gpt3TokenCounter {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::r50k_base()
            .map_err(|e| Error::Internal(format!("Failed to load GPT-3 BPE ranks: {}", e)))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for Gpt3TokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Byte-length estimate, roughly four bytes per BPE token
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }
}

/// Pick the counter for a context configuration
pub fn token_counter(config: &ContextConfig) -> Result<Arc<dyn TokenCounter>> {
    match &config.tokenizer_path {
        Some(path) => {
            tracing::info!("Counting context tokens with {}", path.display());
            Ok(Arc::new(HfTokenCounter::from_file(path)?))
        }
        None => match Gpt3TokenCounter::new() {
            Ok(counter) => {
                tracing::info!("Counting context tokens with GPT-3 BPE");
                Ok(Arc::new(counter))
            }
            Err(e) => {
                tracing::warn!("{}; estimating context tokens instead", e);
                Ok(Arc::new(ApproxTokenCounter))
            }
        },
    }
}
