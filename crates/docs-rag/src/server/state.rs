//! Application state for the docs RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::pipeline::RagPipeline;
use crate::providers::ClientRegistry;
use crate::retrieval::{token_counter, TokenCounter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Lazily-built collaborator clients
    registry: Arc<ClientRegistry>,
    /// Question answering pipeline
    pipeline: RagPipeline,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state whose clients are built from `config` on first request.
    ///
    /// Only the token counter is loaded eagerly; credentials are checked later.
    pub fn new(config: RagConfig) -> Result<Self> {
        let counter = token_counter(&config.context)?;
        let registry = Arc::new(ClientRegistry::new(Arc::new(config)));
        Ok(Self::with_registry(registry, counter))
    }

    /// Create state around an existing registry
    pub fn with_registry(registry: Arc<ClientRegistry>, counter: Arc<dyn TokenCounter>) -> Self {
        let pipeline = RagPipeline::new(registry.clone(), counter);

        Self {
            inner: Arc::new(AppStateInner {
                registry,
                pipeline,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.inner.registry.config()
    }

    /// Get client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.inner.registry
    }

    /// Get the answering pipeline
    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_require_credentials() {
        let state = AppState::new(RagConfig::default()).unwrap();
        assert!(state.is_ready());
        assert_eq!(state.config().context.token_budget, 1500);
    }

    #[test]
    fn test_ready_flag() {
        let state = AppState::new(RagConfig::default()).unwrap();
        let clone = state.clone();
        state.set_ready(false);
        assert!(!clone.is_ready());
    }
}
