//! Moderation gate run before any paid work

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::ModerationProvider;
use crate::types::ModerationVerdict;

/// Rejects policy-violating questions
#[derive(Clone)]
pub struct ModerationGate {
    provider: Arc<dyn ModerationProvider>,
}

impl ModerationGate {
    pub fn new(provider: Arc<dyn ModerationProvider>) -> Self {
        Self { provider }
    }

    /// Classify `text` without deciding anything
    pub async fn check(&self, text: &str) -> Result<ModerationVerdict> {
        self.provider.moderate(text).await
    }

    /// Classify `text` and fail with a user error if it is flagged
    pub async fn enforce(&self, text: &str) -> Result<ModerationVerdict> {
        let verdict = self.check(text).await?;
        if verdict.flagged {
            tracing::info!(
                "Question flagged by {}: {:?}",
                self.provider.name(),
                verdict.flagged_categories()
            );
            return Err(Error::user_with_data("Flagged content", verdict.to_details()));
        }
        Ok(verdict)
    }
}
