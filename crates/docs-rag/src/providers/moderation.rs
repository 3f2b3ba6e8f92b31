//! Moderation provider trait for classifying user input

use async_trait::async_trait;
use crate::error::Result;
use crate::types::ModerationVerdict;

/// Trait for content moderation
///
/// Implementations:
/// - `OpenAiClient`: OpenAI moderation endpoint
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Classify a piece of text
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
