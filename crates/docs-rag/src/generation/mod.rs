//! Answer generation: prompt templating and streamed completions

pub mod prompt;
pub mod sse;
pub mod stream;

pub use prompt::PromptBuilder;
pub use sse::{SseDecoder, SseEvent};
pub use stream::{ChunkSender, CompletionStream, CompletionStreamer};
