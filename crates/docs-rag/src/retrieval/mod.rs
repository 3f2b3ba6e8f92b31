//! Retrieval and context budgeting

pub mod context;
pub mod search;
pub mod tokenizer;

pub use context::{AssembledContext, ContextAssembler, PASSAGE_SEPARATOR};
pub use search::Retriever;
pub use tokenizer::{
    token_counter, ApproxTokenCounter, Gpt3TokenCounter, HfTokenCounter, TokenCounter,
};
