//! Context window assembly
//!
//! Passages are packed greedily in rank order while the running token count
//! stays under the budget. The first passage that would reach the budget ends
//! assembly; later, smaller passages are not tried.

use std::sync::Arc;

use super::tokenizer::TokenCounter;
use crate::types::RetrievedPassage;

/// Separator appended after every included passage
pub const PASSAGE_SEPARATOR: &str = "\n---\n";

/// Packs retrieved passages under a token budget
#[derive(Clone)]
pub struct ContextAssembler {
    counter: Arc<dyn TokenCounter>,
    token_budget: usize,
}

/// Assembled context and what went into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    /// Concatenated passages, each followed by the separator
    pub text: String,
    /// Tokens counted for the included passages
    pub tokens: usize,
    /// Number of leading passages included
    pub included: usize,
}

impl ContextAssembler {
    pub fn new(counter: Arc<dyn TokenCounter>, token_budget: usize) -> Self {
        Self {
            counter,
            token_budget,
        }
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Build the context string for passages in rank order
    pub fn assemble(&self, passages: &[RetrievedPassage]) -> AssembledContext {
        let mut context = AssembledContext::default();

        for passage in passages {
            let tokens = self.counter.count(&passage.text);
            if context.tokens + tokens >= self.token_budget {
                tracing::debug!(
                    "Context budget reached after {} passages ({} + {} >= {})",
                    context.included,
                    context.tokens,
                    tokens,
                    self.token_budget
                );
                break;
            }

            context.tokens += tokens;
            context.text.push_str(passage.text.trim());
            context.text.push_str(PASSAGE_SEPARATOR);
            context.included += 1;
        }

        context
    }
}
