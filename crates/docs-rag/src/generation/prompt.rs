//! Prompt template for documentation answers

/// Persona and grounding rules placed at the top of every prompt
pub const INSTRUCTIONS: &str = "You are a very enthusiastic Soroban developer relations expert who loves \
to help people! Given the following sections from the Soroban documentation, answer the question \
using only that information, outputted in markdown format. If you are unsure and the answer is not \
explicitly written in the documentation, say \"Sorry, I don't know how to help with that.\"";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the prompt for a question and its assembled context.
    ///
    /// Pure templating: the same inputs always give the same prompt, and an
    /// empty context still yields a complete prompt.
    pub fn build_prompt(context: &str, question: &str) -> String {
        format!(
            r#"{instructions}

Context sections:
{context}

Question: """
{question}
"""

Answer as markdown (including related code snippets if available):"#,
            instructions = INSTRUCTIONS,
            context = context,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_sections_in_order() {
        let context = "Contracts are invoked with `soroban contract invoke`.\n---\n";
        let prompt = PromptBuilder::build_prompt(context, "How to invoke a smart contract in Soroban?");

        let instructions = prompt.find("Soroban developer relations expert").unwrap();
        let ctx_label = prompt.find("Context sections:").unwrap();
        let ctx = prompt.find("soroban contract invoke").unwrap();
        let question = prompt.find("How to invoke a smart contract in Soroban?").unwrap();
        let answer = prompt.find("Answer as markdown").unwrap();

        assert!(instructions < ctx_label);
        assert!(ctx_label < ctx);
        assert!(ctx < question);
        assert!(question < answer);
        assert!(prompt.contains("Sorry, I don't know how to help with that."));
    }

    #[test]
    fn test_empty_context_still_well_formed() {
        let prompt = PromptBuilder::build_prompt("", "What is a ledger entry?");
        assert!(prompt.starts_with(INSTRUCTIONS));
        assert!(prompt.contains("Context sections:\n\n"));
        assert!(prompt.contains("Question: \"\"\"\nWhat is a ledger entry?\n\"\"\""));
        assert!(prompt.ends_with("Answer as markdown (including related code snippets if available):"));
    }

    #[test]
    fn test_deterministic() {
        let a = PromptBuilder::build_prompt("ctx", "q");
        let b = PromptBuilder::build_prompt("ctx", "q");
        assert_eq!(a, b);
    }
}
