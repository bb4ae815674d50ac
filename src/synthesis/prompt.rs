//! Instruction templates for grounded answers

/// System instruction: answer only from the supplied excerpts
pub const SYSTEM_PROMPT: &str = "You are a precise assistant that answers questions based ONLY on the provided document excerpts.

CRITICAL INSTRUCTIONS:
1. Answer the question DIRECTLY and SPECIFICALLY using only information from the provided excerpts
2. If the answer is not in the excerpts, say \"The provided documents do not contain information to answer this question\"
3. Do NOT provide general knowledge or information not found in the excerpts
4. Quote or reference specific parts from the excerpts when possible
5. Be concise and focused on answering exactly what was asked
6. Answer in the language of the question; documents and questions may be in any language, including English and Korean";

/// User instruction embedding the question and the labelled excerpts
pub fn build_user_prompt(question: &str, context: &str) -> String {
    format!(
        "Question: {}\n\nRelevant document excerpts:\n{}\n\nBased ONLY on the excerpts above, provide a direct and specific answer to the question. If the answer cannot be found in these excerpts, state that clearly.",
        question, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_embeds_question_and_context() {
        let prompt = build_user_prompt("Who signed?", "[From a.pdf, Chunk 1]\nSigned by Kim.");
        assert!(prompt.starts_with("Question: Who signed?"));
        assert!(prompt.contains("Relevant document excerpts:\n[From a.pdf, Chunk 1]"));
        assert!(prompt.contains("state that clearly"));
    }

    #[test]
    fn test_system_prompt_forbids_outside_knowledge() {
        assert!(SYSTEM_PROMPT.contains("ONLY"));
        assert!(SYSTEM_PROMPT.contains("do not contain information"));
        assert!(SYSTEM_PROMPT.contains("Korean"));
    }
}
