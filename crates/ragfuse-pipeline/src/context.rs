//! Prompt assembly for grounded generation.
use ragfuse_core::types::{Prompt, SearchResult};

/// Answer returned without calling the generator when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find any relevant information in the indexed documents to answer this question.";

pub const SYSTEM_PROMPT: &str = "You answer questions using only the numbered context passages provided. \
Cite the passages you rely on with their bracketed numbers, for example [1] or [2][3]. \
If the context does not contain the answer, say that you don't know.";

/// `[i] label:\ncontent` blocks, 1-based, in rank order, separated by blank lines.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}:\n{}", i + 1, r.chunk.source_label(), r.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(question: &str, results: &[SearchResult]) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("Context:\n{}\n\nQuestion: {}", build_context(results), question),
    }
}
