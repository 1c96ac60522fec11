//! Lexical side of hybrid retrieval.
use ragfuse_core::types::{Chunk, SearchResult};

/// Lowercased query terms longer than two characters, deduplicated in order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in query.split(|c: char| !c.is_alphanumeric()) {
        if raw.chars().count() <= 2 {
            continue;
        }
        let term = raw.to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Attach a linear positional score `1 - rank / count` to unranked scan hits.
pub fn positional_scores(chunks: Vec<Chunk>) -> Vec<SearchResult> {
    let count = chunks.len() as f32;
    chunks
        .into_iter()
        .enumerate()
        .map(|(rank, chunk)| {
            let score = 1.0 - rank as f32 / count;
            SearchResult { chunk, score, vector_score: None, keyword_score: Some(score) }
        })
        .collect()
}
