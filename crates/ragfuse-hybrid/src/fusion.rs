//! Weighted Reciprocal Rank Fusion: score = Σ weight / (k + rank + 1)
//!
//! Only each list's internal order matters, so cosine similarities and
//! positional keyword scores never need to share a scale.

use std::collections::HashMap;

use ragfuse_core::types::SearchResult;

/// Smoothing constant used when none is configured.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Number of leading characters that identify a candidate across lists.
pub const FINGERPRINT_CHARS: usize = 100;

/// Identity key for merging candidates: the first 100 characters of the text.
///
/// Two different chunks sharing a prefix are merged into one candidate.
pub fn fingerprint(content: &str) -> String {
    content.chars().take(FINGERPRINT_CHARS).collect()
}

/// Fuse a vector-ranked and a keyword-ranked list.
///
/// `alpha` weights the vector list and `1 - alpha` the keyword list. A list
/// whose weight is zero contributes no candidates. Component scores carried
/// by the inputs are kept on the fused result. Ties keep first-seen order,
/// which puts vector candidates ahead of keyword-only ones.
pub fn rrf_fuse(vector: Vec<SearchResult>, keyword: Vec<SearchResult>, alpha: f32, k: f32) -> Vec<SearchResult> {
    let mut fused: Vec<SearchResult> = Vec::with_capacity(vector.len() + keyword.len());
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (list, weight) in [(vector, alpha), (keyword, 1.0 - alpha)] {
        if weight <= 0.0 {
            continue;
        }
        for (rank, hit) in list.into_iter().enumerate() {
            let contribution = weight / (k + rank as f32 + 1.0);
            let key = fingerprint(&hit.chunk.content);
            if let Some(&i) = slots.get(&key) {
                let entry = &mut fused[i];
                entry.score += contribution;
                entry.vector_score = entry.vector_score.or(hit.vector_score);
                entry.keyword_score = entry.keyword_score.or(hit.keyword_score);
            } else {
                slots.insert(key, fused.len());
                fused.push(SearchResult { score: contribution, ..hit });
            }
        }
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragfuse_core::types::{Chunk, ContentType, Meta};

    fn result(content: &str, vector: Option<f32>, keyword: Option<f32>) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: content.to_string(),
                doc_id: "d".into(),
                content: content.to_string(),
                chunk_index: 0,
                total_chunks: 1,
                content_type: ContentType::Narrative,
                has_previous: false,
                has_next: false,
                metadata: Meta::new(),
            },
            score: vector.or(keyword).unwrap_or(0.0),
            vector_score: vector,
            keyword_score: keyword,
        }
    }

    fn vec_list(names: &[&str]) -> Vec<SearchResult> {
        names.iter().enumerate().map(|(i, n)| result(n, Some(0.9 - i as f32 * 0.1), None)).collect()
    }

    fn kw_list(names: &[&str]) -> Vec<SearchResult> {
        let n = names.len() as f32;
        names.iter().enumerate().map(|(i, c)| result(c, None, Some(1.0 - i as f32 / n))).collect()
    }

    fn order(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.content.as_str()).collect()
    }

    #[test]
    fn shared_candidate_accumulates_both_lists() {
        let fused = rrf_fuse(vec_list(&["a", "b"]), kw_list(&["b", "c"]), 0.5, 60.0);
        assert_eq!(order(&fused), vec!["b", "a", "c"]);
        let b = &fused[0];
        let expected = 0.5 / 62.0 + 0.5 / 61.0;
        assert!((b.score - expected).abs() < 1e-7);
        assert!(b.vector_score.is_some_and(|s| (s - 0.8).abs() < 1e-6));
        assert_eq!(b.keyword_score, Some(1.0));
    }

    #[test]
    fn alpha_one_follows_vector_order_only() {
        let fused = rrf_fuse(vec_list(&["a", "b", "c"]), kw_list(&["c", "x", "b"]), 1.0, 60.0);
        assert_eq!(order(&fused), vec!["a", "b", "c"]);
        assert!(fused.iter().all(|r| r.keyword_score.is_none()));
    }

    #[test]
    fn alpha_zero_follows_keyword_order_only() {
        let fused = rrf_fuse(vec_list(&["a", "b", "c"]), kw_list(&["c", "x", "b"]), 0.0, 60.0);
        assert_eq!(order(&fused), vec!["c", "x", "b"]);
    }

    #[test]
    fn raising_alpha_never_demotes_vector_only_hit() {
        let position = |fused: &[SearchResult], name: &str| {
            fused.iter().position(|r| r.chunk.content == name).unwrap_or(usize::MAX)
        };
        let mut seen_ahead = false;
        for step in 0..=20 {
            let alpha = step as f32 / 20.0;
            let fused = rrf_fuse(vec_list(&["shared", "v-only"]), kw_list(&["k-only", "shared"]), alpha, 60.0);
            let ahead = position(&fused, "v-only") < position(&fused, "k-only");
            assert!(!seen_ahead || ahead, "vector-only hit fell behind at alpha={alpha}");
            seen_ahead |= ahead;
        }
        assert!(seen_ahead);
    }

    #[test]
    fn equal_scores_keep_vector_first() {
        let fused = rrf_fuse(vec_list(&["v"]), kw_list(&["k"]), 0.5, 60.0);
        assert_eq!(order(&fused), vec!["v", "k"]);
    }

    #[test]
    fn empty_inputs_fuse_to_nothing() {
        assert!(rrf_fuse(Vec::new(), Vec::new(), 0.7, 60.0).is_empty());
    }

    #[test]
    fn fingerprint_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        assert_eq!(fingerprint(&long).chars().count(), FINGERPRINT_CHARS);
        assert_eq!(fingerprint("short"), "short");
    }

    #[test]
    fn prefix_collision_merges_candidates() {
        let base = "x".repeat(FINGERPRINT_CHARS);
        let fused = rrf_fuse(
            vec![result(&format!("{base} one"), Some(0.9), None)],
            vec![result(&format!("{base} two"), None, Some(1.0))],
            0.5,
            60.0,
        );
        assert_eq!(fused.len(), 1);
    }
}
