use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use ragfuse_core::traits::RerankProvider;
use ragfuse_core::types::{RerankScore, SearchResult};

/// Second-stage relevance scoring with a non-fatal failure path.
///
/// Provider failures are logged and the incoming order, truncated to `top_k`,
/// is returned instead. Reranking never fails a query.
pub struct Reranker {
    provider: Arc<dyn RerankProvider>,
}

impl Reranker {
    pub fn new(provider: Arc<dyn RerankProvider>) -> Self {
        Self { provider }
    }

    pub async fn rerank(&self, query: &str, results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
        if results.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let documents: Vec<String> = results.iter().map(rerank_text).collect();
        match self.provider.rerank(query, &documents, top_k).await {
            Ok(scores) => match apply_scores(&results, &scores, top_k) {
                Some(reranked) => {
                    debug!(candidates = results.len(), kept = reranked.len(), "reranked");
                    reranked
                }
                None => {
                    warn!("reranker returned an unusable judgement; keeping fused order");
                    fallback(results, top_k)
                }
            },
            Err(e) => {
                warn!(error = %e, "reranker failed; keeping fused order");
                fallback(results, top_k)
            }
        }
    }
}

/// Chunk text with its title prepended, giving the cross-encoder more signal.
pub fn rerank_text(result: &SearchResult) -> String {
    match result.chunk.title() {
        Some(title) => format!("{title}\n\n{}", result.chunk.content),
        None => result.chunk.content.clone(),
    }
}

fn fallback(mut results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    results.truncate(top_k);
    results
}

/// `None` when any judgement points outside `results` or is not finite.
fn apply_scores(results: &[SearchResult], scores: &[RerankScore], top_k: usize) -> Option<Vec<SearchResult>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(scores.len().min(top_k));
    for s in scores {
        let original = results.get(s.index)?;
        if !s.relevance.is_finite() {
            return None;
        }
        if !seen.insert(s.index) {
            continue;
        }
        out.push(SearchResult {
            chunk: original.chunk.clone(),
            score: s.relevance,
            vector_score: None,
            keyword_score: None,
        });
    }
    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out.truncate(top_k);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragfuse_core::types::{Chunk, ContentType, Meta};

    struct NanProvider;

    #[async_trait]
    impl RerankProvider for NanProvider {
        async fn rerank(&self, _query: &str, documents: &[String], _top_n: usize) -> anyhow::Result<Vec<RerankScore>> {
            Ok((0..documents.len()).map(|index| RerankScore { index, relevance: f32::NAN }).collect())
        }
    }

    fn result(content: &str, title: Option<&str>) -> SearchResult {
        let mut metadata = Meta::new();
        if let Some(t) = title {
            metadata.insert("title".into(), t.into());
        }
        SearchResult {
            chunk: Chunk {
                id: content.into(),
                doc_id: "d".into(),
                content: content.into(),
                chunk_index: 0,
                total_chunks: 1,
                content_type: ContentType::Narrative,
                has_previous: false,
                has_next: false,
                metadata,
            },
            score: 0.5,
            vector_score: Some(0.5),
            keyword_score: None,
        }
    }

    #[test]
    fn title_is_prefixed_when_present() {
        assert_eq!(rerank_text(&result("body", Some("Guide"))), "Guide\n\nbody");
        assert_eq!(rerank_text(&result("body", Some("  "))), "body");
        assert_eq!(rerank_text(&result("body", None)), "body");
    }

    #[test]
    fn scores_reorder_and_drop_components() {
        let results = vec![result("a", None), result("b", None), result("c", None)];
        let scores = [
            RerankScore { index: 2, relevance: 0.9 },
            RerankScore { index: 0, relevance: 0.4 },
            RerankScore { index: 2, relevance: 0.1 },
        ];
        let out = apply_scores(&results, &scores, 5).unwrap_or_default();
        let ids: Vec<&str> = out.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(out.iter().all(|r| r.vector_score.is_none() && r.keyword_score.is_none()));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let results = vec![result("a", None)];
        assert!(apply_scores(&results, &[RerankScore { index: 3, relevance: 1.0 }], 1).is_none());
    }

    #[test]
    fn non_finite_relevance_is_rejected() {
        let results = vec![result("a", None), result("b", None)];
        assert!(apply_scores(&results, &[RerankScore { index: 0, relevance: f32::INFINITY }], 2).is_none());
        assert!(apply_scores(&results, &[RerankScore { index: 1, relevance: f32::NAN }], 2).is_none());
    }

    #[tokio::test]
    async fn nan_scores_fall_back_to_fused_order() {
        let reranker = Reranker::new(Arc::new(NanProvider));
        let results = vec![result("a", None), result("b", None), result("c", None)];
        let out = reranker.rerank("q", results.clone(), 2).await;
        assert_eq!(out, results[..2]);
        assert!(out.iter().all(|r| r.score.is_finite()));
    }
}
