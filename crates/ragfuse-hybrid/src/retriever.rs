use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use ragfuse_core::config::RetrievalConfig;
use ragfuse_core::traits::{Embedder, QueryExpander, VectorIndex};
use ragfuse_core::types::{IndexHit, PayloadFilter, SearchResult};
use ragfuse_core::{Error, Result};

use crate::fusion::rrf_fuse;
use crate::keyword::{positional_scores, query_terms};

/// Dense + lexical retrieval over one vector index.
pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    expander: Option<Arc<dyn QueryExpander>>,
    rrf_k: f32,
}

impl HybridRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index, expander: None, rrf_k: crate::fusion::DEFAULT_RRF_K }
    }

    pub fn with_expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_rrf_k(mut self, k: f32) -> Self {
        self.rrf_k = k;
        self
    }

    /// Retriever wired from the `retrieval` config section.
    pub fn from_config(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        expander: Arc<dyn QueryExpander>,
        config: &RetrievalConfig,
    ) -> Self {
        let r = Self::new(embedder, index).with_rrf_k(config.rrf_k);
        if config.use_query_expansion {
            r.with_expander(expander)
        } else {
            r
        }
    }

    /// Query embedding, replaced by the embedding of `query + terms` when the
    /// expander finds related terms.
    async fn query_vector(&self, query: &str) -> anyhow::Result<Vec<f32>> {
        let base = self.embedder.embed(query).await?;
        let Some(expander) = &self.expander else {
            return Ok(base);
        };
        let terms = expander.expand(query).await?;
        if terms.is_empty() {
            return Ok(base);
        }
        debug!(?terms, "expanded query");
        self.embedder.embed(&format!("{query} {}", terms.join(" "))).await
    }

    async fn keyword_search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SearchResult>> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let chunks = self.index.scan(&PayloadFilter::ContentContainsAny(terms), limit).await?;
        Ok(positional_scores(chunks))
    }

    async fn dense_search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SearchResult>> {
        let vector = self.query_vector(query).await?;
        let hits = self.index.search(&vector, limit).await?;
        Ok(hits.into_iter().map(from_hit).collect())
    }

    /// Vector and keyword search fused with weighted RRF; at most `limit` results.
    pub async fn hybrid_search(&self, query: &str, limit: usize, alpha: f32) -> Result<Vec<SearchResult>> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(Error::InvalidInput(format!("alpha must be within [0, 1], got {alpha}")));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let fetch = limit.saturating_mul(2);
        let (dense, lexical) = futures::try_join!(self.dense_search(query, fetch), self.keyword_search(query, fetch))
            .context("hybrid search")
            .map_err(Error::Retrieval)?;
        debug!(vector_hits = dense.len(), keyword_hits = lexical.len(), alpha, "fusing result lists");

        let mut fused = rrf_fuse(dense, lexical, alpha, self.rrf_k);
        fused.truncate(limit);
        Ok(fused)
    }

    /// Vector-only retrieval; scores are cosine similarities.
    pub async fn vector_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.dense_search(query, limit).await.context("vector search").map_err(Error::Retrieval)
    }
}

fn from_hit(hit: IndexHit) -> SearchResult {
    SearchResult { chunk: hit.chunk, score: hit.score, vector_score: Some(hit.score), keyword_score: None }
}
