//! Collaborator contracts. Every trait has a live and a mock implementation
//! elsewhere in the workspace; the pipeline only sees these.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::types::{Chunk, IndexHit, IndexPoint, PayloadFilter, Prompt, RerankScore};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder {} returned no vector", self.id()))
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace points by chunk id.
    async fn upsert(&self, points: Vec<IndexPoint>) -> anyhow::Result<()>;
    /// Nearest neighbours by cosine similarity, best first.
    async fn search(&self, vector: &[f32], limit: usize) -> anyhow::Result<Vec<IndexHit>>;
    /// Chunks matching a payload predicate, in no particular relevance order.
    async fn scan(&self, filter: &PayloadFilter, limit: usize) -> anyhow::Result<Vec<Chunk>>;
    async fn count(&self) -> anyhow::Result<usize>;
}

#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Score `documents` against `query`; returns at most `top_n` judgements
    /// referencing positions in `documents`.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> anyhow::Result<Vec<RerankScore>>;
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> anyhow::Result<String>;

    /// Incremental text fragments. Nothing is requested until the stream is polled.
    fn generate_stream(&self, prompt: &Prompt) -> BoxStream<'static, anyhow::Result<String>>;
}

#[async_trait]
pub trait QueryExpander: Send + Sync {
    /// Related terms for `query`; empty when nothing applies.
    async fn expand(&self, query: &str) -> anyhow::Result<Vec<String>>;
}
