use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ragfuse_core::chunking::{document_id, stamp_chunks, ChunkStrategySelector};
use ragfuse_core::config::RetrievalConfig;
use ragfuse_core::traits::{AnswerGenerator, Embedder, VectorIndex};
use ragfuse_core::types::{
    Chunk, IndexPoint, IngestDocument, IngestReport, QueryEvent, QueryMetrics, QueryOptions, RagResponse,
    SearchResult, Source,
};
use ragfuse_core::{Error, Result};
use ragfuse_embed::augment_for_embedding;
use ragfuse_hybrid::HybridRetriever;

use crate::context::{build_prompt, NO_RESULTS_ANSWER};
use crate::rerank::Reranker;

/// Responses for one question under the three fixed retrieval setups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub vector_only: RagResponse,
    pub hybrid: RagResponse,
    pub hybrid_reranked: RagResponse,
}

/// Ingestion and question answering over shared, immutable collaborators.
///
/// Each query keeps its own results and timings, so one pipeline can serve
/// concurrent queries through `&self`.
pub struct RagPipeline {
    pub(crate) chunker: ChunkStrategySelector,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) index: Arc<dyn VectorIndex>,
    pub(crate) retriever: HybridRetriever,
    pub(crate) reranker: Reranker,
    pub(crate) generator: Arc<dyn AnswerGenerator>,
    pub(crate) retrieval: RetrievalConfig,
    pub(crate) batch_size: usize,
}

fn validate_question(question: &str) -> Result<&str> {
    let q = question.trim();
    if q.is_empty() {
        return Err(Error::InvalidInput("question must not be empty".into()));
    }
    Ok(q)
}

impl RagPipeline {
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Chunk, embed and upsert `documents`.
    pub async fn ingest(&self, documents: &[IngestDocument]) -> Result<IngestReport> {
        let started = Instant::now();
        let ingested_at = chrono::Utc::now().to_rfc3339();
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut report = IngestReport::default();
        for doc in documents {
            let doc_id = document_id(&doc.content, &doc.metadata);
            let mut doc_chunks = self.chunker.chunk(&doc.content, &doc.metadata);
            stamp_chunks(&mut doc_chunks, &doc_id, &ingested_at);
            debug!(doc_id = %doc_id, chunks = doc_chunks.len(), "chunked document");
            chunks.extend(doc_chunks);
            report.documents += 1;
        }

        for batch in chunks.chunks(self.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(augment_for_embedding).collect();
            let vectors = self.embedder.embed_batch(&texts).await.map_err(Error::Ingestion)?;
            if vectors.len() != batch.len() {
                return Err(Error::Ingestion(anyhow!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != self.embedder.dim()) {
                return Err(Error::Ingestion(anyhow!(
                    "embedding has {} dimensions, expected {}",
                    bad.len(),
                    self.embedder.dim()
                )));
            }
            let points = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| IndexPoint { chunk, vector })
                .collect();
            self.index.upsert(points).await.map_err(Error::Ingestion)?;
            report.chunks += batch.len();
        }

        info!(
            documents = report.documents,
            chunks = report.chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn retrieve(&self, question: &str, options: QueryOptions) -> Result<Vec<SearchResult>> {
        let limit = self.retrieval.top_k;
        if options.use_hybrid_search {
            self.retriever.hybrid_search(question, limit, self.retrieval.alpha).await
        } else {
            self.retriever.vector_search(question, limit).await
        }
    }

    async fn generate(&self, question: &str, results: &[SearchResult]) -> Result<String> {
        if results.is_empty() {
            return Ok(NO_RESULTS_ANSWER.to_string());
        }
        self.generator.generate(&build_prompt(question, results)).await.map_err(Error::Generation)
    }

    /// Retrieve, optionally rerank, and generate a cited answer.
    pub async fn query(&self, question: &str, options: QueryOptions) -> Result<RagResponse> {
        let question = validate_question(question)?;
        let total = Instant::now();
        let mut metrics = QueryMetrics::default();

        let t = Instant::now();
        let candidates = self.retrieve(question, options).await?;
        metrics.retrieval_time = t.elapsed();
        debug!(candidates = candidates.len(), hybrid = options.use_hybrid_search, "retrieval finished");

        let t = Instant::now();
        let results = if options.use_reranking {
            self.reranker.rerank(question, candidates, self.retrieval.rerank_top_k).await
        } else {
            candidates
        };
        metrics.reranking_time = t.elapsed();

        let t = Instant::now();
        let answer = self.generate(question, &results).await?;
        metrics.generation_time = t.elapsed();
        metrics.total_time = total.elapsed();

        info!(
            sources = results.len(),
            retrieval_ms = metrics.retrieval_time.as_millis() as u64,
            reranking_ms = metrics.reranking_time.as_millis() as u64,
            generation_ms = metrics.generation_time.as_millis() as u64,
            total_ms = metrics.total_time.as_millis() as u64,
            "query complete"
        );
        Ok(RagResponse { answer, sources: results.iter().map(Source::from).collect(), metrics })
    }

    /// Lazily evaluated query emitting one event per stage transition and one
    /// per generated fragment. Nothing runs until the stream is polled, and an
    /// error ends the stream.
    pub fn stream_query(&self, question: &str, options: QueryOptions) -> BoxStream<'_, Result<QueryEvent>> {
        let progress = Progress {
            question: question.to_string(),
            options,
            started: Instant::now(),
            metrics: QueryMetrics::default(),
            results: Vec::new(),
        };
        stream::try_unfold(Step::Begin(progress), move |step| self.advance(step)).boxed()
    }

    async fn advance(&self, step: Step) -> Result<Option<(QueryEvent, Step)>> {
        let mut step = step;
        loop {
            step = match step {
                Step::Begin(mut p) => {
                    p.question = validate_question(&p.question)?.to_string();
                    p.started = Instant::now();
                    return Ok(Some((QueryEvent::RetrievalStarted, Step::Retrieve(p))));
                }
                Step::Retrieve(mut p) => {
                    let t = Instant::now();
                    p.results = self.retrieve(&p.question, p.options).await?;
                    p.metrics.retrieval_time = t.elapsed();
                    let event = QueryEvent::RetrievalFinished { result_count: p.results.len() };
                    let next = if p.options.use_reranking { Step::BeginRerank(p) } else { Step::Generate(p) };
                    return Ok(Some((event, next)));
                }
                Step::BeginRerank(p) => return Ok(Some((QueryEvent::RerankingStarted, Step::Rerank(p)))),
                Step::Rerank(mut p) => {
                    let t = Instant::now();
                    let candidates = std::mem::take(&mut p.results);
                    p.results = self.reranker.rerank(&p.question, candidates, self.retrieval.rerank_top_k).await;
                    p.metrics.reranking_time = t.elapsed();
                    let event = QueryEvent::RerankingFinished { result_count: p.results.len() };
                    return Ok(Some((event, Step::Generate(p))));
                }
                Step::Generate(p) => {
                    if p.results.is_empty() {
                        let delta = NO_RESULTS_ANSWER.to_string();
                        return Ok(Some((QueryEvent::Generation { delta }, Step::Finish(p))));
                    }
                    // generation time accrues across pulls of the fragment stream
                    let fragments = self.generator.generate_stream(&build_prompt(&p.question, &p.results));
                    Step::Generating(p, fragments)
                }
                Step::Generating(mut p, mut fragments) => {
                    let t = Instant::now();
                    let next = fragments.next().await;
                    p.metrics.generation_time += t.elapsed();
                    match next {
                        Some(Ok(delta)) => {
                            return Ok(Some((QueryEvent::Generation { delta }, Step::Generating(p, fragments))));
                        }
                        Some(Err(e)) => return Err(Error::Generation(e)),
                        None => Step::Finish(p),
                    }
                }
                Step::Finish(mut p) => {
                    p.metrics.total_time = p.started.elapsed();
                    let sources = p.results.iter().map(Source::from).collect();
                    return Ok(Some((QueryEvent::Complete { sources, metrics: p.metrics }, Step::Done)));
                }
                Step::Done => return Ok(None),
            };
        }
    }

    /// Vector-only, hybrid, and hybrid with reranking for the same question,
    /// run concurrently. Any failure fails the whole comparison.
    pub async fn compare(&self, question: &str) -> Result<Comparison> {
        let (vector_only, hybrid, hybrid_reranked) = futures::try_join!(
            self.query(question, QueryOptions { use_reranking: false, use_hybrid_search: false }),
            self.query(question, QueryOptions { use_reranking: false, use_hybrid_search: true }),
            self.query(question, QueryOptions { use_reranking: true, use_hybrid_search: true }),
        )?;
        Ok(Comparison { vector_only, hybrid, hybrid_reranked })
    }
}

struct Progress {
    question: String,
    options: QueryOptions,
    started: Instant,
    metrics: QueryMetrics,
    results: Vec<SearchResult>,
}

enum Step {
    Begin(Progress),
    Retrieve(Progress),
    BeginRerank(Progress),
    Rerank(Progress),
    Generate(Progress),
    Generating(Progress, BoxStream<'static, anyhow::Result<String>>),
    Finish(Progress),
    Done,
}
