use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use futures::TryStreamExt;

use ragfuse_core::config::RagConfig;
use ragfuse_core::traits::{AnswerGenerator, RerankProvider};
use ragfuse_core::types::{IngestDocument, PayloadFilter, Prompt, QueryEvent, QueryOptions, RerankScore};
use ragfuse_core::Error;
use ragfuse_pipeline::{sample_corpus, PipelineBuilder, RagPipeline, NO_RESULTS_ANSWER};

struct FailingReranker;

#[async_trait]
impl RerankProvider for FailingReranker {
    async fn rerank(&self, _query: &str, _documents: &[String], _top_n: usize) -> anyhow::Result<Vec<RerankScore>> {
        anyhow::bail!("reranker offline")
    }
}

/// Fails on every call; proves a code path never reaches generation.
struct UnreachableGenerator;

#[async_trait]
impl AnswerGenerator for UnreachableGenerator {
    async fn generate(&self, _prompt: &Prompt) -> anyhow::Result<String> {
        anyhow::bail!("generator must not be called")
    }

    fn generate_stream(&self, _prompt: &Prompt) -> BoxStream<'static, anyhow::Result<String>> {
        stream::iter(vec![Err(anyhow::anyhow!("generator must not be called"))]).boxed()
    }
}

/// Streams one fragment, then fails.
struct BrokenStreamGenerator;

#[async_trait]
impl AnswerGenerator for BrokenStreamGenerator {
    async fn generate(&self, _prompt: &Prompt) -> anyhow::Result<String> {
        Ok("unused".into())
    }

    fn generate_stream(&self, _prompt: &Prompt) -> BoxStream<'static, anyhow::Result<String>> {
        stream::iter(vec![Ok("partial ".to_string()), Err(anyhow::anyhow!("connection reset"))]).boxed()
    }
}

fn small_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embedding.dimension = 256;
    config.retrieval.top_k = 4;
    config.retrieval.rerank_top_k = 2;
    config
}

async fn seeded_pipeline(builder: PipelineBuilder) -> anyhow::Result<RagPipeline> {
    let pipeline = builder.build().await?;
    pipeline.ingest(&sample_corpus()).await?;
    Ok(pipeline)
}

const HYBRID_ONLY: QueryOptions = QueryOptions { use_reranking: false, use_hybrid_search: true };
const FULL: QueryOptions = QueryOptions { use_reranking: true, use_hybrid_search: true };

#[tokio::test]
async fn performance_query_over_mock_corpus() -> anyhow::Result<()> {
    let config = small_config();
    let top_k = config.retrieval.top_k;
    let pipeline = seeded_pipeline(PipelineBuilder::new(config)).await?;

    let response = pipeline.query("performance", HYBRID_ONLY).await?;
    assert!(!response.sources.is_empty());
    assert!(response.sources.len() <= top_k);
    for pair in response.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for s in &response.sources {
        assert!((0.0..=1.0).contains(&s.score), "score {} out of range", s.score);
    }
    assert!(response.answer.contains("[1]"));
    assert!(response.metrics.total_time >= response.metrics.retrieval_time);
    Ok(())
}

#[tokio::test]
async fn reranker_failure_falls_back_to_fused_prefix() -> anyhow::Result<()> {
    let config = small_config();
    let rerank_top_k = config.retrieval.rerank_top_k;
    let pipeline = seeded_pipeline(PipelineBuilder::new(config).reranker(Arc::new(FailingReranker))).await?;

    let fused = pipeline.query("cache latency performance", HYBRID_ONLY).await?;
    let reranked = pipeline.query("cache latency performance", FULL).await?;
    assert!(fused.sources.len() > rerank_top_k);
    assert_eq!(reranked.sources.len(), rerank_top_k);
    assert_eq!(reranked.sources[..], fused.sources[..rerank_top_k]);
    Ok(())
}

#[tokio::test]
async fn mock_reranker_keeps_at_most_rerank_top_k() -> anyhow::Result<()> {
    let config = small_config();
    let rerank_top_k = config.retrieval.rerank_top_k;
    let pipeline = seeded_pipeline(PipelineBuilder::new(config)).await?;
    let response = pipeline.query("How do I reduce database latency?", FULL).await?;
    assert!(!response.sources.is_empty() && response.sources.len() <= rerank_top_k);
    for pair in response.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    Ok(())
}

#[tokio::test]
async fn empty_retrieval_returns_canned_answer_without_generating() -> anyhow::Result<()> {
    let pipeline = PipelineBuilder::new(small_config()).generator(Arc::new(UnreachableGenerator)).build().await?;

    let response = pipeline.query("anything at all", FULL).await?;
    assert_eq!(response.answer, NO_RESULTS_ANSWER);
    assert!(response.sources.is_empty());
    assert!(response.metrics.generation_time < Duration::from_millis(50));

    let events: Vec<QueryEvent> = pipeline.stream_query("anything at all", FULL).try_collect().await?;
    assert!(matches!(events.last(), Some(QueryEvent::Complete { sources, .. }) if sources.is_empty()));
    assert!(events.contains(&QueryEvent::Generation { delta: NO_RESULTS_ANSWER.to_string() }));
    Ok(())
}

#[tokio::test]
async fn stream_emits_stages_in_order_and_matches_single_shot() -> anyhow::Result<()> {
    let pipeline = seeded_pipeline(PipelineBuilder::new(small_config())).await?;
    let events: Vec<QueryEvent> = pipeline.stream_query("caching strategies", FULL).try_collect().await?;

    assert_eq!(events[0], QueryEvent::RetrievalStarted);
    assert!(matches!(events[1], QueryEvent::RetrievalFinished { result_count } if result_count > 0));
    assert_eq!(events[2], QueryEvent::RerankingStarted);
    assert!(matches!(events[3], QueryEvent::RerankingFinished { result_count } if result_count <= 2));
    let Some(QueryEvent::Complete { sources, .. }) = events.last() else {
        panic!("stream must end with a complete event");
    };

    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            QueryEvent::Generation { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    let single = pipeline.query("caching strategies", FULL).await?;
    assert_eq!(streamed, single.answer);
    assert_eq!(sources, &single.sources);
    Ok(())
}

#[tokio::test]
async fn stream_without_reranking_skips_reranking_events() -> anyhow::Result<()> {
    let pipeline = seeded_pipeline(PipelineBuilder::new(small_config())).await?;
    let events: Vec<QueryEvent> = pipeline.stream_query("onboarding buddy", HYBRID_ONLY).try_collect().await?;
    assert!(!events.iter().any(|e| matches!(e, QueryEvent::RerankingStarted | QueryEvent::RerankingFinished { .. })));
    assert!(matches!(events[2], QueryEvent::Generation { .. }));
    Ok(())
}

#[tokio::test]
async fn stream_failure_surfaces_after_partial_events() -> anyhow::Result<()> {
    let pipeline = seeded_pipeline(PipelineBuilder::new(small_config()).generator(Arc::new(BrokenStreamGenerator))).await?;
    let items: Vec<Result<QueryEvent, Error>> = pipeline.stream_query("performance", HYBRID_ONLY).collect().await;

    assert!(matches!(items[0], Ok(QueryEvent::RetrievalStarted)));
    assert!(matches!(items[2], Ok(QueryEvent::Generation { ref delta }) if delta == "partial "));
    assert!(matches!(items.last(), Some(Err(Error::Generation(_)))));
    assert_eq!(items.len(), 4);
    Ok(())
}

#[tokio::test]
async fn empty_question_is_rejected_before_any_stage() -> anyhow::Result<()> {
    let pipeline = PipelineBuilder::new(small_config()).generator(Arc::new(UnreachableGenerator)).build().await?;
    assert!(matches!(pipeline.query("   ", FULL).await, Err(Error::InvalidInput(_))));

    let items: Vec<Result<QueryEvent, Error>> = pipeline.stream_query("", FULL).collect().await;
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(Error::InvalidInput(_))));
    Ok(())
}

#[tokio::test]
async fn repeated_queries_are_deterministic() -> anyhow::Result<()> {
    let pipeline = seeded_pipeline(PipelineBuilder::new(small_config())).await?;
    let a = pipeline.query("How should I pick a cache TTL?", FULL).await?;
    let b = pipeline.query("How should I pick a cache TTL?", FULL).await?;
    assert_eq!(a.answer, b.answer);
    assert_eq!(a.sources, b.sources);
    Ok(())
}

#[tokio::test]
async fn compare_runs_all_three_setups() -> anyhow::Result<()> {
    let config = small_config();
    let (top_k, rerank_top_k) = (config.retrieval.top_k, config.retrieval.rerank_top_k);
    let pipeline = seeded_pipeline(PipelineBuilder::new(config)).await?;
    let cmp = pipeline.compare("database performance").await?;

    assert!(cmp.vector_only.sources.len() <= top_k);
    assert!(cmp.hybrid.sources.len() <= top_k);
    assert!(cmp.hybrid_reranked.sources.len() <= rerank_top_k);
    let single = pipeline.query("database performance", HYBRID_ONLY).await?;
    assert_eq!(cmp.hybrid.answer, single.answer);
    assert_eq!(cmp.hybrid.sources, single.sources);
    Ok(())
}

#[tokio::test]
async fn ingest_small_markdown_document() -> anyhow::Result<()> {
    let mut config = RagConfig::default();
    config.chunking.chunk_size = 20;
    config.chunking.chunk_overlap = 5;
    config.embedding.dimension = 64;
    let pipeline = PipelineBuilder::new(config).build().await?;

    let doc = IngestDocument::new("# Title\n\nParagraph one. Paragraph two.").with_meta("source", "a.md");
    let report = pipeline.ingest(&[doc]).await?;
    assert_eq!(report.documents, 1);
    assert!(report.chunks >= 2);
    assert_eq!(pipeline.index().count().await?, report.chunks);

    let chunks = pipeline
        .index()
        .scan(&PayloadFilter::ContentContainsAny(vec!["title".into(), "paragraph".into()]), 10)
        .await?;
    assert_eq!(chunks.len(), report.chunks);
    let last = chunks.len() - 1;
    for (i, c) in chunks.iter().enumerate() {
        assert!(c.content.chars().count() <= 20, "chunk too long: {:?}", c.content);
        assert_eq!(c.chunk_index, i);
        assert_eq!(c.total_chunks, chunks.len());
        assert_eq!(c.has_previous, i > 0);
        assert_eq!(c.has_next, i < last);
        assert_eq!(c.doc_id, "a.md");
        assert!(c.metadata.contains_key("ingested_at"));
    }

    // re-ingesting the same source replaces rather than duplicates
    let again = IngestDocument::new("# Title\n\nParagraph one. Paragraph two.").with_meta("source", "a.md");
    pipeline.ingest(&[again]).await?;
    assert_eq!(pipeline.index().count().await?, report.chunks);
    Ok(())
}
