//! Domain types passed between the chunker, retriever, reranker and generator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// Metadata keys the pipeline reads or stamps.
pub mod meta_keys {
    pub const TITLE: &str = "title";
    pub const CATEGORY: &str = "category";
    pub const TAGS: &str = "tags";
    pub const SOURCE: &str = "source";
    pub const INGESTED_AT: &str = "ingested_at";
}

/// Coarse classification of a document's text, used to pick a chunking strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Code,
    Structured,
    Narrative,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Structured => "structured",
            Self::Narrative => "narrative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code" => Some(Self::Code),
            "structured" => Some(Self::Structured),
            "narrative" => Some(Self::Narrative),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous slice of a source document, the atomic retrieval unit.
///
/// - `id`: assigned at ingestion from `doc_id` and `chunk_index`
/// - `chunk_index`/`total_chunks`: position within the parent document
/// - `has_previous`/`has_next`: adjacency flags consistent with the position
/// - `metadata`: inherited document metadata plus the ingestion timestamp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content_type: ContentType,
    pub has_previous: bool,
    pub has_next: bool,
    pub metadata: Meta,
}

impl Chunk {
    /// Human readable label used in generation context and citations.
    pub fn source_label(&self) -> &str {
        self.metadata
            .get(meta_keys::TITLE)
            .or_else(|| self.metadata.get(meta_keys::SOURCE))
            .map(String::as_str)
            .unwrap_or(&self.doc_id)
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata
            .get(meta_keys::TITLE)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// A scored reference to a chunk.
///
/// `score` means cosine similarity, fused RRF score or reranker relevance
/// depending on the stage that produced it. The component scores survive
/// fusion and are dropped by reranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
    pub vector_score: Option<f32>,
    pub keyword_score: Option<f32>,
}

/// A hit returned by the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// A chunk with its embedding, ready to be written to the index.
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Payload predicate for unranked index scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadFilter {
    /// Chunk text contains any of the (lowercase) terms, case-insensitively.
    ContentContainsAny(Vec<String>),
}

impl PayloadFilter {
    pub fn matches(&self, chunk: &Chunk) -> bool {
        match self {
            Self::ContentContainsAny(terms) => {
                let haystack = chunk.content.to_lowercase();
                terms.iter().any(|t| haystack.contains(t.as_str()))
            }
        }
    }
}

/// One relevance judgement from a reranking provider, by original position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankScore {
    pub index: usize,
    pub relevance: f32,
}

/// Prompt handed to an answer generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// A record to ingest: raw text plus document level metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl IngestDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: Meta::new() }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Per-query switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub use_reranking: bool,
    pub use_hybrid_search: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { use_reranking: true, use_hybrid_search: true }
    }
}

/// States of a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStage {
    Idle,
    Retrieving,
    Reranking,
    Generating,
    Complete,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::Reranking => "reranking",
            Self::Generating => "generating",
            Self::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// A cited passage in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
    pub metadata: Meta,
    pub score: f32,
}

impl From<&SearchResult> for Source {
    fn from(r: &SearchResult) -> Self {
        Self {
            content: r.chunk.content.clone(),
            metadata: r.chunk.metadata.clone(),
            score: r.score,
        }
    }
}

/// Wall-clock stage timings of one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetrics {
    #[serde(with = "millis")]
    pub retrieval_time: Duration,
    #[serde(with = "millis")]
    pub reranking_time: Duration,
    #[serde(with = "millis")]
    pub generation_time: Duration,
    #[serde(with = "millis")]
    pub total_time: Duration,
}

impl QueryMetrics {
    pub fn stage_sum(&self) -> Duration {
        self.retrieval_time + self.reranking_time + self.generation_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub metrics: QueryMetrics,
}

/// Events emitted by a streaming query, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    RetrievalStarted,
    RetrievalFinished { result_count: usize },
    RerankingStarted,
    RerankingFinished { result_count: usize },
    Generation { delta: String },
    Complete { sources: Vec<Source>, metrics: QueryMetrics },
}

impl QueryEvent {
    pub fn stage(&self) -> QueryStage {
        match self {
            Self::RetrievalStarted | Self::RetrievalFinished { .. } => QueryStage::Retrieving,
            Self::RerankingStarted | Self::RerankingFinished { .. } => QueryStage::Reranking,
            Self::Generation { .. } => QueryStage::Generating,
            Self::Complete { .. } => QueryStage::Complete,
        }
    }
}

/// Durations as fractional milliseconds on the wire.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}
