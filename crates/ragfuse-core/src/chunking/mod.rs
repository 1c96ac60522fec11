//! Content-aware chunking.
//!
//! `ChunkStrategySelector` classifies a document (code / structured /
//! narrative) and splits it with the matching strategy:
//! - code: recursive splitting with the small code window
//! - structured: line-preserving, token-bounded windows
//! - narrative: recursive splitting with the default window
//!
//! Every chunk gets its ordinal, the total count, adjacency flags and the
//! detected content type. Identity (`id`, `doc_id`) and the ingestion
//! timestamp are stamped later by the pipeline via [`stamp_chunks`].
use anyhow::Result;
use std::path::Path;

use crate::config::ChunkingConfig;
use crate::hash::chunk_id;
use crate::types::{meta_keys, Chunk, ContentType, Meta};

mod detect;
mod recursive;
mod token;

pub use detect::{detect_content_type, marker_ratios};
pub use recursive::{RecursiveSplitter, DEFAULT_SEPARATORS};
pub use token::{HeuristicTokenCounter, HfTokenCounter, TokenCounter, TokenSplitter};

pub struct ChunkStrategySelector {
    config: ChunkingConfig,
    counter: Box<dyn TokenCounter>,
}

impl ChunkStrategySelector {
    /// Selector with the word-count token heuristic.
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config, counter: Box::new(HeuristicTokenCounter) }
    }

    /// Selector that loads `config.tokenizer_path` when set.
    pub fn from_config(config: ChunkingConfig) -> Result<Self> {
        let counter: Box<dyn TokenCounter> = match config.tokenizer_path.as_deref() {
            Some(p) => Box::new(HfTokenCounter::from_file(&crate::config::expand_path(p))?),
            None => Box::new(HeuristicTokenCounter),
        };
        Ok(Self { config, counter })
    }

    pub fn detect(&self, text: &str) -> ContentType {
        detect_content_type(text, self.config.code_threshold, self.config.structured_threshold)
    }

    /// Split `text` into ordered chunks carrying a copy of `metadata`.
    /// Blank text yields no chunks.
    pub fn chunk(&self, text: &str, metadata: &Meta) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let content_type = self.detect(text);
        let pieces = match content_type {
            ContentType::Code => {
                RecursiveSplitter::new(self.config.code_chunk_size, self.config.code_overlap).split(text)
            }
            ContentType::Structured => {
                TokenSplitter::new(self.config.chunk_size, self.config.chunk_overlap, self.counter.as_ref())
                    .split(text)
            }
            ContentType::Narrative => {
                RecursiveSplitter::new(self.config.chunk_size, self.config.chunk_overlap).split(text)
            }
        };

        let total = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                id: String::new(),
                doc_id: String::new(),
                content,
                chunk_index: i,
                total_chunks: total,
                content_type,
                has_previous: i > 0,
                has_next: i + 1 < total,
                metadata: metadata.clone(),
            })
            .collect()
    }
}

/// Assign document identity and ingestion time to freshly split chunks.
pub fn stamp_chunks(chunks: &mut [Chunk], doc_id: &str, ingested_at: &str) {
    for c in chunks {
        c.doc_id = doc_id.to_string();
        c.id = chunk_id(doc_id, c.chunk_index);
        c.metadata.insert(meta_keys::INGESTED_AT.to_string(), ingested_at.to_string());
    }
}

/// Document identity: the `source` metadata entry when present, otherwise a
/// content hash so re-ingesting the same text supersedes the old chunks.
pub fn document_id(content: &str, metadata: &Meta) -> String {
    match metadata.get(meta_keys::SOURCE) {
        Some(s) if !s.trim().is_empty() => s.clone(),
        _ => format!("doc-{:016x}", crate::hash::stable_hash(content)),
    }
}

/// Display name of a file path for the `source` metadata entry.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(size: usize, overlap: usize) -> ChunkStrategySelector {
        ChunkStrategySelector::new(ChunkingConfig { chunk_size: size, chunk_overlap: overlap, ..ChunkingConfig::default() })
    }

    #[test]
    fn empty_text_yields_zero_chunks() {
        assert!(selector(20, 5).chunk("", &Meta::new()).is_empty());
        assert!(selector(20, 5).chunk(" \n ", &Meta::new()).is_empty());
    }

    #[test]
    fn ordinals_and_adjacency_are_consistent() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi omicron pi rho";
        let chunks = selector(20, 5).chunk(text, &Meta::new());
        assert!(chunks.len() > 2);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.total_chunks, chunks.len());
            assert_eq!(c.has_previous, i > 0);
            assert_eq!(c.has_next, i + 1 < chunks.len());
            assert_eq!(c.content_type, ContentType::Narrative);
        }
    }

    #[test]
    fn code_uses_code_window() {
        let line = "fn f() { let x = 1; return x; }\n";
        let text = line.repeat(40);
        let chunks = selector(2000, 100).chunk(&text, &Meta::new());
        assert!(chunks.iter().all(|c| c.content_type == ContentType::Code));
        assert!(chunks.len() > 1, "code window (256) should split a 1.3k char file");
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 256));
    }

    #[test]
    fn metadata_is_inherited_and_stamped() {
        let mut meta = Meta::new();
        meta.insert("title".into(), "Guide".into());
        let mut chunks = selector(20, 5).chunk("one two three four five six seven eight nine", &meta);
        stamp_chunks(&mut chunks, "guide.md", "2026-01-01T00:00:00Z");
        for c in &chunks {
            assert_eq!(c.metadata.get("title").map(String::as_str), Some("Guide"));
            assert_eq!(c.metadata.get("ingested_at").map(String::as_str), Some("2026-01-01T00:00:00Z"));
            assert_eq!(c.doc_id, "guide.md");
            assert_eq!(c.id, chunk_id("guide.md", c.chunk_index));
        }
    }

    #[test]
    fn document_id_prefers_source() {
        let mut meta = Meta::new();
        assert!(document_id("abc", &meta).starts_with("doc-"));
        meta.insert("source".into(), "a.md".into());
        assert_eq!(document_id("abc", &meta), "a.md");
    }
}
