//! ragfuse-embed
//!
//! Embedding providers: a local BGE-M3 model on candle for live use and a
//! deterministic hashed embedder for mock mode.
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::info;

use ragfuse_core::config::{expand_path, RagConfig};
use ragfuse_core::traits::Embedder;

pub mod augment;
pub mod bge;
pub mod device;
pub mod hashed;
pub mod pool;
pub mod tokenize;

pub use augment::augment_for_embedding;
pub use bge::BgeEmbedder;
pub use hashed::HashEmbedder;
pub use pool::masked_mean_l2;

/// Embedder selected by `mock_mode`.
pub fn get_default_embedder(config: &RagConfig) -> Result<Arc<dyn Embedder>> {
    if config.mock_mode {
        info!(dim = config.embedding.dimension, "using hashed mock embedder");
        return Ok(Arc::new(HashEmbedder::new(config.embedding.dimension)));
    }
    let dir = config
        .embedding
        .model_dir
        .as_deref()
        .ok_or_else(|| anyhow!("embedding.model_dir is not configured"))?;
    let path = expand_path(dir);
    if !path.exists() {
        return Err(anyhow!("Could not locate embedding model directory {}", path.display()));
    }
    Ok(Arc::new(BgeEmbedder::load(&path, config.embedding.max_len)?))
}
