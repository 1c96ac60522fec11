//! ragfuse-vector
//!
//! Vector index backends: LanceDB on disk for live use and an in-memory
//! brute-force index for mock mode.
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use ragfuse_core::config::{expand_path, RagConfig};
use ragfuse_core::traits::VectorIndex;

pub mod lance;
pub mod memory;
pub mod schema;
pub mod table;

pub use lance::LanceIndex;
pub use memory::MemoryIndex;

/// Index selected by `mock_mode`.
pub async fn get_default_index(config: &RagConfig) -> Result<Arc<dyn VectorIndex>> {
    if config.mock_mode {
        info!("using in-memory mock vector index");
        return Ok(Arc::new(MemoryIndex::new()));
    }
    let uri = expand_path(&config.vector.uri);
    info!(uri = %uri.display(), table = %config.vector.table, "opening LanceDB index");
    let index = LanceIndex::open(&uri.to_string_lossy(), &config.vector.table, config.embedding.dimension).await?;
    Ok(Arc::new(index))
}
