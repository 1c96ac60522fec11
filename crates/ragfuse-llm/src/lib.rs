//! ragfuse-llm
//!
//! Reranking and answer generation providers: HTTP clients for live
//! services and hash-seeded mocks for offline runs.
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use ragfuse_core::config::RagConfig;
use ragfuse_core::traits::{AnswerGenerator, RerankProvider};

pub mod cohere;
pub mod mock;
pub mod openai;
pub mod sse;

pub use cohere::HttpReranker;
pub use mock::{MockGenerator, MockReranker};
pub use openai::OpenAiGenerator;

/// Reranking provider selected by `mock_mode`.
pub fn get_default_reranker(config: &RagConfig) -> Result<Arc<dyn RerankProvider>> {
    if config.mock_mode {
        return Ok(Arc::new(MockReranker::new()));
    }
    info!(endpoint = %config.reranker.endpoint, model = %config.reranker.model, "using HTTP reranker");
    Ok(Arc::new(HttpReranker::from_config(&config.reranker)?))
}

/// Answer generator selected by `mock_mode`.
pub fn get_default_generator(config: &RagConfig) -> Result<Arc<dyn AnswerGenerator>> {
    if config.mock_mode {
        return Ok(Arc::new(MockGenerator::new()));
    }
    info!(endpoint = %config.generator.endpoint, model = %config.generator.model, "using chat completions generator");
    Ok(Arc::new(OpenAiGenerator::from_config(&config.generator)?))
}
