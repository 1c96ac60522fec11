use std::sync::Arc;

use tracing::info;

use ragfuse_core::chunking::ChunkStrategySelector;
use ragfuse_core::config::RagConfig;
use ragfuse_core::traits::{AnswerGenerator, Embedder, QueryExpander, RerankProvider, VectorIndex};
use ragfuse_core::{Error, Result};
use ragfuse_hybrid::{DomainTermExpander, HybridRetriever};

use crate::pipeline::RagPipeline;
use crate::rerank::Reranker;

fn config_err(e: anyhow::Error) -> Error {
    Error::InvalidConfig(format!("{e:#}"))
}

/// Assembles a [`RagPipeline`]. Collaborators that are not set explicitly
/// are chosen from the config: mocks when `mock_mode` is on, live services
/// otherwise.
pub struct PipelineBuilder {
    config: RagConfig,
    embedder: Option<Arc<dyn Embedder>>,
    index: Option<Arc<dyn VectorIndex>>,
    reranker: Option<Arc<dyn RerankProvider>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    expander: Option<Arc<dyn QueryExpander>>,
}

impl PipelineBuilder {
    pub fn new(config: RagConfig) -> Self {
        Self { config, embedder: None, index: None, reranker: None, generator: None, expander: None }
    }

    /// Pipeline with every collaborator selected by `config.mock_mode`.
    pub async fn from_config(config: RagConfig) -> Result<RagPipeline> {
        Self::new(config).build().await
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn RerankProvider>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub async fn build(self) -> Result<RagPipeline> {
        let config = self.config;
        config.validate()?;

        let embedder = match self.embedder {
            Some(e) => e,
            None => ragfuse_embed::get_default_embedder(&config).map_err(config_err)?,
        };
        let index = match self.index {
            Some(i) => i,
            None => ragfuse_vector::get_default_index(&config).await.map_err(config_err)?,
        };
        let reranker = match self.reranker {
            Some(r) => r,
            None => ragfuse_llm::get_default_reranker(&config).map_err(config_err)?,
        };
        let generator = match self.generator {
            Some(g) => g,
            None => ragfuse_llm::get_default_generator(&config).map_err(config_err)?,
        };
        let expander: Arc<dyn QueryExpander> = match self.expander {
            Some(x) => x,
            None => Arc::new(DomainTermExpander::new()),
        };

        let chunker = ChunkStrategySelector::from_config(config.chunking.clone()).map_err(config_err)?;
        let retriever = HybridRetriever::from_config(embedder.clone(), index.clone(), expander, &config.retrieval);

        info!(
            mock_mode = config.mock_mode,
            embedder = embedder.id(),
            top_k = config.retrieval.top_k,
            alpha = config.retrieval.alpha,
            "pipeline ready"
        );
        Ok(RagPipeline {
            chunker,
            embedder,
            index,
            retriever,
            reranker: Reranker::new(reranker),
            generator,
            retrieval: config.retrieval.clone(),
            batch_size: config.embedding.batch_size,
        })
    }
}
