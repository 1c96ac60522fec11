//! Cross-encoder reranking over a Cohere-compatible `/rerank` endpoint.
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use ragfuse_core::config::RerankerConfig;
use ragfuse_core::traits::RerankProvider;
use ragfuse_core::types::RerankScore;

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

pub struct HttpReranker {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpReranker {
    pub fn from_config(config: &RerankerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("reranker.api_key is required outside mock mode"))?;
        let client = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self { client, endpoint: config.endpoint.clone(), api_key, model: config.model.clone() })
    }
}

#[async_trait]
impl RerankProvider for HttpReranker {
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankScore>> {
        if documents.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        let body = RerankRequest { model: &self.model, query, documents, top_n };
        let response = self.client.post(&self.endpoint).bearer_auth(&self.api_key).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("rerank request failed with {status}: {text}");
        }
        let parsed: RerankResponse = response.json().await?;
        debug!(documents = documents.len(), returned = parsed.results.len(), "rerank response");
        let mut scores: Vec<RerankScore> = parsed
            .results
            .into_iter()
            .map(|r| RerankScore { index: r.index, relevance: r.relevance_score })
            .collect();
        scores.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        scores.truncate(top_n);
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_rejected() {
        let cfg = RerankerConfig { api_key: Some("  ".into()), ..RerankerConfig::default() };
        assert!(HttpReranker::from_config(&cfg).is_err());
    }

    #[test]
    fn response_shape_parses() -> Result<()> {
        let raw = r#"{"id":"x","results":[{"index":2,"relevance_score":0.91},{"index":0,"relevance_score":0.12}]}"#;
        let parsed: RerankResponse = serde_json::from_str(raw)?;
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].index, 2);
        Ok(())
    }
}
