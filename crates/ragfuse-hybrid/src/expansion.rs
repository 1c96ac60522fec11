//! Domain-term query expansion.
//!
//! "perf" → "performance latency throughput ..." so the expanded embedding
//! lands nearer passages that use the long form.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use ragfuse_core::traits::QueryExpander;

/// Expansions are capped to keep the embedded query focused.
pub const MAX_EXPANSION_TERMS: usize = 5;

fn domain_terms() -> HashMap<&'static str, &'static [&'static str]> {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("perf", &["performance", "latency", "throughput", "benchmark"]);
    m.insert("performance", &["latency", "throughput", "optimization", "speed"]);
    m.insert("slow", &["latency", "performance", "bottleneck"]);
    m.insert("fast", &["performance", "speed", "low latency"]);
    m.insert("cache", &["caching", "invalidation", "ttl", "memoization"]);
    m.insert("db", &["database", "sql", "query", "schema", "index"]);
    m.insert("database", &["sql", "storage", "schema", "index"]);
    m.insert("search", &["retrieval", "ranking", "index", "query"]);
    m.insert("rag", &["retrieval", "augmented", "generation", "context"]);
    m.insert("llm", &["language model", "generation", "prompt"]);
    m.insert("embedding", &["vector", "dense", "semantic"]);
    m.insert("vector", &["embedding", "similarity", "nearest neighbor"]);
    m.insert("auth", &["authentication", "authorization", "login", "session"]);
    m.insert("api", &["endpoint", "route", "handler", "rest"]);
    m.insert("config", &["configuration", "settings", "environment"]);
    m.insert("err", &["error", "exception", "failure"]);
    m.insert("error", &["failure", "exception", "fault"]);
    m.insert("deploy", &["release", "rollout", "pipeline", "rollback"]);
    m.insert("scale", &["scalability", "sharding", "replication", "load"]);
    m.insert("security", &["vulnerability", "encryption", "tls", "access control"]);
    m.insert("log", &["logging", "trace", "observability"]);
    m.insert("async", &["concurrent", "parallel", "future", "await"]);
    m
}

/// Expander backed by a fixed table of domain terms.
pub struct DomainTermExpander {
    terms: HashMap<&'static str, &'static [&'static str]>,
}

impl Default for DomainTermExpander {
    fn default() -> Self {
        Self { terms: domain_terms() }
    }
}

impl DomainTermExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Related terms not already present in `query`, at most five.
    pub fn related_terms(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
        let mut out: Vec<String> = Vec::new();
        for word in &words {
            let Some(related) = self.terms.get(word) else { continue };
            for term in *related {
                let present = words.contains(term) || out.iter().any(|t| t == term);
                if !present {
                    out.push((*term).to_string());
                }
            }
        }
        out.truncate(MAX_EXPANSION_TERMS);
        out
    }
}

#[async_trait]
impl QueryExpander for DomainTermExpander {
    async fn expand(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.related_terms(query))
    }
}
