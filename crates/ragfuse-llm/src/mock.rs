//! Deterministic offline stand-ins for the reranking and generation services.
//!
//! Outputs depend only on the input text (through `stable_hash`), so repeated
//! calls and repeated test runs agree.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use ragfuse_core::hash::stable_hash;
use ragfuse_core::traits::{AnswerGenerator, RerankProvider};
use ragfuse_core::types::{Prompt, RerankScore};

/// Scores documents by query-term overlap with a small hash-derived jitter.
#[derive(Debug, Default, Clone)]
pub struct MockReranker;

impl MockReranker {
    pub fn new() -> Self {
        Self
    }

    fn relevance(query_terms: &[String], query: &str, document: &str) -> f32 {
        let doc = document.to_lowercase();
        let overlap = if query_terms.is_empty() {
            0.0
        } else {
            query_terms.iter().filter(|t| doc.contains(t.as_str())).count() as f32 / query_terms.len() as f32
        };
        let jitter = (stable_hash(&format!("{query}\u{1f}{document}")) % 1000) as f32 / 1000.0;
        0.8 * overlap + 0.2 * jitter
    }
}

#[async_trait]
impl RerankProvider for MockReranker {
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankScore>> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(str::to_string)
            .collect();
        let mut scores: Vec<RerankScore> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| RerankScore { index, relevance: Self::relevance(&terms, query, doc) })
            .collect();
        scores.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        scores.truncate(top_n);
        Ok(scores)
    }
}

const ANSWER_TEMPLATES: &[&str] = &[
    "Based on the retrieved context [1], {question} is addressed directly. The cited passages describe the relevant practices and the trade-offs involved.",
    "The sources agree on this point [1]. Regarding {question}, the documents recommend measuring first and then applying the targeted changes they describe.",
    "In short: {question} is covered by the material in [1]. The remaining passages add supporting detail and examples.",
    "According to the provided documents [1], the answer to {question} depends on the workload. The context lists the main options and when each applies.",
];

/// Canned answers picked by hashing the prompt.
#[derive(Debug, Default, Clone)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn answer_for(prompt: &Prompt) -> String {
        let key = format!("{}\n{}", prompt.system, prompt.user);
        let idx = (stable_hash(&key) % ANSWER_TEMPLATES.len() as u64) as usize;
        ANSWER_TEMPLATES[idx].replace("{question}", &format!("\"{}\"", question_of(&prompt.user)))
    }
}

/// The text after the last `Question:` marker, or the whole prompt.
fn question_of(user: &str) -> &str {
    user.rsplit_once("Question:").map_or(user, |(_, q)| q).trim()
}

#[async_trait]
impl AnswerGenerator for MockGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        Ok(Self::answer_for(prompt))
    }

    fn generate_stream(&self, prompt: &Prompt) -> BoxStream<'static, Result<String>> {
        let fragments: Vec<Result<String>> =
            Self::answer_for(prompt).split_inclusive(' ').map(|f| Ok(f.to_string())).collect();
        stream::iter(fragments).boxed()
    }
}
