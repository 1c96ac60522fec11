//! Answer generation over an OpenAI-compatible chat completions API.
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use ragfuse_core::config::GeneratorConfig;
use ragfuse_core::traits::AnswerGenerator;
use ragfuse_core::types::Prompt;

use crate::sse::SseDeltaParser;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Value>,
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

enum StreamState {
    Pending(reqwest::RequestBuilder),
    Reading {
        body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
        parser: SseDeltaParser,
        queued: VecDeque<String>,
        exhausted: bool,
    },
}

impl OpenAiGenerator {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("generator.api_key is required outside mock mode"))?;
        let client = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn request(&self, prompt: &Prompt, stream: bool) -> reqwest::RequestBuilder {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        };
        self.client.post(&self.url).bearer_auth(&self.api_key).json(&body)
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!("chat completion failed with {status}: {text}");
    }
    Ok(response)
}

/// Advance the SSE reader until one content delta is available.
async fn next_delta(mut state: StreamState) -> Result<Option<(String, StreamState)>> {
    loop {
        state = match state {
            StreamState::Pending(request) => {
                let response = send(request).await?;
                StreamState::Reading {
                    body: response.bytes_stream().map(|r| r.map(|b| b.to_vec())).boxed(),
                    parser: SseDeltaParser::new(),
                    queued: VecDeque::new(),
                    exhausted: false,
                }
            }
            StreamState::Reading { mut body, mut parser, mut queued, exhausted } => {
                if let Some(delta) = queued.pop_front() {
                    return Ok(Some((delta, StreamState::Reading { body, parser, queued, exhausted })));
                }
                if exhausted || parser.is_done() {
                    return Ok(None);
                }
                match body.next().await {
                    Some(bytes) => {
                        queued.extend(parser.push(&bytes?));
                        StreamState::Reading { body, parser, queued, exhausted: false }
                    }
                    None => {
                        queued.extend(parser.finish());
                        StreamState::Reading { body, parser, queued, exhausted: true }
                    }
                }
            }
        };
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let response: ChatResponse = send(self.request(prompt, false)).await?.json().await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| anyhow!("chat completion returned no message content"))?;
        debug!(chars = content.len(), model = %self.model, "generated answer");
        Ok(content.to_string())
    }

    fn generate_stream(&self, prompt: &Prompt) -> BoxStream<'static, Result<String>> {
        // The request is only sent once the stream is first polled.
        let initial = StreamState::Pending(self.request(prompt, true));
        stream::try_unfold(initial, next_delta).boxed()
    }
}
