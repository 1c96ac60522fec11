//! Typed configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars (nested keys separated by `__`,
//! e.g. `APP_RETRIEVAL__ALPHA=0.5`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Use deterministic in-process collaborators instead of live services.
    pub mock_mode: bool,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub vector: VectorConfig,
    pub reranker: RerankerConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Narrative window in characters; structured window in tokens.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub code_chunk_size: usize,
    pub code_overlap: usize,
    /// Code-token matches per 100 characters above which text counts as code.
    pub code_threshold: f32,
    /// Structure-marker matches per 100 characters above which text counts as structured.
    pub structured_threshold: f32,
    /// Optional HuggingFace `tokenizer.json` used to count tokens for structured text.
    pub tokenizer_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub rerank_top_k: usize,
    /// Vector list weight in fusion; keyword list gets `1 - alpha`.
    pub alpha: f32,
    pub rrf_k: f32,
    pub use_query_expansion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model_dir: Option<String>,
    pub dimension: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    pub uri: String,
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            mock_mode: true,
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector: VectorConfig::default(),
            reranker: RerankerConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 128,
            code_chunk_size: 256,
            code_overlap: 64,
            code_threshold: 0.5,
            structured_threshold: 0.3,
            tokenizer_path: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10, rerank_top_k: 5, alpha: 0.7, rrf_k: 60.0, use_query_expansion: true }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { model_dir: None, dimension: 1024, max_len: 256, batch_size: 32 }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { uri: "./data/lancedb".to_string(), table: "chunks".to_string() }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cohere.com/v2/rerank".to_string(),
            api_key: None,
            model: "rerank-english-v3.0".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 120,
        }
    }
}

impl RagConfig {
    /// Load from the current directory using `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Load `config.toml` and `config.<env>.toml` from `dir`, then `APP_*` vars.
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(RagConfig::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self::from_figment(&figment)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 || c.chunk_overlap >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if c.code_chunk_size == 0 || c.code_overlap >= c.code_chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.code_overlap ({}) must be smaller than chunking.code_chunk_size ({})",
                c.code_overlap, c.code_chunk_size
            )));
        }
        let r = &self.retrieval;
        if !(0.0..=1.0).contains(&r.alpha) {
            return Err(Error::InvalidConfig(format!("retrieval.alpha must be within [0, 1], got {}", r.alpha)));
        }
        if r.top_k == 0 || r.rerank_top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k and retrieval.rerank_top_k must be positive".into()));
        }
        if r.rrf_k < 0.0 {
            return Err(Error::InvalidConfig("retrieval.rrf_k must not be negative".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be positive".into()));
        }
        if !self.mock_mode {
            if blank(self.generator.api_key.as_deref()) {
                return Err(Error::InvalidConfig("generator.api_key is required when mock_mode is off".into()));
            }
            if blank(self.reranker.api_key.as_deref()) {
                return Err(Error::InvalidConfig("reranker.api_key is required when mock_mode is off".into()));
            }
            if self.embedding.model_dir.is_none() {
                return Err(Error::InvalidConfig("embedding.model_dir is required when mock_mode is off".into()));
            }
        }
        Ok(())
    }
}

fn blank(v: Option<&str>) -> bool {
    v.map_or(true, |s| s.trim().is_empty())
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_toml(toml: &str) -> Result<RagConfig> {
        let figment = Figment::from(Serialized::defaults(RagConfig::default())).merge(Toml::string(toml));
        RagConfig::from_figment(&figment)
    }

    #[test]
    fn defaults_are_valid_mock_mode() {
        let c = RagConfig::default();
        assert!(c.mock_mode);
        c.validate().expect("defaults validate");
        assert_eq!(c.chunking.chunk_size, 512);
        assert_eq!(c.chunking.code_overlap, 64);
        assert!((c.retrieval.rrf_k - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn toml_overrides_nested_keys() {
        let c = with_toml("[retrieval]\nalpha = 0.25\ntop_k = 3\n").expect("valid");
        assert!((c.retrieval.alpha - 0.25).abs() < f32::EPSILON);
        assert_eq!(c.retrieval.top_k, 3);
        assert_eq!(c.retrieval.rerank_top_k, 5);
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let err = with_toml("[chunking]\nchunk_size = 10\nchunk_overlap = 10\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn alpha_out_of_range_is_rejected() {
        assert!(with_toml("[retrieval]\nalpha = 1.5\n").is_err());
    }

    #[test]
    fn live_mode_requires_credentials() {
        let err = with_toml("mock_mode = false\n").unwrap_err();
        assert!(err.to_string().contains("generator.api_key"));
        let ok = with_toml(
            "mock_mode = false\n[generator]\napi_key = \"g\"\n[reranker]\napi_key = \"r\"\n[embedding]\nmodel_dir = \"/models/bge-m3\"\n",
        );
        assert!(ok.is_ok());
    }
}
