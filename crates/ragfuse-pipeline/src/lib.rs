//! ragfuse-pipeline
//!
//! Query orchestration: hybrid retrieval, optional reranking with a
//! non-fatal fallback, and grounded generation. Single-shot and streaming
//! entry points plus a side-by-side comparison of retrieval setups.

mod builder;
pub mod context;
mod pipeline;
pub mod rerank;
pub mod sample;

pub use builder::PipelineBuilder;
pub use context::{build_context, build_prompt, NO_RESULTS_ANSWER};
pub use pipeline::{Comparison, RagPipeline};
pub use rerank::Reranker;
pub use sample::sample_corpus;
