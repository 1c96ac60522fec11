//! ragfuse-hybrid
//!
//! Hybrid retrieval: a dense nearest-neighbour query and a keyword payload
//! scan against the same index, merged by weighted Reciprocal Rank Fusion.

pub mod expansion;
pub mod fusion;
pub mod keyword;
mod retriever;

pub use expansion::DomainTermExpander;
pub use fusion::{fingerprint, rrf_fuse, DEFAULT_RRF_K};
pub use retriever::HybridRetriever;
