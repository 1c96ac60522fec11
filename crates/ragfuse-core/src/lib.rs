//! ragfuse-core
//!
//! Domain types, collaborator traits, configuration and the chunking
//! strategies shared by every other crate in the workspace.

pub mod chunking;
pub mod config;
pub mod error;
pub mod hash;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
