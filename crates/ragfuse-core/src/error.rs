use thiserror::Error;

use crate::types::QueryStage;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(#[source] anyhow::Error),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] anyhow::Error),

    #[error("Generation failed: {0}")]
    Generation(#[source] anyhow::Error),
}

impl Error {
    /// The query stage an error surfaced from, if it came from one.
    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            Self::Retrieval(_) => Some(QueryStage::Retrieving),
            Self::Generation(_) => Some(QueryStage::Generating),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
