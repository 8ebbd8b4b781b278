use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Raised when a query runs before any successful build.
    #[error("Vector index not found at {}. Run 'ruleseer-indexer' to build it first.", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Embedding model failure: {0:#}")]
    Embedding(anyhow::Error),

    #[error("Index store failure: {0:#}")]
    Store(anyhow::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_index_not_found(&self) -> bool {
        matches!(self, Self::IndexNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
