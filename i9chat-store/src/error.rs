//! Store errors.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Document or collection ids must be single, non-empty path segments.
    #[error("invalid document id: {0:?}")]
    InvalidId(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for i9chat_core::Error {
    fn from(e: StoreError) -> Self {
        i9chat_core::Error::Storage(e.to_string())
    }
}
