use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the pitlane library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The data service answered with an error payload.
    #[error("{message}")]
    Store { message: String },

    /// The configured data service URL could not be used as a base URL.
    #[error("invalid data service url: {url}")]
    InvalidBaseUrl { url: String },

    /// Raised when a reference lookup targets a table without a natural key.
    #[error("table {table} has no reference column")]
    UnsupportedReference { table: &'static str },

    /// Dataset could not be located at the given path.
    #[error("dataset not found at {path}")]
    DatasetNotFound { path: PathBuf },

    /// Raised when a dataset file does not have the expected shape.
    #[error("invalid dataset: {message}")]
    InvalidDataset { message: String },

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for JSON decoding errors.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a store error from any message.
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store {
            message: message.into(),
        }
    }
}
