//! Adapter construction errors.
//!
//! Runtime failures are reported through the core port errors
//! (`SourceError`, `SinkError`); these only cover building an adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry a path (e.g. `mailto:`).
    #[error("Base URL cannot have a path: {0}")]
    NotABase(String),
}
