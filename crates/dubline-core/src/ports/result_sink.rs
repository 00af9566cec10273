//! Result sink port: append-only log of completed translations.
//!
//! Inserts are not idempotent. A retried network call may store the same
//! record twice; the sink is a log, not a ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One persisted translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    /// Segment text as sent for synthesis, speaker tag removed.
    pub original_text: String,
    /// Trimmed translation captured while the segment played.
    pub translated_text: String,
    pub language: String,
}

/// Errors from the result sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Result sink unavailable: {0}")]
    Unavailable(String),

    #[error("Result sink rejected record (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to encode result record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only storage for translation results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn insert(&self, record: ResultRecord) -> Result<(), SinkError>;
}
