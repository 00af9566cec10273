//! Transcript source port: the external store that produces snapshots.
//!
//! Two delivery paths exist and may deliver the same snapshot twice:
//! polling via [`TranscriptSource::fetch_latest`] and push via
//! [`TranscriptSource::subscribe`]. Deduplication is the caller's job.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::TranscriptSnapshot;

/// Stream of pushed snapshots. Dropping the receiver unsubscribes.
pub type SnapshotFeed = mpsc::UnboundedReceiver<TranscriptSnapshot>;

/// Errors from the transcript source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or backend failure; retried on the next poll.
    #[error("Transcript source unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something that isn't a snapshot.
    #[error("Malformed transcript row: {0}")]
    Malformed(String),

    /// This source has no push path; callers fall back to polling.
    #[error("Push notifications are not supported by this source")]
    PushUnsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of transcript snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the most recently updated snapshot, if any.
    async fn fetch_latest(&self) -> Result<Option<TranscriptSnapshot>, SourceError>;

    /// Subscribe to pushed snapshot changes.
    async fn subscribe(&self) -> Result<SnapshotFeed, SourceError>;
}
