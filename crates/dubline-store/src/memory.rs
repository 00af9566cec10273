//! In-process adapters for demos and tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use dubline_core::domain::TranscriptSnapshot;
use dubline_core::ports::{
    ResultRecord, ResultSink, SinkError, SnapshotFeed, SourceError, TranscriptSource,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transcript source fed by [`publish`](Self::publish).
///
/// A published snapshot becomes the poll result and is pushed to every live
/// subscriber, so both delivery paths see it.
#[derive(Debug, Default)]
pub struct MemoryTranscriptSource {
    latest: Mutex<Option<TranscriptSnapshot>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TranscriptSnapshot>>>,
}

impl MemoryTranscriptSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `snapshot` the latest row and push it to subscribers.
    pub fn publish(&self, snapshot: TranscriptSnapshot) {
        lock(&self.subscribers).retain(|tx| tx.send(snapshot.clone()).is_ok());
        *lock(&self.latest) = Some(snapshot);
    }

    /// Update the latest row without notifying subscribers.
    pub fn set_latest(&self, snapshot: TranscriptSnapshot) {
        *lock(&self.latest) = Some(snapshot);
    }

    /// Number of subscribers still listening.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl TranscriptSource for MemoryTranscriptSource {
    async fn fetch_latest(&self) -> Result<Option<TranscriptSnapshot>, SourceError> {
        Ok(lock(&self.latest).clone())
    }

    async fn subscribe(&self) -> Result<SnapshotFeed, SourceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        Ok(rx)
    }
}

/// Result sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryResultSink {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemoryResultSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<ResultRecord> {
        lock(&self.records).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultSink for MemoryResultSink {
    async fn insert(&self, record: ResultRecord) -> Result<(), SinkError> {
        lock(&self.records).push(record);
        Ok(())
    }
}
