//! Result commit step.

use std::sync::Arc;

use tracing::{debug, warn};

use dubline_core::domain::QueueItem;
use dubline_core::events::DubEvent;
use dubline_core::ports::{DubEventEmitter, ResultRecord, ResultSink};

/// What happened to a completed item's translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Persisted,
    /// Filler item, or nothing was captured.
    Skipped,
    /// The sink refused or failed; the error was logged.
    Failed,
}

/// Persists completed translations.
///
/// A record is written only for items that came from a snapshot and whose
/// trimmed translation is non-empty. Sink failures are logged, never raised.
pub struct ResultCommitter {
    sink: Arc<dyn ResultSink>,
    emitter: Arc<dyn DubEventEmitter>,
    session_id: Option<String>,
    user_id: Option<String>,
}

impl ResultCommitter {
    pub fn new(sink: Arc<dyn ResultSink>, emitter: Arc<dyn DubEventEmitter>) -> Self {
        Self {
            sink,
            emitter,
            session_id: None,
            user_id: None,
        }
    }

    /// Owner ids used when a snapshot carries none.
    #[must_use]
    pub fn with_fallback_owner(mut self, session_id: Option<String>, user_id: Option<String>) -> Self {
        self.session_id = session_id;
        self.user_id = user_id;
        self
    }

    /// Build the record for `item`, or `None` if it must not be persisted.
    #[must_use]
    pub fn record_for(&self, item: &QueueItem, translation: &str, language: &str) -> Option<ResultRecord> {
        let snapshot = item.snapshot.as_ref()?;
        let translated = translation.trim();
        if translated.is_empty() {
            return None;
        }

        Some(ResultRecord {
            session_id: snapshot.session_id.clone().or_else(|| self.session_id.clone()),
            user_id: snapshot.user_id.clone().or_else(|| self.user_id.clone()),
            original_text: item.segment.display_text.clone(),
            translated_text: translated.to_string(),
            language: language.to_string(),
        })
    }

    pub async fn commit(&self, item: &QueueItem, translation: &str, language: &str) -> CommitOutcome {
        let turn_id = item.turn_id();
        let Some(record) = self.record_for(item, translation, language) else {
            debug!(target: "dubline.queue", turn = ?turn_id, "Nothing to persist");
            return CommitOutcome::Skipped;
        };

        match self.sink.insert(record).await {
            Ok(()) => {
                debug!(target: "dubline.queue", turn = ?turn_id, "Result persisted");
                self.emitter.emit(DubEvent::ResultPersisted { turn_id });
                CommitOutcome::Persisted
            }
            Err(e) => {
                warn!(target: "dubline.queue", turn = ?turn_id, error = %e, "Failed to persist result");
                self.emitter.emit(DubEvent::ResultPersistFailed {
                    turn_id,
                    error: e.to_string(),
                });
                CommitOutcome::Failed
            }
        }
    }
}
