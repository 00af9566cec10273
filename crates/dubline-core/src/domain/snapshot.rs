//! Transcript snapshots: full-text states of the external transcript source.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque snapshot identity.
///
/// Snapshots are deduplicated by this id alone; two snapshots with the same
/// id are the same snapshot even if their text differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SnapshotId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One full-text state of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    pub id: SnapshotId,
    /// Full source text; paragraphs separated by newlines.
    pub text: String,
    pub updated_at: DateTime<Utc>,
    /// Owning session, copied onto persisted results.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Owning user, copied onto persisted results.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl TranscriptSnapshot {
    /// Create a snapshot stamped with the current time and no owner.
    pub fn new(id: impl Into<SnapshotId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            updated_at: Utc::now(),
            session_id: None,
            user_id: None,
        }
    }

    #[must_use]
    pub fn with_owner(mut self, session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}
