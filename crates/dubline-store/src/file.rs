//! Local file adapters.
//!
//! [`FileTranscriptSource`] treats a text file as the transcript table: its
//! identity is its modification time plus length, so any save that changes
//! either produces a new snapshot. [`JsonlResultSink`] appends one JSON
//! object per record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use dubline_core::domain::TranscriptSnapshot;
use dubline_core::ports::{
    ResultRecord, ResultSink, SinkError, SnapshotFeed, SourceError, TranscriptSource,
};

/// Polls a text file for changes.
#[derive(Debug, Clone)]
pub struct FileTranscriptSource {
    path: PathBuf,
    session_id: Option<String>,
    user_id: Option<String>,
}

impl FileTranscriptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            session_id: None,
            user_id: None,
        }
    }

    /// Stamp every snapshot with an owner.
    #[must_use]
    pub fn with_owner(mut self, session_id: Option<String>, user_id: Option<String>) -> Self {
        self.session_id = session_id;
        self.user_id = user_id;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn fetch_latest(&self) -> Result<Option<TranscriptSnapshot>, SourceError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let modified = metadata.modified()?;
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let text = tokio::fs::read_to_string(&self.path).await?;

        let mut snapshot = TranscriptSnapshot::new(format!("{nanos}-{}", metadata.len()), text)
            .with_updated_at(DateTime::<Utc>::from(modified));
        snapshot.session_id.clone_from(&self.session_id);
        snapshot.user_id.clone_from(&self.user_id);
        Ok(Some(snapshot))
    }

    async fn subscribe(&self) -> Result<SnapshotFeed, SourceError> {
        Err(SourceError::PushUnsupported)
    }
}

#[derive(Serialize)]
struct JsonlLine<'a> {
    recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a ResultRecord,
}

/// Appends records to a JSON-lines file, creating it on first write.
#[derive(Debug)]
pub struct JsonlResultSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for JsonlResultSink {
    async fn insert(&self, record: ResultRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&JsonlLine {
            recorded_at: Utc::now(),
            record: &record,
        })?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> ResultRecord {
        ResultRecord {
            session_id: Some("sess".into()),
            user_id: None,
            original_text: text.into(),
            translated_text: format!("{text} (es)"),
            language: "es".into(),
        }
    }

    #[tokio::test]
    async fn missing_file_has_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTranscriptSource::new(dir.path().join("absent.txt"));
        assert_eq!(source.fetch_latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_id_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        std::fs::write(&path, "Male 1: Hi\n").unwrap();

        let source = FileTranscriptSource::new(&path).with_owner(Some("sess".into()), None);
        let first = source.fetch_latest().await.unwrap().unwrap();
        let again = source.fetch_latest().await.unwrap().unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.text, "Male 1: Hi\n");
        assert_eq!(first.session_id.as_deref(), Some("sess"));

        std::fs::write(&path, "Male 1: Hi\nFemale 1: Hello\n").unwrap();
        let changed = source.fetch_latest().await.unwrap().unwrap();
        assert_ne!(changed.id, first.id);
    }

    #[tokio::test]
    async fn file_source_is_poll_only() {
        let source = FileTranscriptSource::new("transcript.txt");
        assert!(matches!(
            source.subscribe().await,
            Err(SourceError::PushUnsupported)
        ));
    }

    #[tokio::test]
    async fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlResultSink::new(dir.path().join("results.jsonl"));

        sink.insert(record("one")).await.unwrap();
        sink.insert(record("two")).await.unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["original_text"], "one");
        assert_eq!(lines[1]["translated_text"], "two (es)");
        assert!(lines[0]["recorded_at"].is_string());
    }

    #[tokio::test]
    async fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlResultSink::new(dir.path().join("missing").join("results.jsonl"));
        assert!(matches!(
            sink.insert(record("x")).await,
            Err(SinkError::Io(_))
        ));
    }
}
