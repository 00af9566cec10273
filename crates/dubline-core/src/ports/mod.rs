//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the dubbing core expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP, file or audio types in any signature
//! - Every fallible operation has its own `thiserror` error type
//! - Channels are addressed by [`SpeakerKey`](crate::domain::SpeakerKey), never by index

pub mod event_emitter;
pub mod result_sink;
pub mod speech_channel;
pub mod timer;
pub mod transcript_source;

pub use event_emitter::{DubEventEmitter, NoopEmitter};
pub use result_sink::{ResultRecord, ResultSink, SinkError};
pub use speech_channel::{
    ChannelConfig, ChannelError, ChannelEvent, ChannelState, PlaybackProbe, PlaybackState,
    SpeechChannel, ToolCallRequest,
};
pub use timer::{Heartbeat, TimerPort};
pub use transcript_source::{SnapshotFeed, SourceError, TranscriptSource};

#[cfg(test)]
pub use result_sink::MockResultSink;
#[cfg(test)]
pub use transcript_source::MockTranscriptSource;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TranscriptSnapshot;

    #[test]
    fn mock_source_reports_missing_push() {
        let mut source = MockTranscriptSource::new();
        source
            .expect_subscribe()
            .returning(|| Err(SourceError::PushUnsupported));
        source
            .expect_fetch_latest()
            .returning(|| Ok(Some(TranscriptSnapshot::new("s1", "hello"))));

        let feed = tokio_test::block_on(source.subscribe());
        assert!(matches!(feed, Err(SourceError::PushUnsupported)));

        let latest = tokio_test::block_on(source.fetch_latest()).unwrap();
        assert_eq!(latest.map(|s| s.id), Some("s1".into()));
    }

    #[test]
    fn mock_sink_receives_record() {
        let mut sink = MockResultSink::new();
        sink.expect_insert()
            .withf(|record| record.translated_text == "hola" && record.language == "es")
            .times(1)
            .returning(|_| Ok(()));

        let record = ResultRecord {
            session_id: Some("session".into()),
            user_id: None,
            original_text: "hello".into(),
            translated_text: "hola".into(),
            language: "es".into(),
        };
        tokio_test::block_on(sink.insert(record)).unwrap();
    }
}
