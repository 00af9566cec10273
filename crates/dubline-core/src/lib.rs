#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod segmenter;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    FILLER_TEXT, QueueItem, Segment, SnapshotId, SpeakerKey, TranscriptSnapshot, TurnId,
    UnknownStyle, VoiceStyle,
};
pub use events::{DropReason, DubEvent};
pub use ports::{
    ChannelConfig, ChannelError, ChannelEvent, ChannelState, DubEventEmitter, Heartbeat,
    NoopEmitter, PlaybackProbe, PlaybackState, ResultRecord, ResultSink, SinkError, SnapshotFeed,
    SourceError, SpeechChannel, TimerPort, ToolCallRequest, TranscriptSource,
};
pub use segmenter::{DEFAULT_FILLER_EVERY, Segmenter, split_segments};
pub use settings::{
    DEFAULT_HEARTBEAT_MS, DEFAULT_QUEUE_SOFT_LIMIT, DeliveryProfile, DubbingSettings, QueueTiming,
    SettingsError, validate_settings,
};
