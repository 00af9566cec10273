//! Core domain types for the dubbing queue.

mod segment;
mod snapshot;
mod speaker;
mod style;

pub use segment::{FILLER_TEXT, QueueItem, Segment, TurnId};
pub use snapshot::{SnapshotId, TranscriptSnapshot};
pub use speaker::SpeakerKey;
pub use style::{UnknownStyle, VoiceStyle};
