//! Canonical event union for the dubbing pipeline.
//!
//! These events feed the UI log (CLI output, SSE, desktop shells). They are
//! observational only: nothing in the pipeline reacts to its own events.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "segment_dispatched", "turnId": "…", "speaker": "male1", "text": "(slowly) Hi" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{SnapshotId, SpeakerKey, TurnId};
use crate::ports::ChannelState;

/// Why a queued segment never reached a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Style wrapping produced no text.
    EmptyText,
    /// The channel refused the send.
    SendFailed,
}

/// Canonical dubbing events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DubEvent {
    // ========== Source ==========
    /// A new snapshot passed deduplication and was segmented.
    SnapshotAccepted {
        #[serde(rename = "snapshotId")]
        snapshot_id: SnapshotId,
        /// Queue items produced, fillers included.
        items: usize,
    },

    // ========== Queue ==========
    SegmentQueued {
        #[serde(rename = "turnId")]
        turn_id: Option<TurnId>,
        speaker: SpeakerKey,
        /// Speaker-stripped text for display.
        text: String,
    },

    SegmentDispatched {
        #[serde(rename = "turnId")]
        turn_id: Option<TurnId>,
        speaker: SpeakerKey,
        /// Text exactly as sent to the channel.
        text: String,
    },

    SegmentDropped {
        #[serde(rename = "turnId")]
        turn_id: Option<TurnId>,
        speaker: SpeakerKey,
        reason: DropReason,
    },

    /// Streamed translation text for the in-flight turn.
    TranslationDelta {
        #[serde(rename = "turnId")]
        turn_id: Option<TurnId>,
        text: String,
    },

    SegmentCompleted {
        #[serde(rename = "turnId")]
        turn_id: Option<TurnId>,
        speaker: SpeakerKey,
        /// Full translation captured for this turn (may be empty).
        translation: String,
        /// Audio arrival was never observed within the arrival timeout.
        #[serde(rename = "arrivalTimedOut")]
        arrival_timed_out: bool,
        /// Playback did not drain within the drain timeout.
        #[serde(rename = "drainTimedOut")]
        drain_timed_out: bool,
    },

    DrainStarted {
        pending: usize,
    },

    /// Queue empty; orchestrator back to idle.
    DrainIdle,

    /// Drain stopped because the target channel was disconnected.
    DrainAborted {
        speaker: SpeakerKey,
        /// Items discarded, the one being dispatched included.
        dropped: usize,
    },

    // ========== Channels ==========
    ChannelStateChanged {
        speaker: SpeakerKey,
        state: ChannelState,
    },

    PlaybackInterrupted {
        /// Channel that reported the interruption.
        speaker: SpeakerKey,
    },

    ToolCallReceived {
        speaker: SpeakerKey,
        name: String,
    },

    // ========== Results ==========
    ResultPersisted {
        #[serde(rename = "turnId")]
        turn_id: Option<TurnId>,
    },

    ResultPersistFailed {
        #[serde(rename = "turnId")]
        turn_id: Option<TurnId>,
        error: String,
    },
}

impl DubEvent {
    /// Short, stable name of the event kind (for log filtering).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SnapshotAccepted { .. } => "snapshot_accepted",
            Self::SegmentQueued { .. } => "segment_queued",
            Self::SegmentDispatched { .. } => "segment_dispatched",
            Self::SegmentDropped { .. } => "segment_dropped",
            Self::TranslationDelta { .. } => "translation_delta",
            Self::SegmentCompleted { .. } => "segment_completed",
            Self::DrainStarted { .. } => "drain_started",
            Self::DrainIdle => "drain_idle",
            Self::DrainAborted { .. } => "drain_aborted",
            Self::ChannelStateChanged { .. } => "channel_state_changed",
            Self::PlaybackInterrupted { .. } => "playback_interrupted",
            Self::ToolCallReceived { .. } => "tool_call_received",
            Self::ResultPersisted { .. } => "result_persisted",
            Self::ResultPersistFailed { .. } => "result_persist_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = DubEvent::DrainStarted { pending: 4 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "drain_started");
        assert_eq!(json["pending"], 4);
    }

    #[test]
    fn turn_ids_use_camel_case_keys() {
        let event = DubEvent::ResultPersisted { turn_id: None };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("turnId").is_some());
        assert_eq!(event.kind(), "result_persisted");
    }

    #[test]
    fn round_trips_through_json() {
        let event = DubEvent::ChannelStateChanged {
            speaker: SpeakerKey::Female1,
            state: ChannelState::Connected,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: DubEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
