//! Segments and queue items.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::snapshot::TranscriptSnapshot;
use super::speaker::SpeakerKey;
use super::style::VoiceStyle;

/// Literal text of the synthetic filler segment.
pub const FILLER_TEXT: &str = "(clears throat)";

/// Identifier of one dispatched turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(Uuid);

impl TurnId {
    /// Mint a fresh, globally unique turn id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One speakable unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Text as it appeared in the source, speaker tag included.
    pub raw_text: String,
    pub speaker: SpeakerKey,
    /// Text with the speaker tag removed. This is what gets styled and sent.
    pub display_text: String,
    /// `None` only for synthetic filler segments.
    pub turn_id: Option<TurnId>,
}

impl Segment {
    /// Build a segment from one trimmed source paragraph.
    ///
    /// A leading speaker tag is stripped and recorded; otherwise the segment
    /// targets the default channel.
    #[must_use]
    pub fn from_paragraph(paragraph: &str) -> Self {
        let (speaker, display) = SpeakerKey::strip_tag(paragraph)
            .unwrap_or((SpeakerKey::Default, paragraph));

        Self {
            raw_text: paragraph.to_string(),
            speaker,
            display_text: display.to_string(),
            turn_id: Some(TurnId::generate()),
        }
    }

    /// The synthetic throat-clearing segment.
    #[must_use]
    pub fn filler() -> Self {
        Self {
            raw_text: FILLER_TEXT.to_string(),
            speaker: SpeakerKey::Default,
            display_text: FILLER_TEXT.to_string(),
            turn_id: None,
        }
    }

    #[must_use]
    pub const fn is_filler(&self) -> bool {
        self.turn_id.is_none()
    }
}

/// A segment waiting in (or travelling through) the dispatch queue.
///
/// Owned by the queue orchestrator from enqueue to completion.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub segment: Segment,
    /// Snapshot the segment came from. `None` for filler items, which are
    /// therefore never persisted.
    pub snapshot: Option<Arc<TranscriptSnapshot>>,
}

impl QueueItem {
    #[must_use]
    pub const fn new(segment: Segment, snapshot: Arc<TranscriptSnapshot>) -> Self {
        Self {
            segment,
            snapshot: Some(snapshot),
        }
    }

    #[must_use]
    pub fn filler() -> Self {
        Self {
            segment: Segment::filler(),
            snapshot: None,
        }
    }

    #[must_use]
    pub const fn turn_id(&self) -> Option<TurnId> {
        self.segment.turn_id
    }

    #[must_use]
    pub const fn speaker(&self) -> SpeakerKey {
        self.segment.speaker
    }

    #[must_use]
    pub const fn is_filler(&self) -> bool {
        self.segment.is_filler()
    }

    /// Text to hand the channel under `style`. Fillers are sent verbatim.
    #[must_use]
    pub fn spoken_text(&self, style: VoiceStyle) -> String {
        if self.is_filler() {
            self.segment.display_text.clone()
        } else {
            style.apply(&self.segment.display_text)
        }
    }
}
