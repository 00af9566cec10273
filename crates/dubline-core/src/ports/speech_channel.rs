//! Speech channel port: one bidirectional synthesis endpoint per speaker.
//!
//! A channel is a black box: text goes in via [`SpeechChannel::send`],
//! audio is queued on the channel's own playback engine, and streamed
//! transcript text comes back as [`ChannelEvent`]s. The orchestrator only
//! *reads* playback progress through [`SpeechChannel::playback`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::SpeakerKey;

/// Connection state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    /// The remote side interrupted generation. The connection stays open.
    Interrupted,
}

impl ChannelState {
    /// Whether text can be sent on the channel.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Interrupted)
    }
}

/// Connection parameters shared by every channel in a pool.
///
/// The pool overrides `voice` per speaker before connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub voice: String,
    /// Synthesis model identifier.
    pub model: String,
    /// Target language of the translation.
    pub language: String,
    /// Persona / system instruction text, generated elsewhere.
    #[serde(default)]
    pub instruction: Option<String>,
}

impl ChannelConfig {
    /// Copy of this config bound to `speaker`'s voice.
    #[must_use]
    pub fn for_speaker(&self, speaker: SpeakerKey) -> Self {
        Self {
            voice: speaker.voice().to_string(),
            ..self.clone()
        }
    }
}

/// A tool invocation requested by the remote model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Events emitted by a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Opened,
    Closed { reason: Option<String> },
    /// All buffered audio, on every channel, should stop.
    Interrupted,
    /// Encoded audio; already queued on the channel's playback engine.
    AudioChunk(Vec<u8>),
    /// Streamed output transcript (the translation being spoken).
    Transcript { text: String, is_final: bool },
    ToolCall(ToolCallRequest),
}

/// Playback progress of one channel's audio engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Seconds of audio queued but not yet played.
    pub buffered_secs: f64,
    /// Engine-clock timestamp (seconds) at which the queued audio ends.
    pub end_of_queue_secs: f64,
}

/// Errors returned by channel operations.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("Channel '{0}' is not connected")]
    NotConnected(SpeakerKey),

    #[error("Failed to connect channel '{speaker}': {reason}")]
    ConnectFailed { speaker: SpeakerKey, reason: String },

    #[error("Failed to send on channel '{speaker}': {reason}")]
    SendFailed { speaker: SpeakerKey, reason: String },
}

/// One independently connected synthesis endpoint bound to a fixed voice.
#[async_trait]
pub trait SpeechChannel: Send + Sync {
    /// Speaker this channel serves.
    fn speaker(&self) -> SpeakerKey;

    fn state(&self) -> ChannelState;

    async fn connect(&self, config: &ChannelConfig) -> Result<(), ChannelError>;

    async fn disconnect(&self);

    /// Send text for synthesis. Returns once the text has been handed off,
    /// not when audio arrives.
    async fn send(&self, text: &str) -> Result<(), ChannelError>;

    /// Subscribe to this channel's events.
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;

    /// Current playback progress of this channel's audio engine.
    fn playback(&self) -> PlaybackState;

    /// Drop all queued audio immediately.
    fn stop_playback(&self);
}

/// Read-only playback query across a set of channels.
pub trait PlaybackProbe: Send + Sync {
    /// Playback state of `speaker`'s channel, or of the primary channel when
    /// `speaker` is `None`.
    fn playback_state(&self, speaker: Option<SpeakerKey>) -> PlaybackState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_counts_as_connected() {
        assert!(ChannelState::Connected.is_connected());
        assert!(ChannelState::Interrupted.is_connected());
        assert!(!ChannelState::Connecting.is_connected());
        assert!(!ChannelState::Disconnected.is_connected());
    }

    #[test]
    fn config_for_speaker_swaps_voice_only() {
        let base = ChannelConfig {
            voice: "ignored".into(),
            model: "live-native-audio".into(),
            language: "es".into(),
            instruction: Some("Translate to Spanish".into()),
        };
        let male = base.for_speaker(SpeakerKey::Male1);
        assert_eq!(male.voice, SpeakerKey::Male1.voice());
        assert_eq!(male.model, base.model);
        assert_eq!(male.instruction, base.instruction);
    }

    #[test]
    fn errors_name_their_speaker() {
        assert_eq!(
            ChannelError::NotConnected(SpeakerKey::Male1).to_string(),
            "Channel 'Male 1' is not connected"
        );
        let failed = ChannelError::SendFailed {
            speaker: SpeakerKey::Female2,
            reason: "socket closed".into(),
        };
        assert_eq!(
            failed.to_string(),
            "Failed to send on channel 'Female 2': socket closed"
        );
    }
}
