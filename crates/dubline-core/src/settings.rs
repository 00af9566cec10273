//! Settings domain types and validation.
//!
//! These are pure domain types with no infrastructure dependencies. The CLI
//! loads them from an optional JSON file and overrides fields from flags.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::VoiceStyle;
use crate::segmenter::DEFAULT_FILLER_EVERY;

/// Default heartbeat period for polling the transcript source.
pub const DEFAULT_HEARTBEAT_MS: u64 = 1_000;

/// Default pending-queue size above which intake logs a warning.
pub const DEFAULT_QUEUE_SOFT_LIMIT: usize = 64;

/// Poll cadences, timeouts and thresholds of the two playback waits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueTiming {
    /// How often the end-of-queue timestamp is sampled while waiting for audio.
    pub arrival_poll_ms: u64,
    /// Give up waiting for audio arrival after this long (non-fatal).
    pub arrival_timeout_ms: u64,
    /// End-of-queue must move past the baseline by more than this to count.
    pub arrival_epsilon_secs: f64,
    /// How often buffered duration is sampled while waiting for playback.
    pub drain_poll_ms: u64,
    /// Give up waiting for playback after this long (non-fatal).
    pub drain_timeout_ms: u64,
    /// Advance once buffered audio is at or below this many seconds. The
    /// remaining tail masks the next dispatch's network latency.
    pub drain_threshold_secs: f64,
}

impl QueueTiming {
    #[must_use]
    pub const fn arrival_poll(&self) -> Duration {
        Duration::from_millis(self.arrival_poll_ms)
    }

    #[must_use]
    pub const fn arrival_timeout(&self) -> Duration {
        Duration::from_millis(self.arrival_timeout_ms)
    }

    #[must_use]
    pub const fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms)
    }

    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for QueueTiming {
    fn default() -> Self {
        Self {
            arrival_poll_ms: 250,
            arrival_timeout_ms: 15_000,
            arrival_epsilon_secs: 0.1,
            drain_poll_ms: 100,
            drain_timeout_ms: 60_000,
            drain_threshold_secs: 0.5,
        }
    }
}

/// Settings that may change while segments are queued.
///
/// Read at dispatch (style) and commit (language) time, never at enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryProfile {
    pub style: VoiceStyle,
    /// Language code stored alongside each persisted translation.
    pub language: String,
}

impl Default for DeliveryProfile {
    fn default() -> Self {
        Self {
            style: VoiceStyle::Natural,
            language: "en".to_string(),
        }
    }
}

/// Application settings for one dubbing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DubbingSettings {
    pub style: VoiceStyle,
    pub language: String,

    /// Fallback session id for results whose snapshot carries none.
    pub session_id: Option<String>,

    /// Fallback user id for results whose snapshot carries none.
    pub user_id: Option<String>,

    /// Transcript source poll period.
    pub heartbeat_ms: u64,

    pub timing: QueueTiming,

    /// Real segments between two filler items. 0 turns fillers off.
    pub filler_every: u32,

    /// Treat the snapshot present at startup as already seen.
    pub skip_existing: bool,

    /// Pending items above which intake warns. Never enforced.
    pub queue_soft_limit: usize,
}

impl Default for DubbingSettings {
    fn default() -> Self {
        Self {
            style: VoiceStyle::Natural,
            language: "en".to_string(),
            session_id: None,
            user_id: None,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
            timing: QueueTiming::default(),
            filler_every: DEFAULT_FILLER_EVERY,
            skip_existing: false,
            queue_soft_limit: DEFAULT_QUEUE_SOFT_LIMIT,
        }
    }
}

impl DubbingSettings {
    #[must_use]
    pub const fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    /// The live part of these settings.
    #[must_use]
    pub fn delivery_profile(&self) -> DeliveryProfile {
        DeliveryProfile {
            style: self.style,
            language: self.language.clone(),
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("{timeout} ({timeout_ms} ms) must not be shorter than {poll} ({poll_ms} ms)")]
    TimeoutShorterThanPoll {
        timeout: &'static str,
        timeout_ms: u64,
        poll: &'static str,
        poll_ms: u64,
    },

    #[error("{0} must be a finite, non-negative number of seconds, got {1}")]
    InvalidSeconds(&'static str, f64),

    #[error("Language cannot be empty")]
    EmptyLanguage,
}

/// Validate settings before use.
pub fn validate_settings(settings: &DubbingSettings) -> Result<(), SettingsError> {
    if settings.language.trim().is_empty() {
        return Err(SettingsError::EmptyLanguage);
    }
    if settings.heartbeat_ms == 0 {
        return Err(SettingsError::ZeroInterval("heartbeat_ms"));
    }

    let t = &settings.timing;
    if t.arrival_poll_ms == 0 {
        return Err(SettingsError::ZeroInterval("arrival_poll_ms"));
    }
    if t.drain_poll_ms == 0 {
        return Err(SettingsError::ZeroInterval("drain_poll_ms"));
    }
    if t.arrival_timeout_ms < t.arrival_poll_ms {
        return Err(SettingsError::TimeoutShorterThanPoll {
            timeout: "arrival_timeout_ms",
            timeout_ms: t.arrival_timeout_ms,
            poll: "arrival_poll_ms",
            poll_ms: t.arrival_poll_ms,
        });
    }
    if t.drain_timeout_ms < t.drain_poll_ms {
        return Err(SettingsError::TimeoutShorterThanPoll {
            timeout: "drain_timeout_ms",
            timeout_ms: t.drain_timeout_ms,
            poll: "drain_poll_ms",
            poll_ms: t.drain_poll_ms,
        });
    }
    for (name, value) in [
        ("arrival_epsilon_secs", t.arrival_epsilon_secs),
        ("drain_threshold_secs", t.drain_threshold_secs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(SettingsError::InvalidSeconds(name, value));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_playback_contract() {
        let t = QueueTiming::default();
        assert_eq!(t.arrival_poll(), Duration::from_millis(250));
        assert_eq!(t.arrival_timeout(), Duration::from_secs(15));
        assert_eq!(t.drain_poll(), Duration::from_millis(100));
        assert_eq!(t.drain_timeout(), Duration::from_secs(60));
        assert!((t.arrival_epsilon_secs - 0.1).abs() < f64::EPSILON);
        assert!((t.drain_threshold_secs - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn default_settings_validate() {
        assert_eq!(validate_settings(&DubbingSettings::default()), Ok(()));
    }

    #[test]
    fn rejects_empty_language() {
        let settings = DubbingSettings {
            language: "  ".into(),
            ..DubbingSettings::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::EmptyLanguage)
        );
    }

    #[test]
    fn zero_filler_cadence_is_accepted() {
        let settings = DubbingSettings {
            filler_every: 0,
            ..DubbingSettings::default()
        };
        assert_eq!(validate_settings(&settings), Ok(()));
    }

    #[test]
    fn rejects_timeout_shorter_than_poll() {
        let mut settings = DubbingSettings::default();
        settings.timing.drain_timeout_ms = 50;
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::TimeoutShorterThanPoll { timeout: "drain_timeout_ms", .. })
        ));
    }

    #[test]
    fn rejects_negative_threshold() {
        let mut settings = DubbingSettings::default();
        settings.timing.drain_threshold_secs = -1.0;
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidSeconds("drain_threshold_secs", _))
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: DubbingSettings =
            serde_json::from_str(r#"{ "style": "dramatic", "timing": { "drain_timeout_ms": 30000 } }"#)
                .unwrap();
        assert_eq!(settings.style, VoiceStyle::Dramatic);
        assert_eq!(settings.timing.drain_timeout_ms, 30_000);
        assert_eq!(settings.timing.arrival_poll_ms, 250);
        assert_eq!(settings.language, "en");
    }
}
