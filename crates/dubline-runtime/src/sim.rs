//! Simulated speech channel.
//!
//! Stands in for a live synthesis endpoint: `send` hands the text to a
//! background task that, after a configurable latency, queues audio on a
//! virtual playback clock and streams back a transcript. Playback progress
//! follows the tokio clock, so tests can drive it with paused time.
//!
//! The "translation" a simulated channel streams back is simply the sent
//! text with its stage directions removed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use dubline_core::domain::SpeakerKey;
use dubline_core::ports::{
    ChannelConfig, ChannelError, ChannelEvent, ChannelState, PlaybackState, SpeechChannel,
};

const EVENT_CAPACITY: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Behaviour knobs for a [`SimulatedChannel`].
#[derive(Debug, Clone)]
pub struct SimulatedChannelConfig {
    /// Delay between `send` and the first audio/transcript.
    pub synthesis_latency: Duration,
    /// Speaking rate used to size the queued audio.
    pub chars_per_second: f64,
    /// When false, sends are accepted but no audio is ever queued.
    pub deliver_audio: bool,
    /// When false, no transcript text is streamed back.
    pub deliver_transcript: bool,
    /// Make `connect` fail.
    pub fail_connect: bool,
}

impl Default for SimulatedChannelConfig {
    fn default() -> Self {
        Self {
            synthesis_latency: Duration::from_millis(300),
            chars_per_second: 15.0,
            deliver_audio: true,
            deliver_transcript: true,
            fail_connect: false,
        }
    }
}

/// One text handed to a simulated channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub speaker: SpeakerKey,
    pub text: String,
    pub at: Instant,
}

/// Shared, ordered record of every send across a set of simulated channels.
#[derive(Debug, Clone, Default)]
pub struct SendJournal(Arc<Mutex<Vec<SentText>>>);

impl SendJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, speaker: SpeakerKey, text: &str) {
        lock(&self.0).push(SentText {
            speaker,
            text: text.to_string(),
            at: Instant::now(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> Vec<SentText> {
        lock(&self.0).clone()
    }

    /// `(speaker, text)` pairs in send order.
    #[must_use]
    pub fn sends(&self) -> Vec<(SpeakerKey, String)> {
        lock(&self.0)
            .iter()
            .map(|s| (s.speaker, s.text.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.0).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Virtual audio engine: tracks when queued audio runs out.
#[derive(Debug)]
struct PlaybackClock {
    epoch: Instant,
    end_of_queue: Instant,
}

impl PlaybackClock {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            epoch: now,
            end_of_queue: now,
        }
    }

    fn enqueue(&mut self, audio: Duration) {
        let start = self.end_of_queue.max(Instant::now());
        self.end_of_queue = start + audio;
    }

    fn stop(&mut self) {
        let now = Instant::now();
        if self.end_of_queue > now {
            self.end_of_queue = now;
        }
    }

    fn state(&self) -> PlaybackState {
        PlaybackState {
            buffered_secs: self
                .end_of_queue
                .saturating_duration_since(Instant::now())
                .as_secs_f64(),
            end_of_queue_secs: self
                .end_of_queue
                .saturating_duration_since(self.epoch)
                .as_secs_f64(),
        }
    }
}

/// A speech channel backed by a virtual playback clock.
pub struct SimulatedChannel {
    speaker: SpeakerKey,
    config: SimulatedChannelConfig,
    state: Arc<Mutex<ChannelState>>,
    events: broadcast::Sender<ChannelEvent>,
    clock: Arc<Mutex<PlaybackClock>>,
    journal: SendJournal,
}

impl SimulatedChannel {
    #[must_use]
    pub fn new(speaker: SpeakerKey, config: SimulatedChannelConfig) -> Self {
        Self::with_journal(speaker, config, SendJournal::new())
    }

    /// Create a channel that records its sends into a shared journal.
    #[must_use]
    pub fn with_journal(
        speaker: SpeakerKey,
        config: SimulatedChannelConfig,
        journal: SendJournal,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            speaker,
            config,
            state: Arc::new(Mutex::new(ChannelState::Disconnected)),
            events,
            clock: Arc::new(Mutex::new(PlaybackClock::new())),
            journal,
        }
    }

    /// Drop the connection as if the remote side closed it.
    pub fn force_disconnect(&self) {
        *lock(&self.state) = ChannelState::Disconnected;
        let _ = self.events.send(ChannelEvent::Closed {
            reason: Some("simulated disconnect".into()),
        });
    }

    /// Raise an interruption as if the remote side cut generation short.
    pub fn interrupt(&self) {
        *lock(&self.state) = ChannelState::Interrupted;
        let _ = self.events.send(ChannelEvent::Interrupted);
    }

    /// Inject a transcript chunk directly.
    pub fn push_transcript(&self, text: &str, is_final: bool) {
        let _ = self.events.send(ChannelEvent::Transcript {
            text: text.to_string(),
            is_final,
        });
    }

    /// Text with parenthesised stage directions and ellipses removed.
    fn spoken_text(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut depth = 0_u32;
        for c in text.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ if depth == 0 => out.push(c),
                _ => {}
            }
        }
        out.replace("...", " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn audio_length(&self, text: &str) -> Duration {
        #[expect(
            clippy::cast_precision_loss,
            reason = "character counts are far below f64 precision limits"
        )]
        let chars = text.chars().count().max(1) as f64;
        Duration::from_secs_f64(chars / self.config.chars_per_second.max(0.1))
    }
}

#[async_trait]
impl SpeechChannel for SimulatedChannel {
    fn speaker(&self) -> SpeakerKey {
        self.speaker
    }

    fn state(&self) -> ChannelState {
        *lock(&self.state)
    }

    async fn connect(&self, config: &ChannelConfig) -> Result<(), ChannelError> {
        *lock(&self.state) = ChannelState::Connecting;

        if self.config.fail_connect {
            *lock(&self.state) = ChannelState::Disconnected;
            return Err(ChannelError::ConnectFailed {
                speaker: self.speaker,
                reason: "simulated connect failure".into(),
            });
        }

        *lock(&self.state) = ChannelState::Connected;
        let _ = self.events.send(ChannelEvent::Opened);
        tracing::debug!(speaker = %self.speaker, voice = %config.voice, "Simulated channel connected");
        Ok(())
    }

    async fn disconnect(&self) {
        *lock(&self.state) = ChannelState::Disconnected;
        lock(&self.clock).stop();
        let _ = self.events.send(ChannelEvent::Closed { reason: None });
    }

    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        {
            let mut state = lock(&self.state);
            if !state.is_connected() {
                return Err(ChannelError::NotConnected(self.speaker));
            }
            *state = ChannelState::Connected;
        }

        self.journal.record(self.speaker, text);

        let spoken = Self::spoken_text(text);
        let audio = self.audio_length(&spoken);
        let latency = self.config.synthesis_latency;
        let deliver_audio = self.config.deliver_audio;
        let deliver_transcript = self.config.deliver_transcript;
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            if !lock(&state).is_connected() {
                return;
            }

            if deliver_audio {
                lock(&clock).enqueue(audio);
                let _ = events.send(ChannelEvent::AudioChunk(vec![0; 320]));
            }

            if deliver_transcript && !spoken.is_empty() {
                for word in spoken.split_inclusive(' ') {
                    let _ = events.send(ChannelEvent::Transcript {
                        text: word.to_string(),
                        is_final: false,
                    });
                }
                let _ = events.send(ChannelEvent::Transcript {
                    text: String::new(),
                    is_final: true,
                });
            }
        });

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    fn playback(&self) -> PlaybackState {
        lock(&self.clock).state()
    }

    fn stop_playback(&self) {
        lock(&self.clock).stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChannelConfig {
        ChannelConfig {
            voice: "Kore".into(),
            model: "sim".into(),
            language: "en".into(),
            instruction: None,
        }
    }

    #[test]
    fn spoken_text_drops_stage_directions() {
        assert_eq!(
            SimulatedChannel::spoken_text("(slowly) Hello there ... (long pause)"),
            "Hello there"
        );
        assert_eq!(SimulatedChannel::spoken_text("(clears throat)"), "");
    }

    #[tokio::test(start_paused = true)]
    async fn send_requires_connection() {
        let channel = SimulatedChannel::new(SpeakerKey::Male1, SimulatedChannelConfig::default());
        let err = channel.send("hi").await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConnected(SpeakerKey::Male1)));
    }

    #[tokio::test(start_paused = true)]
    async fn audio_arrives_after_latency_and_drains() {
        let channel = SimulatedChannel::new(SpeakerKey::Default, SimulatedChannelConfig::default());
        channel.connect(&config()).await.unwrap();

        let baseline = channel.playback().end_of_queue_secs;
        channel.send("fifteen chars!!").await.unwrap();
        assert!((channel.playback().end_of_queue_secs - baseline).abs() < f64::EPSILON);

        tokio::time::sleep(Duration::from_millis(350)).await;
        let state = channel.playback();
        assert!(state.end_of_queue_secs > baseline + 0.1);
        assert!(state.buffered_secs > 0.5);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(channel.playback().buffered_secs.abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn streams_transcript_words() {
        let channel = SimulatedChannel::new(SpeakerKey::Default, SimulatedChannelConfig::default());
        let mut events = channel.subscribe();
        channel.connect(&config()).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), ChannelEvent::Opened);

        channel.send("(excitedly) Hi there").await.unwrap();
        let mut text = String::new();
        loop {
            match events.recv().await.unwrap() {
                ChannelEvent::Transcript { is_final: true, .. } => break,
                ChannelEvent::Transcript { text: chunk, .. } => text.push_str(&chunk),
                _ => {}
            }
        }
        assert_eq!(text, "Hi there");
    }

    #[tokio::test(start_paused = true)]
    async fn journal_records_sends_across_channels() {
        let journal = SendJournal::new();
        let a = SimulatedChannel::with_journal(
            SpeakerKey::Male1,
            SimulatedChannelConfig::default(),
            journal.clone(),
        );
        let b = SimulatedChannel::with_journal(
            SpeakerKey::Female1,
            SimulatedChannelConfig::default(),
            journal.clone(),
        );
        a.connect(&config()).await.unwrap();
        b.connect(&config()).await.unwrap();

        a.send("one").await.unwrap();
        b.send("two").await.unwrap();

        assert_eq!(
            journal.sends(),
            [
                (SpeakerKey::Male1, "one".to_string()),
                (SpeakerKey::Female1, "two".to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_playback_clears_buffer() {
        let channel = SimulatedChannel::new(SpeakerKey::Default, SimulatedChannelConfig::default());
        channel.connect(&config()).await.unwrap();
        channel.send("a fairly long sentence to speak").await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(channel.playback().buffered_secs > 0.0);

        channel.stop_playback();
        assert!(channel.playback().buffered_secs.abs() < f64::EPSILON);
    }
}
