//! Speech channel pool.
//!
//! One channel per speaker, keyed by [`SpeakerKey`]. The pool is shared by
//! the orchestrator (sends), the transcript router (events) and anyone
//! querying playback; it holds no lock over the channels themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dubline_core::domain::SpeakerKey;
use dubline_core::ports::{
    ChannelConfig, ChannelError, ChannelEvent, ChannelState, PlaybackProbe, PlaybackState,
    SpeechChannel,
};

use crate::error::RuntimeError;

/// Event tagged with the speaker whose channel produced it.
pub type PoolEvent = (SpeakerKey, ChannelEvent);

/// Keyed collection of speech channels.
pub struct ChannelPool {
    channels: BTreeMap<SpeakerKey, Arc<dyn SpeechChannel>>,
    /// Non-primary channels whose initial connect failed.
    unavailable: Mutex<BTreeSet<SpeakerKey>>,
}

impl ChannelPool {
    /// Build a pool from channels keyed by their own speaker.
    ///
    /// A later channel for the same speaker replaces an earlier one.
    pub fn new(channels: impl IntoIterator<Item = Arc<dyn SpeechChannel>>) -> Self {
        let channels = channels
            .into_iter()
            .map(|channel| (channel.speaker(), channel))
            .collect();
        Self {
            channels,
            unavailable: Mutex::new(BTreeSet::new()),
        }
    }

    /// Build one channel for every entry of the speaker table.
    pub fn from_table<F>(mut factory: F) -> Self
    where
        F: FnMut(SpeakerKey) -> Arc<dyn SpeechChannel>,
    {
        Self::new(SpeakerKey::ALL.into_iter().map(&mut factory))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn speakers(&self) -> impl Iterator<Item = SpeakerKey> + '_ {
        self.channels.keys().copied()
    }

    /// The channel registered for exactly this speaker.
    #[must_use]
    pub fn get(&self, speaker: SpeakerKey) -> Option<&Arc<dyn SpeechChannel>> {
        self.channels.get(&speaker)
    }

    /// The channel a segment for `speaker` should be sent on.
    ///
    /// Speakers without a channel, or whose channel failed its initial
    /// connect, fall back to the primary channel.
    #[must_use]
    pub fn resolve(&self, speaker: SpeakerKey) -> Option<&Arc<dyn SpeechChannel>> {
        let usable = speaker.is_default()
            || !self
                .unavailable
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&speaker);

        match self.channels.get(&speaker) {
            Some(channel) if usable => Some(channel),
            _ => self.channels.get(&SpeakerKey::Default),
        }
    }

    /// Connect every channel with `base`, bound to each speaker's voice.
    ///
    /// Returns the per-channel outcomes. Fails only when no channel at all
    /// could be connected.
    pub async fn connect_all(
        &self,
        base: &ChannelConfig,
    ) -> Result<Vec<(SpeakerKey, Result<(), ChannelError>)>, RuntimeError> {
        let mut outcomes = Vec::with_capacity(self.channels.len());

        for (&speaker, channel) in &self.channels {
            let config = base.for_speaker(speaker);
            let result = channel.connect(&config).await;

            let mut unavailable = self
                .unavailable
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match &result {
                Ok(()) => {
                    unavailable.remove(&speaker);
                    info!(target: "dubline.pool", speaker = %speaker, voice = %config.voice, "Channel connected");
                }
                Err(e) if speaker.is_default() => {
                    warn!(target: "dubline.pool", speaker = %speaker, error = %e, "Primary channel failed to connect");
                }
                Err(e) => {
                    unavailable.insert(speaker);
                    warn!(
                        target: "dubline.pool",
                        speaker = %speaker,
                        error = %e,
                        "Channel failed to connect, its segments will use the primary channel"
                    );
                }
            }
            drop(unavailable);

            outcomes.push((speaker, result));
        }

        if outcomes.iter().all(|(_, r)| r.is_err()) {
            return Err(RuntimeError::NoChannelConnected);
        }
        Ok(outcomes)
    }

    pub async fn disconnect_all(&self) {
        for (speaker, channel) in &self.channels {
            channel.disconnect().await;
            debug!(target: "dubline.pool", speaker = %speaker, "Channel disconnected");
        }
    }

    /// Drop buffered audio on every channel.
    pub fn stop_all_playback(&self) {
        for channel in self.channels.values() {
            channel.stop_playback();
        }
    }

    /// Current state of every channel.
    #[must_use]
    pub fn states(&self) -> Vec<(SpeakerKey, ChannelState)> {
        self.channels
            .iter()
            .map(|(&speaker, channel)| (speaker, channel.state()))
            .collect()
    }

    /// Merge every channel's events into one receiver.
    ///
    /// One forwarding task runs per channel until the channel's event
    /// sender closes, the receiver is dropped, or `cancel` fires.
    pub fn merged_events(&self, cancel: &CancellationToken) -> mpsc::UnboundedReceiver<PoolEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        for (&speaker, channel) in &self.channels {
            let events = channel.subscribe();
            let tx = tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(forward_events(speaker, events, tx, cancel));
        }

        rx
    }
}

async fn forward_events(
    speaker: SpeakerKey,
    mut events: broadcast::Receiver<ChannelEvent>,
    tx: mpsc::UnboundedSender<PoolEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(event) => {
                if tx.send((speaker, event)).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(target: "dubline.pool", speaker = %speaker, skipped, "Channel event listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!(target: "dubline.pool", speaker = %speaker, "Event forwarder stopped");
}

/// Reports the channel a speaker's audio actually plays on, fallback included.
impl PlaybackProbe for ChannelPool {
    fn playback_state(&self, speaker: Option<SpeakerKey>) -> PlaybackState {
        self.resolve(speaker.unwrap_or_default())
            .map(|channel| channel.playback())
            .unwrap_or_default()
    }
}
