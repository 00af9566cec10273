//! Output transcript routing.
//!
//! Every channel's transcript text lands in one handler. Text is appended to
//! the buffer of the turn currently in flight, whichever channel produced
//! it. The orchestrator opens a turn with [`TranscriptRouter::begin`] and
//! closes it with the returned [`DispatchToken`]; a stale token reads
//! nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use dubline_core::domain::TurnId;
use dubline_core::events::DubEvent;
use dubline_core::ports::{ChannelEvent, ChannelState, DubEventEmitter};

use crate::pool::{ChannelPool, PoolEvent};

/// Handle to one dispatched turn's translation buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct DispatchToken(u64);

#[derive(Debug)]
struct ActiveTurn {
    token: u64,
    turn_id: Option<TurnId>,
    buffer: String,
}

/// Routes streamed transcript text into the in-flight turn.
pub struct TranscriptRouter {
    active: Mutex<Option<ActiveTurn>>,
    next_token: AtomicU64,
    emitter: Arc<dyn DubEventEmitter>,
}

impl TranscriptRouter {
    pub fn new(emitter: Arc<dyn DubEventEmitter>) -> Self {
        Self {
            active: Mutex::new(None),
            next_token: AtomicU64::new(1),
            emitter,
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveTurn>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a fresh, empty buffer for `turn_id`, replacing any previous one.
    pub fn begin(&self, turn_id: Option<TurnId>) -> DispatchToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        *self.active() = Some(ActiveTurn {
            token,
            turn_id,
            buffer: String::new(),
        });
        DispatchToken(token)
    }

    /// Append streamed text to the in-flight turn.
    ///
    /// Returns `false` when no turn is in flight and the text was dropped.
    pub fn append(&self, text: &str) -> bool {
        let turn_id = {
            let mut active = self.active();
            let Some(turn) = active.as_mut() else {
                debug!(target: "dubline.queue", chars = text.len(), "Transcript text with no turn in flight, dropped");
                return false;
            };
            turn.buffer.push_str(text);
            turn.turn_id
        };

        if !text.is_empty() {
            self.emitter.emit(DubEvent::TranslationDelta {
                turn_id,
                text: text.to_string(),
            });
        }
        true
    }

    /// Close the turn and take its buffered text.
    ///
    /// Returns an empty string if `token` is no longer the active turn.
    pub fn finish(&self, token: DispatchToken) -> String {
        let mut active = self.active();
        match active.take() {
            Some(turn) if turn.token == token.0 => turn.buffer,
            other => {
                *active = other;
                String::new()
            }
        }
    }

    /// Turn currently collecting text, if any.
    #[must_use]
    pub fn current_turn(&self) -> Option<Option<TurnId>> {
        self.active().as_ref().map(|turn| turn.turn_id)
    }

    /// Consume the pool's merged event stream until it closes.
    pub async fn route_events(
        self: Arc<Self>,
        pool: Arc<ChannelPool>,
        mut events: mpsc::UnboundedReceiver<PoolEvent>,
    ) {
        while let Some((speaker, event)) = events.recv().await {
            match event {
                ChannelEvent::Transcript { text, is_final } => {
                    trace!(target: "dubline.queue", speaker = %speaker, is_final, "Transcript chunk");
                    self.append(&text);
                }
                ChannelEvent::Interrupted => {
                    info!(target: "dubline.pool", speaker = %speaker, "Interrupted, stopping playback on every channel");
                    pool.stop_all_playback();
                    self.emitter.emit(DubEvent::PlaybackInterrupted { speaker });
                    self.emitter.emit(DubEvent::ChannelStateChanged {
                        speaker,
                        state: ChannelState::Interrupted,
                    });
                }
                ChannelEvent::Opened => {
                    self.emitter.emit(DubEvent::ChannelStateChanged {
                        speaker,
                        state: ChannelState::Connected,
                    });
                }
                ChannelEvent::Closed { reason } => {
                    info!(target: "dubline.pool", speaker = %speaker, reason = ?reason, "Channel closed");
                    self.emitter.emit(DubEvent::ChannelStateChanged {
                        speaker,
                        state: ChannelState::Disconnected,
                    });
                }
                ChannelEvent::ToolCall(request) => {
                    info!(
                        target: "dubline.pool",
                        speaker = %speaker,
                        tool = %request.name,
                        id = %request.id,
                        "Tool call requested"
                    );
                    self.emitter.emit(DubEvent::ToolCallReceived {
                        speaker,
                        name: request.name,
                    });
                }
                ChannelEvent::AudioChunk(bytes) => {
                    trace!(target: "dubline.pool", speaker = %speaker, bytes = bytes.len(), "Audio chunk");
                }
            }
        }
        debug!(target: "dubline.queue", "Transcript router stopped");
    }
}
