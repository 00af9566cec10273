//! Queue orchestrator: the single-flight drain loop.
//!
//! Items are dispatched strictly in queue order, one at a time, whichever
//! channel they target. After each send the loop waits for two playback
//! signals on the target channel before moving on:
//!
//! 1. **Arrival**: the channel's end-of-queue timestamp moves past the value
//!    recorded just before the send.
//! 2. **Drain**: buffered audio falls to the near-empty threshold. The tail
//!    that remains covers the next send's network latency.
//!
//! Both waits give up after their timeout and the loop advances anyway.
//! Only a disconnected target channel stops a drain early, and it discards
//! everything still queued.
//!
//! ```text
//!   enqueue ──► [ queue ] ──► Idle ──kick──► Draining ──queue empty──► Idle
//!                                               │
//!                                   channel down└──► clear queue ──► Idle
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use dubline_core::domain::{QueueItem, SpeakerKey};
use dubline_core::events::{DropReason, DubEvent};
use dubline_core::ports::{DubEventEmitter, PlaybackProbe, SpeechChannel, TimerPort};
use dubline_core::settings::{DEFAULT_QUEUE_SOFT_LIMIT, DeliveryProfile, QueueTiming};

use crate::commit::ResultCommitter;
use crate::pool::ChannelPool;
use crate::routing::TranscriptRouter;

/// Whether a drain loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Draining,
}

/// How a call to [`QueueOrchestrator::drain`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue ran empty.
    Completed,
    /// The target channel was disconnected; the queue was cleared.
    Aborted,
    /// Another drain was already running; this call did nothing.
    AlreadyDraining,
}

/// Collaborators of a [`QueueOrchestrator`].
pub struct OrchestratorDeps {
    pub pool: Arc<ChannelPool>,
    pub timer: Arc<dyn TimerPort>,
    pub router: Arc<TranscriptRouter>,
    pub committer: ResultCommitter,
    /// Live style and language, read at dispatch and commit time.
    pub profile: watch::Receiver<DeliveryProfile>,
    pub emitter: Arc<dyn DubEventEmitter>,
}

/// Single consumer of the segment queue.
pub struct QueueOrchestrator {
    queue: Mutex<VecDeque<QueueItem>>,
    draining: AtomicBool,
    pool: Arc<ChannelPool>,
    timer: Arc<dyn TimerPort>,
    router: Arc<TranscriptRouter>,
    committer: ResultCommitter,
    profile: watch::Receiver<DeliveryProfile>,
    emitter: Arc<dyn DubEventEmitter>,
    timing: QueueTiming,
    soft_limit: usize,
}

impl QueueOrchestrator {
    pub fn new(deps: OrchestratorDeps, timing: QueueTiming) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            pool: deps.pool,
            timer: deps.timer,
            router: deps.router,
            committer: deps.committer,
            profile: deps.profile,
            emitter: deps.emitter,
            timing,
            soft_limit: DEFAULT_QUEUE_SOFT_LIMIT,
        }
    }

    /// Pending count above which [`enqueue`](Self::enqueue) warns.
    #[must_use]
    pub const fn with_soft_limit(mut self, soft_limit: usize) -> Self {
        self.soft_limit = soft_limit;
        self
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<QueueItem>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Items waiting for dispatch. The in-flight item is not counted.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        if self.draining.load(Ordering::Acquire) {
            OrchestratorState::Draining
        } else {
            OrchestratorState::Idle
        }
    }

    /// Append items in order. Returns the pending count afterwards.
    ///
    /// Nothing is ever refused; a queue above the soft limit only logs.
    pub fn enqueue(&self, items: Vec<QueueItem>) -> usize {
        let events: Vec<_> = items
            .iter()
            .map(|item| DubEvent::SegmentQueued {
                turn_id: item.turn_id(),
                speaker: item.speaker(),
                text: item.segment.display_text.clone(),
            })
            .collect();

        let pending = {
            let mut queue = self.queue();
            queue.extend(items);
            queue.len()
        };

        for event in events {
            self.emitter.emit(event);
        }

        if pending > self.soft_limit {
            warn!(
                target: "dubline.queue",
                pending,
                soft_limit = self.soft_limit,
                "Segment queue is growing faster than it drains"
            );
        }
        pending
    }

    /// Start a drain in the background unless one is already running.
    pub fn kick(self: &Arc<Self>) {
        if self.draining.load(Ordering::Acquire) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.drain().await;
        });
    }

    /// Drain the queue to empty.
    ///
    /// Re-entrant calls while a drain is running return
    /// [`DrainOutcome::AlreadyDraining`] immediately.
    pub async fn drain(&self) -> DrainOutcome {
        if !self.try_begin() {
            return DrainOutcome::AlreadyDraining;
        }

        loop {
            let outcome = self.drain_pass().await;
            self.draining.store(false, Ordering::Release);

            // An enqueue that raced the flag reset found us still draining
            // and did not kick.
            if self.pending() == 0 || !self.try_begin() {
                return outcome;
            }
        }
    }

    fn try_begin(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn drain_pass(&self) -> DrainOutcome {
        self.emitter.emit(DubEvent::DrainStarted {
            pending: self.pending(),
        });
        info!(target: "dubline.queue", pending = self.pending(), "Drain started");

        loop {
            let Some(item) = self.queue().front().cloned() else {
                break;
            };
            let speaker = item.speaker();

            let channel = match self.pool.resolve(speaker) {
                Some(channel) if channel.state().is_connected() => Arc::clone(channel),
                _ => {
                    let dropped = {
                        let mut queue = self.queue();
                        let n = queue.len();
                        queue.clear();
                        n
                    };
                    warn!(
                        target: "dubline.queue",
                        speaker = %speaker,
                        dropped,
                        "Target channel not connected, abandoning queue"
                    );
                    self.emitter.emit(DubEvent::DrainAborted { speaker, dropped });
                    return DrainOutcome::Aborted;
                }
            };

            self.process(item, channel.as_ref()).await;
        }

        self.emitter.emit(DubEvent::DrainIdle);
        info!(target: "dubline.queue", "Drain finished, idle");
        DrainOutcome::Completed
    }

    /// Dispatch the front item on `channel` and see it through to commit.
    async fn process(&self, item: QueueItem, channel: &dyn SpeechChannel) {
        let turn_id = item.turn_id();
        let speaker = item.speaker();
        let style = self.profile.borrow().style;

        let text = item.spoken_text(style);

        if text.trim().is_empty() {
            self.queue().pop_front();
            debug!(target: "dubline.queue", turn = ?turn_id, "Empty after styling, dropped");
            self.emitter.emit(DubEvent::SegmentDropped {
                turn_id,
                speaker,
                reason: DropReason::EmptyText,
            });
            return;
        }

        let token = self.router.begin(turn_id);
        let baseline = self.pool.playback_state(Some(speaker)).end_of_queue_secs;

        if let Err(e) = channel.send(&text).await {
            self.queue().pop_front();
            let _ = self.router.finish(token);
            warn!(target: "dubline.queue", speaker = %speaker, turn = ?turn_id, error = %e, "Send failed, segment dropped");
            self.emitter.emit(DubEvent::SegmentDropped {
                turn_id,
                speaker,
                reason: DropReason::SendFailed,
            });
            return;
        }

        self.queue().pop_front();
        debug!(
            target: "dubline.queue",
            speaker = %speaker,
            channel = %channel.speaker(),
            turn = ?turn_id,
            "Segment dispatched"
        );
        self.emitter.emit(DubEvent::SegmentDispatched {
            turn_id,
            speaker,
            text,
        });

        let arrived = self.wait_for_arrival(speaker, baseline).await;
        let drained = self.wait_for_drain(speaker).await;

        let translation = self.router.finish(token);
        let language = self.profile.borrow().language.clone();
        self.committer.commit(&item, &translation, &language).await;

        self.emitter.emit(DubEvent::SegmentCompleted {
            turn_id,
            speaker,
            translation,
            arrival_timed_out: !arrived,
            drain_timed_out: !drained,
        });
    }

    /// Wait until the end-of-queue of `speaker`'s channel moves past
    /// `baseline`.
    ///
    /// Returns `false` on timeout.
    async fn wait_for_arrival(&self, speaker: SpeakerKey, baseline: f64) -> bool {
        let deadline = Instant::now() + self.timing.arrival_timeout();
        let target = baseline + self.timing.arrival_epsilon_secs;

        loop {
            if self.pool.playback_state(Some(speaker)).end_of_queue_secs > target {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(
                    target: "dubline.queue",
                    speaker = %speaker,
                    timeout_ms = self.timing.arrival_timeout_ms,
                    "No audio arrived in time, continuing"
                );
                return false;
            }
            self.timer.wait(self.timing.arrival_poll()).await;
        }
    }

    /// Wait until buffered audio is at or below the drain threshold.
    ///
    /// Returns `false` on timeout.
    async fn wait_for_drain(&self, speaker: SpeakerKey) -> bool {
        let deadline = Instant::now() + self.timing.drain_timeout();

        loop {
            if self.pool.playback_state(Some(speaker)).buffered_secs
                <= self.timing.drain_threshold_secs
            {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(
                    target: "dubline.queue",
                    speaker = %speaker,
                    timeout_ms = self.timing.drain_timeout_ms,
                    "Playback did not drain in time, continuing"
                );
                return false;
            }
            self.timer.wait(self.timing.drain_poll()).await;
        }
    }
}
