//! Source change detector.
//!
//! Combines the source's push feed with a heartbeat-driven poll. Both paths
//! may deliver the same snapshot; the [`SnapshotDeduper`] lets the first one
//! through and drops the rest by id.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dubline_core::domain::{SnapshotId, TranscriptSnapshot};
use dubline_core::ports::{SnapshotFeed, SourceError, TimerPort, TranscriptSource};

/// Number of recent snapshot ids remembered for deduplication.
pub const DEDUP_WINDOW: usize = 64;

/// Deduper shared by every detector run of one session.
pub type SharedDeduper = Arc<Mutex<SnapshotDeduper>>;

fn lock(dedup: &SharedDeduper) -> MutexGuard<'_, SnapshotDeduper> {
    dedup.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity-based snapshot filter.
///
/// Remembers the last [`DEDUP_WINDOW`] accepted ids, so a redelivery of any
/// recent snapshot is dropped even after a newer one was accepted.
#[derive(Debug, Default)]
pub struct SnapshotDeduper {
    recent: VecDeque<SnapshotId>,
}

impl SnapshotDeduper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared() -> SharedDeduper {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Mark `id` as seen without accepting a snapshot.
    pub fn prime(&mut self, id: SnapshotId) {
        self.remember(id);
    }

    /// Returns `true` exactly once per distinct id.
    pub fn accept(&mut self, snapshot: &TranscriptSnapshot) -> bool {
        if self.recent.contains(&snapshot.id) {
            return false;
        }
        self.remember(snapshot.id.clone());
        true
    }

    /// Most recently accepted id.
    #[must_use]
    pub fn last_seen(&self) -> Option<&SnapshotId> {
        self.recent.back()
    }

    fn remember(&mut self, id: SnapshotId) {
        if self.recent.len() == DEDUP_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(id);
    }
}

enum Wake {
    Tick,
    HeartbeatStopped,
    Pushed(TranscriptSnapshot),
    PushClosed,
    Cancelled,
}

/// Watches a transcript source and forwards each new snapshot once.
pub struct ChangeDetector {
    source: Arc<dyn TranscriptSource>,
    timer: Arc<dyn TimerPort>,
    period: Duration,
    skip_existing: bool,
    dedup: SharedDeduper,
}

impl ChangeDetector {
    pub fn new(source: Arc<dyn TranscriptSource>, timer: Arc<dyn TimerPort>, period: Duration) -> Self {
        Self {
            source,
            timer,
            period,
            skip_existing: false,
            dedup: SnapshotDeduper::shared(),
        }
    }

    /// Filter through `dedup` instead of a fresh deduper, so ids accepted
    /// by an earlier run stay seen.
    #[must_use]
    pub fn with_deduper(mut self, dedup: SharedDeduper) -> Self {
        self.dedup = dedup;
        self
    }

    /// Treat the snapshot present at startup as already processed.
    #[must_use]
    pub const fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Run until cancelled or until `out` is closed.
    pub async fn run(self, out: mpsc::UnboundedSender<TranscriptSnapshot>, cancel: CancellationToken) {
        if self.skip_existing
            && let Some(existing) = self.poll().await
        {
            info!(target: "dubline.detector", snapshot = %existing.id, "Skipping snapshot present at startup");
            lock(&self.dedup).prime(existing.id);
        }

        let mut push = match self.source.subscribe().await {
            Ok(feed) => Some(feed),
            Err(SourceError::PushUnsupported) => {
                debug!(target: "dubline.detector", "Source has no push feed, polling only");
                None
            }
            Err(e) => {
                warn!(target: "dubline.detector", error = %e, "Push subscription failed, polling only");
                None
            }
        };

        let mut ticks = self.timer.heartbeat(self.period);

        loop {
            let wake = tokio::select! {
                () = cancel.cancelled() => Wake::Cancelled,
                tick = ticks.recv() => tick.map_or(Wake::HeartbeatStopped, |_| Wake::Tick),
                pushed = next_push(&mut push) => pushed.map_or(Wake::PushClosed, Wake::Pushed),
            };

            let candidate = match wake {
                Wake::Cancelled => break,
                Wake::HeartbeatStopped => {
                    warn!(target: "dubline.detector", "Heartbeat stopped, detector exiting");
                    break;
                }
                Wake::Tick => self.poll().await,
                Wake::Pushed(snapshot) => Some(snapshot),
                Wake::PushClosed => {
                    info!(target: "dubline.detector", "Push feed closed, polling only");
                    push = None;
                    None
                }
            };

            let Some(snapshot) = candidate else {
                continue;
            };
            let fresh = lock(&self.dedup).accept(&snapshot);
            if !fresh {
                continue;
            }

            debug!(target: "dubline.detector", snapshot = %snapshot.id, "New snapshot");
            if out.send(snapshot).is_err() {
                break;
            }
        }

        debug!(target: "dubline.detector", "Change detector stopped");
    }

    async fn poll(&self) -> Option<TranscriptSnapshot> {
        match self.source.fetch_latest().await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(target: "dubline.detector", error = %e, "Transcript fetch failed, retrying next tick");
                None
            }
        }
    }
}

async fn next_push(feed: &mut Option<SnapshotFeed>) -> Option<TranscriptSnapshot> {
    match feed {
        Some(feed) => feed.recv().await,
        None => std::future::pending().await,
    }
}
