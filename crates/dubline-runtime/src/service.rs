//! Dubbing service: wires detector, segmenter, orchestrator and pool.
//!
//! ```text
//!  TranscriptSource ──► ChangeDetector ──► intake (Segmenter) ──► QueueOrchestrator
//!                                                                      │ send / playback
//!                          TranscriptRouter ◄── merged events ◄── ChannelPool
//! ```
//!
//! Background tasks share one [`CancellationToken`]; [`DubbingService::stop`]
//! cancels it and disconnects every channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use dubline_core::domain::{SpeakerKey, TranscriptSnapshot, VoiceStyle};
use dubline_core::events::DubEvent;
use dubline_core::ports::{
    ChannelConfig, ChannelError, ChannelState, DubEventEmitter, ResultSink, TimerPort,
    TranscriptSource,
};
use dubline_core::segmenter::Segmenter;
use dubline_core::settings::{DeliveryProfile, DubbingSettings, SettingsError, validate_settings};

use crate::commit::ResultCommitter;
use crate::detector::{ChangeDetector, SharedDeduper, SnapshotDeduper};
use crate::error::RuntimeError;
use crate::orchestrator::{OrchestratorDeps, OrchestratorState, QueueOrchestrator};
use crate::pool::ChannelPool;
use crate::routing::TranscriptRouter;

/// External collaborators of a [`DubbingService`].
pub struct ServiceParts {
    pub pool: Arc<ChannelPool>,
    pub source: Arc<dyn TranscriptSource>,
    pub sink: Arc<dyn ResultSink>,
    pub timer: Arc<dyn TimerPort>,
    pub emitter: Arc<dyn DubEventEmitter>,
    /// Shared connection parameters; the voice is set per speaker.
    pub channel_config: ChannelConfig,
}

/// Snapshot of the service's state.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub orchestrator: OrchestratorState,
    pub pending: usize,
    pub style: VoiceStyle,
    pub language: String,
    pub channels: Vec<(SpeakerKey, ChannelState)>,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// A running (or startable) dubbing session.
pub struct DubbingService {
    settings: DubbingSettings,
    pool: Arc<ChannelPool>,
    source: Arc<dyn TranscriptSource>,
    timer: Arc<dyn TimerPort>,
    emitter: Arc<dyn DubEventEmitter>,
    channel_config: ChannelConfig,
    router: Arc<TranscriptRouter>,
    orchestrator: Arc<QueueOrchestrator>,
    profile: watch::Sender<DeliveryProfile>,
    /// Both outlive stop/start: accepted ids and the filler count belong to
    /// the session.
    dedup: SharedDeduper,
    segmenter: Arc<Mutex<Segmenter>>,
    running: Mutex<Option<Running>>,
}

impl DubbingService {
    /// Validate `settings` and assemble the service. Nothing starts yet.
    pub fn new(settings: DubbingSettings, parts: ServiceParts) -> Result<Self, RuntimeError> {
        validate_settings(&settings)?;

        let (profile, profile_rx) = watch::channel(settings.delivery_profile());
        let router = Arc::new(TranscriptRouter::new(Arc::clone(&parts.emitter)));
        let committer = ResultCommitter::new(parts.sink, Arc::clone(&parts.emitter))
            .with_fallback_owner(settings.session_id.clone(), settings.user_id.clone());

        let orchestrator = QueueOrchestrator::new(
            OrchestratorDeps {
                pool: Arc::clone(&parts.pool),
                timer: Arc::clone(&parts.timer),
                router: Arc::clone(&router),
                committer,
                profile: profile_rx,
                emitter: Arc::clone(&parts.emitter),
            },
            settings.timing,
        )
        .with_soft_limit(settings.queue_soft_limit);

        let segmenter = Arc::new(Mutex::new(Segmenter::new(settings.filler_every)));

        Ok(Self {
            settings,
            pool: parts.pool,
            source: parts.source,
            timer: parts.timer,
            emitter: parts.emitter,
            channel_config: parts.channel_config,
            router,
            orchestrator: Arc::new(orchestrator),
            profile,
            dedup: SnapshotDeduper::shared(),
            segmenter,
            running: Mutex::new(None),
        })
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &Arc<QueueOrchestrator> {
        &self.orchestrator
    }

    #[must_use]
    pub const fn pool(&self) -> &Arc<ChannelPool> {
        &self.pool
    }

    /// Connect the pool and start the background tasks.
    ///
    /// Returns each channel's connect outcome. Fails if no channel could be
    /// connected or if the service is already running.
    pub async fn start(&self) -> Result<Vec<(SpeakerKey, Result<(), ChannelError>)>, RuntimeError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(RuntimeError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(3);

        // Subscribe before connecting so `Opened` events are not missed.
        let events = self.pool.merged_events(&cancel);
        tasks.push(tokio::spawn(
            Arc::clone(&self.router).route_events(Arc::clone(&self.pool), events),
        ));

        let outcomes = match self.pool.connect_all(&self.channel_config).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                cancel.cancel();
                return Err(e);
            }
        };

        let (snapshots_tx, snapshots_rx) = mpsc::unbounded_channel();
        let detector = ChangeDetector::new(
            Arc::clone(&self.source),
            Arc::clone(&self.timer),
            self.settings.heartbeat(),
        )
        .skip_existing(self.settings.skip_existing)
        .with_deduper(Arc::clone(&self.dedup));
        tasks.push(tokio::spawn(detector.run(snapshots_tx, cancel.clone())));

        tasks.push(tokio::spawn(intake(
            snapshots_rx,
            Arc::clone(&self.segmenter),
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.emitter),
            cancel.clone(),
        )));

        info!(
            channels = self.pool.len(),
            heartbeat_ms = self.settings.heartbeat_ms,
            "Dubbing service started"
        );
        *running = Some(Running { cancel, tasks });
        Ok(outcomes)
    }

    /// Stop the background tasks and disconnect every channel.
    ///
    /// A drain in progress runs on until its next connectivity check.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        running.cancel.cancel();
        for task in running.tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "Service task ended abnormally");
            }
        }
        self.pool.disconnect_all().await;
        info!("Dubbing service stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Change the voice style. Applies from the next dispatched segment.
    pub fn set_style(&self, style: VoiceStyle) {
        self.profile.send_modify(|profile| profile.style = style);
        info!(style = %style, "Voice style changed");
    }

    /// Change the language recorded on results committed from now on.
    pub fn set_language(&self, language: &str) -> Result<(), SettingsError> {
        let language = language.trim();
        if language.is_empty() {
            return Err(SettingsError::EmptyLanguage);
        }
        self.profile
            .send_modify(|profile| profile.language = language.to_string());
        info!(language, "Target language changed");
        Ok(())
    }

    #[must_use]
    pub fn profile(&self) -> DeliveryProfile {
        self.profile.borrow().clone()
    }

    pub async fn status(&self) -> ServiceStatus {
        let profile = self.profile();
        ServiceStatus {
            running: self.is_running().await,
            orchestrator: self.orchestrator.state(),
            pending: self.orchestrator.pending(),
            style: profile.style,
            language: profile.language,
            channels: self.pool.states(),
        }
    }
}

/// Segment accepted snapshots and hand them to the orchestrator.
async fn intake(
    mut snapshots: mpsc::UnboundedReceiver<TranscriptSnapshot>,
    segmenter: Arc<Mutex<Segmenter>>,
    orchestrator: Arc<QueueOrchestrator>,
    emitter: Arc<dyn DubEventEmitter>,
    cancel: CancellationToken,
) {
    loop {
        let snapshot = tokio::select! {
            () = cancel.cancelled() => break,
            snapshot = snapshots.recv() => match snapshot {
                Some(snapshot) => Arc::new(snapshot),
                None => break,
            },
        };

        let items = segmenter.lock().await.segment(&snapshot);
        emitter.emit(DubEvent::SnapshotAccepted {
            snapshot_id: snapshot.id.clone(),
            items: items.len(),
        });

        if items.is_empty() {
            continue;
        }
        let pending = orchestrator.enqueue(items);
        debug!(target: "dubline.queue", snapshot = %snapshot.id, pending, "Snapshot enqueued");
        orchestrator.kick();
    }
    debug!(target: "dubline.queue", "Intake stopped");
}
