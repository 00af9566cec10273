//! Integration tests for `DubbingService`: start/stop, snapshot intake from
//! both delivery paths, and live settings.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dubline_core::{
    ChannelConfig, ChannelState, DubEvent, DubbingSettings, ResultRecord, ResultSink, SinkError,
    SnapshotFeed, SourceError, SpeakerKey, SpeechChannel, TranscriptSnapshot, TranscriptSource,
    VoiceStyle,
};
use dubline_runtime::{
    ChannelEmitter, ChannelPool, DubbingService, OrchestratorState, RuntimeError, SendJournal,
    ServiceParts, SimulatedChannel, SimulatedChannelConfig, TokioTimer,
};
use tokio::sync::mpsc;

/// Source with both a pollable "latest row" and a push feed.
struct FeedSource {
    latest: Mutex<Option<TranscriptSnapshot>>,
    push: Mutex<Option<SnapshotFeed>>,
}

impl FeedSource {
    fn new() -> (Arc<Self>, mpsc::UnboundedSender<TranscriptSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            latest: Mutex::new(None),
            push: Mutex::new(Some(rx)),
        });
        (source, tx)
    }

    fn set_latest(&self, snapshot: TranscriptSnapshot) {
        *self.latest.lock().unwrap() = Some(snapshot);
    }
}

#[async_trait]
impl TranscriptSource for FeedSource {
    async fn fetch_latest(&self) -> Result<Option<TranscriptSnapshot>, SourceError> {
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn subscribe(&self) -> Result<SnapshotFeed, SourceError> {
        self.push
            .lock()
            .unwrap()
            .take()
            .ok_or(SourceError::PushUnsupported)
    }
}

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<ResultRecord>>,
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn insert(&self, record: ResultRecord) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

struct Setup {
    service: DubbingService,
    source: Arc<FeedSource>,
    push: mpsc::UnboundedSender<TranscriptSnapshot>,
    sink: Arc<RecordingSink>,
    journal: SendJournal,
    events: mpsc::UnboundedReceiver<DubEvent>,
}

fn setup(settings: DubbingSettings, sim: SimulatedChannelConfig) -> Result<Setup, RuntimeError> {
    let journal = SendJournal::new();
    let pool = Arc::new(ChannelPool::from_table(|speaker| {
        Arc::new(SimulatedChannel::with_journal(speaker, sim.clone(), journal.clone()))
            as Arc<dyn SpeechChannel>
    }));
    let (source, push) = FeedSource::new();
    let sink = Arc::new(RecordingSink::default());
    let (emitter, events) = ChannelEmitter::new();

    let service = DubbingService::new(
        settings,
        ServiceParts {
            pool,
            source: source.clone(),
            sink: sink.clone(),
            timer: Arc::new(TokioTimer::new()),
            emitter: Arc::new(emitter),
            channel_config: ChannelConfig {
                voice: String::new(),
                model: "sim".into(),
                language: "es".into(),
                instruction: None,
            },
        },
    )?;

    Ok(Setup {
        service,
        source,
        push,
        sink,
        journal,
        events,
    })
}

fn settings() -> DubbingSettings {
    DubbingSettings {
        language: "es".into(),
        session_id: Some("session-1".into()),
        ..DubbingSettings::default()
    }
}

fn accepted_ids(events: &mut mpsc::UnboundedReceiver<DubEvent>) -> Vec<String> {
    std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|e| match e {
            DubEvent::SnapshotAccepted { snapshot_id, .. } => Some(snapshot_id.as_str().to_string()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn poll_and_push_deliver_each_snapshot_once() {
    let mut s = setup(settings(), SimulatedChannelConfig::default()).unwrap();
    s.service.start().await.unwrap();

    let first = TranscriptSnapshot::new("s1", "Hello");
    s.source.set_latest(first.clone());
    s.push.send(first.clone()).unwrap();
    s.push.send(first).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let second = TranscriptSnapshot::new("s2", "Male 2: World");
    s.push.send(second.clone()).unwrap();
    s.source.set_latest(second);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(accepted_ids(&mut s.events), ["s1", "s2"]);
    assert_eq!(
        s.journal.sends(),
        [
            (SpeakerKey::Default, "Hello".to_string()),
            (SpeakerKey::Male2, "World".to_string())
        ]
    );

    let records = s.sink.records.lock().unwrap().clone();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.session_id.as_deref() == Some("session-1")));

    s.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn live_settings_apply_to_later_segments() {
    let s = setup(settings(), SimulatedChannelConfig::default()).unwrap();
    s.service.start().await.unwrap();

    s.service.set_style(VoiceStyle::Conversational);
    s.service.set_language("fr").unwrap();
    s.push.send(TranscriptSnapshot::new("s1", "Bonjour")).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(s.journal.sends()[0].1, "(casually) Bonjour");
    assert_eq!(s.sink.records.lock().unwrap()[0].language, "fr");
    assert!(s.service.set_language("  ").is_err());
    assert_eq!(s.service.profile().language, "fr");

    s.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn restart_keeps_session_dedup_and_filler_count() {
    let mut s = setup(settings(), SimulatedChannelConfig::default()).unwrap();
    s.source.set_latest(TranscriptSnapshot::new("s1", "Hello\nb"));

    s.service.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    s.service.stop().await;

    s.service.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    s.source.set_latest(TranscriptSnapshot::new("s2", "c\nd"));
    tokio::time::sleep(Duration::from_secs(10)).await;
    s.service.stop().await;

    assert_eq!(accepted_ids(&mut s.events), ["s1", "s2"]);
    let texts: Vec<_> = s.journal.sends().into_iter().map(|(_, t)| t).collect();
    assert_eq!(texts, ["Hello", "b", "c", "(clears throat)", "d"]);
    assert_eq!(s.sink.records.lock().unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn status_reflects_lifecycle() {
    let s = setup(settings(), SimulatedChannelConfig::default()).unwrap();

    let status = s.service.status().await;
    assert!(!status.running);
    assert!(status
        .channels
        .iter()
        .all(|(_, state)| *state == ChannelState::Disconnected));

    s.service.start().await.unwrap();
    assert!(matches!(
        s.service.start().await,
        Err(RuntimeError::AlreadyRunning)
    ));

    let status = s.service.status().await;
    assert!(status.running);
    assert_eq!(status.orchestrator, OrchestratorState::Idle);
    assert_eq!(status.pending, 0);
    assert_eq!(status.channels.len(), SpeakerKey::ALL.len());
    assert!(status
        .channels
        .iter()
        .all(|(_, state)| *state == ChannelState::Connected));

    s.service.stop().await;
    let status = s.service.status().await;
    assert!(!status.running);
    assert!(status
        .channels
        .iter()
        .all(|(_, state)| *state == ChannelState::Disconnected));

    // Stopping twice is harmless.
    s.service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn start_fails_when_no_channel_connects() {
    let s = setup(
        settings(),
        SimulatedChannelConfig {
            fail_connect: true,
            ..SimulatedChannelConfig::default()
        },
    )
    .unwrap();

    assert!(matches!(
        s.service.start().await,
        Err(RuntimeError::NoChannelConnected)
    ));
    assert!(!s.service.is_running().await);
}

#[test]
fn invalid_settings_are_rejected() {
    let bad = DubbingSettings {
        heartbeat_ms: 0,
        ..settings()
    };
    assert!(matches!(
        setup(bad, SimulatedChannelConfig::default()),
        Err(RuntimeError::InvalidSettings(_))
    ));
}
