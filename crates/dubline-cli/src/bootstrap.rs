//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter. All concrete implementations are instantiated here:
//! - Transcript source and result sink (via dubline-store)
//! - Simulated speech channels, timer and emitter (via dubline-runtime)
//! - The dubbing service itself
//!
//! Command handlers receive the composed [`CliContext`] and delegate to it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use dubline_core::{
    ChannelConfig, DubEvent, DubbingSettings, ResultSink, SpeechChannel, TranscriptSource,
};
use dubline_runtime::{
    ChannelEmitter, ChannelPool, DubbingService, ServiceParts, SimulatedChannel,
    SimulatedChannelConfig, timer_or_fallback,
};
use dubline_store::{
    FileTranscriptSource, JsonlResultSink, RestConfig, RestResultSink, RestTranscriptSource,
};

use crate::commands::RunArgs;
use crate::error::CliError;

/// Where transcripts are read from.
#[derive(Debug, Clone)]
pub enum SourceTarget {
    File(PathBuf),
    Rest(RestConfig),
}

/// Where translations are persisted.
#[derive(Debug, Clone)]
pub enum SinkTarget {
    Jsonl(PathBuf),
    Rest(RestConfig),
}

/// Adapter choices for one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: SourceTarget,
    pub sink: SinkTarget,
    /// Synthesis model name shared by every channel.
    pub model: String,
    pub simulation: SimulatedChannelConfig,
}

impl RunOptions {
    /// Resolve source and sink from the `run` flags.
    pub fn from_args(args: &RunArgs) -> Result<Self, CliError> {
        let rest = match (&args.rest_url, &args.rest_key) {
            (Some(url), Some(key)) => Some(
                RestConfig::new(url.as_str(), key.as_str())
                    .with_tables(&args.transcripts_table, &args.results_table),
            ),
            (Some(_), None) => {
                return Err(CliError::Arguments(
                    "--rest-url needs --rest-key (or DUBLINE_REST_KEY)".into(),
                ));
            }
            _ => None,
        };

        let source = match (&args.file, &rest) {
            (Some(path), _) => SourceTarget::File(path.clone()),
            (None, Some(config)) => SourceTarget::Rest(config.clone()),
            (None, None) => {
                return Err(CliError::Arguments(
                    "a transcript source is required: --file or --rest-url".into(),
                ));
            }
        };

        let sink = match (&args.results, rest) {
            (Some(path), _) => SinkTarget::Jsonl(path.clone()),
            (None, Some(config)) => SinkTarget::Rest(config),
            (None, None) => {
                return Err(CliError::Arguments(
                    "a result sink is required: --results or --rest-url".into(),
                ));
            }
        };

        if !(args.chars_per_second.is_finite() && args.chars_per_second > 0.0) {
            return Err(CliError::Arguments(
                "--chars-per-second must be a positive number".into(),
            ));
        }

        Ok(Self {
            source,
            sink,
            model: args.model.clone(),
            simulation: SimulatedChannelConfig {
                synthesis_latency: Duration::from_millis(args.latency_ms),
                chars_per_second: args.chars_per_second,
                ..SimulatedChannelConfig::default()
            },
        })
    }
}

/// Load settings from `path`, or defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<DubbingSettings, CliError> {
    let Some(path) = path else {
        return Ok(DubbingSettings::default());
    };

    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    let settings = serde_json::from_str(&raw)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), "Loaded settings file");
    Ok(settings)
}

/// Apply `run` flags on top of file settings.
pub fn apply_overrides(settings: &mut DubbingSettings, args: &RunArgs) {
    if let Some(style) = args.style {
        settings.style = style;
    }
    if let Some(language) = &args.language {
        settings.language.clone_from(language);
    }
    if let Some(session_id) = &args.session_id {
        settings.session_id = Some(session_id.clone());
    }
    if let Some(user_id) = &args.user_id {
        settings.user_id = Some(user_id.clone());
    }
    if let Some(heartbeat_ms) = args.heartbeat_ms {
        settings.heartbeat_ms = heartbeat_ms;
    }
    if args.skip_existing {
        settings.skip_existing = true;
    }
}

/// Fully composed context for `dubline run`.
pub struct CliContext {
    pub service: DubbingService,
    /// The UI log.
    pub events: mpsc::UnboundedReceiver<DubEvent>,
}

/// Build the dubbing service for `settings` and `options`.
///
/// Nothing connects or starts here; see [`DubbingService::start`].
pub fn bootstrap(settings: DubbingSettings, options: RunOptions) -> Result<CliContext, CliError> {
    let simulation = options.simulation;
    let pool = Arc::new(ChannelPool::from_table(|speaker| {
        Arc::new(SimulatedChannel::new(speaker, simulation.clone())) as Arc<dyn SpeechChannel>
    }));

    let source: Arc<dyn TranscriptSource> = match &options.source {
        SourceTarget::File(path) => Arc::new(
            FileTranscriptSource::new(path)
                .with_owner(settings.session_id.clone(), settings.user_id.clone()),
        ),
        SourceTarget::Rest(config) => Arc::new(RestTranscriptSource::new(config)?),
    };

    let sink: Arc<dyn ResultSink> = match &options.sink {
        SinkTarget::Jsonl(path) => Arc::new(JsonlResultSink::new(path)),
        SinkTarget::Rest(config) => Arc::new(RestResultSink::new(config)?),
    };

    let (emitter, events) = ChannelEmitter::new();
    let channel_config = ChannelConfig {
        voice: String::new(),
        model: options.model,
        language: settings.language.clone(),
        instruction: None,
    };

    let service = DubbingService::new(
        settings,
        ServiceParts {
            pool,
            source,
            sink,
            timer: timer_or_fallback(),
            emitter: Arc::new(emitter),
            channel_config,
        },
    )?;

    Ok(CliContext { service, events })
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use dubline_core::VoiceStyle;

    use super::*;
    use crate::commands::Commands;
    use crate::parser::Cli;

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["dubline", "run"].iter().chain(extra).copied();
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn missing_config_path_gives_defaults() {
        assert_eq!(load_settings(None).unwrap(), DubbingSettings::default());
    }

    #[test]
    fn settings_file_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dub.json");
        std::fs::write(
            &path,
            r#"{ "style": "formal", "language": "de", "timing": { "drain_threshold_secs": 1.5 } }"#,
        )
        .unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.style, VoiceStyle::Formal);
        assert_eq!(settings.language, "de");
        assert!((settings.timing.drain_threshold_secs - 1.5).abs() < f64::EPSILON);
        assert_eq!(settings.timing.arrival_poll_ms, 250);
    }

    #[test]
    fn unreadable_and_malformed_files_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.json");
        assert!(matches!(load_settings(Some(&absent)), Err(CliError::Io(_))));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(load_settings(Some(&bad)), Err(CliError::Config(_))));
    }

    #[test]
    fn flags_override_file_settings() {
        let mut settings = DubbingSettings {
            language: "de".into(),
            heartbeat_ms: 2_000,
            ..DubbingSettings::default()
        };
        let args = run_args(&[
            "--file",
            "t.txt",
            "--language",
            "pt",
            "--style",
            "breathy",
            "--skip-existing",
        ]);
        apply_overrides(&mut settings, &args);

        assert_eq!(settings.language, "pt");
        assert_eq!(settings.style, VoiceStyle::Breathy);
        assert_eq!(settings.heartbeat_ms, 2_000);
        assert!(settings.skip_existing);
    }

    #[test]
    fn rest_endpoint_serves_as_source_and_sink() {
        let args = run_args(&["--rest-url", "http://localhost:54321", "--rest-key", "k"]);
        let options = RunOptions::from_args(&args).unwrap();
        assert!(matches!(options.source, SourceTarget::Rest(_)));
        assert!(matches!(options.sink, SinkTarget::Rest(_)));
    }

    #[test]
    fn file_source_needs_a_results_path() {
        let args = run_args(&["--file", "t.txt"]);
        assert!(matches!(
            RunOptions::from_args(&args),
            Err(CliError::Arguments(_))
        ));

        let args = run_args(&["--file", "t.txt", "--results", "r.jsonl"]);
        let options = RunOptions::from_args(&args).unwrap();
        assert!(matches!(options.sink, SinkTarget::Jsonl(_)));
    }

    #[test]
    fn bootstrap_composes_an_idle_service() {
        let dir = tempfile::tempdir().unwrap();
        let args = run_args(&[
            "--file",
            dir.path().join("t.txt").to_str().unwrap(),
            "--results",
            dir.path().join("r.jsonl").to_str().unwrap(),
        ]);
        let options = RunOptions::from_args(&args).unwrap();
        let ctx = bootstrap(DubbingSettings::default(), options).unwrap();

        let status = tokio_test::block_on(ctx.service.status());
        assert!(!status.running);
        assert_eq!(status.pending, 0);
        assert_eq!(status.channels.len(), 5);
    }

    #[test]
    fn invalid_settings_fail_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::from_args(&run_args(&[
            "--file",
            "t.txt",
            "--results",
            dir.path().join("r.jsonl").to_str().unwrap(),
        ]))
        .unwrap();
        let settings = DubbingSettings {
            language: String::new(),
            ..DubbingSettings::default()
        };
        assert!(matches!(
            bootstrap(settings, options),
            Err(CliError::Config(_))
        ));
    }
}
