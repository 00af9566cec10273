//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use dubline_core::VoiceStyle;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Watch a transcript source and dub each new segment
    Run(RunArgs),

    /// Preview how a transcript file would be queued
    Segment {
        /// Transcript text file
        file: PathBuf,
        /// Voice style to apply (defaults to the configured style)
        #[arg(long)]
        style: Option<VoiceStyle>,
        /// Real segments between fillers (defaults to the configured cadence)
        #[arg(long)]
        filler_every: Option<u32>,
        /// Print one JSON object per queue item
        #[arg(long)]
        json: bool,
    },

    /// List speakers and their voices
    Voices,
}

/// Arguments of `dubline run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Poll this text file for transcript changes
    #[arg(long, conflicts_with = "rest_url")]
    pub file: Option<PathBuf>,

    /// `PostgREST` project URL for transcripts and results
    #[arg(long, env = "DUBLINE_REST_URL")]
    pub rest_url: Option<String>,

    /// API key sent with every REST request
    #[arg(long, env = "DUBLINE_REST_KEY", hide_env_values = true, requires = "rest_url")]
    pub rest_key: Option<String>,

    /// Table holding transcript rows
    #[arg(long, default_value = "transcripts")]
    pub transcripts_table: String,

    /// Table receiving translation rows
    #[arg(long, default_value = "translations")]
    pub results_table: String,

    /// Append results to this JSON-lines file instead of the REST table
    #[arg(long)]
    pub results: Option<PathBuf>,

    #[arg(long)]
    pub style: Option<VoiceStyle>,

    /// Target language code stored with each result
    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub session_id: Option<String>,

    #[arg(long)]
    pub user_id: Option<String>,

    /// Transcript poll period in milliseconds
    #[arg(long)]
    pub heartbeat_ms: Option<u64>,

    /// Ignore the transcript already present at startup
    #[arg(long)]
    pub skip_existing: bool,

    /// Synthesis model name passed to each channel
    #[arg(long, default_value = "simulated")]
    pub model: String,

    /// Simulated synthesis latency in milliseconds
    #[arg(long, default_value_t = 300)]
    pub latency_ms: u64,

    /// Simulated speaking rate in characters per second
    #[arg(long, default_value_t = 15.0)]
    pub chars_per_second: f64,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}
