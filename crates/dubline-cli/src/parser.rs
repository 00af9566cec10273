//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the dubbing queue.
#[derive(Parser)]
#[command(name = "dubline")]
#[command(about = "Dub live transcripts through per-speaker speech channels")]
#[command(version)]
pub struct Cli {
    /// JSON settings file; flags override its fields
    #[arg(long, global = true, env = "DUBLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
