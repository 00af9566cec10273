//! Segment command handler.
//!
//! Shows the queue a transcript file would produce: one line per item, with
//! the target speaker and the exact text the channel would receive.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use dubline_core::{QueueItem, Segmenter, TranscriptSnapshot, VoiceStyle};

/// Segment `text` the way the intake task would for a fresh session.
pub fn preview(text: &str, filler_every: u32) -> Vec<QueueItem> {
    let snapshot = Arc::new(TranscriptSnapshot::new("preview", text));
    Segmenter::new(filler_every).segment(&snapshot)
}

pub fn execute(path: &Path, style: VoiceStyle, filler_every: u32, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    let items = preview(&text, filler_every);

    if items.is_empty() {
        println!("No speakable segments in {}.", path.display());
        return Ok(());
    }

    for (index, item) in items.iter().enumerate() {
        let spoken = item.spoken_text(style);
        if json {
            let line = json!({
                "index": index,
                "speaker": item.speaker(),
                "filler": item.is_filler(),
                "text": spoken,
            });
            println!("{line}");
        } else {
            let marker = if item.is_filler() { "~" } else { " " };
            println!("{index:>3}{marker} {:<9} {spoken}", item.speaker().label());
        }
    }

    let fillers = items.iter().filter(|i| i.is_filler()).count();
    if !json {
        println!();
        println!(
            "{} segment(s), {fillers} filler(s), style {style}",
            items.len() - fillers
        );
    }
    Ok(())
}
