//! Run command handler.
//!
//! Starts the dubbing service and prints its event stream until ctrl-c.

use anyhow::Result;
use chrono::Local;
use tracing::{info, warn};

use dubline_core::{DropReason, DubEvent};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// One human-readable log line for `event`, or `None` for events that are
/// too chatty for the plain log.
pub fn format_event(event: &DubEvent) -> Option<String> {
    let line = match event {
        DubEvent::SnapshotAccepted { snapshot_id, items } => {
            format!("snapshot {snapshot_id}: {items} item(s) queued")
        }
        DubEvent::SegmentQueued { .. } | DubEvent::TranslationDelta { .. } => return None,
        DubEvent::SegmentDispatched { speaker, text, .. } => format!("[{speaker}] >> {text}"),
        DubEvent::SegmentDropped {
            speaker, reason, ..
        } => {
            let why = match reason {
                DropReason::EmptyText => "nothing to say",
                DropReason::SendFailed => "send failed",
            };
            format!("[{speaker}] dropped ({why})")
        }
        DubEvent::SegmentCompleted {
            speaker,
            translation,
            arrival_timed_out,
            drain_timed_out,
            ..
        } => {
            let mut line = format!("[{speaker}] << {translation}");
            if *arrival_timed_out {
                line.push_str("  (no audio)");
            }
            if *drain_timed_out {
                line.push_str("  (playback timeout)");
            }
            line
        }
        DubEvent::DrainStarted { pending } => format!("draining {pending} item(s)"),
        DubEvent::DrainIdle => "queue idle".to_string(),
        DubEvent::DrainAborted { speaker, dropped } => {
            format!("[{speaker}] disconnected, {dropped} item(s) discarded")
        }
        DubEvent::ChannelStateChanged { speaker, state } => format!("[{speaker}] {state:?}"),
        DubEvent::PlaybackInterrupted { speaker } => format!("[{speaker}] interrupted"),
        DubEvent::ToolCallReceived { speaker, name } => format!("[{speaker}] tool call {name}"),
        DubEvent::ResultPersisted { .. } => "result saved".to_string(),
        DubEvent::ResultPersistFailed { error, .. } => format!("result NOT saved: {error}"),
    };
    Some(line)
}

/// Execute the run command.
pub async fn execute(ctx: CliContext, json: bool) -> Result<()> {
    let CliContext {
        service,
        mut events,
    } = ctx;

    for (speaker, outcome) in service.start().await.map_err(CliError::from)? {
        match outcome {
            Ok(()) => info!(speaker = %speaker, "Channel connected"),
            Err(e) => warn!(
                speaker = %speaker,
                error = %e,
                "Channel unavailable; its segments use the primary voice"
            ),
        }
    }
    println!("Dubbing started. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for ctrl-c");
                }
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                } else if let Some(line) = format_event(&event) {
                    println!("{} {line}", Local::now().format("%H:%M:%S"));
                }
            }
        }
    }

    let status = service.status().await;
    service.stop().await;
    println!(
        "Stopped with {} item(s) still pending ({:?}).",
        status.pending, status.orchestrator
    );
    Ok(())
}
