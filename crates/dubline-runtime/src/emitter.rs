//! Channel-backed event emitter.

use tokio::sync::mpsc;

use dubline_core::events::DubEvent;
use dubline_core::ports::DubEventEmitter;

/// Forwards every event into an unbounded tokio channel.
///
/// Events emitted after the receiver is dropped are discarded silently.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<DubEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver that observes it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DubEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DubEventEmitter for ChannelEmitter {
    fn emit(&self, event: DubEvent) {
        let _ = self.tx.send(event);
    }
}
