//! Event emitter trait for the dubbing event stream.
//!
//! Implementations handle transport details (channels, SSE, terminal output).

use crate::events::DubEvent;

/// Trait for emitting dubbing events.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts without a listener
/// - `ChannelEmitter` (in `dubline-runtime`) - forwards into a tokio channel
pub trait DubEventEmitter: Send + Sync {
    /// Emit an event. Must not block.
    fn emit(&self, event: DubEvent);
}

/// A no-op event emitter for tests and headless contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    pub const fn new() -> Self {
        Self
    }
}

impl DubEventEmitter for NoopEmitter {
    fn emit(&self, _event: DubEvent) {}
}
