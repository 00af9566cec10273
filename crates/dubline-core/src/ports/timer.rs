//! Timer port: heartbeat and one-shot delays.
//!
//! The runtime provides a throttle-immune implementation running on its own
//! thread, plus a plain tokio fallback.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receiver of heartbeat ticks (a monotonically increasing tick count).
/// Dropping it stops the heartbeat.
pub type Heartbeat = mpsc::UnboundedReceiver<u64>;

#[async_trait]
pub trait TimerPort: Send + Sync {
    /// Resolve after roughly `duration`.
    async fn wait(&self, duration: Duration);

    /// Start a heartbeat ticking every `period`. The first tick is immediate.
    fn heartbeat(&self, period: Duration) -> Heartbeat;
}
