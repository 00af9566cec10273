//! Timer service: heartbeat and delay primitives on a dedicated thread.
//!
//! Waits and heartbeats are served by a current-thread tokio runtime living
//! on its own OS thread (`dubline-timer`), so a busy or throttled main
//! runtime cannot stretch poll intervals. Callers talk to it through
//! [`TimerService`], a `Send + Sync` handle that routes every request as a
//! [`TimerCommand`].
//!
//! If the thread cannot be created, [`timer_or_fallback`] hands out a
//! [`TokioTimer`] instead: same contract, ordinary runtime timers. If the
//! thread dies later, requests degrade to the caller's runtime as well.

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};

use dubline_core::ports::{Heartbeat, TimerPort};

use crate::error::RuntimeError;

// ── Commands ───────────────────────────────────────────────────────

/// A request sent to the timer thread.
enum TimerCommand {
    /// Reply once `duration` has elapsed.
    Wait {
        duration: Duration,
        reply: oneshot::Sender<()>,
    },

    /// Tick into `ticks` every `period` until the receiver is dropped.
    Heartbeat {
        period: Duration,
        ticks: mpsc::UnboundedSender<u64>,
    },

    /// Stop the thread. Pending waits are released early.
    Shutdown,
}

// ── Handle ─────────────────────────────────────────────────────────

/// `Send + Sync` handle to the dedicated timer thread.
pub struct TimerService {
    cmd_tx: mpsc::UnboundedSender<TimerCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl TimerService {
    /// Spawn the timer thread and wait for its runtime to come up.
    pub fn spawn() -> Result<Self, RuntimeError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<TimerCommand>();
        let (init_tx, init_rx) = std_mpsc::channel::<Result<(), RuntimeError>>();

        let thread = thread::Builder::new()
            .name("dubline-timer".into())
            .spawn(move || Self::run(cmd_rx, init_tx))
            .map_err(|e| RuntimeError::TimerSpawn(e.to_string()))?;

        init_rx.recv().map_err(|_| RuntimeError::TimerThreadDied)??;

        tracing::debug!(target: "dubline.timer", "Timer thread started");

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// Body of the timer thread. Owns its runtime for its entire lifetime.
    fn run(
        mut cmd_rx: mpsc::UnboundedReceiver<TimerCommand>,
        init_tx: std_mpsc::Sender<Result<(), RuntimeError>>,
    ) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                let _ = init_tx.send(Err(RuntimeError::TimerSpawn(e.to_string())));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        runtime.block_on(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    TimerCommand::Wait { duration, reply } => {
                        tokio::spawn(async move {
                            tokio::time::sleep(duration).await;
                            let _ = reply.send(());
                        });
                    }
                    TimerCommand::Heartbeat { period, ticks } => {
                        tokio::spawn(run_heartbeat(period, ticks));
                    }
                    TimerCommand::Shutdown => break,
                }
            }
        });

        tracing::debug!(target: "dubline.timer", "Timer thread shutting down");
    }
}

#[async_trait]
impl TimerPort for TimerService {
    async fn wait(&self, duration: Duration) {
        let (reply, done) = oneshot::channel();
        if self
            .cmd_tx
            .send(TimerCommand::Wait { duration, reply })
            .is_err()
        {
            tracing::warn!(target: "dubline.timer", "Timer thread gone, using runtime sleep");
            tokio::time::sleep(duration).await;
            return;
        }

        if done.await.is_err() {
            // Thread shut down mid-wait.
            tokio::time::sleep(duration).await;
        }
    }

    fn heartbeat(&self, period: Duration) -> Heartbeat {
        let (ticks, rx) = mpsc::unbounded_channel();
        if let Err(mpsc::error::SendError(cmd)) =
            self.cmd_tx.send(TimerCommand::Heartbeat { period, ticks })
        {
            tracing::warn!(target: "dubline.timer", "Timer thread gone, heartbeat on runtime");
            if let TimerCommand::Heartbeat { period, ticks } = cmd {
                tokio::spawn(run_heartbeat(period, ticks));
            }
        }
        rx
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(TimerCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

// ── Fallback ───────────────────────────────────────────────────────

/// Timer backed by the caller's tokio runtime.
///
/// Used when the timer thread is unavailable, and in tests that run under
/// tokio's paused clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl TokioTimer {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimerPort for TokioTimer {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn heartbeat(&self, period: Duration) -> Heartbeat {
        let (ticks, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_heartbeat(period, ticks));
        rx
    }
}

/// Prefer the dedicated timer thread; fall back to [`TokioTimer`].
pub fn timer_or_fallback() -> Arc<dyn TimerPort> {
    match TimerService::spawn() {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::warn!(
                target: "dubline.timer",
                error = %e,
                "Timer thread unavailable; falling back to runtime timers"
            );
            Arc::new(TokioTimer::new())
        }
    }
}

/// Tick until the receiving side goes away. The first tick is immediate.
async fn run_heartbeat(period: Duration, ticks: mpsc::UnboundedSender<u64>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut count = 0_u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                count += 1;
                if ticks.send(count).is_err() {
                    break;
                }
            }
            () = ticks.closed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn service_wait_resolves() {
        let timer = TimerService::spawn().unwrap();
        let started = Instant::now();
        tokio::time::timeout(Duration::from_secs(5), timer.wait(Duration::from_millis(20)))
            .await
            .expect("wait should resolve");
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn service_heartbeat_ticks_in_order() {
        let timer = TimerService::spawn().unwrap();
        let mut beats = timer.heartbeat(Duration::from_millis(5));
        let mut seen = Vec::new();
        for _ in 0..3 {
            let tick = tokio::time::timeout(Duration::from_secs(5), beats.recv())
                .await
                .expect("tick in time");
            seen.push(tick.unwrap());
        }
        assert_eq!(seen, [1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_heartbeat_first_tick_is_immediate() {
        let timer = TokioTimer::new();
        let mut beats = timer.heartbeat(Duration::from_secs(10));
        assert_eq!(beats.recv().await, Some(1));

        let before = tokio::time::Instant::now();
        assert_eq!(beats.recv().await, Some(2));
        assert!(before.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_heartbeat_stops_task() {
        let (ticks, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_heartbeat(Duration::from_secs(1), ticks));
        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("heartbeat task exits")
            .unwrap();
    }

    #[test]
    fn fallback_constructs_a_timer() {
        let timer = timer_or_fallback();
        tokio_test::block_on(timer.wait(Duration::from_millis(1)));
    }
}
