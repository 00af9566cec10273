//! Runtime error types.

use dubline_core::settings::SettingsError;

/// Errors raised while setting up runtime components.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The timer thread (or its runtime) could not be created.
    #[error("Failed to start timer thread: {0}")]
    TimerSpawn(String),

    /// The timer thread exited before finishing initialisation.
    #[error("Timer thread died during startup")]
    TimerThreadDied,

    /// Not a single channel in the pool could connect.
    #[error("No speech channel could be connected")]
    NoChannelConnected,

    #[error("Service is already running")]
    AlreadyRunning,

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),
}
