//! CLI-specific error types and exit code mapping.

use dubline_core::SettingsError;
use dubline_runtime::RuntimeError;
use dubline_store::StoreError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Core(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No speech channel could be reached.
    #[error("Speech channels unavailable: {0}")]
    Unavailable(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions (see sysexits.h).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2,    // EX_USAGE
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Io(_) => 74,          // EX_IOERR
            Self::Config(_) => 78,      // EX_CONFIG
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<RuntimeError> for CliError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::InvalidSettings(e) => e.into(),
            RuntimeError::NoChannelConnected => Self::Unavailable(err.to_string()),
            other => Self::Core(other.to_string()),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidUrl(_) | StoreError::NotABase(_) => Self::Arguments(err.to_string()),
            StoreError::Client(_) => Self::Core(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_errors_are_config_errors() {
        let err = CliError::from(RuntimeError::InvalidSettings(SettingsError::EmptyLanguage));
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn unreachable_channels_map_to_unavailable() {
        let err = CliError::from(RuntimeError::NoChannelConnected);
        assert_eq!(err.exit_code(), 69);
    }

    #[test]
    fn bad_urls_are_argument_errors() {
        let err = CliError::from(StoreError::NotABase("mailto:x".into()));
        assert_eq!(err.exit_code(), 2);
    }
}
