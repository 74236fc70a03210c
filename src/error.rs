//! Error types for randr-tail.
//!
//! One enum per component, plus the top-level `MonitorError` that decides
//! the process exit status.

use thiserror::Error;

/// Errors returned by the output registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Output name is empty")]
    EmptyName,

    #[error("Output name is {len} bytes long, limit is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("Cannot track output '{name}': all {capacity} slots are in use")]
    CapacityExceeded { name: String, capacity: usize },
}

/// Errors related to the display server connection.
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Could not open X11 display: {0}")]
    ConnectFailed(String),

    #[error("Screen {0} not found in X11 setup")]
    ScreenNotFound(usize),

    #[error("Could not query the XRandR extension: {0}")]
    ExtensionUnavailable(String),

    #[error("Could not subscribe to output change notifications: {0}")]
    SubscribeFailed(String),

    #[error("Could not get screen resources: {0}")]
    ScreenResources(String),

    #[error("Could not get output info: {0}")]
    OutputInfo(String),

    #[error("Connection to the display server lost: {0}")]
    ConnectionLost(String),
}

impl DisplayError {
    /// Whether the connection itself is unusable after this error.
    ///
    /// Per-request failures (`ScreenResources`, `OutputInfo`) only drop the
    /// current event.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DisplayError::ScreenResources(_) | DisplayError::OutputInfo(_)
        )
    }
}

/// Errors related to configuration management.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Errors related to logging initialization.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Could not determine the user data directory")]
    DataDirectoryNotFound,

    #[error("Failed to create log directory '{path}': {source}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create log file appender: {0}")]
    AppenderCreationFailed(String),

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Errors that end the monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    #[error("Failed to write to standard output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Monitor thread terminated unexpectedly")]
    ThreadDied,
}
