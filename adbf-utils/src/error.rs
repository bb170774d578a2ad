//! Error types for adbf
//!
//! Provides a unified error type used across all adbf crates.

use std::path::PathBuf;

/// Main error type for adbf operations
#[derive(Debug, thiserror::Error)]
pub enum AdbfError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Workflow Conditions ===

    #[error("Path slot limit reached ({max})")]
    CapacityExceeded { max: usize },

    #[error("No path slots left")]
    EmptyWorkflow,

    #[error("Path slot {index} does not exist ({len} slots)")]
    InvalidSlot { index: usize, len: usize },

    #[error("Path selection is already confirmed")]
    WorkflowLocked,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    // === Roster / Progress Conditions ===

    #[error("Peer not found: {0}")]
    UnknownPeer(String),

    #[error("Scan path not found: {0}")]
    UnknownPath(usize),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdbfError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Local validation condition reported back to the caller.
    ///
    /// These never end a session.
    pub fn is_local_condition(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. }
                | Self::EmptyWorkflow
                | Self::InvalidSlot { .. }
                | Self::WorkflowLocked
                | Self::UnknownAction(_)
                | Self::UnknownPeer(_)
                | Self::UnknownPath(_)
        )
    }
}

/// Result type alias using AdbfError
pub type Result<T> = std::result::Result<T, AdbfError>;
