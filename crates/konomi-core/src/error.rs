//! Sync error handling
//!
//! Typed errors for the settings store, the local cache and the remote
//! settings endpoint. The coordinator consumes most of these internally;
//! only store validation errors reach callers.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or syncing settings
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network failure talking to the settings endpoint
    #[error("Settings server request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Settings server returned HTTP {status}")]
    Status { status: u16 },

    /// No credential, or the server rejected it
    #[error("Not authenticated. Log in with `konomi login <token>` first.")]
    NotAuthenticated,

    /// Payload could not be decoded into settings
    #[error("Invalid settings payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Cache file could not be written
    #[error("Failed to write settings cache '{path}': {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Value does not fit the setting's type or allowed choices
    #[error("Invalid value for setting '{key}': {details}")]
    InvalidSetting { key: String, details: String },

    /// Key is not part of the settings document
    #[error("Unknown setting: '{0}'")]
    UnknownSetting(String),

    /// Coordinator was started outside a Tokio runtime
    #[error("Sync coordinator must be started from within a Tokio runtime")]
    NoRuntime,
}

impl SyncError {
    /// Whether the next poll tick or local change may succeed where this failed
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Status { status } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for settings operations
pub type SyncResult<T> = Result<T, SyncError>;
