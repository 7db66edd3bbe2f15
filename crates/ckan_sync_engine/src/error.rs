//! Error types for the sync engine.

use ckan_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Transport and application failures of lifecycle operations are not
/// returned to the caller; they are turned into notices. These variants
/// surface from construction, stores and the auxiliary clients.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network failure or unreadable response.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The catalog answered with `success: false`.
    #[error("catalog error: {}", .0.join("; "))]
    Application(Vec<String>),

    /// Invalid configuration (unknown entity kind, missing endpoint, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Encoding or decoding failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// Entity store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Import was rejected by a pre-flight check.
    #[error("{0}")]
    Import(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns the user-facing messages carried by this error.
    pub fn messages(&self) -> Vec<String> {
        match self {
            SyncError::Application(messages) => messages.clone(),
            SyncError::Import(message) => vec![message.clone()],
            other => vec![other.to_string()],
        }
    }

    /// Returns true for failures reported by the remote side.
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Transport { .. } | SyncError::Application(_))
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Codec(err.to_string())
    }
}
