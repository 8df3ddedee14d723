//! Error types for daemon control operations.

use std::io;
use thiserror::Error;

/// Result type for daemon control operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the merge daemon.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The receive deadline elapsed before the daemon replied.
    #[error("timed out waiting for daemon reply")]
    Timeout,

    /// The daemon's reply was unparseable, or a message violated the
    /// protocol's framing rules.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },

    /// The daemon answered a command with `fail`.
    #[error("daemon rejected command: {command}")]
    DaemonFailure {
        /// The command that was rejected.
        command: String,
    },

    /// The daemon answered the liveness probe with `passive`.
    #[error("daemon is passive")]
    DaemonPassive,

    /// The daemon binary could not be spawned.
    #[error("failed to spawn daemon: {0}")]
    Spawn(#[source] io::Error),

    /// No active daemon answered on any configured socket.
    #[error("no active daemon reachable")]
    Unreachable,
}

impl ClientError {
    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}
