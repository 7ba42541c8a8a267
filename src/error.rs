//! Error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::platform::State;

/// Result alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors returned by router adapters and their helpers.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Writing the dnsmasq directive file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying cause.
        source: std::io::Error,
    },

    /// Removing the dnsmasq directive file failed.
    #[error("failed to remove {path}: {source}")]
    Remove {
        /// Target file.
        path: PathBuf,
        /// Underlying cause.
        source: std::io::Error,
    },

    /// An external command could not be launched or exited non-zero.
    #[error("{op}: {source}")]
    Command {
        /// Operation name, e.g. `dnsmasq restart` or `uci get dhcp.@dnsmasq[0].port`.
        op: String,
        /// What went wrong with the process.
        source: CommandError,
    },

    /// The configuration database has no entry for the key.
    #[error("uci: entry not found: {key}")]
    EntryNotFound {
        /// The missing key.
        key: String,
    },

    /// A lifecycle step was called out of order.
    #[error("cannot {op} while {state}")]
    InvalidState {
        /// The rejected step.
        op: &'static str,
        /// State the adapter was in.
        state: State,
    },

    /// Invalid configuration values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl RouterError {
    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Write { source: e, .. } | Self::Remove { source: e, .. } => {
                e.kind() == std::io::ErrorKind::PermissionDenied
            }
            Self::Command {
                source: CommandError::Spawn(e),
                ..
            } => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Returns `true` for a configuration database miss.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound { .. })
    }
}

/// Failure of a single external process.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be started.
    #[error("failed to launch: {0}")]
    Spawn(#[source] std::io::Error),

    /// The process exited unsuccessfully.
    #[error("exit status {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Exit {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error.
        stderr: String,
    },
}
