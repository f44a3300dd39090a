//! Error types for the synchronization engine.

use std::path::PathBuf;

use gitsync_core::CoreError;

use crate::convert::ConversionStep;

/// Errors that can occur while synchronizing a repository.
///
/// Every variant carries the operation and the path or location involved so
/// that a single log line is enough to diagnose a failure.
#[derive(Debug, thiserror::Error)]
pub enum GitSyncError {
    /// A git subprocess exited with a non-zero status.
    #[error("{operation} failed for {target} (exit status {status}): {output}")]
    CommandFailed {
        operation: String,
        target: String,
        status: String,
        output: String,
    },

    /// The git binary could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A git subprocess did not finish in time and was killed.
    #[error("git {operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The ephemeral key file could not be created, written or removed.
    #[error("key scope for user '{user}': {message}: {source}")]
    KeyScope {
        user: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Bare-to-normal conversion stopped part way.
    #[error("conversion step '{step}' failed for {path}: {message}")]
    Conversion {
        step: ConversionStep,
        path: PathBuf,
        message: String,
    },

    /// The anonymous pre-flight request was refused.
    #[error("access denied to {location}: HTTP {status}")]
    AccessDenied { location: String, status: u16 },

    /// The anonymous pre-flight request could not be made.
    #[error("HTTP request to {location} failed: {message}")]
    Http { location: String, message: String },

    /// A reference name was rejected before touching the repository.
    #[error("invalid reference name '{name}': {reason}")]
    InvalidRefName { name: String, reason: &'static str },

    /// A reference the operation depends on does not exist.
    #[error("reference {name} not found in {path}")]
    RefNotFound { name: String, path: PathBuf },

    /// A commit the operation depends on does not exist.
    #[error("commit {hash} not found in {path}")]
    CommitNotFound { hash: String, path: PathBuf },

    /// A repository-level operation failed.
    #[error("git error in {path}: {message}")]
    Git { path: PathBuf, message: String },

    /// A domain value was invalid.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task could not be joined.
    #[error("background task failed: {0}")]
    Task(String),

    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GitSyncError {
    /// Creates a new repository-level error.
    pub fn git(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Git {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new conversion error.
    pub fn conversion(
        step: ConversionStep,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            step,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new key scope error.
    pub fn key_scope(
        user: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::KeyScope {
            user: user.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a new invalid reference name error.
    pub fn invalid_ref(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidRefName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a new HTTP error.
    pub fn http(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Creates a new task join error.
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task(message.into())
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Http { .. })
    }

    /// Returns true if a referenced branch, tag or commit is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RefNotFound { .. } | Self::CommitNotFound { .. })
    }

    /// Returns the combined subprocess output, if this error came from git.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Type alias for Results with GitSyncError.
pub type Result<T> = std::result::Result<T, GitSyncError>;
