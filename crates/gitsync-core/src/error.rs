//! Error types for gitsync domain values.
//!
//! These errors are raised while *building* domain values (parsing a
//! repository location, validating a push spec). Failures of git operations
//! themselves live in the engine crate.

use thiserror::Error;

/// Error raised when a domain value cannot be constructed.
///
/// # Example
///
/// ```
/// use gitsync_core::RepositoryLocation;
///
/// let error = RepositoryLocation::parse("").unwrap_err();
/// assert!(error.is_invalid_location());
/// ```
#[derive(Debug, Error)]
pub enum CoreError {
    /// The repository location could not be understood.
    #[error("Invalid repository location '{location}': {reason}")]
    InvalidLocation {
        /// The location as given by the caller
        location: String,
        /// Why it was rejected
        reason: String,
    },

    /// A push spec was rejected before reaching git.
    #[error("Invalid push spec '{spec}': {reason}")]
    InvalidPushSpec {
        /// The rejected spec
        spec: String,
        /// Why it was rejected
        reason: String,
    },

    /// A field failed validation.
    #[error("Validation error for field '{field}': {message}")]
    ValidationError {
        /// Field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },
}

impl CoreError {
    /// Creates an InvalidLocation error.
    pub fn invalid_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidPushSpec error.
    pub fn invalid_push_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPushSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Creates a ValidationError.
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if a repository location was rejected.
    pub fn is_invalid_location(&self) -> bool {
        matches!(self, Self::InvalidLocation { .. })
    }

    /// Returns true if a push spec was rejected.
    pub fn is_invalid_push_spec(&self) -> bool {
        matches!(self, Self::InvalidPushSpec { .. })
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }
}

/// Type alias for Results with CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
