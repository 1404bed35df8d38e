//! Shared primitives for all Rust crates in Warden.

#![forbid(unsafe_code)]

/// Identity of the actor performing a mutation.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::ActorIdentity;

/// Result type used across Warden crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed or empty input, rejected before any store access.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested role, user, or permission does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested permission names that did not resolve against the catalog.
    #[error("permissions not found: {}", .0.join(", "))]
    UnknownPermissions(Vec<String>),

    /// Well-formed request that makes no sense against the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Stored concurrency token no longer matches the expected one.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Write operation conflicts with a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller cancelled the operation before it committed.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true for both not-found categories.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UnknownPermissions(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_permissions_lists_every_name() {
        let error = AppError::UnknownPermissions(vec![
            "nonexistent:permission".to_owned(),
            "other:missing".to_owned(),
        ]);

        assert!(error.is_not_found());
        assert_eq!(
            error.to_string(),
            "permissions not found: nonexistent:permission, other:missing"
        );
    }
}
