//! User-side records consumed by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::RoleId;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// User account fields the engine needs for claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Stable identifier.
    pub id: UserId,
    /// Display name.
    pub display_name: String,
    /// Optional contact email.
    pub email: Option<String>,
    /// Whether the email address was confirmed.
    pub email_verified: bool,
    /// Whether a second factor is enrolled.
    pub two_factor_enabled: bool,
}

impl UserAccount {
    /// Creates an unverified account without a second factor.
    #[must_use]
    pub fn new(id: UserId, display_name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email,
            email_verified: false,
            two_factor_enabled: false,
        }
    }
}

/// Role held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    /// Assigned user.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Subject of the actor that made the assignment.
    pub assigned_by: String,
}
