use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Permission, PermissionId, RoleId};
use crate::user::UserId;

/// Principal a permission is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GrantTarget {
    /// Role-to-permission grant.
    Role(RoleId),
    /// Direct user-to-permission grant.
    User(UserId),
}

impl GrantTarget {
    /// Returns a stable label for the target kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role(_) => "role",
            Self::User(_) => "user",
        }
    }
}

impl Display for GrantTarget {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role(role_id) => write!(formatter, "role:{role_id}"),
            Self::User(user_id) => write!(formatter, "user:{user_id}"),
        }
    }
}

/// Opaque optimistic-concurrency token, regenerated on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcurrencyToken(Uuid);

impl ConcurrencyToken {
    /// Creates a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a token from an existing UUID value.
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

impl Default for ConcurrencyToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConcurrencyToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Creation and last-modification stamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Creating actor subject.
    pub created_by: String,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
    /// Last modifying actor subject.
    pub modified_by: String,
}

impl AuditStamp {
    /// Stamp for a row created now.
    #[must_use]
    pub fn created(actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            created_by: actor.to_owned(),
            modified_at: at,
            modified_by: actor.to_owned(),
        }
    }

    /// Re-stamps the modification fields, keeping creation fields.
    #[must_use]
    pub fn touched(&self, actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            modified_at: at,
            modified_by: actor.to_owned(),
        }
    }
}

/// Persisted link from a role or user to a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Grant holder.
    pub target: GrantTarget,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Current concurrency token of the row.
    pub concurrency_token: ConcurrencyToken,
    /// Audit stamps.
    pub audit: AuditStamp,
}

/// Row a caller expects to remove, with the token it last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantExpectation {
    /// Permission whose grant is removed.
    pub permission_id: PermissionId,
    /// Token the row must still carry.
    pub concurrency_token: ConcurrencyToken,
}

/// Grants currently held by one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantSet {
    /// Grant holder.
    pub target: GrantTarget,
    /// Granted permissions ordered by display name.
    pub permissions: Vec<Permission>,
    /// Token shared by the target's rows; `None` when nothing is granted.
    pub concurrency_token: Option<ConcurrencyToken>,
}

impl GrantSet {
    /// Returns whether the set holds the permission (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let normalized = name.trim().to_uppercase();
        self.permissions
            .iter()
            .any(|permission| permission.name.normalized() == normalized)
    }

    /// Returns the display names of the granted permissions.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.permissions
            .iter()
            .map(|permission| permission.name.as_str().to_owned())
            .collect()
    }
}
