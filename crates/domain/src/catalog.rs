use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::names::{PermissionName, RoleName};
use crate::security::{BuiltinPermission, SystemRole};

/// Unique identifier for a catalog permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
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

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
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

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Catalog permission record. Identity is the normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable identifier.
    pub id: PermissionId,
    /// Display and normalized name.
    pub name: PermissionName,
    /// Optional description shown in administration views.
    pub description: Option<String>,
}

impl Permission {
    /// Creates a permission record with a fresh identifier.
    #[must_use]
    pub fn new(name: PermissionName, description: Option<String>) -> Self {
        Self {
            id: PermissionId::new(),
            name,
            description,
        }
    }

    /// Creates the record for a name reached only through an implication rule.
    ///
    /// Such names have no catalog row; the identifier is derived from the
    /// normalized name so every view reports the same one.
    #[must_use]
    pub fn implied(name: PermissionName) -> Self {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.normalized().as_bytes());

        Self {
            id: PermissionId::from_uuid(id),
            name,
            description: None,
        }
    }

    /// Creates the catalog record for a built-in permission.
    #[must_use]
    pub fn builtin(permission: BuiltinPermission) -> Self {
        Self::new(permission.name(), Some(permission.description()))
    }
}

/// Role record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable identifier.
    pub id: RoleId,
    /// Display and normalized name.
    pub name: RoleName,
    /// Optional description shown in administration views.
    pub description: Option<String>,
}

impl Role {
    /// Creates a role record with a fresh identifier.
    #[must_use]
    pub fn new(name: RoleName, description: Option<String>) -> Self {
        Self {
            id: RoleId::new(),
            name,
            description,
        }
    }

    /// Creates the record for a fixed system role.
    #[must_use]
    pub fn system(role: SystemRole) -> Self {
        Self::new(role.name(), Some(role.description().to_owned()))
    }
}
