use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warden_core::AppError;

use crate::names::{PermissionName, RoleName};

/// Resources covered by the built-in permission catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionResource {
    /// Product records.
    Products,
    /// Product categories.
    Categories,
    /// Sales orders.
    Orders,
    /// Customer records.
    Customers,
    /// Invoices.
    Invoices,
    /// User accounts.
    Users,
    /// Roles and their grants.
    Roles,
}

impl PermissionResource {
    /// Returns a stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Orders => "orders",
            Self::Customers => "customers",
            Self::Invoices => "invoices",
            Self::Users => "users",
            Self::Roles => "roles",
        }
    }

    /// Returns all known resources.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionResource] = &[
            PermissionResource::Products,
            PermissionResource::Categories,
            PermissionResource::Orders,
            PermissionResource::Customers,
            PermissionResource::Invoices,
            PermissionResource::Users,
            PermissionResource::Roles,
        ];

        ALL
    }
}

/// Actions covered by the built-in permission catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    /// View or list.
    Read,
    /// Create new records.
    Create,
    /// Modify existing records.
    Update,
    /// Delete records.
    Delete,
    /// Coarse grant implying every granular action.
    Manage,
}

impl PermissionAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionAction] = &[
            PermissionAction::Read,
            PermissionAction::Create,
            PermissionAction::Update,
            PermissionAction::Delete,
            PermissionAction::Manage,
        ];

        ALL
    }

    /// Returns the granular actions a `manage` grant implies.
    #[must_use]
    pub fn granular() -> &'static [Self] {
        const GRANULAR: &[PermissionAction] = &[
            PermissionAction::Read,
            PermissionAction::Create,
            PermissionAction::Update,
            PermissionAction::Delete,
        ];

        GRANULAR
    }
}

/// Typed identifier of a built-in catalog permission.
///
/// Default implication and role tables are written in terms of this type so a
/// misspelled permission is a compile error rather than a silently dead grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuiltinPermission {
    /// Resource the permission applies to.
    pub resource: PermissionResource,
    /// Action allowed on the resource.
    pub action: PermissionAction,
}

impl BuiltinPermission {
    /// Creates a built-in permission identifier.
    #[must_use]
    pub const fn new(resource: PermissionResource, action: PermissionAction) -> Self {
        Self { resource, action }
    }

    /// Shorthand for the `manage` permission of a resource.
    #[must_use]
    pub const fn manage(resource: PermissionResource) -> Self {
        Self::new(resource, PermissionAction::Manage)
    }

    /// Returns the storage and claim value, e.g. `products:read`.
    #[must_use]
    pub fn storage_name(&self) -> String {
        format!("{}:{}", self.resource.as_str(), self.action.as_str())
    }

    /// Returns the catalog name of this permission.
    #[must_use]
    pub fn name(&self) -> PermissionName {
        PermissionName::from_trusted(&self.storage_name())
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        let resource = self.resource.as_str();
        match self.action {
            PermissionAction::Read => format!("View and list {resource}"),
            PermissionAction::Create => format!("Create {resource}"),
            PermissionAction::Update => format!("Update {resource}"),
            PermissionAction::Delete => format!("Delete {resource}"),
            PermissionAction::Manage => format!("Full management of {resource}"),
        }
    }

    /// Returns the granular permissions implied by this one, if it is a
    /// `manage` permission.
    #[must_use]
    pub fn implied(&self) -> Vec<Self> {
        if self.action != PermissionAction::Manage {
            return Vec::new();
        }

        PermissionAction::granular()
            .iter()
            .map(|action| Self::new(self.resource, *action))
            .collect()
    }

    /// Returns every built-in permission.
    #[must_use]
    pub fn all() -> Vec<Self> {
        PermissionResource::all()
            .iter()
            .flat_map(|resource| {
                PermissionAction::all()
                    .iter()
                    .map(|action| Self::new(*resource, *action))
            })
            .collect()
    }
}

impl FromStr for BuiltinPermission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let Some((resource, action)) = normalized.split_once(':') else {
            return Err(AppError::Validation(format!(
                "permission '{value}' must have the form 'resource:action'"
            )));
        };

        let resource = PermissionResource::all()
            .iter()
            .find(|candidate| candidate.as_str() == resource)
            .ok_or_else(|| AppError::Validation(format!("unknown permission resource '{resource}'")))?;
        let action = PermissionAction::all()
            .iter()
            .find(|candidate| candidate.as_str() == action)
            .ok_or_else(|| AppError::Validation(format!("unknown permission action '{action}'")))?;

        Ok(Self::new(*resource, *action))
    }
}

/// Fixed roles created at system initialization.
///
/// Variants are declared from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemRole {
    /// Anonymous-like read-only visitor.
    Guest,
    /// Regular signed-in user.
    User,
    /// Business manager.
    Manager,
    /// Organization administrator.
    Administrator,
    /// Unrestricted administrator.
    SuperAdmin,
}

impl SystemRole {
    /// Returns the stable role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "Guest",
            Self::User => "User",
            Self::Manager => "Manager",
            Self::Administrator => "Administrator",
            Self::SuperAdmin => "SuperAdmin",
        }
    }

    /// Returns the catalog name of this role.
    #[must_use]
    pub fn name(&self) -> RoleName {
        RoleName::from_trusted(self.as_str())
    }

    /// Returns all system roles, least privileged first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SystemRole] = &[
            SystemRole::Guest,
            SystemRole::User,
            SystemRole::Manager,
            SystemRole::Administrator,
            SystemRole::SuperAdmin,
        ];

        ALL
    }

    /// Returns this role and every more privileged one.
    #[must_use]
    pub fn at_least(self) -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|role| *role >= self)
            .collect()
    }

    /// Returns whether the role overrides resource ownership checks.
    #[must_use]
    pub fn is_administrative(&self) -> bool {
        matches!(self, Self::Administrator | Self::SuperAdmin)
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Guest => "Read-only access to the public catalog",
            Self::User => "Places orders and browses the catalog",
            Self::Manager => "Manages catalog, orders, and customers",
            Self::Administrator => "Administers business data and user accounts",
            Self::SuperAdmin => "Unrestricted access including role administration",
        }
    }

    /// Returns the grants seeded for this role.
    #[must_use]
    pub fn default_grants(&self) -> Vec<BuiltinPermission> {
        use PermissionAction::{Create, Read};
        use PermissionResource::{Categories, Customers, Invoices, Orders, Products, Roles, Users};

        match self {
            Self::Guest => vec![
                BuiltinPermission::new(Products, Read),
                BuiltinPermission::new(Categories, Read),
            ],
            Self::User => vec![
                BuiltinPermission::new(Products, Read),
                BuiltinPermission::new(Categories, Read),
                BuiltinPermission::new(Orders, Read),
                BuiltinPermission::new(Orders, Create),
            ],
            Self::Manager => vec![
                BuiltinPermission::manage(Products),
                BuiltinPermission::manage(Categories),
                BuiltinPermission::manage(Orders),
                BuiltinPermission::manage(Customers),
                BuiltinPermission::new(Invoices, Read),
            ],
            Self::Administrator => vec![
                BuiltinPermission::manage(Products),
                BuiltinPermission::manage(Categories),
                BuiltinPermission::manage(Orders),
                BuiltinPermission::manage(Customers),
                BuiltinPermission::manage(Invoices),
                BuiltinPermission::manage(Users),
                BuiltinPermission::new(Roles, Read),
            ],
            Self::SuperAdmin => PermissionResource::all()
                .iter()
                .map(|resource| BuiltinPermission::manage(*resource))
                .collect(),
        }
    }
}

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when permissions are granted to a role or user.
    SecurityGrantsAdded,
    /// Emitted when permissions are revoked from a role or user.
    SecurityGrantsRemoved,
    /// Emitted when a role is assigned to a user.
    SecurityRoleAssigned,
    /// Emitted when a role is removed from a user.
    SecurityRoleUnassigned,
    /// Emitted when the catalog seeder creates missing entries.
    SecurityCatalogSeeded,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityGrantsAdded => "security.grants.added",
            Self::SecurityGrantsRemoved => "security.grants.removed",
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityRoleUnassigned => "security.role.unassigned",
            Self::SecurityCatalogSeeded => "security.catalog.seeded",
        }
    }
}
