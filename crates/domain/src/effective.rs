use serde::Serialize;

use crate::catalog::{Permission, RoleId};
use crate::names::RoleName;
use crate::user::UserId;

/// Expanded grants contributed by one assigned role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePermissions {
    /// Assigned role.
    pub role_id: RoleId,
    /// Role display name.
    pub role_name: RoleName,
    /// Role grants after implication expansion, ordered by display name.
    pub permissions: Vec<Permission>,
}

/// Computed, non-persisted view of a user's permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePermissionSet {
    /// Subject user.
    pub user_id: UserId,
    /// Direct grants, unexpanded.
    pub direct_permissions: Vec<Permission>,
    /// Per-role breakdown ordered by role display name.
    pub role_permissions: Vec<RolePermissions>,
    /// Expanded union of direct and role-derived grants.
    pub effective_permissions: Vec<Permission>,
}

impl EffectivePermissionSet {
    /// Returns whether the effective set holds the permission (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let normalized = name.trim().to_uppercase();
        self.effective_permissions
            .iter()
            .any(|permission| permission.name.normalized() == normalized)
    }

    /// Returns the display names of the effective permissions.
    #[must_use]
    pub fn effective_names(&self) -> Vec<&str> {
        self.effective_permissions
            .iter()
            .map(|permission| permission.name.as_str())
            .collect()
    }
}

/// Orders permissions by display name, case-insensitively, with an ordinal
/// tiebreak so output is deterministic.
pub fn sort_by_display_name(permissions: &mut [Permission]) {
    permissions.sort_by(|left, right| {
        left.name
            .as_str()
            .to_lowercase()
            .cmp(&right.name.as_str().to_lowercase())
            .then_with(|| left.name.as_str().cmp(right.name.as_str()))
    });
}

#[cfg(test)]
mod tests {
    use crate::catalog::Permission;
    use crate::names::PermissionName;

    use super::sort_by_display_name;

    fn permission(name: &str) -> Permission {
        Permission::new(
            PermissionName::parse(name).unwrap_or_else(|_| unreachable!()),
            None,
        )
    }

    #[test]
    fn sorting_ignores_case() {
        let mut permissions = vec![
            permission("Products:Update"),
            permission("orders:read"),
            permission("products:create"),
        ];

        sort_by_display_name(&mut permissions);

        let names: Vec<&str> = permissions
            .iter()
            .map(|permission| permission.name.as_str())
            .collect();
        assert_eq!(names, ["orders:read", "products:create", "Products:Update"]);
    }
}
