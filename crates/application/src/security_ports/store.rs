use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::AppResult;
use warden_domain::{
    ConcurrencyToken, Grant, GrantExpectation, GrantTarget, Permission, PermissionId,
    PermissionName, Role, RoleId, UserAccount, UserId,
};

/// Permission name granted to one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrantName {
    /// Role holding the grant.
    pub role_id: RoleId,
    /// Granted permission name.
    pub permission_name: PermissionName,
}

/// Grant row joined with its catalog permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedPermission {
    /// Grant row.
    pub grant: Grant,
    /// Catalog permission referenced by the grant.
    pub permission: Permission,
}

/// Read/write facade over the role and user grant relations.
///
/// Every method is atomic on its own. The engine holds no locks across calls;
/// lost updates are detected through concurrency tokens on unlink.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Finds a role by identifier.
    async fn get_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a user account by identifier.
    async fn get_user_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>>;

    /// Lists the roles assigned to a user.
    async fn get_user_roles(&self, user_id: UserId) -> AppResult<Vec<Role>>;

    /// Resolves normalized names against the catalog in one lookup. Names
    /// without a catalog record are absent from the result.
    async fn get_permissions_by_normalized_names(
        &self,
        normalized_names: &[String],
    ) -> AppResult<Vec<Permission>>;

    /// Lists the permission names granted to each of the roles.
    async fn get_permission_names_by_role_ids(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RoleGrantName>>;

    /// Lists the permission names granted directly to a user.
    async fn get_permission_names_by_user_id(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionName>>;

    /// Lists the grant rows currently held by a target.
    async fn list_grants(&self, target: GrantTarget) -> AppResult<Vec<GrantedPermission>>;

    /// Inserts grants that do not exist yet and re-stamps every row of the
    /// target with one fresh token, which is returned.
    async fn link_permissions(
        &self,
        target: GrantTarget,
        permission_ids: &[PermissionId],
        actor: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ConcurrencyToken>;

    /// Deletes the expected grants and re-stamps the remaining rows.
    ///
    /// Fails with `ConcurrencyConflict`, deleting nothing, when any expected
    /// row is missing or carries a different token.
    async fn unlink_permissions(
        &self,
        target: GrantTarget,
        expectations: &[GrantExpectation],
        actor: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ConcurrencyToken>;
}
