use async_trait::async_trait;

use warden_core::AppResult;
use warden_domain::{Permission, Role, RoleId, UserAccount, UserId, UserRoleAssignment};

/// Repository port for catalog records and role assignments.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Lists every catalog permission.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Persists a new permission. Fails with `Conflict` when the normalized
    /// name is taken.
    async fn save_permission(&self, permission: Permission) -> AppResult<()>;

    /// Lists every role.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Persists a new role. Fails with `Conflict` when the normalized name is
    /// taken.
    async fn save_role(&self, role: Role) -> AppResult<()>;

    /// Persists a new user account.
    async fn save_user(&self, user: UserAccount) -> AppResult<()>;

    /// Records a role assignment. Fails with `Conflict` when the user already
    /// holds the role.
    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()>;

    /// Deletes a role assignment, returning whether one existed.
    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool>;
}
