use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use warden_application::{
    AuditEvent, AuditRepository, CatalogRepository, GrantStore, GrantedPermission, RoleGrantName,
};
use warden_core::{AppError, AppResult};
use warden_domain::{
    AuditStamp, ConcurrencyToken, Grant, GrantExpectation, GrantTarget, Permission, PermissionId,
    PermissionName, Role, RoleId, UserAccount, UserId, UserRoleAssignment,
};

#[derive(Debug, Default)]
struct SecurityState {
    permissions: HashMap<PermissionId, Permission>,
    permissions_by_name: HashMap<String, PermissionId>,
    roles: HashMap<RoleId, Role>,
    users: HashMap<UserId, UserAccount>,
    assignments: Vec<UserRoleAssignment>,
    grants: HashMap<(GrantTarget, PermissionId), Grant>,
    audit_events: Vec<AuditEvent>,
}

impl SecurityState {
    fn restamp(&mut self, target: GrantTarget, actor: &str, at: DateTime<Utc>) -> ConcurrencyToken {
        let token = ConcurrencyToken::new();
        for grant in self
            .grants
            .values_mut()
            .filter(|grant| grant.target == target)
        {
            grant.concurrency_token = token;
            grant.audit = grant.audit.touched(actor, at);
        }

        token
    }
}

/// In-memory implementation of the grant store, catalog, and audit ports.
///
/// Each port call runs inside one write-lock section, which makes every
/// mutation atomic.
#[derive(Debug, Default)]
pub struct InMemorySecurityStore {
    state: RwLock<SecurityState>,
}

impl InMemorySecurityStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the audit events appended so far, oldest first.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.state.read().await.audit_events.clone()
    }
}

#[async_trait]
impl GrantStore for InMemorySecurityStore {
    async fn get_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&role_id).cloned())
    }

    async fn get_user_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id)
            .filter_map(|assignment| state.roles.get(&assignment.role_id).cloned())
            .collect())
    }

    async fn get_permissions_by_normalized_names(
        &self,
        normalized_names: &[String],
    ) -> AppResult<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(normalized_names
            .iter()
            .filter_map(|name| state.permissions_by_name.get(name))
            .filter_map(|permission_id| state.permissions.get(permission_id).cloned())
            .collect())
    }

    async fn get_permission_names_by_role_ids(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RoleGrantName>> {
        let state = self.state.read().await;
        Ok(state
            .grants
            .values()
            .filter_map(|grant| match grant.target {
                GrantTarget::Role(role_id) if role_ids.contains(&role_id) => state
                    .permissions
                    .get(&grant.permission_id)
                    .map(|permission| RoleGrantName {
                        role_id,
                        permission_name: permission.name.clone(),
                    }),
                _ => None,
            })
            .collect())
    }

    async fn get_permission_names_by_user_id(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionName>> {
        let state = self.state.read().await;
        Ok(state
            .grants
            .values()
            .filter(|grant| grant.target == GrantTarget::User(user_id))
            .filter_map(|grant| state.permissions.get(&grant.permission_id))
            .map(|permission| permission.name.clone())
            .collect())
    }

    async fn list_grants(&self, target: GrantTarget) -> AppResult<Vec<GrantedPermission>> {
        let state = self.state.read().await;
        Ok(state
            .grants
            .values()
            .filter(|grant| grant.target == target)
            .filter_map(|grant| {
                state
                    .permissions
                    .get(&grant.permission_id)
                    .map(|permission| GrantedPermission {
                        grant: grant.clone(),
                        permission: permission.clone(),
                    })
            })
            .collect())
    }

    async fn link_permissions(
        &self,
        target: GrantTarget,
        permission_ids: &[PermissionId],
        actor: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ConcurrencyToken> {
        let mut state = self.state.write().await;

        if let Some(missing) = permission_ids
            .iter()
            .find(|permission_id| !state.permissions.contains_key(*permission_id))
        {
            return Err(AppError::NotFound(format!(
                "permission '{missing}' does not exist"
            )));
        }

        for permission_id in permission_ids {
            state
                .grants
                .entry((target, *permission_id))
                .or_insert_with(|| Grant {
                    target,
                    permission_id: *permission_id,
                    concurrency_token: ConcurrencyToken::new(),
                    audit: AuditStamp::created(actor, at),
                });
        }

        Ok(state.restamp(target, actor, at))
    }

    async fn unlink_permissions(
        &self,
        target: GrantTarget,
        expectations: &[GrantExpectation],
        actor: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ConcurrencyToken> {
        let mut state = self.state.write().await;

        for expectation in expectations {
            let current = state
                .grants
                .get(&(target, expectation.permission_id))
                .map(|grant| grant.concurrency_token);
            if current != Some(expectation.concurrency_token) {
                return Err(AppError::ConcurrencyConflict(format!(
                    "grant of permission '{}' to {target} was modified concurrently",
                    expectation.permission_id
                )));
            }
        }

        for expectation in expectations {
            state.grants.remove(&(target, expectation.permission_id));
        }

        Ok(state.restamp(target, actor, at))
    }
}

#[async_trait]
impl CatalogRepository for InMemorySecurityStore {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut permissions: Vec<Permission> =
            self.state.read().await.permissions.values().cloned().collect();
        permissions.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(permissions)
    }

    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        let mut state = self.state.write().await;
        let key = permission.name.normalized().to_owned();

        if state.permissions_by_name.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name
            )));
        }

        state.permissions_by_name.insert(key, permission.id);
        state.permissions.insert(permission.id, permission);
        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.state.read().await.roles.values().cloned().collect();
        roles.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(roles)
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut state = self.state.write().await;

        if state.roles.values().any(|existing| existing.name == role.name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }

        state.roles.insert(role.id, role);
        Ok(())
    }

    async fn save_user(&self, user: UserAccount) -> AppResult<()> {
        let mut state = self.state.write().await;

        if state.users.contains_key(&user.id) {
            return Err(AppError::Conflict(format!(
                "user '{}' already exists",
                user.id
            )));
        }

        state.users.insert(user.id, user);
        Ok(())
    }

    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        let mut state = self.state.write().await;

        if state.assignments.iter().any(|existing| {
            existing.user_id == assignment.user_id && existing.role_id == assignment.role_id
        }) {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds role '{}'",
                assignment.user_id, assignment.role_id
            )));
        }

        state.assignments.push(assignment);
        Ok(())
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.assignments.len();
        state
            .assignments
            .retain(|assignment| assignment.user_id != user_id || assignment.role_id != role_id);

        Ok(state.assignments.len() != before)
    }
}

#[async_trait]
impl AuditRepository for InMemorySecurityStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.state.write().await.audit_events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
