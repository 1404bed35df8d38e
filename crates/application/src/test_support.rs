use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use warden_core::{AppError, AppResult};
use warden_domain::{
    AuditStamp, ConcurrencyToken, Grant, GrantExpectation, GrantTarget, Permission, PermissionId,
    PermissionName, Role, RoleId, RoleName, UserAccount, UserId, UserRoleAssignment,
};

use crate::{
    AuditEvent, AuditRepository, CatalogRepository, Clock, GrantStore, GrantedPermission,
    RoleGrantName,
};

#[derive(Default)]
pub(crate) struct FakeState {
    pub permissions: Vec<Permission>,
    pub roles: Vec<Role>,
    pub users: Vec<UserAccount>,
    pub assignments: Vec<UserRoleAssignment>,
    pub grants: Vec<Grant>,
    pub events: Vec<AuditEvent>,
    pub writes: usize,
}

/// Store fake backing every port with one mutex-guarded state.
#[derive(Default)]
pub(crate) struct FakeSecurityStore {
    pub state: Mutex<FakeState>,
    pub cancel_on_list_grants: Mutex<Option<CancellationToken>>,
    pub fail_audit_appends: Mutex<bool>,
}

impl FakeSecurityStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_permission(&self, name: &str) -> Permission {
        let permission = Permission::new(
            PermissionName::parse(name).unwrap_or_else(|_| unreachable!()),
            None,
        );
        self.state.lock().await.permissions.push(permission.clone());
        permission
    }

    pub async fn add_permissions(&self, names: &[&str]) {
        for name in names {
            self.add_permission(name).await;
        }
    }

    pub async fn add_role(&self, name: &str) -> Role {
        let role = Role::new(
            RoleName::parse(name).unwrap_or_else(|_| unreachable!()),
            None,
        );
        self.state.lock().await.roles.push(role.clone());
        role
    }

    pub async fn add_user(&self, display_name: &str) -> UserAccount {
        let user = UserAccount::new(UserId::new(), display_name, None);
        self.state.lock().await.users.push(user.clone());
        user
    }

    pub async fn assign(&self, user_id: UserId, role_id: RoleId) {
        self.state.lock().await.assignments.push(UserRoleAssignment {
            user_id,
            role_id,
            assigned_at: fixed_time(),
            assigned_by: "seed".to_owned(),
        });
    }

    pub async fn grant(&self, target: GrantTarget, permission: &Permission) {
        self.state.lock().await.grants.push(Grant {
            target,
            permission_id: permission.id,
            concurrency_token: ConcurrencyToken::new(),
            audit: AuditStamp::created("seed", fixed_time()),
        });
    }

    pub async fn grant_count(&self, target: GrantTarget) -> usize {
        self.state
            .lock()
            .await
            .grants
            .iter()
            .filter(|grant| grant.target == target)
            .count()
    }

    pub async fn writes(&self) -> usize {
        self.state.lock().await.writes
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.state.lock().await.events.clone()
    }
}

#[async_trait]
impl GrantStore for FakeSecurityStore {
    async fn get_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .find(|role| role.id == role_id)
            .cloned())
    }

    async fn get_user_by_id(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }

    async fn get_user_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id)
            .filter_map(|assignment| {
                state
                    .roles
                    .iter()
                    .find(|role| role.id == assignment.role_id)
                    .cloned()
            })
            .collect())
    }

    async fn get_permissions_by_normalized_names(
        &self,
        normalized_names: &[String],
    ) -> AppResult<Vec<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .filter(|permission| {
                normalized_names
                    .iter()
                    .any(|name| name == permission.name.normalized())
            })
            .cloned()
            .collect())
    }

    async fn get_permission_names_by_role_ids(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<RoleGrantName>> {
        let state = self.state.lock().await;
        let mut names = Vec::new();
        for grant in &state.grants {
            let GrantTarget::Role(role_id) = grant.target else {
                continue;
            };
            if !role_ids.contains(&role_id) {
                continue;
            }
            if let Some(permission) = state
                .permissions
                .iter()
                .find(|permission| permission.id == grant.permission_id)
            {
                names.push(RoleGrantName {
                    role_id,
                    permission_name: permission.name.clone(),
                });
            }
        }

        Ok(names)
    }

    async fn get_permission_names_by_user_id(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<PermissionName>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .iter()
            .filter(|grant| grant.target == GrantTarget::User(user_id))
            .filter_map(|grant| {
                state
                    .permissions
                    .iter()
                    .find(|permission| permission.id == grant.permission_id)
                    .map(|permission| permission.name.clone())
            })
            .collect())
    }

    async fn list_grants(&self, target: GrantTarget) -> AppResult<Vec<GrantedPermission>> {
        if let Some(cancel) = self.cancel_on_list_grants.lock().await.as_ref() {
            cancel.cancel();
        }

        let state = self.state.lock().await;
        Ok(state
            .grants
            .iter()
            .filter(|grant| grant.target == target)
            .filter_map(|grant| {
                state
                    .permissions
                    .iter()
                    .find(|permission| permission.id == grant.permission_id)
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
        let mut state = self.state.lock().await;
        let token = ConcurrencyToken::new();
        for permission_id in permission_ids {
            let exists = state
                .grants
                .iter()
                .any(|grant| grant.target == target && grant.permission_id == *permission_id);
            if !exists {
                state.grants.push(Grant {
                    target,
                    permission_id: *permission_id,
                    concurrency_token: token,
                    audit: AuditStamp::created(actor, at),
                });
            }
        }
        for grant in state.grants.iter_mut().filter(|grant| grant.target == target) {
            grant.concurrency_token = token;
            grant.audit = grant.audit.touched(actor, at);
        }
        state.writes += 1;

        Ok(token)
    }

    async fn unlink_permissions(
        &self,
        target: GrantTarget,
        expectations: &[GrantExpectation],
        actor: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ConcurrencyToken> {
        let mut state = self.state.lock().await;
        for expectation in expectations {
            let matches = state.grants.iter().any(|grant| {
                grant.target == target
                    && grant.permission_id == expectation.permission_id
                    && grant.concurrency_token == expectation.concurrency_token
            });
            if !matches {
                return Err(AppError::ConcurrencyConflict(format!(
                    "grant '{}' of {target} changed since it was read",
                    expectation.permission_id
                )));
            }
        }

        state.grants.retain(|grant| {
            grant.target != target
                || !expectations
                    .iter()
                    .any(|expectation| expectation.permission_id == grant.permission_id)
        });
        let token = ConcurrencyToken::new();
        for grant in state.grants.iter_mut().filter(|grant| grant.target == target) {
            grant.concurrency_token = token;
            grant.audit = grant.audit.touched(actor, at);
        }
        state.writes += 1;

        Ok(token)
    }
}

#[async_trait]
impl CatalogRepository for FakeSecurityStore {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.state.lock().await.permissions.clone())
    }

    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .permissions
            .iter()
            .any(|existing| existing.name == permission.name)
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name
            )));
        }
        state.permissions.push(permission);
        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.state.lock().await.roles.clone())
    }

    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.roles.iter().any(|existing| existing.name == role.name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        state.roles.push(role);
        Ok(())
    }

    async fn save_user(&self, user: UserAccount) -> AppResult<()> {
        self.state.lock().await.users.push(user);
        Ok(())
    }

    async fn assign_role(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.assignments.iter().any(|existing| {
            existing.user_id == assignment.user_id && existing.role_id == assignment.role_id
        }) {
            return Err(AppError::Conflict("role is already assigned".to_owned()));
        }
        state.assignments.push(assignment);
        Ok(())
    }

    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.assignments.len();
        state
            .assignments
            .retain(|assignment| assignment.user_id != user_id || assignment.role_id != role_id);
        Ok(state.assignments.len() != before)
    }
}

#[async_trait]
impl AuditRepository for FakeSecurityStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if *self.fail_audit_appends.lock().await {
            return Err(AppError::Internal("audit sink unavailable".to_owned()));
        }

        self.state.lock().await.events.push(event);
        Ok(())
    }
}

pub(crate) struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        fixed_time()
    }
}

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}
