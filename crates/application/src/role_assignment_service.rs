use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_core::{ActorIdentity, AppError, AppResult, NonEmptyString};
use warden_domain::{AuditAction, Role, RoleId, UserAccount, UserId, UserRoleAssignment};

use crate::cancellation::ensure_active;
use crate::security_ports::append_committed;
use crate::{AuditEvent, AuditRepository, CatalogRepository, Clock, GrantStore};

/// Registers users and manages their role assignments.
#[derive(Clone)]
pub struct RoleAssignmentService {
    store: Arc<dyn GrantStore>,
    catalog: Arc<dyn CatalogRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl RoleAssignmentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        store: Arc<dyn GrantStore>,
        catalog: Arc<dyn CatalogRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            audit_repository,
            clock,
        }
    }

    /// Registers a user account that roles and grants can target.
    pub async fn register_user(
        &self,
        display_name: &str,
        email: Option<String>,
        cancel: &CancellationToken,
    ) -> AppResult<UserAccount> {
        let display_name = NonEmptyString::new(display_name.trim())?;
        let user = UserAccount::new(UserId::new(), display_name.as_str(), email);

        ensure_active(cancel, "user registration")?;
        self.catalog.save_user(user.clone()).await?;

        Ok(user)
    }

    /// Finds a role by case-insensitive name.
    pub async fn find_role_by_name(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> AppResult<Role> {
        let normalized = name.trim().to_uppercase();

        ensure_active(cancel, "role lookup")?;
        self.catalog
            .list_roles()
            .await?
            .into_iter()
            .find(|role| role.name.normalized() == normalized)
            .ok_or_else(|| AppError::NotFound(format!("role '{}' does not exist", name.trim())))
    }

    /// Assigns a role to a user.
    pub async fn assign_role(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        role_id: RoleId,
        cancel: &CancellationToken,
    ) -> AppResult<UserRoleAssignment> {
        let role = self.require_user_and_role(user_id, role_id, cancel).await?;

        ensure_active(cancel, "role assignment")?;
        let held = self.store.get_user_roles(user_id).await?;
        if held.iter().any(|existing| existing.id == role_id) {
            return Err(AppError::Conflict(format!(
                "user '{user_id}' already holds role '{}'",
                role.name
            )));
        }

        let assignment = UserRoleAssignment {
            user_id,
            role_id,
            assigned_at: self.clock.now(),
            assigned_by: actor.subject().to_owned(),
        };

        ensure_active(cancel, "role assignment")?;
        self.catalog.assign_role(assignment.clone()).await?;

        info!(
            actor = actor.subject(),
            user_id = %user_id,
            role = %role.name,
            "role assigned"
        );
        append_committed(
            self.audit_repository.as_ref(),
            AuditEvent {
                subject: actor.subject().to_owned(),
                action: AuditAction::SecurityRoleAssigned,
                resource_type: "user".to_owned(),
                resource_id: user_id.to_string(),
                detail: Some(format!("assigned role '{}'", role.name)),
                occurred_at: assignment.assigned_at,
            },
        )
        .await;

        Ok(assignment)
    }

    /// Removes a role from a user. Fails with `InvalidOperation` when the
    /// user does not hold the role.
    pub async fn unassign_role(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        role_id: RoleId,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let role = self.require_user_and_role(user_id, role_id, cancel).await?;

        ensure_active(cancel, "role removal")?;
        if !self.catalog.remove_role(user_id, role_id).await? {
            return Err(AppError::InvalidOperation(format!(
                "user '{user_id}' does not hold role '{}'",
                role.name
            )));
        }

        info!(
            actor = actor.subject(),
            user_id = %user_id,
            role = %role.name,
            "role unassigned"
        );
        append_committed(
            self.audit_repository.as_ref(),
            AuditEvent {
                subject: actor.subject().to_owned(),
                action: AuditAction::SecurityRoleUnassigned,
                resource_type: "user".to_owned(),
                resource_id: user_id.to_string(),
                detail: Some(format!("removed role '{}'", role.name)),
                occurred_at: self.clock.now(),
            },
        )
        .await;

        Ok(())
    }

    async fn require_user_and_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        cancel: &CancellationToken,
    ) -> AppResult<Role> {
        ensure_active(cancel, "role assignment lookup")?;
        if self.store.get_user_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user '{user_id}' does not exist")));
        }

        ensure_active(cancel, "role assignment lookup")?;
        self.store
            .get_role_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }
}
