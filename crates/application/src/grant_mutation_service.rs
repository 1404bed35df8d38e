use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warden_core::{ActorIdentity, AppError, AppResult};
use warden_domain::{
    AuditAction, ConcurrencyToken, GrantExpectation, GrantSet, GrantTarget, PermissionName,
    RoleId, UserId, normalize_permission_names, sort_by_display_name,
};

use crate::cancellation::ensure_active;
use crate::security_ports::append_committed;
use crate::{AuditEvent, AuditRepository, Clock, GrantStore};

/// Adds and removes role and user grants under optimistic concurrency.
#[derive(Clone)]
pub struct GrantMutationService {
    store: Arc<dyn GrantStore>,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl GrantMutationService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        store: Arc<dyn GrantStore>,
        audit_repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            audit_repository,
            clock,
        }
    }

    /// Returns the grants currently held by a target.
    pub async fn get_grant_set(
        &self,
        target: GrantTarget,
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        self.require_target(target, cancel).await?;
        self.read_grant_set(target, cancel).await
    }

    /// Grants permissions to a target.
    ///
    /// Every requested name must resolve against the catalog; otherwise the
    /// call fails listing all unresolved names and nothing is written. Names
    /// the target already holds are skipped. The audit event is appended
    /// after the write commits; a failed append is logged and the committed
    /// grant set is still returned.
    pub async fn add_grants<S: AsRef<str>>(
        &self,
        actor: &ActorIdentity,
        target: GrantTarget,
        permission_names: &[S],
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        let requested = normalize_permission_names(permission_names)?;
        self.require_target(target, cancel).await?;

        ensure_active(cancel, "grant add")?;
        let normalized: Vec<String> = requested
            .iter()
            .map(|name| name.normalized().to_owned())
            .collect();
        let resolved = self
            .store
            .get_permissions_by_normalized_names(&normalized)
            .await?;

        let missing: Vec<String> = requested
            .iter()
            .filter(|name| !resolved.iter().any(|permission| &permission.name == *name))
            .map(|name| name.as_str().to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::UnknownPermissions(missing));
        }

        ensure_active(cancel, "grant add")?;
        let held: BTreeSet<_> = self
            .store
            .list_grants(target)
            .await?
            .into_iter()
            .map(|granted| granted.grant.permission_id)
            .collect();
        let new_permissions: Vec<_> = resolved
            .iter()
            .filter(|permission| !held.contains(&permission.id))
            .collect();

        if !new_permissions.is_empty() {
            let permission_ids: Vec<_> = new_permissions
                .iter()
                .map(|permission| permission.id)
                .collect();
            let at = self.clock.now();

            ensure_active(cancel, "grant add")?;
            let token = self
                .store
                .link_permissions(target, &permission_ids, actor.subject(), at)
                .await?;

            let added = display_names(new_permissions.iter().map(|permission| &permission.name));
            info!(
                actor = actor.subject(),
                grant_target = %target,
                added = %added,
                token = %token,
                "permissions granted"
            );
            append_committed(
                self.audit_repository.as_ref(),
                AuditEvent {
                    subject: actor.subject().to_owned(),
                    action: AuditAction::SecurityGrantsAdded,
                    resource_type: target.kind().to_owned(),
                    resource_id: target.to_string(),
                    detail: Some(format!("granted {added}")),
                    occurred_at: at,
                },
            )
            .await;
        }

        self.read_grant_set(target, cancel).await
    }

    /// Revokes permissions from a target.
    ///
    /// At least one requested name must currently be held; names that are
    /// not held are ignored. When `expected_token` is supplied it must match
    /// the token the target carries now. Each removed row is deleted only if
    /// it still carries the token that was read, so a concurrent writer makes
    /// this call fail with `ConcurrencyConflict` instead of losing an update.
    /// As with adds, a failed audit append after the commit is only logged.
    pub async fn remove_grants<S: AsRef<str>>(
        &self,
        actor: &ActorIdentity,
        target: GrantTarget,
        permission_names: &[S],
        expected_token: Option<ConcurrencyToken>,
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        let requested = normalize_permission_names(permission_names)?;
        self.require_target(target, cancel).await?;

        ensure_active(cancel, "grant removal")?;
        let held = self.store.list_grants(target).await?;

        if let Some(expected) = expected_token {
            let current = held
                .first()
                .map(|granted| granted.grant.concurrency_token);
            if current != Some(expected) {
                warn!(
                    actor = actor.subject(),
                    grant_target = %target,
                    expected = %expected,
                    "grant removal rejected: stale concurrency token"
                );
                return Err(AppError::ConcurrencyConflict(format!(
                    "grants of {target} changed since token '{expected}' was issued"
                )));
            }
        }

        let removed: Vec<_> = held
            .iter()
            .filter(|granted| requested.contains(&granted.permission.name))
            .collect();
        if removed.is_empty() {
            return Err(AppError::InvalidOperation(
                "none of the requested permissions are currently assigned".to_owned(),
            ));
        }

        let expectations: Vec<GrantExpectation> = removed
            .iter()
            .map(|granted| GrantExpectation {
                permission_id: granted.grant.permission_id,
                concurrency_token: expected_token.unwrap_or(granted.grant.concurrency_token),
            })
            .collect();
        let at = self.clock.now();

        ensure_active(cancel, "grant removal")?;
        let token = self
            .store
            .unlink_permissions(target, &expectations, actor.subject(), at)
            .await
            .inspect_err(|error| {
                if matches!(error, AppError::ConcurrencyConflict(_)) {
                    warn!(
                        actor = actor.subject(),
                        grant_target = %target,
                        "grant removal lost a concurrent update race"
                    );
                }
            })?;

        let revoked = display_names(removed.iter().map(|granted| &granted.permission.name));
        info!(
            actor = actor.subject(),
            grant_target = %target,
            removed = %revoked,
            token = %token,
            "permissions revoked"
        );
        append_committed(
            self.audit_repository.as_ref(),
            AuditEvent {
                subject: actor.subject().to_owned(),
                action: AuditAction::SecurityGrantsRemoved,
                resource_type: target.kind().to_owned(),
                resource_id: target.to_string(),
                detail: Some(format!("revoked {revoked}")),
                occurred_at: at,
            },
        )
        .await;

        self.read_grant_set(target, cancel).await
    }

    /// Grants permissions to a role.
    pub async fn add_permissions_to_role<S: AsRef<str>>(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        permission_names: &[S],
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        self.add_grants(actor, GrantTarget::Role(role_id), permission_names, cancel)
            .await
    }

    /// Grants permissions directly to a user.
    pub async fn add_permissions_to_user<S: AsRef<str>>(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        permission_names: &[S],
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        self.add_grants(actor, GrantTarget::User(user_id), permission_names, cancel)
            .await
    }

    /// Revokes permissions from a role.
    pub async fn remove_permissions_from_role<S: AsRef<str>>(
        &self,
        actor: &ActorIdentity,
        role_id: RoleId,
        permission_names: &[S],
        expected_token: Option<ConcurrencyToken>,
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        self.remove_grants(
            actor,
            GrantTarget::Role(role_id),
            permission_names,
            expected_token,
            cancel,
        )
        .await
    }

    /// Revokes direct permissions from a user.
    pub async fn remove_permissions_from_user<S: AsRef<str>>(
        &self,
        actor: &ActorIdentity,
        user_id: UserId,
        permission_names: &[S],
        expected_token: Option<ConcurrencyToken>,
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        self.remove_grants(
            actor,
            GrantTarget::User(user_id),
            permission_names,
            expected_token,
            cancel,
        )
        .await
    }

    async fn require_target(
        &self,
        target: GrantTarget,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        ensure_active(cancel, "target lookup")?;
        let exists = match target {
            GrantTarget::Role(role_id) => self.store.get_role_by_id(role_id).await?.is_some(),
            GrantTarget::User(user_id) => self.store.get_user_by_id(user_id).await?.is_some(),
        };

        if !exists {
            return Err(AppError::NotFound(format!("{target} does not exist")));
        }

        Ok(())
    }

    async fn read_grant_set(
        &self,
        target: GrantTarget,
        cancel: &CancellationToken,
    ) -> AppResult<GrantSet> {
        ensure_active(cancel, "grant set lookup")?;
        let granted = self.store.list_grants(target).await?;
        let concurrency_token = granted
            .first()
            .map(|granted| granted.grant.concurrency_token);
        let mut permissions: Vec<_> = granted
            .into_iter()
            .map(|granted| granted.permission)
            .collect();
        sort_by_display_name(&mut permissions);

        Ok(GrantSet {
            target,
            permissions,
            concurrency_token,
        })
    }
}

fn display_names<'a>(names: impl Iterator<Item = &'a PermissionName>) -> String {
    names
        .map(PermissionName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests;
