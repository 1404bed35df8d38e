use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warden_core::{ActorIdentity, AppResult};
use warden_domain::{AuditAction, BuiltinPermission, Permission, Role, SystemRole};

use crate::cancellation::ensure_active;
use crate::{AuditEvent, AuditRepository, CatalogRepository, Clock, GrantMutationService};

/// Counts of catalog entries created by one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Built-in permissions that were missing and got created.
    pub permissions_created: usize,
    /// System roles that were missing and got created.
    pub roles_created: usize,
    /// Default role grants written for the created roles.
    pub grants_added: usize,
}

/// Creates the built-in permission catalog and the system roles.
///
/// Seeding is idempotent. Default grants are written only for roles created
/// by the same run, so grants an administrator revoked later stay revoked.
/// Each role receives its defaults before the next role is created; a run
/// that fails or is cancelled between the two writes leaves that one role
/// without defaults, and later runs do not add them. Grant them with
/// `GrantMutationService::add_permissions_to_role` in that case.
#[derive(Clone)]
pub struct CatalogSeedService {
    catalog: Arc<dyn CatalogRepository>,
    grants: GrantMutationService,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl CatalogSeedService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        grants: GrantMutationService,
        audit_repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            grants,
            audit_repository,
            clock,
        }
    }

    /// Seeds missing built-in permissions, system roles, and their defaults.
    pub async fn seed(
        &self,
        actor: &ActorIdentity,
        cancel: &CancellationToken,
    ) -> AppResult<SeedReport> {
        let mut report = SeedReport::default();

        ensure_active(cancel, "catalog seeding")?;
        let existing: BTreeSet<_> = self
            .catalog
            .list_permissions()
            .await?
            .into_iter()
            .map(|permission| permission.name)
            .collect();
        for builtin in BuiltinPermission::all() {
            if existing.contains(&builtin.name()) {
                continue;
            }

            ensure_active(cancel, "catalog seeding")?;
            self.catalog
                .save_permission(Permission::builtin(builtin))
                .await?;
            report.permissions_created += 1;
        }

        ensure_active(cancel, "catalog seeding")?;
        let existing_roles: BTreeSet<_> = self
            .catalog
            .list_roles()
            .await?
            .into_iter()
            .map(|role| role.name)
            .collect();
        for system_role in SystemRole::all() {
            if existing_roles.contains(&system_role.name()) {
                continue;
            }

            let role = Role::system(*system_role);
            ensure_active(cancel, "catalog seeding")?;
            self.catalog.save_role(role.clone()).await?;
            report.roles_created += 1;

            let defaults: Vec<String> = system_role
                .default_grants()
                .iter()
                .map(BuiltinPermission::storage_name)
                .collect();
            if defaults.is_empty() {
                continue;
            }

            let grant_set = self
                .grants
                .add_permissions_to_role(actor, role.id, &defaults, cancel)
                .await
                .inspect_err(|error| {
                    warn!(
                        role = %role.name,
                        error = %error,
                        "system role created without its default grants"
                    );
                })?;
            report.grants_added += grant_set.permissions.len();
        }

        if report != SeedReport::default() {
            info!(
                actor = actor.subject(),
                permissions = report.permissions_created,
                roles = report.roles_created,
                grants = report.grants_added,
                "security catalog seeded"
            );
            self.audit_repository
                .append_event(AuditEvent {
                    subject: actor.subject().to_owned(),
                    action: AuditAction::SecurityCatalogSeeded,
                    resource_type: "catalog".to_owned(),
                    resource_id: "builtin".to_owned(),
                    detail: Some(format!(
                        "created {} permissions, {} roles, {} grants",
                        report.permissions_created, report.roles_created, report.grants_added
                    )),
                    occurred_at: self.clock.now(),
                })
                .await?;
        }

        Ok(report)
    }
}
