use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use warden_core::{AppError, AppResult};
use warden_domain::{
    EffectivePermissionSet, ImplicationMap, Permission, PermissionName, RolePermissions, UserId,
};

use crate::GrantStore;
use crate::cancellation::ensure_active;
use crate::catalog_view::CatalogView;

/// Computes direct and effective permission views for users.
#[derive(Clone)]
pub struct PermissionAggregator {
    store: Arc<dyn GrantStore>,
    implications: Arc<ImplicationMap>,
}

impl PermissionAggregator {
    /// Creates a new aggregator from required dependencies.
    #[must_use]
    pub fn new(store: Arc<dyn GrantStore>, implications: Arc<ImplicationMap>) -> Self {
        Self {
            store,
            implications,
        }
    }

    /// Returns the permissions granted directly to a user, unexpanded.
    pub async fn get_direct_permissions(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Permission>> {
        self.require_user(user_id, cancel).await?;

        ensure_active(cancel, "direct permission lookup")?;
        let names: BTreeSet<PermissionName> = self
            .store
            .get_permission_names_by_user_id(user_id)
            .await?
            .into_iter()
            .collect();

        let view = CatalogView::load(
            self.store.as_ref(),
            &ImplicationMap::empty(),
            &names,
            cancel,
        )
        .await?;
        Ok(view.materialize(&view.known(&names)))
    }

    /// Returns the direct, per-role, and effective permissions of a user.
    ///
    /// Granted names that no longer resolve against the catalog are dropped
    /// instead of failing the call. Expansion runs over the surviving names,
    /// so implied names appear even without a catalog row of their own.
    pub async fn get_effective_permissions(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> AppResult<EffectivePermissionSet> {
        self.require_user(user_id, cancel).await?;

        ensure_active(cancel, "effective permission lookup")?;
        let direct: BTreeSet<PermissionName> = self
            .store
            .get_permission_names_by_user_id(user_id)
            .await?
            .into_iter()
            .collect();

        ensure_active(cancel, "effective permission lookup")?;
        let mut roles = self.store.get_user_roles(user_id).await?;
        roles.sort_by(|left, right| {
            left.name
                .as_str()
                .to_lowercase()
                .cmp(&right.name.as_str().to_lowercase())
        });
        let role_ids: Vec<_> = roles.iter().map(|role| role.id).collect();

        let mut per_role: BTreeMap<_, BTreeSet<PermissionName>> = BTreeMap::new();
        if !role_ids.is_empty() {
            ensure_active(cancel, "effective permission lookup")?;
            for grant in self.store.get_permission_names_by_role_ids(&role_ids).await? {
                per_role
                    .entry(grant.role_id)
                    .or_default()
                    .insert(grant.permission_name);
            }
        }

        let candidate: BTreeSet<PermissionName> = direct
            .iter()
            .chain(per_role.values().flatten())
            .cloned()
            .collect();
        let view =
            CatalogView::load(self.store.as_ref(), &self.implications, &candidate, cancel).await?;
        let effective = view.expand_known(&self.implications, &candidate);

        let role_permissions = roles
            .into_iter()
            .map(|role| {
                let granted = per_role.remove(&role.id).unwrap_or_default();
                RolePermissions {
                    role_id: role.id,
                    role_name: role.name,
                    permissions: view
                        .materialize(&view.expand_known(&self.implications, &granted)),
                }
            })
            .collect();

        let result = EffectivePermissionSet {
            user_id,
            direct_permissions: view.materialize(&view.known(&direct)),
            role_permissions,
            effective_permissions: view.materialize(&effective),
        };

        debug!(
            user_id = %user_id,
            direct = result.direct_permissions.len(),
            roles = result.role_permissions.len(),
            effective = result.effective_permissions.len(),
            "computed effective permissions"
        );

        Ok(result)
    }

    async fn require_user(&self, user_id: UserId, cancel: &CancellationToken) -> AppResult<()> {
        ensure_active(cancel, "user lookup")?;
        self.store
            .get_user_by_id(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }
}
