use std::collections::{BTreeMap, BTreeSet};

use tokio_util::sync::CancellationToken;
use warden_core::AppResult;
use warden_domain::{ImplicationMap, Permission, PermissionName, sort_by_display_name};

use crate::GrantStore;
use crate::cancellation::ensure_active;

/// Catalog records for a batch of names, loaded in one lookup.
///
/// Granted names without a catalog row are dropped before expansion. Names
/// reached through an implication keep an implied record when the catalog
/// has no row for them.
pub(crate) struct CatalogView {
    records: BTreeMap<PermissionName, Permission>,
}

impl CatalogView {
    /// Loads the records for `granted` and everything it implies.
    pub(crate) async fn load(
        store: &dyn GrantStore,
        implications: &ImplicationMap,
        granted: &BTreeSet<PermissionName>,
        cancel: &CancellationToken,
    ) -> AppResult<Self> {
        let wanted = implications.expand(granted);
        if wanted.is_empty() {
            return Ok(Self {
                records: BTreeMap::new(),
            });
        }

        let normalized: Vec<String> = wanted
            .iter()
            .map(|name| name.normalized().to_owned())
            .collect();

        ensure_active(cancel, "catalog lookup")?;
        let records = store
            .get_permissions_by_normalized_names(&normalized)
            .await?
            .into_iter()
            .map(|permission| (permission.name.clone(), permission))
            .collect();

        Ok(Self { records })
    }

    /// Granted names that still resolve against the catalog.
    pub(crate) fn known(&self, granted: &BTreeSet<PermissionName>) -> BTreeSet<PermissionName> {
        granted
            .iter()
            .filter(|name| self.records.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Expands the known part of `granted`.
    pub(crate) fn expand_known(
        &self,
        implications: &ImplicationMap,
        granted: &BTreeSet<PermissionName>,
    ) -> BTreeSet<PermissionName> {
        implications.expand(&self.known(granted))
    }

    /// Records for `names`, ordered by display name.
    pub(crate) fn materialize(&self, names: &BTreeSet<PermissionName>) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = names
            .iter()
            .map(|name| {
                self.records
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Permission::implied(name.clone()))
            })
            .collect();
        sort_by_display_name(&mut permissions);
        permissions
    }
}
