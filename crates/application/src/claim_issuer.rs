//! Credential claim computation.
//!
//! Claims are a snapshot taken at issuance. Grants revoked afterwards stay in
//! the already-issued payload until the credential is issued again.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use warden_core::{AppError, AppResult};
use warden_domain::{
    ImplicationMap, IssuedClaims, PermissionName, PrincipalClaims, UserAccount, UserId,
};

use crate::GrantStore;
use crate::cancellation::ensure_active;
use crate::catalog_view::CatalogView;

/// Computes role and permission claims for credential issuance.
#[derive(Clone)]
pub struct ClaimIssuer {
    store: Arc<dyn GrantStore>,
    implications: Arc<ImplicationMap>,
}

impl ClaimIssuer {
    /// Creates a new issuer from required dependencies.
    #[must_use]
    pub fn new(store: Arc<dyn GrantStore>, implications: Arc<ImplicationMap>) -> Self {
        Self {
            store,
            implications,
        }
    }

    /// Returns the user's role names and the expanded permissions of those
    /// roles.
    pub async fn issue_claims(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> AppResult<IssuedClaims> {
        self.require_user(user_id, cancel).await?;
        self.collect(user_id, cancel).await
    }

    /// Returns the full claim payload for a user, including account flags.
    pub async fn issue_principal_claims(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> AppResult<PrincipalClaims> {
        let user = self.require_user(user_id, cancel).await?;
        let issued = self.collect(user_id, cancel).await?;

        Ok(PrincipalClaims {
            email_verified: user.email_verified,
            two_factor_enabled: user.two_factor_enabled,
            ..PrincipalClaims::from_issued(user_id.to_string(), issued)
        })
    }

    async fn require_user(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> AppResult<UserAccount> {
        ensure_active(cancel, "claim issuance")?;
        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }

    async fn collect(&self, user_id: UserId, cancel: &CancellationToken) -> AppResult<IssuedClaims> {
        ensure_active(cancel, "claim issuance")?;
        let roles = self.store.get_user_roles(user_id).await?;
        if roles.is_empty() {
            return Ok(IssuedClaims::default());
        }

        let role_ids: Vec<_> = roles.iter().map(|role| role.id).collect();
        ensure_active(cancel, "claim issuance")?;
        let granted: BTreeSet<PermissionName> = self
            .store
            .get_permission_names_by_role_ids(&role_ids)
            .await?
            .into_iter()
            .map(|grant| grant.permission_name)
            .collect();
        let view =
            CatalogView::load(self.store.as_ref(), &self.implications, &granted, cancel).await?;
        let expanded = view.materialize(&view.expand_known(&self.implications, &granted));

        let issued = IssuedClaims {
            roles: roles
                .iter()
                .map(|role| role.name.as_str().to_owned())
                .collect(),
            permissions: expanded
                .into_iter()
                .map(|permission| permission.name.as_str().to_owned())
                .collect(),
        };

        debug!(
            user_id = %user_id,
            roles = issued.roles.len(),
            permissions = issued.permissions.len(),
            "issued claims"
        );

        Ok(issued)
    }
}
