use std::sync::Arc;

use tracing::{debug, warn};
use warden_core::{AppError, AppResult};
use warden_domain::{Decision, Principal, PolicyRegistry, ResourceContext};

/// Decision point evaluating named policies against presented claims.
///
/// Evaluation uses only the claims; it never reads the grant store.
#[derive(Clone)]
pub struct AuthorizationService {
    policies: Arc<PolicyRegistry>,
}

impl AuthorizationService {
    /// Creates a new decision point over a policy registry.
    #[must_use]
    pub fn new(policies: Arc<PolicyRegistry>) -> Self {
        Self { policies }
    }

    /// Evaluates a policy. A deny is a normal decision; only an unknown
    /// policy name is an error.
    pub fn authorize(
        &self,
        principal: &Principal,
        policy_name: &str,
        resource: Option<&ResourceContext>,
    ) -> AppResult<Decision> {
        let policy = self.policies.get(policy_name).ok_or_else(|| {
            AppError::NotFound(format!("policy '{policy_name}' is not registered"))
        })?;

        let decision = policy.evaluate(principal, resource);
        let subject = principal
            .claims()
            .map_or("anonymous", |claims| claims.subject.as_str());

        match &decision {
            Decision::Allow => debug!(subject, policy = policy_name, "authorization allowed"),
            Decision::Deny(reason) => warn!(
                subject,
                policy = policy_name,
                requirement = %reason.requirement,
                reason = %reason.message,
                "authorization denied"
            ),
        }

        Ok(decision)
    }

    /// Returns whether the principal satisfies the policy.
    pub fn is_allowed(
        &self,
        principal: &Principal,
        policy_name: &str,
        resource: Option<&ResourceContext>,
    ) -> AppResult<bool> {
        Ok(self
            .authorize(principal, policy_name, resource)?
            .is_allowed())
    }
}
