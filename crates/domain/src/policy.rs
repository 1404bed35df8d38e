//! Claim-only authorization policies.
//!
//! A policy is a named conjunction of requirements. Every policy also requires
//! an authenticated principal. Evaluation never touches a store.

use std::collections::BTreeMap;

use serde::Serialize;
use warden_core::{AppError, AppResult};

use crate::claims::Principal;
use crate::security::{BuiltinPermission, SystemRole};

/// Resource data supplied by the caller for ownership checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContext {
    /// Identifier of the principal that owns the resource.
    pub owner_id: String,
}

impl ResourceContext {
    /// Creates a context for a resource owned by `owner_id`.
    #[must_use]
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }
}

/// Stateless predicate over a principal's claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// The permission claim must be present.
    PermissionPresent {
        /// Permission name, matched ordinally.
        permission: String,
    },
    /// At least one of the roles must be held.
    MinimumRole {
        /// Accepted role names.
        roles: Vec<String>,
    },
    /// The `email_verified` claim must be true.
    EmailVerified,
    /// The `two_factor_enabled` claim must be true.
    TwoFactorEnabled,
    /// The principal must own the resource or hold an administrative role.
    ResourceOwner {
        /// Roles that override the ownership check.
        administrative_roles: Vec<String>,
    },
}

impl Requirement {
    /// Requires a permission claim.
    #[must_use]
    pub fn permission(permission: impl Into<String>) -> Self {
        Self::PermissionPresent {
            permission: permission.into(),
        }
    }

    /// Requires `role` or any more privileged system role.
    #[must_use]
    pub fn minimum_role(role: SystemRole) -> Self {
        Self::MinimumRole {
            roles: role
                .at_least()
                .iter()
                .map(|role| role.as_str().to_owned())
                .collect(),
        }
    }

    /// Requires ownership, overridden by administrative system roles.
    #[must_use]
    pub fn resource_owner() -> Self {
        Self::ResourceOwner {
            administrative_roles: SystemRole::all()
                .iter()
                .filter(|role| role.is_administrative())
                .map(|role| role.as_str().to_owned())
                .collect(),
        }
    }

    /// Returns a short label used in deny reasons.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::PermissionPresent { .. } => "permission_present",
            Self::MinimumRole { .. } => "minimum_role",
            Self::EmailVerified => "email_verified",
            Self::TwoFactorEnabled => "two_factor_enabled",
            Self::ResourceOwner { .. } => "resource_owner",
        }
    }

    /// Evaluates the requirement, returning the failure message on deny.
    pub fn evaluate(
        &self,
        principal: &Principal,
        resource: Option<&ResourceContext>,
    ) -> Result<(), String> {
        let Some(claims) = principal.claims() else {
            return Err("principal is not authenticated".to_owned());
        };

        match self {
            Self::PermissionPresent { permission } => {
                if claims.has_permission(permission) {
                    Ok(())
                } else {
                    Err(format!("missing permission '{permission}'"))
                }
            }
            Self::MinimumRole { roles } => {
                if claims.has_any_role(roles) {
                    Ok(())
                } else {
                    Err(format!("requires one of the roles [{}]", roles.join(", ")))
                }
            }
            Self::EmailVerified => {
                if claims.email_verified {
                    Ok(())
                } else {
                    Err("email address is not verified".to_owned())
                }
            }
            Self::TwoFactorEnabled => {
                if claims.two_factor_enabled {
                    Ok(())
                } else {
                    Err("two-factor authentication is not enabled".to_owned())
                }
            }
            Self::ResourceOwner {
                administrative_roles,
            } => {
                if claims.has_any_role(administrative_roles) {
                    return Ok(());
                }

                match resource {
                    Some(resource) if resource.owner_id == claims.subject => Ok(()),
                    Some(_) => Err(format!(
                        "subject '{}' does not own the resource",
                        claims.subject
                    )),
                    None => Err("no resource context was supplied".to_owned()),
                }
            }
        }
    }
}

/// Diagnostic detail of a denied decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyReason {
    /// Evaluated policy.
    pub policy: String,
    /// Label of the first failing requirement, or `authentication`.
    pub requirement: String,
    /// Human-readable failure message.
    pub message: String,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    /// Every requirement passed.
    Allow,
    /// A requirement failed.
    Deny(DenyReason),
}

impl Decision {
    /// Returns whether the decision allows the request.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Named conjunction of requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    name: String,
    requirements: Vec<Requirement>,
}

impl Policy {
    /// Creates a policy; the name must not be blank.
    pub fn new(name: impl Into<String>, requirements: Vec<Requirement>) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "policy name must not be empty".to_owned(),
            ));
        }

        Ok(Self { name, requirements })
    }

    /// Returns the policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the requirements in evaluation order.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Evaluates every requirement and reports the first failure.
    #[must_use]
    pub fn evaluate(&self, principal: &Principal, resource: Option<&ResourceContext>) -> Decision {
        if principal.claims().is_none() {
            return Decision::Deny(DenyReason {
                policy: self.name.clone(),
                requirement: "authentication".to_owned(),
                message: "principal is not authenticated".to_owned(),
            });
        }

        for requirement in &self.requirements {
            if let Err(message) = requirement.evaluate(principal, resource) {
                return Decision::Deny(DenyReason {
                    policy: self.name.clone(),
                    requirement: requirement.label().to_owned(),
                    message,
                });
            }
        }

        Decision::Allow
    }
}

/// Immutable-after-startup lookup of policies by name.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, Policy>,
}

/// Policy requiring the `User` role or above.
pub const POLICY_REQUIRE_USER: &str = "RequireUser";
/// Policy requiring the `Manager` role or above.
pub const POLICY_REQUIRE_MANAGER: &str = "RequireManager";
/// Policy requiring the `Administrator` role or above.
pub const POLICY_REQUIRE_ADMINISTRATOR: &str = "RequireAdministrator";
/// Policy requiring the `SuperAdmin` role.
pub const POLICY_REQUIRE_SUPER_ADMIN: &str = "RequireSuperAdmin";
/// Policy requiring a verified email address.
pub const POLICY_REQUIRE_VERIFIED_EMAIL: &str = "RequireVerifiedEmail";
/// Policy requiring two-factor enrollment.
pub const POLICY_REQUIRE_TWO_FACTOR: &str = "RequireTwoFactor";
/// Policy requiring resource ownership or an administrative role.
pub const POLICY_RESOURCE_OWNER: &str = "ResourceOwnerOrAdmin";
/// Policy for sensitive administration: administrator, verified, two-factor.
pub const POLICY_SENSITIVE_ADMINISTRATION: &str = "SensitiveAdministration";

impl PolicyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a policy; names are unique.
    pub fn register(&mut self, policy: Policy) -> AppResult<()> {
        if self.policies.contains_key(policy.name()) {
            return Err(AppError::Conflict(format!(
                "policy '{}' is already registered",
                policy.name()
            )));
        }

        self.policies.insert(policy.name().to_owned(), policy);
        Ok(())
    }

    /// Returns the policy with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    /// Returns the registered policy names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    /// Default registry: one policy per built-in permission, named after the
    /// permission, plus the role, verification, and ownership policies.
    pub fn builtin() -> AppResult<Self> {
        let mut registry = Self::new();

        for permission in BuiltinPermission::all() {
            let name = permission.storage_name();
            registry.register(Policy::new(
                name.clone(),
                vec![Requirement::permission(name)],
            )?)?;
        }

        registry.register(Policy::new(
            POLICY_REQUIRE_USER,
            vec![Requirement::minimum_role(SystemRole::User)],
        )?)?;
        registry.register(Policy::new(
            POLICY_REQUIRE_MANAGER,
            vec![Requirement::minimum_role(SystemRole::Manager)],
        )?)?;
        registry.register(Policy::new(
            POLICY_REQUIRE_ADMINISTRATOR,
            vec![Requirement::minimum_role(SystemRole::Administrator)],
        )?)?;
        registry.register(Policy::new(
            POLICY_REQUIRE_SUPER_ADMIN,
            vec![Requirement::minimum_role(SystemRole::SuperAdmin)],
        )?)?;
        registry.register(Policy::new(
            POLICY_REQUIRE_VERIFIED_EMAIL,
            vec![Requirement::EmailVerified],
        )?)?;
        registry.register(Policy::new(
            POLICY_REQUIRE_TWO_FACTOR,
            vec![Requirement::TwoFactorEnabled],
        )?)?;
        registry.register(Policy::new(
            POLICY_RESOURCE_OWNER,
            vec![Requirement::resource_owner()],
        )?)?;
        registry.register(Policy::new(
            POLICY_SENSITIVE_ADMINISTRATION,
            vec![
                Requirement::minimum_role(SystemRole::Administrator),
                Requirement::EmailVerified,
                Requirement::TwoFactorEnabled,
            ],
        )?)?;

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use crate::claims::{Principal, PrincipalClaims};

    use super::{
        Decision, POLICY_RESOURCE_OWNER, POLICY_SENSITIVE_ADMINISTRATION, Policy, PolicyRegistry,
        Requirement, ResourceContext,
    };

    fn principal(subject: &str, roles: &[&str], permissions: &[&str]) -> Principal {
        let mut claims = PrincipalClaims::new(subject);
        claims.roles = roles.iter().map(|role| (*role).to_owned()).collect();
        claims.permissions = permissions
            .iter()
            .map(|permission| (*permission).to_owned())
            .collect();
        Principal::Authenticated(claims)
    }

    fn registry() -> PolicyRegistry {
        PolicyRegistry::builtin().unwrap_or_default()
    }

    #[test]
    fn anonymous_principal_fails_every_requirement() {
        let requirements = [
            Requirement::permission("products:read"),
            Requirement::EmailVerified,
            Requirement::TwoFactorEnabled,
            Requirement::resource_owner(),
        ];

        for requirement in requirements {
            assert!(
                requirement
                    .evaluate(&Principal::Anonymous, Some(&ResourceContext::owned_by("x")))
                    .is_err()
            );
        }

        let empty = Policy::new("open", Vec::new()).unwrap_or_else(|_| unreachable!());
        assert!(!empty.evaluate(&Principal::Anonymous, None).is_allowed());
        assert!(empty.evaluate(&principal("u", &[], &[]), None).is_allowed());
    }

    #[test]
    fn permission_policy_uses_ordinal_match() {
        let registry = registry();
        let policy = registry.get("products:read");
        assert!(policy.is_some());
        let policy = policy.unwrap_or_else(|| unreachable!());

        assert!(policy
            .evaluate(&principal("u", &[], &["products:read"]), None)
            .is_allowed());
        assert!(!policy
            .evaluate(&principal("u", &[], &["PRODUCTS:READ"]), None)
            .is_allowed());
    }

    #[test]
    fn resource_owner_allows_owner_and_administrators() {
        let registry = registry();
        let policy = registry
            .get(POLICY_RESOURCE_OWNER)
            .unwrap_or_else(|| unreachable!());
        let resource = ResourceContext::owned_by("alice");

        assert!(policy
            .evaluate(&principal("alice", &["User"], &[]), Some(&resource))
            .is_allowed());
        assert!(!policy
            .evaluate(&principal("bob", &["User"], &[]), Some(&resource))
            .is_allowed());
        assert!(policy
            .evaluate(&principal("bob", &["Administrator"], &[]), Some(&resource))
            .is_allowed());
        assert!(!policy
            .evaluate(&principal("alice", &["User"], &[]), None)
            .is_allowed());
    }

    #[test]
    fn deny_reports_first_failing_requirement() {
        let registry = registry();
        let policy = registry
            .get(POLICY_SENSITIVE_ADMINISTRATION)
            .unwrap_or_else(|| unreachable!());

        let decision = policy.evaluate(&principal("root", &["SuperAdmin"], &[]), None);
        match decision {
            Decision::Deny(reason) => {
                assert_eq!(reason.requirement, "email_verified");
                assert_eq!(reason.policy, POLICY_SENSITIVE_ADMINISTRATION);
            }
            Decision::Allow => panic!("expected deny"),
        }

        let mut claims = PrincipalClaims::new("root");
        claims.roles.insert("SuperAdmin".to_owned());
        claims.email_verified = true;
        claims.two_factor_enabled = true;
        assert!(policy
            .evaluate(&Principal::Authenticated(claims), None)
            .is_allowed());
    }

    #[test]
    fn duplicate_policy_names_are_rejected() {
        let mut registry = registry();
        let duplicate = Policy::new("products:read", Vec::new()).unwrap_or_else(|_| unreachable!());
        assert!(registry.register(duplicate).is_err());
    }
}
