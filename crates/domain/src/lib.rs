//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod catalog;
mod claims;
mod effective;
mod grant;
mod implication;
mod names;
mod policy;
mod security;
mod user;

pub use catalog::{Permission, PermissionId, Role, RoleId};
pub use claims::{
    CLAIM_EMAIL_VERIFIED, CLAIM_PERMISSION, CLAIM_ROLE, CLAIM_SUBJECT, CLAIM_TWO_FACTOR_ENABLED,
    Claim, IssuedClaims, Principal, PrincipalClaims,
};
pub use effective::{EffectivePermissionSet, RolePermissions, sort_by_display_name};
pub use grant::{AuditStamp, ConcurrencyToken, Grant, GrantExpectation, GrantSet, GrantTarget};
pub use implication::{ImplicationConfig, ImplicationMap};
pub use names::{MAX_NAME_LENGTH, PermissionName, RoleName, normalize_permission_names};
pub use policy::{
    Decision, DenyReason, POLICY_REQUIRE_ADMINISTRATOR, POLICY_REQUIRE_MANAGER,
    POLICY_REQUIRE_SUPER_ADMIN, POLICY_REQUIRE_TWO_FACTOR, POLICY_REQUIRE_USER,
    POLICY_REQUIRE_VERIFIED_EMAIL, POLICY_RESOURCE_OWNER, POLICY_SENSITIVE_ADMINISTRATION, Policy,
    PolicyRegistry, Requirement, ResourceContext,
};
pub use security::{AuditAction, BuiltinPermission, PermissionAction, PermissionResource, SystemRole};
pub use user::{UserAccount, UserId, UserRoleAssignment};
