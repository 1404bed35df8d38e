//! Claim payload embedded in issued credentials.
//!
//! The payload is a point-in-time snapshot. Revoking a grant does not touch
//! claims that were already issued; the change shows up at the next issuance.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult};

/// Claim type carrying the principal identifier.
pub const CLAIM_SUBJECT: &str = "sub";
/// Claim type carrying one role name.
pub const CLAIM_ROLE: &str = "role";
/// Claim type carrying one permission name.
pub const CLAIM_PERMISSION: &str = "permission";
/// Claim type carrying the email verification flag.
pub const CLAIM_EMAIL_VERIFIED: &str = "email_verified";
/// Claim type carrying the two-factor flag.
pub const CLAIM_TWO_FACTOR_ENABLED: &str = "two_factor_enabled";

/// One name/value pair of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type.
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claim value.
    pub value: String,
}

impl Claim {
    /// Creates a claim.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Role and permission names computed for a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedClaims {
    /// Assigned role names.
    pub roles: BTreeSet<String>,
    /// Expanded permission names.
    pub permissions: BTreeSet<String>,
}

/// Claims presented by an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalClaims {
    /// Principal identifier.
    pub subject: String,
    /// Role names.
    pub roles: BTreeSet<String>,
    /// Permission names.
    pub permissions: BTreeSet<String>,
    /// Email verification flag.
    pub email_verified: bool,
    /// Two-factor enrollment flag.
    pub two_factor_enabled: bool,
}

impl PrincipalClaims {
    /// Creates claims for a subject with no roles, permissions, or flags.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
            email_verified: false,
            two_factor_enabled: false,
        }
    }

    /// Builds claims from an issued role/permission snapshot.
    #[must_use]
    pub fn from_issued(subject: impl Into<String>, issued: IssuedClaims) -> Self {
        Self {
            roles: issued.roles,
            permissions: issued.permissions,
            ..Self::new(subject)
        }
    }

    /// Parses a flat claim list.
    ///
    /// Exactly one `sub` claim is required. Flag claims are true only for the
    /// value `true` (case-insensitive); unknown claim types are ignored.
    pub fn from_claims<'a, I>(claims: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        let mut subject: Option<&str> = None;
        let mut roles = BTreeSet::new();
        let mut permissions = BTreeSet::new();
        let mut email_verified = false;
        let mut two_factor_enabled = false;

        for claim in claims {
            match claim.claim_type.as_str() {
                CLAIM_SUBJECT => {
                    if subject.replace(claim.value.as_str()).is_some() {
                        return Err(AppError::Validation(
                            "claim set must contain exactly one subject".to_owned(),
                        ));
                    }
                }
                CLAIM_ROLE => {
                    roles.insert(claim.value.clone());
                }
                CLAIM_PERMISSION => {
                    permissions.insert(claim.value.clone());
                }
                CLAIM_EMAIL_VERIFIED => email_verified = is_true(&claim.value),
                CLAIM_TWO_FACTOR_ENABLED => two_factor_enabled = is_true(&claim.value),
                _ => {}
            }
        }

        let subject = subject
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("claim set is missing a subject".to_owned()))?;

        Ok(Self {
            subject: subject.to_owned(),
            roles,
            permissions,
            email_verified,
            two_factor_enabled,
        })
    }

    /// Flattens the claims into a list suitable for a credential.
    #[must_use]
    pub fn to_claims(&self) -> Vec<Claim> {
        let mut claims = vec![Claim::new(CLAIM_SUBJECT, self.subject.as_str())];
        claims.extend(self.roles.iter().map(|role| Claim::new(CLAIM_ROLE, role.as_str())));
        claims.extend(
            self.permissions
                .iter()
                .map(|permission| Claim::new(CLAIM_PERMISSION, permission.as_str())),
        );
        claims.push(Claim::new(
            CLAIM_EMAIL_VERIFIED,
            self.email_verified.to_string(),
        ));
        claims.push(Claim::new(
            CLAIM_TWO_FACTOR_ENABLED,
            self.two_factor_enabled.to_string(),
        ));

        claims
    }

    /// Returns whether the permission claim is present (ordinal match).
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Returns whether any of the roles is held (ordinal match).
    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.roles.contains(role.as_ref()))
    }
}

/// Principal presented to the decision point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// No credential was presented.
    Anonymous,
    /// A validated credential was presented.
    Authenticated(PrincipalClaims),
}

impl Principal {
    /// Returns the claims of an authenticated principal.
    #[must_use]
    pub fn claims(&self) -> Option<&PrincipalClaims> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(claims) => Some(claims),
        }
    }
}

fn is_true(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
