//! Coarse-to-granular permission implication.
//!
//! The map is configuration: it is built once at startup and shared read-only.
//! Expansion is a single pass. Construction rejects any rule whose implied
//! permission has rules of its own, which rules out cycles and keeps one pass
//! a closure, so `expand(expand(s)) == expand(s)`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use warden_core::{AppError, AppResult};

use crate::names::PermissionName;
use crate::security::BuiltinPermission;

/// Raw implication rules as read from a configuration file.
///
/// The JSON shape is `{"products:manage": ["products:read", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ImplicationConfig(pub BTreeMap<String, Vec<String>>);

impl ImplicationConfig {
    /// Parses rules from a JSON document.
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|error| AppError::Validation(format!("invalid implication rules: {error}")))
    }
}

/// Validated, immutable implication rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImplicationMap {
    rules: BTreeMap<PermissionName, BTreeSet<PermissionName>>,
}

impl ImplicationMap {
    /// Creates a map without rules; expansion is the identity.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a validated map from rules.
    pub fn new<I, J>(rules: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (PermissionName, J)>,
        J: IntoIterator<Item = PermissionName>,
    {
        let mut collected: BTreeMap<PermissionName, BTreeSet<PermissionName>> = BTreeMap::new();
        for (source, implied) in rules {
            collected.entry(source).or_default().extend(implied);
        }

        validate(&collected)?;

        Ok(Self { rules: collected })
    }

    /// Rules for the built-in catalog: `<resource>:manage` implies the
    /// granular actions of the same resource.
    #[must_use]
    pub fn builtin() -> Self {
        let rules = BuiltinPermission::all()
            .into_iter()
            .filter_map(|permission| {
                let implied = permission.implied();
                (!implied.is_empty()).then(|| {
                    (
                        permission.name(),
                        implied
                            .iter()
                            .map(BuiltinPermission::name)
                            .collect::<BTreeSet<_>>(),
                    )
                })
            })
            .collect();

        Self { rules }
    }

    /// Returns a map where `config` replaces the rules of every key it names.
    pub fn with_overrides(&self, config: &ImplicationConfig) -> AppResult<Self> {
        let mut rules = self.rules.clone();
        for (source, implied) in &config.0 {
            let source = PermissionName::parse(source)?;
            let implied = implied
                .iter()
                .map(|name| PermissionName::parse(name))
                .collect::<AppResult<BTreeSet<_>>>()?;
            rules.insert(source, implied);
        }

        validate(&rules)?;

        Ok(Self { rules })
    }

    /// Returns the input together with everything it implies.
    ///
    /// Permissions without a rule expand to themselves only.
    #[must_use]
    pub fn expand<'a, I>(&self, permissions: I) -> BTreeSet<PermissionName>
    where
        I: IntoIterator<Item = &'a PermissionName>,
    {
        let mut expanded = BTreeSet::new();
        for permission in permissions {
            if let Some(implied) = self.rules.get(permission) {
                expanded.extend(implied.iter().cloned());
            }
            expanded.insert(permission.clone());
        }

        expanded
    }

    /// Returns the permissions directly implied by `permission`.
    #[must_use]
    pub fn implied_by(&self, permission: &PermissionName) -> Option<&BTreeSet<PermissionName>> {
        self.rules.get(permission)
    }

    /// Returns the number of coarse permissions with rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether the map has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn validate(rules: &BTreeMap<PermissionName, BTreeSet<PermissionName>>) -> AppResult<()> {
    for (source, implied) in rules {
        if implied.contains(source) {
            return Err(AppError::Validation(format!(
                "permission '{source}' must not imply itself"
            )));
        }

        if let Some(chained) = implied.iter().find(|name| rules.contains_key(*name)) {
            return Err(AppError::Validation(format!(
                "permission '{source}' implies '{chained}', which has implications of its own; \
                 implication rules must be single-level"
            )));
        }
    }

    Ok(())
}
