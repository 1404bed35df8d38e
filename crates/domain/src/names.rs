//! Case-insensitive catalog names.
//!
//! Names are normalized exactly once, when they are parsed. After that every
//! comparison is an ordinal comparison of the normalized key, so hot paths
//! never case-fold.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use warden_core::{AppError, AppResult};

/// Maximum accepted length of a permission or role name, in characters.
pub const MAX_NAME_LENGTH: usize = 256;

macro_rules! canonical_name {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            display: String,
            normalized: String,
        }

        impl $name {
            /// Parses a raw name: trims it, checks its length, and derives the
            /// normalized key.
            pub fn parse(value: &str) -> AppResult<Self> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(format!(
                        "{} name must not be empty",
                        $kind
                    )));
                }

                if trimmed.chars().count() > MAX_NAME_LENGTH {
                    return Err(AppError::Validation(format!(
                        "{} name '{}…' exceeds {} characters",
                        $kind,
                        trimmed.chars().take(32).collect::<String>(),
                        MAX_NAME_LENGTH
                    )));
                }

                Ok(Self::from_trusted(trimmed))
            }

            pub(crate) fn from_trusted(value: &str) -> Self {
                Self {
                    display: value.to_owned(),
                    normalized: value.to_uppercase(),
                }
            }

            /// Returns the display spelling.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.display.as_str()
            }

            /// Returns the normalized (uppercase-invariant) key.
            #[must_use]
            pub fn normalized(&self) -> &str {
                self.normalized.as_str()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.normalized == other.normalized
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.normalized.hash(state);
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.normalized.cmp(&other.normalized)
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                formatter.write_str(&self.display)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.display)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

canonical_name!(
    /// Permission name such as `products:read`.
    PermissionName,
    "permission"
);

canonical_name!(
    /// Role name such as `Administrator`.
    RoleName,
    "role"
);

/// Normalizes a requested batch of permission names.
///
/// Blank entries are dropped, duplicates are collapsed case-insensitively
/// (first spelling wins), and the batch must not end up empty.
pub fn normalize_permission_names<I, S>(values: I) -> AppResult<Vec<PermissionName>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();

    for value in values {
        let value = value.as_ref();
        if value.trim().is_empty() {
            continue;
        }

        let name = PermissionName::parse(value)?;
        if seen.insert(name.normalized().to_owned()) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Err(AppError::Validation(
            "at least one permission name is required".to_owned(),
        ));
    }

    Ok(names)
}
