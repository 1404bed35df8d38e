use std::sync::Arc;

use warden_core::AppResult;
use warden_domain::{ImplicationConfig, ImplicationMap, PolicyRegistry};

/// Immutable engine configuration built once at startup and shared by `Arc`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Implication rules consulted by aggregation and claim issuance.
    pub implications: Arc<ImplicationMap>,
    /// Named policies consulted by the decision point.
    pub policies: Arc<PolicyRegistry>,
}

impl EngineConfig {
    /// Creates a configuration from explicit parts.
    #[must_use]
    pub fn new(implications: ImplicationMap, policies: PolicyRegistry) -> Self {
        Self {
            implications: Arc::new(implications),
            policies: Arc::new(policies),
        }
    }

    /// Built-in implication rules and default policies.
    pub fn builtin() -> AppResult<Self> {
        Ok(Self::new(ImplicationMap::builtin(), PolicyRegistry::builtin()?))
    }

    /// Built-in configuration with implication rules overridden per key.
    pub fn with_implication_overrides(overrides: &ImplicationConfig) -> AppResult<Self> {
        Ok(Self::new(
            ImplicationMap::builtin().with_overrides(overrides)?,
            PolicyRegistry::builtin()?,
        ))
    }
}
