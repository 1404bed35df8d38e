//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_service;
mod cancellation;
mod catalog_seed_service;
mod catalog_view;
mod claim_issuer;
mod engine_config;
mod grant_mutation_service;
mod permission_aggregator;
mod role_assignment_service;
mod security_ports;

#[cfg(test)]
mod test_support;

pub use authorization_service::AuthorizationService;
pub use catalog_seed_service::{CatalogSeedService, SeedReport};
pub use claim_issuer::ClaimIssuer;
pub use engine_config::EngineConfig;
pub use grant_mutation_service::GrantMutationService;
pub use permission_aggregator::PermissionAggregator;
pub use role_assignment_service::RoleAssignmentService;
pub use security_ports::{
    AuditEvent, AuditRepository, CatalogRepository, Clock, GrantStore, GrantedPermission,
    RoleGrantName, SystemClock,
};
