//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_security_store;
mod postgres_audit_repository;
mod postgres_grant_store;

pub use in_memory_security_store::InMemorySecurityStore;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_grant_store::PostgresGrantStore;
