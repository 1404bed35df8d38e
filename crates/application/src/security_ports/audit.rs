use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use warden_core::AppResult;
use warden_domain::AuditAction;

/// Canonical audit event payload emitted by security use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Subject that performed the action.
    pub subject: String,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Resource type label.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Optional audit detail payload.
    pub detail: Option<String>,
    /// Time the action committed.
    pub occurred_at: DateTime<Utc>,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Appends the audit event of a mutation that has already committed.
///
/// A failed append is logged; the committed mutation stays the outcome.
pub(crate) async fn append_committed(repository: &dyn AuditRepository, event: AuditEvent) {
    let action = event.action.as_str();
    if let Err(error) = repository.append_event(event).await {
        warn!(
            action,
            error = %error,
            "audit event for a committed mutation was not recorded"
        );
    }
}
