mod audit;
mod catalog;
mod clock;
mod store;

pub(crate) use audit::append_committed;
pub use audit::{AuditEvent, AuditRepository};
pub use catalog::CatalogRepository;
pub use clock::{Clock, SystemClock};
pub use store::{GrantStore, GrantedPermission, RoleGrantName};
