pub mod audit_event;
pub mod stats;

pub use audit_event::{AuditAction, AuditEvent, AuditMetadata, AuditResource, FieldChange};
pub use stats::{ActionStat, AuditStats, ResourceStat, UserStat};
