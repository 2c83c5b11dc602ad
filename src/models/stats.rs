use serde::Serialize;
use uuid::Uuid;

use crate::models::{AuditAction, AuditResource};

/// Aggregate counts over a tenant's log, optionally bounded by a date range.
/// `recent_activity` is always the trailing 24 hours from "now", regardless
/// of the range the other aggregates were computed over.
#[derive(Debug, Clone, Serialize)]
pub struct AuditStats {
    pub total_logs: i64,
    pub recent_activity: i64,
    pub user_stats: Vec<UserStat>,
    pub resource_stats: Vec<ResourceStat>,
    pub action_stats: Vec<ActionStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStat {
    pub user_id: Uuid,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceStat {
    pub resource: AuditResource,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionStat {
    pub action: AuditAction,
    pub count: i64,
}
