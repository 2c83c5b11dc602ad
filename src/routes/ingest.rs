use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::provenance;
use crate::audit::recorder::NewAuditEvent;
use crate::auth::extractor::AuthUser;
use crate::auth::Capability;
use crate::error::AppError;
use crate::models::{AuditAction, AuditResource};
use crate::state::SharedState;

/// Event description as submitted by a collaborating service. Action and
/// resource are free strings here; unknown tokens are kept, not rejected
/// (a complete log beats a clean one).
#[derive(Debug, Deserialize)]
pub struct IngestPayload {
    pub action: String,
    pub resource: String,
    pub actor_user_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub resource_id: Option<String>,
    pub details: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// `POST /api/v1/audit/events` — fire-and-forget ingestion. Replies 202 as
/// soon as the event is queued; a persistence failure later is logged
/// operationally and never surfaces to the submitter.
pub async fn ingest(
    auth: AuthUser,
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<IngestPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    auth.require(Capability::AuditWrite)?;

    if payload.action.trim().is_empty() {
        return Err(AppError::InvalidFilter(
            "action must not be empty".to_string(),
        ));
    }
    if payload.resource.trim().is_empty() {
        return Err(AppError::InvalidFilter(
            "resource must not be empty".to_string(),
        ));
    }

    // Submitter-captured provenance wins; fall back to this request's.
    let prov = provenance::extract(&headers, Some(peer.ip()), &state.config.trusted_proxies);

    let id = state.recorder.record(NewAuditEvent {
        tenant_id: auth.tenant_id(),
        actor_user_id: payload.actor_user_id,
        actor_email: payload.actor_email,
        action: AuditAction::parse(&payload.action),
        resource: AuditResource::parse(&payload.resource),
        resource_id: payload.resource_id,
        details: payload.details,
        metadata: payload.metadata,
        ip_address: payload.ip_address.or(prov.ip_address),
        user_agent: payload.user_agent.or(prov.user_agent),
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "success": true, "data": { "id": id } })),
    ))
}
