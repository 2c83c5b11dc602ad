use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::filter::{AuditFilter, PageParams, RawFilterParams, SortField, SortOrder};
use crate::audit::recorder::NewAuditEvent;
use crate::audit::{export, provenance};
use crate::auth::extractor::AuthUser;
use crate::auth::Capability;
use crate::db;
use crate::error::AppError;
use crate::models::{AuditAction, AuditMetadata, AuditResource};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(flatten)]
    pub filter: RawFilterParams,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Bound a read-path storage round-trip. These calls are cancelled for free
/// when the client disconnects (the handler future is dropped); the timeout
/// covers the other failure mode, a hung backend.
async fn with_timeout<T>(
    secs: u64,
    fut: impl Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::StorageUnavailable(
            "query timed out".to_string(),
        )),
    }
}

fn parse_int(raw: Option<&str>, name: &str) -> Result<Option<i64>, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AppError::InvalidFilter(format!("Invalid {name}: {s}")))
        })
        .transpose()
}

/// `GET /api/v1/audit/logs` — filtered, paginated, tenant-scoped listing.
pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require(Capability::AuditRead)?;

    let filter = AuditFilter::from_params(&params.filter)?;
    let page = PageParams::new(
        parse_int(params.page.as_deref(), "page")?,
        parse_int(params.limit.as_deref(), "limit")?,
    )?;
    let sort_field = SortField::parse(params.sort_by.as_deref())?;
    let sort_order = SortOrder::parse(params.sort_order.as_deref())?;

    let tenant_id = auth.tenant_id();
    let (records, total_count) = with_timeout(state.config.query_timeout_secs, async {
        tokio::try_join!(
            db::audit::list(&state.pool, tenant_id, &filter, page, sort_field, sort_order),
            db::audit::count(&state.pool, tenant_id, &filter),
        )
    })
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": records,
        "pagination": {
            "current_page": page.page,
            "total_pages": page.total_pages(total_count),
            "total_count": total_count,
            "has_next": page.has_next(total_count),
            "has_prev": page.has_prev(),
        },
    })))
}

/// `GET /api/v1/audit/logs/{id}` — one event with `metadata.changes`
/// expanded for display. Cross-tenant ids are a plain 404.
pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require(Capability::AuditRead)?;

    let event = with_timeout(
        state.config.query_timeout_secs,
        db::audit::find_by_id_scoped(&state.pool, id, auth.tenant_id()),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Audit event not found".to_string()))?;

    let mut data = serde_json::to_value(&event)
        .map_err(|e| AppError::Internal(format!("Failed to serialize event: {e}")))?;
    if let Some(metadata) = &event.metadata {
        data["metadata"] = AuditMetadata::from_value(metadata).expanded();
    }

    Ok(Json(serde_json::json!({ "success": true, "data": data })))
}

/// `GET /api/v1/audit/stats` — aggregates over an optional date range.
pub async fn stats(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require(Capability::AuditRead)?;

    let range = AuditFilter::from_params(&RawFilterParams {
        start_date: params.start_date,
        end_date: params.end_date,
        ..Default::default()
    })?;

    let stats = with_timeout(
        state.config.query_timeout_secs,
        db::audit::stats(&state.pool, auth.tenant_id(), range.start_date, range.end_date),
    )
    .await?;

    Ok(Json(serde_json::json!({ "success": true, "data": stats })))
}

/// `GET /api/v1/audit/export` — stream the full filtered set as a CSV
/// attachment. No pagination; the body is produced in bounded chunks and a
/// storage failure mid-walk aborts the transfer rather than ending it
/// cleanly. The export itself is recorded as an EXPORT event.
pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<LogsQuery>,
) -> Result<Response, AppError> {
    auth.require(Capability::AuditRead)?;

    let filter = AuditFilter::from_params(&params.filter)?;

    let prov = provenance::extract(&headers, Some(peer.ip()), &state.config.trusted_proxies);
    state.recorder.record(NewAuditEvent {
        tenant_id: auth.tenant_id(),
        actor_user_id: Some(auth.user_id),
        actor_email: auth.email.clone(),
        action: AuditAction::Export,
        resource: AuditResource::System,
        resource_id: None,
        details: Some("Exported audit logs".to_string()),
        metadata: None,
        ip_address: prov.ip_address,
        user_agent: prov.user_agent,
    });

    let stream = export::stream(
        state.pool.clone(),
        auth.tenant_id(),
        filter,
        state.config.export_chunk_size,
    );

    let filename = format!("audit_logs_{}.csv", Utc::now().format("%Y-%m-%d"));
    let response = (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response();

    Ok(response)
}
