pub mod config;
pub mod error;
pub mod state;
pub mod auth;
pub mod db;
pub mod models;
pub mod audit;
pub mod routes;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::audit::recorder::AuditRecorder;
use crate::config::Config;
use crate::state::{AppState, SharedState};

/// Assemble the router and start the audit writer task. The returned handle
/// completes once the writer has drained its queue after the last sender
/// (the app state) is dropped; `main` awaits it during shutdown so queued
/// events are not lost.
pub fn build_app(pool: PgPool, config: Config) -> (Router, JoinHandle<()>) {
    let (recorder, writer) = AuditRecorder::spawn(pool.clone(), config.ingest_queue_size);
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        recorder,
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(routes::ingest_routes(max_body_size))
        .route("/health", axum::routing::get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state);

    (app, writer)
}

async fn health() -> &'static str {
    "ok"
}
