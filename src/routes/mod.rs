pub mod audit;
pub mod ingest;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/audit/logs", get(audit::list))
        .route("/api/v1/audit/logs/{id}", get(audit::get))
        .route("/api/v1/audit/stats", get(audit::stats))
        .route("/api/v1/audit/export", get(audit::export))
}

pub fn ingest_routes(max_body_size: usize) -> Router<SharedState> {
    Router::new()
        .route("/api/v1/audit/events", post(ingest::ingest))
        .layer(RequestBodyLimitLayer::new(max_body_size))
}
