//! Default request handler.
//!
//! The policy endpoint this server fronts is supplied by the embedding
//! application as an [`axum::Router`]. The binary serves this minimal router
//! so a bare process still answers health checks.

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

/// Router with `GET /healthz` and a 404 fallback.
pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(not_found)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}
