//! # ipadrop-api: Axum Service for Archive Sharing
//!
//! Accepts `.ipa` uploads, stores them on disk, extracts bundle metadata,
//! and hands back a short slug that resolves to a download.
//!
//! ## API Surface
//!
//! | Route                   | Module                  |
//! |-------------------------|-------------------------|
//! | `POST /upload`          | [`routes::upload`]      |
//! | `GET /ipa/{slug}`       | [`routes::links`]       |
//! | `GET /l/{slug}`         | [`routes::links`]       |
//! | `GET /health`           | liveness                |
//! | `GET /health/readiness` | readiness               |
//! | `GET /openapi.json`     | [`openapi`]             |
//!
//! ## Crate Policy
//!
//! - Route handlers only extract and delegate; the pipeline lives in
//!   [`ingest`] and [`distribution`].
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod config;
pub mod db;
pub mod distribution;
pub mod error;
pub mod extractors;
pub mod ingest;
pub mod openapi;
pub mod registry;
pub mod routes;
pub mod state;
pub mod storage;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::upload::router(&state.config))
        .merge(routes::links::router())
        .merge(openapi::router())
        .route("/health", get(liveness))
        .route("/health/readiness", get(readiness));

    api.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Liveness probe: 200 whenever the process is serving.
async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

/// Readiness probe: upload directory present and database reachable.
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if !state.artifacts.is_available().await {
        tracing::warn!(
            dir = %state.artifacts.root().display(),
            "Upload directory unavailable"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "upload directory unavailable").into_response();
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
