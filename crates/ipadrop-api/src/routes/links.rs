//! # Link Routes
//!
//! - `GET /ipa/{slug}` streams the archive and records a download.
//! - `GET /l/{slug}` returns landing metadata.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use crate::distribution::{self, Download, LandingResponse};
use crate::error::AppError;
use crate::extractors::{PublicOrigin, Requester};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ipa/{slug}", get(download_ipa))
        .route("/l/{slug}", get(landing))
}

/// GET /ipa/{slug}: Download the archive behind a slug.
#[utoipa::path(
    get,
    path = "/ipa/{slug}",
    params(("slug" = String, Path, description = "Eight-character link slug")),
    responses(
        (status = 200, description = "Archive bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown slug or missing file", body = crate::error::ErrorBody),
    ),
    tag = "links"
)]
pub async fn download_ipa(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    requester: Requester,
) -> Result<Download, AppError> {
    distribution::download(&state, &slug, requester).await
}

/// GET /l/{slug}: Landing metadata for a slug.
#[utoipa::path(
    get,
    path = "/l/{slug}",
    params(("slug" = String, Path, description = "Eight-character link slug")),
    responses(
        (status = 200, description = "Link metadata", body = LandingResponse),
        (status = 404, description = "Unknown slug", body = crate::error::ErrorBody),
    ),
    tag = "links"
)]
pub async fn landing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<LandingResponse>, AppError> {
    let origin = PublicOrigin::from_headers(&headers, &state.config);
    Ok(Json(distribution::describe(&state, &slug, &origin)?))
}
