//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ipadrop API",
        description = "Upload iOS application archives and share them through short links.",
        license(name = "AGPL-3.0-or-later")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server"),
    ),
    paths(
        crate::routes::upload::upload,
        crate::routes::links::download_ipa,
        crate::routes::links::landing,
    ),
    components(schemas(
        crate::ingest::UploadResponse,
        crate::distribution::LandingResponse,
        crate::distribution::LandingApp,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "upload", description = "Archive ingestion"),
        (name = "links", description = "Slug resolution and downloads"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
