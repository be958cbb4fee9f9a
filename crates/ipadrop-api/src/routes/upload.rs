//! # Upload Route
//!
//! `POST /upload` accepts a multipart body. The first part that carries a
//! filename is the archive; other parts are ignored. The part is streamed
//! straight into the artifact store.

use std::io;

use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::extractors::{extract_multipart, PublicOrigin};
use crate::ingest::{self, Upload, UploadResponse};
use crate::state::AppState;

/// Room for multipart framing on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the upload router. The body limit follows the configured maximum.
pub fn router(config: &AppConfig) -> Router<AppState> {
    let limit = usize::try_from(config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(limit))
}

/// POST /upload: Store an archive and mint its public link.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "Form with one `.ipa` file part"),
    responses(
        (status = 200, description = "Archive stored and linked", body = UploadResponse),
        (status = 400, description = "Missing file, wrong extension, or empty file", body = crate::error::ErrorBody),
        (status = 413, description = "File exceeds the size limit", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody),
    ),
    tag = "upload"
)]
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = extract_multipart(multipart)?;
    let origin = PublicOrigin::from_headers(&headers, &state.config);

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let reader = StreamReader::new(field.map_err(io::Error::other));
        tokio::pin!(reader);
        let response = ingest::ingest(
            &state,
            Upload {
                filename,
                body: reader,
            },
            &origin,
        )
        .await?;
        return Ok(Json(response));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("malformed multipart body: {}", err.body_text()))
    }
}
