//! # Distribution Resolver
//!
//! Resolves a public slug to its stored archive. `download` streams the
//! bytes and records an access event; `describe` returns the landing
//! metadata and records nothing.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use ipadrop_core::{header_safe, Slug};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{PublicOrigin, Requester};
use crate::state::{AccessKind, AppState, ArtifactRecord, LinkRecord};

/// An open archive ready to stream to the client.
#[derive(Debug)]
pub struct Download {
    pub file: File,
    pub size: u64,
    /// Declared filename, as recorded at upload.
    pub filename: String,
}

impl IntoResponse for Download {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", header_safe(&self.filename));
        let disposition = HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        (
            StatusCode::OK,
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/octet-stream"),
                ),
                (header::CONTENT_LENGTH, HeaderValue::from(self.size)),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            Body::from_stream(ReaderStream::new(self.file)),
        )
            .into_response()
    }
}

/// Bundle fields shown on the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LandingApp {
    pub bundle_id: String,
    pub version: String,
    pub build: String,
}

/// Landing page payload for `GET /l/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LandingResponse {
    pub slug: String,
    pub app: LandingApp,
    pub download_ipa_url: String,
}

/// Resolve a raw path segment. Malformed slugs are simply unknown.
fn lookup(state: &AppState, raw_slug: &str) -> Result<(LinkRecord, ArtifactRecord), AppError> {
    Slug::parse(raw_slug)
        .ok()
        .and_then(|slug| state.registry.resolve(&slug))
        .ok_or_else(|| AppError::NotFound("link".to_string()))
}

/// Open the archive behind a slug and record the download.
pub async fn download(
    state: &AppState,
    raw_slug: &str,
    requester: Requester,
) -> Result<Download, AppError> {
    let (link, artifact) = lookup(state, raw_slug)?;

    let Some((file, size)) = state.artifacts.open(&artifact.storage_path).await else {
        tracing::warn!(
            slug = %link.slug,
            path = %artifact.storage_path.display(),
            "Backing file missing for link"
        );
        return Err(AppError::NotFound("File missing".to_string()));
    };

    state.registry.record_access(
        link.id,
        AccessKind::Download,
        requester.user_agent,
        requester.address,
    );

    Ok(Download {
        file,
        size,
        filename: artifact.filename,
    })
}

/// Landing metadata for a slug.
pub fn describe(
    state: &AppState,
    raw_slug: &str,
    origin: &PublicOrigin,
) -> Result<LandingResponse, AppError> {
    let (link, artifact) = lookup(state, raw_slug)?;
    Ok(LandingResponse {
        download_ipa_url: origin.download_url(&link.slug),
        slug: link.slug.to_string(),
        app: LandingApp {
            bundle_id: artifact.metadata.bundle_id,
            version: artifact.metadata.version,
            build: artifact.metadata.build,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::registry::NewArtifact;
    use ipadrop_core::AppMetadata;

    async fn seeded(dir: &std::path::Path, contents: &[u8]) -> (AppState, LinkRecord) {
        let config = AppConfig {
            upload_dir: dir.to_path_buf(),
            ..AppConfig::default()
        };
        let state = AppState::new(config, None);
        let storage_path = dir.join("1700000000000_abcdefgh.ipa");
        std::fs::write(&storage_path, contents).unwrap();
        let artifact = state
            .registry
            .create_artifact(NewArtifact {
                filename: "My \"App\".ipa".to_string(),
                storage_path,
                size_bytes: contents.len() as u64,
                metadata: AppMetadata {
                    bundle_id: "com.example.app".into(),
                    version: "2.1".into(),
                    build: "42".into(),
                },
            })
            .await
            .unwrap();
        let link = state.registry.create_link(artifact.id).await.unwrap();
        (state, link)
    }

    #[tokio::test]
    async fn download_opens_file_and_records_event() {
        let dir = tempfile::tempdir().unwrap();
        let (state, link) = seeded(dir.path(), b"ipa-bytes").await;
        let requester = Requester {
            user_agent: Some("curl/8".into()),
            address: Some("127.0.0.1".into()),
        };

        let download = download(&state, link.slug.as_str(), requester).await.unwrap();
        assert_eq!(download.size, 9);

        let response = download.into_response();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"My App.ipa\""
        );

        let events = state.registry.access_events(link.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AccessKind::Download);
        assert_eq!(events[0].user_agent.as_deref(), Some("curl/8"));
    }

    #[tokio::test]
    async fn malformed_slug_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = seeded(dir.path(), b"x").await;
        let err = download(&state, "../../etc", Requester::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_backing_file_is_not_found_and_unrecorded() {
        let dir = tempfile::tempdir().unwrap();
        let (state, link) = seeded(dir.path(), b"x").await;
        std::fs::remove_file(dir.path().join("1700000000000_abcdefgh.ipa")).unwrap();

        let err = download(&state, link.slug.as_str(), Requester::default())
            .await
            .unwrap_err();
        match err {
            AppError::NotFound(msg) => assert_eq!(msg, "File missing"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(state.registry.access_events(link.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn describe_returns_recorded_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let (state, link) = seeded(dir.path(), b"x").await;
        let origin = PublicOrigin {
            scheme: "http".into(),
            host: "localhost:3000".into(),
        };

        let landing = describe(&state, link.slug.as_str(), &origin).unwrap();
        assert_eq!(landing.app.bundle_id, "com.example.app");
        assert_eq!(landing.app.build, "42");
        assert_eq!(
            landing.download_ipa_url,
            format!("http://localhost:3000/ipa/{}", link.slug)
        );
        assert!(state.registry.access_events(link.id).await.unwrap().is_empty());
    }
}
