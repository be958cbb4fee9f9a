//! # Ingestion Pipeline
//!
//! Turns one uploaded stream into a stored artifact with a public link.
//!
//! ```text
//! Received → Validated → Stored → MetadataExtracted → Linked → Responded
//! ```
//!
//! Each stage runs once, in order. A failure before `Stored` leaves
//! nothing behind; a failure while storing removes the partial file and
//! creates no records. Metadata extraction cannot fail the upload.

use std::fmt;

use ipadrop_core::{IpaFilename, MetadataOutcome};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::PublicOrigin;
use crate::registry::NewArtifact;
use crate::state::AppState;

/// Pipeline stage, reported in logs when an upload stops early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Validated,
    Stored,
    MetadataExtracted,
    Linked,
    Responded,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Stored => "stored",
            Self::MetadataExtracted => "metadata_extracted",
            Self::Linked => "linked",
            Self::Responded => "responded",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming file part: declared name plus its byte stream.
#[derive(Debug)]
pub struct Upload<R> {
    pub filename: String,
    pub body: R,
}

/// Response body for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Artifact id.
    pub id: Uuid,
    /// Eight-character public identifier.
    pub slug: String,
    pub bundle_id: String,
    pub version: String,
    pub build: String,
    /// `<base>/ipa/<slug>`.
    pub download_ipa_url: String,
    /// `<base>/l/<slug>`.
    pub install_url: String,
}

/// Run one upload through the pipeline.
pub async fn ingest<R>(
    state: &AppState,
    upload: Upload<R>,
    origin: &PublicOrigin,
) -> Result<UploadResponse, AppError>
where
    R: AsyncRead + Unpin,
{
    let mut stage = IngestStage::Received;
    let result = run(state, upload, origin, &mut stage).await;
    if let Err(err) = &result {
        tracing::info!(stage = %stage, error = %err, "Upload rejected");
    }
    result
}

async fn run<R>(
    state: &AppState,
    upload: Upload<R>,
    origin: &PublicOrigin,
    stage: &mut IngestStage,
) -> Result<UploadResponse, AppError>
where
    R: AsyncRead + Unpin,
{
    let filename = IpaFilename::parse(&upload.filename)?;
    *stage = IngestStage::Validated;

    let stored = state.artifacts.store(upload.body, &filename).await?;
    *stage = IngestStage::Stored;

    let outcome = extract_metadata(stored.storage_path.clone()).await;
    if let Some(reason) = outcome.reason() {
        tracing::warn!(
            filename = %filename,
            path = %stored.storage_path.display(),
            reason,
            "Metadata extraction fell back to defaults"
        );
    }
    *stage = IngestStage::MetadataExtracted;

    let artifact = state
        .registry
        .create_artifact(NewArtifact {
            filename: filename.as_str().to_string(),
            storage_path: stored.storage_path,
            size_bytes: stored.size_bytes,
            metadata: outcome.into_metadata(),
        })
        .await?;
    let link = state.registry.create_link(artifact.id).await?;
    *stage = IngestStage::Linked;

    tracing::info!(
        artifact_id = %artifact.id,
        slug = %link.slug,
        bundle_id = %artifact.metadata.bundle_id,
        size_bytes = artifact.size_bytes,
        "Artifact ingested"
    );

    let response = UploadResponse {
        id: artifact.id,
        slug: link.slug.to_string(),
        bundle_id: artifact.metadata.bundle_id,
        version: artifact.metadata.version,
        build: artifact.metadata.build,
        download_ipa_url: origin.download_url(&link.slug),
        install_url: origin.install_url(&link.slug),
    };
    *stage = IngestStage::Responded;
    Ok(response)
}

/// Parse the stored archive on the blocking pool.
async fn extract_metadata(path: std::path::PathBuf) -> MetadataOutcome {
    match tokio::task::spawn_blocking(move || ipadrop_archive::inspect(&path)).await {
        Ok(outcome) => outcome,
        Err(err) => MetadataOutcome::from_failure(format!("extraction task failed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use ipadrop_core::{DEFAULT_BUILD, DEFAULT_BUNDLE_ID, DEFAULT_VERSION};

    fn state_in(dir: &std::path::Path) -> AppState {
        let config = AppConfig {
            upload_dir: dir.to_path_buf(),
            ..AppConfig::default()
        };
        AppState::new(config, None)
    }

    fn origin() -> PublicOrigin {
        PublicOrigin {
            scheme: "https".into(),
            host: "apps.example.com".into(),
        }
    }

    #[tokio::test]
    async fn corrupt_archive_gets_defaults_and_a_link() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let upload = Upload {
            filename: "Foo.ipa".to_string(),
            body: &b"definitely not a zip"[..],
        };

        let response = ingest(&state, upload, &origin()).await.unwrap();
        assert_eq!(response.bundle_id, DEFAULT_BUNDLE_ID);
        assert_eq!(response.version, DEFAULT_VERSION);
        assert_eq!(response.build, DEFAULT_BUILD);
        assert_eq!(response.slug.len(), 8);
        assert_eq!(
            response.download_ipa_url,
            format!("https://apps.example.com/ipa/{}", response.slug)
        );
        assert_eq!(
            response.install_url,
            format!("https://apps.example.com/l/{}", response.slug)
        );
        assert_eq!(state.registry.link_count(), 1);
    }

    #[tokio::test]
    async fn wrong_extension_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let upload = Upload {
            filename: "app.apk".to_string(),
            body: &b"PK"[..],
        };

        let err = ingest(&state, upload, &origin()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(state.registry.artifact_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_stream_is_rejected_without_records() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let upload = Upload {
            filename: "Empty.ipa".to_string(),
            body: &b""[..],
        };

        let err = ingest(&state, upload, &origin()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(state.registry.artifact_count(), 0);
        assert_eq!(state.registry.link_count(), 0);
    }

    #[test]
    fn stage_names() {
        assert_eq!(IngestStage::MetadataExtracted.to_string(), "metadata_extracted");
        assert_eq!(IngestStage::Responded.as_str(), "responded");
    }
}
