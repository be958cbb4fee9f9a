//! Artifact persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `artifacts` table.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ipadrop_core::AppMetadata;
use sqlx::PgPool;
use uuid::Uuid;

use super::{from_bigint, to_bigint};
use crate::state::ArtifactRecord;

/// Insert a new artifact record.
pub async fn insert(pool: &PgPool, record: &ArtifactRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO artifacts (id, filename, storage_path, size_bytes, bundle_id,
         version, build, signed, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(record.id)
    .bind(&record.filename)
    .bind(record.storage_path.to_string_lossy().into_owned())
    .bind(to_bigint(record.size_bytes)?)
    .bind(&record.metadata.bundle_id)
    .bind(&record.metadata.version)
    .bind(&record.metadata.build)
    .bind(record.signed)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all artifacts into memory on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ArtifactRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, filename, storage_path, size_bytes, bundle_id, version, build,
         signed, created_at
         FROM artifacts ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ArtifactRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ArtifactRow {
    id: Uuid,
    filename: String,
    storage_path: String,
    size_bytes: i64,
    bundle_id: String,
    version: String,
    build: String,
    signed: bool,
    created_at: DateTime<Utc>,
}

impl ArtifactRow {
    fn into_record(self) -> Result<ArtifactRecord, sqlx::Error> {
        Ok(ArtifactRecord {
            id: self.id,
            filename: self.filename,
            storage_path: PathBuf::from(self.storage_path),
            size_bytes: from_bigint(self.size_bytes)?,
            metadata: AppMetadata {
                bundle_id: self.bundle_id,
                version: self.version,
                build: self.build,
            },
            signed: self.signed,
            created_at: self.created_at,
        })
    }
}
