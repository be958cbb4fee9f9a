//! Link persistence operations on the `links` table.

use chrono::{DateTime, Utc};
use ipadrop_core::Slug;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::LinkRecord;

/// Insert a new link. Fails with a unique violation if the slug is taken.
pub async fn insert(pool: &PgPool, record: &LinkRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO links (id, slug, artifact_id, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(record.id)
    .bind(record.slug.as_str())
    .bind(record.artifact_id)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all links into memory on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<LinkRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LinkRow>(
        "SELECT id, slug, artifact_id, created_at FROM links ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(LinkRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: Uuid,
    slug: String,
    artifact_id: Uuid,
    created_at: DateTime<Utc>,
}

impl LinkRow {
    fn into_record(self) -> Result<LinkRecord, sqlx::Error> {
        let slug = Slug::parse(&self.slug).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(LinkRecord {
            id: self.id,
            slug,
            artifact_id: self.artifact_id,
            created_at: self.created_at,
        })
    }
}
