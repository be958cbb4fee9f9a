//! Access-event persistence on the append-only `access_events` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::{AccessEventRecord, AccessKind};

/// Append an access event.
pub async fn insert(pool: &PgPool, event: &AccessEventRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO access_events (id, link_id, kind, user_agent, address, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(event.id)
    .bind(event.link_id)
    .bind(event.kind.as_str())
    .bind(event.user_agent.as_deref())
    .bind(event.address.as_deref())
    .bind(event.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// List events for a link, oldest first. Rows with an unknown kind are skipped.
pub async fn list_by_link(
    pool: &PgPool,
    link_id: Uuid,
) -> Result<Vec<AccessEventRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccessEventRow>(
        "SELECT id, link_id, kind, user_agent, address, created_at
         FROM access_events WHERE link_id = $1 ORDER BY created_at",
    )
    .bind(link_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(AccessEventRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct AccessEventRow {
    id: Uuid,
    link_id: Uuid,
    kind: String,
    user_agent: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl AccessEventRow {
    fn into_record(self) -> Option<AccessEventRecord> {
        let Some(kind) = AccessKind::parse(&self.kind) else {
            tracing::warn!(id = %self.id, kind = %self.kind, "Skipping access event with unknown kind");
            return None;
        };
        Some(AccessEventRecord {
            id: self.id,
            link_id: self.link_id,
            kind,
            user_agent: self.user_agent,
            address: self.address,
            created_at: self.created_at,
        })
    }
}
