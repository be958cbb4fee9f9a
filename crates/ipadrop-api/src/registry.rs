//! # Link Registry
//!
//! Owns the artifact, link, and access-event records.
//!
//! Reads are served from in-memory indexes. When a database pool is
//! configured every write goes to Postgres first and the indexes are
//! hydrated from it on startup.
//!
//! ## Slug uniqueness
//!
//! The slug generator promises nothing about uniqueness, so
//! [`LinkRegistry::create_link`] claims each candidate with an atomic
//! insert-if-absent on the slug index, then inserts the row; a
//! unique-constraint violation from Postgres releases the claim and
//! redraws. After [`MAX_SLUG_ATTEMPTS`] collisions it gives up.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use ipadrop_core::{AppMetadata, RandomSlugs, Slug, SlugSource};
use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db;
use crate::state::{AccessEventRecord, AccessKind, ArtifactRecord, LinkRecord, Store};

/// Slug draws per link before giving up.
pub const MAX_SLUG_ATTEMPTS: usize = 16;

/// Errors from the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `create_link` was called for an artifact that was never created.
    #[error("unknown artifact {0}")]
    UnknownArtifact(Uuid),

    /// Every candidate slug collided.
    #[error("no free slug after {attempts} attempts")]
    SlugSpaceExhausted { attempts: usize },

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fields for a new artifact record.
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub filename: String,
    pub storage_path: PathBuf,
    pub size_bytes: u64,
    pub metadata: AppMetadata,
}

/// Registry of artifacts, links, and access events.
#[derive(Debug, Clone)]
pub struct LinkRegistry {
    artifacts: Store<ArtifactRecord>,
    links: Store<LinkRecord>,
    /// Slug to link id.
    slugs: Arc<RwLock<HashMap<Slug, Uuid>>>,
    /// Access events, kept here only when running without a database.
    events: Store<AccessEventRecord>,
    slug_source: Arc<dyn SlugSource>,
    db_pool: Option<PgPool>,
}

impl LinkRegistry {
    /// Create a registry drawing slugs from the thread CSPRNG.
    pub fn new(db_pool: Option<PgPool>) -> Self {
        Self::with_slug_source(db_pool, Arc::new(RandomSlugs))
    }

    /// Create a registry with a custom slug source.
    pub fn with_slug_source(db_pool: Option<PgPool>, slug_source: Arc<dyn SlugSource>) -> Self {
        Self {
            artifacts: Store::new(),
            links: Store::new(),
            slugs: Arc::new(RwLock::new(HashMap::new())),
            events: Store::new(),
            slug_source,
            db_pool,
        }
    }

    /// Persist a new artifact record.
    pub async fn create_artifact(&self, new: NewArtifact) -> Result<ArtifactRecord, RegistryError> {
        let record = ArtifactRecord {
            id: Uuid::new_v4(),
            filename: new.filename,
            storage_path: new.storage_path,
            size_bytes: new.size_bytes,
            metadata: new.metadata,
            signed: false,
            created_at: Utc::now(),
        };
        if let Some(pool) = &self.db_pool {
            db::artifacts::insert(pool, &record).await?;
        }
        self.artifacts.insert(record.id, record.clone());
        Ok(record)
    }

    /// Mint a unique slug and bind it to an existing artifact.
    pub async fn create_link(&self, artifact_id: Uuid) -> Result<LinkRecord, RegistryError> {
        if !self.artifacts.contains(&artifact_id) {
            return Err(RegistryError::UnknownArtifact(artifact_id));
        }

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let record = LinkRecord {
                id: Uuid::new_v4(),
                slug: self.slug_source.next_slug(),
                artifact_id,
                created_at: Utc::now(),
            };

            if !self.claim_slug(&record.slug, record.id) {
                tracing::debug!(slug = %record.slug, attempt, "Slug already taken, redrawing");
                continue;
            }

            if let Some(pool) = &self.db_pool {
                match db::links::insert(pool, &record).await {
                    Ok(()) => {}
                    Err(err) if db::is_unique_violation(&err) => {
                        self.release_slug(&record.slug);
                        tracing::debug!(slug = %record.slug, attempt, "Slug taken in database, redrawing");
                        continue;
                    }
                    Err(err) => {
                        self.release_slug(&record.slug);
                        return Err(err.into());
                    }
                }
            }

            self.links.insert(record.id, record.clone());
            return Ok(record);
        }

        Err(RegistryError::SlugSpaceExhausted {
            attempts: MAX_SLUG_ATTEMPTS,
        })
    }

    /// Look up a slug and the artifact it points to.
    pub fn resolve(&self, slug: &Slug) -> Option<(LinkRecord, ArtifactRecord)> {
        let link_id = *self.slugs.read().get(slug)?;
        let link = self.links.get(&link_id)?;
        let artifact = self.artifacts.get(&link.artifact_id)?;
        Some((link, artifact))
    }

    /// Append an access event. Never fails the caller.
    ///
    /// With a database the insert runs on a detached task and failures are
    /// logged; without one the event is kept in memory.
    pub fn record_access(
        &self,
        link_id: Uuid,
        kind: AccessKind,
        user_agent: Option<String>,
        address: Option<String>,
    ) {
        let event = AccessEventRecord {
            id: Uuid::new_v4(),
            link_id,
            kind,
            user_agent,
            address,
            created_at: Utc::now(),
        };

        match &self.db_pool {
            Some(pool) => {
                let pool = pool.clone();
                tokio::spawn(async move {
                    if let Err(err) = db::access_events::insert(&pool, &event).await {
                        tracing::warn!(
                            link_id = %event.link_id,
                            kind = event.kind.as_str(),
                            error = %err,
                            "Failed to record access event"
                        );
                    }
                });
            }
            None => {
                self.events.insert(event.id, event);
            }
        }
    }

    /// Access events recorded for a link, oldest first.
    pub async fn access_events(&self, link_id: Uuid) -> Result<Vec<AccessEventRecord>, RegistryError> {
        if let Some(pool) = &self.db_pool {
            return Ok(db::access_events::list_by_link(pool, link_id).await?);
        }
        let mut events = self.events.filter(|e| e.link_id == link_id);
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    /// Number of artifact records.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Number of link records.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Load persisted artifacts and links into the in-memory indexes.
    pub async fn hydrate(&self, pool: &PgPool) -> Result<(), RegistryError> {
        let artifacts = db::artifacts::load_all(pool).await?;
        let artifact_count = artifacts.len();
        for record in artifacts {
            self.artifacts.insert(record.id, record);
        }

        let links = db::links::load_all(pool).await?;
        let link_count = links.len();
        {
            let mut slugs = self.slugs.write();
            for record in &links {
                slugs.insert(record.slug.clone(), record.id);
            }
        }
        for record in links {
            self.links.insert(record.id, record);
        }

        tracing::info!(
            artifacts = artifact_count,
            links = link_count,
            "Hydrated in-memory indexes from database"
        );
        Ok(())
    }

    fn claim_slug(&self, slug: &Slug, link_id: Uuid) -> bool {
        match self.slugs.write().entry(slug.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(link_id);
                true
            }
        }
    }

    fn release_slug(&self, slug: &Slug) {
        self.slugs.write().remove(slug);
    }
}
