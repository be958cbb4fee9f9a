//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Constructed once in `main`, cloned cheaply
//! into every request, and closed on shutdown.
//!
//! ## Architecture
//!
//! - **Artifact store**: the upload directory on disk.
//! - **Link registry**: artifact, link, and access-event records, held in
//!   in-memory indexes and written through to Postgres when configured.
//! - **Database pool**: optional; absent means in-memory only.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ipadrop_core::{AppMetadata, Slug};
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::registry::{LinkRegistry, RegistryError};
use crate::storage::ArtifactStore;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot`, never held across `.await`, and
/// non-poisonable.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// Records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Records ------------------------------------------------------------------

/// A stored application archive and its extracted metadata.
///
/// `storage_path` is assigned once by the artifact store and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub id: Uuid,
    /// Client-declared filename. Display only.
    pub filename: String,
    pub storage_path: PathBuf,
    pub size_bytes: u64,
    pub metadata: AppMetadata,
    /// Reserved. No signing step exists, so this is always `false`.
    pub signed: bool,
    pub created_at: DateTime<Utc>,
}

/// Binding between a public slug and one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: Uuid,
    pub slug: Slug,
    pub artifact_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// What happened on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Download,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "download" => Some(Self::Download),
            _ => None,
        }
    }
}

/// One append-only telemetry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEventRecord {
    pub id: Uuid,
    pub link_id: Uuid,
    pub kind: AccessKind,
    pub user_agent: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- AppState -----------------------------------------------------------------

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub artifacts: ArtifactStore,
    pub registry: LinkRegistry,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Build state from configuration and an optional database pool.
    pub fn new(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let artifacts = ArtifactStore::new(config.upload_dir.clone(), config.max_upload_bytes);
        let registry = LinkRegistry::new(db_pool.clone());
        Self {
            config: Arc::new(config),
            artifacts,
            registry,
            db_pool,
        }
    }

    /// Replace the registry, e.g. to inject a deterministic slug source.
    pub fn with_registry(mut self, registry: LinkRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Load persisted artifacts and links into the in-memory indexes.
    ///
    /// No-op without a database pool.
    pub async fn hydrate_from_db(&self) -> Result<(), RegistryError> {
        match &self.db_pool {
            Some(pool) => self.registry.hydrate(pool).await,
            None => Ok(()),
        }
    }

    /// Release held resources. Called once after the server stops.
    pub async fn close(&self) {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
            tracing::info!("Database pool closed");
        }
    }
}
