//! # Artifact Store
//!
//! Streams uploaded archives into the upload directory.
//!
//! Files are named `<unix-millis>_<slug>.ipa`: the timestamp orders them,
//! the random slug keeps concurrent uploads in the same millisecond apart.
//! Creation uses create-new semantics, so a clash fails rather than
//! overwriting. The payload is copied in fixed-size chunks and never held
//! in memory as a whole; the reported size comes from a `stat` after fsync.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ipadrop_core::{IpaFilename, Slug};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

const CHUNK_SIZE: usize = 64 * 1024;

/// Errors while persisting an upload.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stream carried no bytes.
    #[error("uploaded file is empty")]
    Empty,

    /// The stream exceeded the configured limit.
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// Reading the incoming stream failed (client side).
    #[error("upload stream interrupted: {0}")]
    Read(io::Error),

    /// Writing to storage failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A successfully persisted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub storage_path: PathBuf,
    /// Size on disk, from `stat`.
    pub size_bytes: u64,
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    max_bytes: u64,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Create the upload directory if needed.
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Whether the upload directory exists and is a directory.
    pub async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Persist `reader` under a fresh storage name.
    ///
    /// The `.ipa` extension requirement is carried by [`IpaFilename`]; the
    /// declared name only informs logging and never the path on disk.
    /// On any failure the partially written file is removed.
    pub async fn store<R>(&self, mut reader: R, filename: &IpaFilename) -> Result<StoredFile, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        self.ensure_root().await?;
        let storage_path = self.root.join(storage_name());
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&storage_path)
            .await?;

        let written = match self.copy_bounded(&mut reader, &mut file).await {
            Ok(0) => Err(StoreError::Empty),
            other => other,
        };
        drop(file);

        let written = match written {
            Ok(n) => n,
            Err(err) => {
                remove_partial(&storage_path).await;
                return Err(err);
            }
        };

        let size_bytes = match tokio::fs::metadata(&storage_path).await {
            Ok(meta) => meta.len(),
            Err(err) => {
                remove_partial(&storage_path).await;
                return Err(err.into());
            }
        };
        if size_bytes != written {
            tracing::warn!(
                path = %storage_path.display(),
                written,
                size_bytes,
                "Stored size differs from bytes written"
            );
        }

        tracing::debug!(
            filename = %filename,
            path = %storage_path.display(),
            size_bytes,
            "Upload persisted"
        );
        Ok(StoredFile {
            storage_path,
            size_bytes,
        })
    }

    async fn copy_bounded<R>(&self, reader: &mut R, file: &mut File) -> Result<u64, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = reader.read(&mut buf).await.map_err(StoreError::Read)?;
            if n == 0 {
                break;
            }
            written += n as u64;
            if written > self.max_bytes {
                return Err(StoreError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&buf[..n]).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    /// Open a stored archive for streaming.
    ///
    /// Returns `None` when the file is gone or unreadable.
    pub async fn open(&self, storage_path: &Path) -> Option<(File, u64)> {
        let file = match File::open(storage_path).await {
            Ok(file) => file,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %storage_path.display(), error = %err, "Stored archive unreadable");
                }
                return None;
            }
        };
        match file.metadata().await {
            Ok(meta) if meta.is_file() => Some((file, meta.len())),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(path = %storage_path.display(), error = %err, "Stored archive unreadable");
                None
            }
        }
    }
}

fn storage_name() -> String {
    format!("{}_{}.ipa", Utc::now().timestamp_millis(), Slug::generate())
}

async fn remove_partial(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %err, "Failed to remove partial upload");
    }
}
