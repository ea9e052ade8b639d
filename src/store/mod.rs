//! Persistent checksum state for delta sync.
//!
//! [`ChecksumStore`] records, per ever-seen document id, the checksum of the
//! last fully ingested version. The backing file is a single JSON object
//! keyed by id, written through a temp-file-then-rename sequence so a crash
//! mid-write never leaves a torn state file.
//!
//! All access is serialized through one `tokio::sync::Mutex` constructed
//! eagerly at [`ChecksumStore::open`]; concurrent pipeline workers can share
//! the store by cloning it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::{ChecksumRecord, DocumentStatus, SyncError};

/// Concurrency-safe, file-backed map from document id to [`ChecksumRecord`].
#[derive(Clone, Debug)]
pub struct ChecksumStore {
    path: PathBuf,
    state: Arc<Mutex<HashMap<String, ChecksumRecord>>>,
}

impl ChecksumStore {
    /// Opens the store, loading any previously persisted records.
    ///
    /// A missing file is treated as an empty store; the parent directory is
    /// created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let path = path.into();
        let records = match fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str(&data)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            state: Arc::new(Mutex::new(records)),
        })
    }

    /// Path of the backing state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the record for `id`, if the document was ever fully ingested.
    pub async fn get(&self, id: &str) -> Option<ChecksumRecord> {
        let guard = self.state.lock().await;
        guard.get(id).cloned()
    }

    /// Number of recorded documents.
    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    /// True when no document has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Inserts or overwrites the record for `id` and persists the store.
    ///
    /// Call this only after the index has confirmed ingestion; a failed write
    /// surfaces to the caller and leaves the document eligible for retry on
    /// the next cycle. Repeating an upsert with identical arguments leaves
    /// the state unchanged.
    pub async fn upsert(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Result<(), SyncError> {
        let id = id.into();
        let record = ChecksumRecord {
            id: id.clone(),
            name: name.into(),
            checksum: checksum.into(),
            status: DocumentStatus::Synced,
        };

        let mut guard = self.state.lock().await;
        guard.insert(id, record);
        self.persist(&guard).await?;
        debug!(path = %self.path.display(), records = guard.len(), "state store persisted");
        Ok(())
    }

    /// Writes the full record map while the lock is held.
    async fn persist(&self, records: &HashMap<String, ChecksumRecord>) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let serialized = serde_json::to_string_pretty(records)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, serialized).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}
