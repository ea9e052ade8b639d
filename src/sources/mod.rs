//! Collaborator contracts consumed by the sync pipeline.
//!
//! The pipeline itself owns only delta comparison, chunking, metadata
//! injection and state. Everything touching the outside world sits behind one
//! of these seams:
//!
//! - [`DocumentSource`] — remote corpus enumeration and byte download
//!   (concrete adapter: [`drive::DriveSource`])
//! - [`PageExtractor`] — PDF text extraction, consumed as a black box
//! - [`SearchIndex`] — the hosted text index accepting prepared documents
//!
//! Extraction and index hosting are implemented elsewhere; tests exercise the
//! seams with in-memory fakes.

pub mod drive;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::types::{ExtractedPage, RemoteDocument, SyncError};

pub use drive::DriveSource;

/// Enumerates and downloads documents from the remote corpus.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Lists every leaf document currently in the corpus, one entry per
    /// document, in provider order.
    ///
    /// # Errors
    ///
    /// [`SyncError::Transient`]/[`SyncError::Http`] for retryable network
    /// failures (retried inside the adapter), [`SyncError::Config`] for
    /// non-retryable setup problems.
    async fn list_documents(&self) -> Result<Vec<RemoteDocument>, SyncError>;

    /// Streams one document's bytes into `destination` and returns the local
    /// path. Implementations must use bounded-size chunks rather than
    /// buffering whole files in memory.
    async fn download(
        &self,
        document: &RemoteDocument,
        destination: &Path,
    ) -> Result<PathBuf, SyncError>;
}

/// Extracts per-page text from a downloaded file.
///
/// CPU-bound by nature; implementations run the parse off the cooperative
/// scheduler (e.g. `tokio::task::spawn_blocking`) and report a best-effort
/// printed page number per page, `"Unknown"` when undetected.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract_pages(&self, path: &Path) -> Result<Vec<ExtractedPage>, SyncError>;
}

/// The hosted text-search index receiving prepared documents.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ensures the backing index exists and returns its handle.
    ///
    /// Called once per cycle before fan-out; a failure here is fatal for the
    /// cycle.
    async fn prepare(&self) -> Result<String, SyncError>;

    /// Persists one prepared document artifact into the index.
    ///
    /// Idempotent from the caller's perspective: retrying a whole-document
    /// upload is always safe.
    async fn persist_document(&self, index_id: &str, path: &Path) -> Result<(), SyncError>;
}
