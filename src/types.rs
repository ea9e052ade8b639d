//! Core data model and error taxonomy for the sync pipeline.
//!
//! # Key Types
//!
//! - [`RemoteDocument`]: one entry of the remote corpus listing, immutable
//!   snapshot per sync cycle
//! - [`ExtractedPage`]: per-page extraction output, consumed immediately
//! - [`ChecksumRecord`]: the only durable core state — one record per
//!   ever-seen document
//! - [`SyncError`]: error taxonomy shared across the pipeline

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A document discovered in the remote corpus listing.
///
/// Produced by a [`DocumentSource`](crate::sources::DocumentSource) once per
/// cycle and never persisted; the `checksum` is the provider-supplied content
/// hash used for delta comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    /// Opaque stable identifier assigned by the provider.
    pub id: String,
    /// Human-readable file name (also the metadata-convention carrier).
    pub name: String,
    /// Provider-supplied content checksum; compared byte-exact.
    pub checksum: String,
}

impl RemoteDocument {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            checksum: checksum.into(),
        }
    }
}

/// One page of extraction output from the
/// [`PageExtractor`](crate::sources::PageExtractor) collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Zero-based physical page index within the file.
    pub page_index: usize,
    /// Raw text content of the page.
    pub text: String,
    /// Best-effort printed page number; `"Unknown"` when undetected.
    pub internal_page_number: String,
}

/// Ingestion status recorded in the state store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// The document's last-seen version was fully ingested.
    Synced,
}

/// Durable record of a successfully ingested document version.
///
/// Invariant: the `checksum` field always reflects the last *fully ingested*
/// version, never a partially processed one — the record is only written
/// after the external index confirms success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRecord {
    pub id: String,
    pub name: String,
    pub checksum: String,
    pub status: DocumentStatus,
}

/// Errors raised by the sync pipeline and its collaborators.
///
/// The taxonomy follows the pipeline's containment rules: transient
/// variants are retried at the collaborator boundary, per-document failures
/// are logged and skipped, and anything raised before fan-out aborts the
/// cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transient network or timeout failure, retryable with backoff.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Missing or invalid configuration; never retryable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local filesystem failure (scratch dir, downloads, state file).
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP-level failure talking to the drive provider.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// State file could not be encoded or decoded.
    #[error("state serialization failed: {0}")]
    State(#[from] serde_json::Error),

    /// Page extraction failed for a downloaded file.
    #[error("extraction failed for {path}: {message}")]
    Extraction {
        /// Local path of the file that failed to parse.
        path: PathBuf,
        /// Collaborator-provided description.
        message: String,
    },

    /// The hosted index rejected or failed a persist call.
    #[error("index persistence failed: {0}")]
    Index(String),
}

impl SyncError {
    /// True when retrying the failed operation may succeed.
    ///
    /// Timeouts, connect failures, HTTP 429 and 5xx qualify; everything else
    /// surfaces immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transient(_) => true,
            SyncError::Http(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }
                err.status()
                    .is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(SyncError::Transient("socket reset".into()).is_transient());
        assert!(!SyncError::Config("missing folder id".into()).is_transient());
        assert!(
            !SyncError::Index("quota exceeded".into()).is_transient(),
            "index failures surface to the worker, retries live in the adapter"
        );
    }

    #[test]
    fn checksum_record_round_trips() {
        let record = ChecksumRecord {
            id: "abc".into(),
            name: "2019 - Smith - Carriage of Goods.pdf".into(),
            checksum: "d41d8cd9".into(),
            status: DocumentStatus::Synced,
        };
        let encoded = serde_json::to_string(&record).unwrap();
        assert!(encoded.contains("\"status\":\"synced\""));
        let decoded: ChecksumRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
