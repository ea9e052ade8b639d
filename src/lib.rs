//! Delta-sync ingestion pipeline mirroring a remote document corpus into a
//! hosted text-search index.
//!
//! Only documents that are new or changed since the last successful run are
//! reprocessed, and at most a fixed number of documents are in flight at
//! once, so corpora of tens of gigabytes ingest without exhausting memory or
//! tripping provider rate limits.
//!
//! ```text
//! Remote listing ──► sync::DeltaPlan ──► work queue
//!                          ▲                  │
//!                  store::ChecksumStore       │ admission gate (N workers)
//!                          ▲                  ▼
//!                          │          PipelineWorker (per document)
//!                          │   download ─► extract ─► chunk + enrich
//!                          │                  │            │
//!                          │        sources::PageExtractor │
//!                          │                               ▼
//!                          └──── commit ◄── sources::SearchIndex
//! ```
//!
//! The checksum store is the only durable state: a record is written only
//! after the index confirms ingestion, so a crash or failure at any stage
//! leaves the document eligible for retry on the next cycle.

pub mod chunking;
pub mod config;
pub mod metadata;
pub mod retry;
pub mod sources;
pub mod store;
pub mod sync;
pub mod types;

pub use chunking::SemanticChunker;
pub use config::SyncConfig;
pub use metadata::{ChunkMetadata, inject_metadata, parse_filename_metadata};
pub use retry::RetryPolicy;
pub use sources::{DocumentSource, DriveSource, PageExtractor, SearchIndex};
pub use store::ChecksumStore;
pub use sync::{CycleSummary, DeltaPlan, SyncEngine, WorkStage};
pub use types::{ChecksumRecord, DocumentStatus, ExtractedPage, RemoteDocument, SyncError};
