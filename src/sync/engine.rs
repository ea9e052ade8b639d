//! The [`SyncEngine`] — drives one full delta-sync cycle.
//!
//! # Cycle model
//!
//! 1. The scratch directory is recreated empty.
//! 2. The index is prepared and the remote corpus listed; a failure in
//!    either aborts the cycle (fatal, propagated).
//! 3. [`DeltaPlan`](super::DeltaPlan) selects new and modified documents.
//! 4. One pipeline worker per queued document runs
//!    download → extract → chunk+enrich → upload → record, admitted through
//!    a counting semaphore so at most `max_concurrency` documents are
//!    in flight at once.
//! 5. Per-document failures are logged with the stage reached and skipped;
//!    siblings continue. The cycle ends with a [`CycleSummary`].
//! 6. The scratch directory is cleared on both success and failure.
//!
//! A document only reaches [`WorkStage::Recorded`] after the index confirms
//! ingestion *and* the checksum store write succeeds; anything less leaves it
//! eligible for retry next cycle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::chunking::SemanticChunker;
use crate::config::SyncConfig;
use crate::metadata::{ChunkMetadata, inject_metadata, parse_filename_metadata};
use crate::sources::{DocumentSource, PageExtractor, SearchIndex};
use crate::store::ChecksumStore;
use crate::sync::delta::DeltaPlan;
use crate::types::{ExtractedPage, RemoteDocument, SyncError};

/// Lifecycle of one work item as it moves through its pipeline worker.
///
/// Stages are strictly sequential within one document; `Failed` is terminal
/// and reachable from any non-terminal stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStage {
    Discovered,
    Downloading,
    Extracting,
    Chunking,
    Uploading,
    Recorded,
    Failed,
}

impl fmt::Display for WorkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkStage::Discovered => "discovered",
            WorkStage::Downloading => "downloading",
            WorkStage::Extracting => "extracting",
            WorkStage::Chunking => "chunking",
            WorkStage::Uploading => "uploading",
            WorkStage::Recorded => "recorded",
            WorkStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Aggregate outcome of one sync cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Documents selected by delta comparison.
    pub queued: usize,
    /// Documents fully ingested and recorded.
    pub succeeded: usize,
    /// Documents that failed at some stage and were skipped this cycle.
    pub failed: usize,
    /// Documents skipped up front because their checksum matched.
    pub skipped: usize,
}

/// Orchestrates delta detection and bounded-concurrency ingestion.
pub struct SyncEngine {
    config: SyncConfig,
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn PageExtractor>,
    index: Arc<dyn SearchIndex>,
    store: ChecksumStore,
    chunker: SemanticChunker,
}

impl SyncEngine {
    /// Assembles an engine from its collaborators and an opened state store.
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn DocumentSource>,
        extractor: Arc<dyn PageExtractor>,
        index: Arc<dyn SearchIndex>,
        store: ChecksumStore,
    ) -> Self {
        let chunker = SemanticChunker::new(config.max_chunk_chars);
        Self {
            config,
            source,
            extractor,
            index,
            store,
            chunker,
        }
    }

    /// Read access to the engine's state store (used by callers reporting on
    /// sync state).
    pub fn store(&self) -> &ChecksumStore {
        &self.store
    }

    /// Runs one full synchronization cycle.
    ///
    /// # Errors
    ///
    /// Propagates failures raised before fan-out (index preparation, corpus
    /// listing, scratch setup). Per-document failures are contained and
    /// reported through the summary instead.
    pub async fn run_cycle(&self) -> Result<CycleSummary, SyncError> {
        info!("starting synchronization cycle");
        self.reset_scratch_dir().await?;

        let outcome = self.run_cycle_inner().await;

        if let Err(err) = fs::remove_dir_all(&self.config.scratch_dir).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %err, "failed to clear scratch directory");
            }
        }

        match &outcome {
            Ok(summary) => info!(
                queued = summary.queued,
                succeeded = summary.succeeded,
                failed = summary.failed,
                skipped = summary.skipped,
                "synchronization cycle completed"
            ),
            Err(err) => error!(error = %err, "synchronization cycle failed"),
        }
        outcome
    }

    async fn run_cycle_inner(&self) -> Result<CycleSummary, SyncError> {
        let index_id = self.index.prepare().await?;
        debug!(index = %index_id, "index ready");

        info!("fetching remote corpus listing");
        let listing = self.source.list_documents().await?;

        let plan = DeltaPlan::compute(&self.store, &listing).await;
        if plan.is_empty() {
            info!("corpus is up to date, nothing to sync");
            return Ok(CycleSummary {
                skipped: plan.unchanged,
                ..CycleSummary::default()
            });
        }

        info!(
            queued = plan.queue.len(),
            limit = self.config.max_concurrency,
            "processing delta queue"
        );
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(plan.queue.len());

        for document in plan.queue.iter().cloned() {
            let worker = PipelineWorker {
                source: Arc::clone(&self.source),
                extractor: Arc::clone(&self.extractor),
                index: Arc::clone(&self.index),
                store: self.store.clone(),
                chunker: self.chunker.clone(),
                scratch_dir: self.config.scratch_dir.clone(),
            };
            let semaphore = Arc::clone(&semaphore);
            let index_id = index_id.clone();
            handles.push(tokio::spawn(async move {
                // Admission gate: the item stays in Discovered until a slot
                // frees up.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return WorkStage::Failed;
                };
                worker.process(document, &index_id).await
            }));
        }

        let mut summary = CycleSummary {
            queued: handles.len(),
            skipped: plan.unchanged,
            ..CycleSummary::default()
        };
        for handle in handles {
            match handle.await {
                Ok(WorkStage::Recorded) => summary.succeeded += 1,
                Ok(_) => summary.failed += 1,
                Err(err) => {
                    error!(error = %err, "pipeline worker panicked");
                    summary.failed += 1;
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch processing summary"
        );
        Ok(summary)
    }

    /// Recreates the scratch directory empty at cycle start.
    async fn reset_scratch_dir(&self) -> Result<(), SyncError> {
        match fs::remove_dir_all(&self.config.scratch_dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        fs::create_dir_all(&self.config.scratch_dir).await?;
        Ok(())
    }
}

/// Per-document unit of work; owns its work item exclusively.
struct PipelineWorker {
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn PageExtractor>,
    index: Arc<dyn SearchIndex>,
    store: ChecksumStore,
    chunker: SemanticChunker,
    scratch_dir: PathBuf,
}

impl PipelineWorker {
    /// Runs the full pipeline for one document and returns its terminal
    /// stage: [`WorkStage::Recorded`] or [`WorkStage::Failed`].
    async fn process(&self, document: RemoteDocument, index_id: &str) -> WorkStage {
        let mut stage = WorkStage::Discovered;
        match self.run_pipeline(&document, index_id, &mut stage).await {
            Ok(()) => {
                info!(name = %document.name, "successfully processed and recorded");
                stage
            }
            Err(err) => {
                error!(
                    name = %document.name,
                    id = %document.id,
                    failed_at = %stage,
                    error = %err,
                    "document failed, skipping for this cycle"
                );
                WorkStage::Failed
            }
        }
    }

    async fn run_pipeline(
        &self,
        document: &RemoteDocument,
        index_id: &str,
        stage: &mut WorkStage,
    ) -> Result<(), SyncError> {
        *stage = WorkStage::Downloading;
        debug!(name = %document.name, "downloading");
        let local_path = self.source.download(document, &self.scratch_dir).await?;

        *stage = WorkStage::Extracting;
        let pages = self.extractor.extract_pages(&local_path).await?;
        debug!(name = %document.name, pages = pages.len(), "extraction complete");

        *stage = WorkStage::Chunking;
        let artifact = self.prepare_artifact(document, &local_path, &pages).await?;

        *stage = WorkStage::Uploading;
        self.index.persist_document(index_id, &artifact).await?;

        // Commit only after the index confirmed success; a store failure
        // leaves the document eligible for retry next cycle.
        self.store
            .upsert(
                document.id.as_str(),
                document.name.as_str(),
                document.checksum.as_str(),
            )
            .await?;
        *stage = WorkStage::Recorded;
        Ok(())
    }

    /// Chunks every page, enriches each chunk with metadata, and writes the
    /// concatenated result as one artifact per source document.
    async fn prepare_artifact(
        &self,
        document: &RemoteDocument,
        local_path: &Path,
        pages: &[ExtractedPage],
    ) -> Result<PathBuf, SyncError> {
        let (year, author, title) = parse_filename_metadata(&document.name);

        let mut blocks = Vec::new();
        for page in pages {
            for chunk in self.chunker.chunk_text(&page.text) {
                let metadata = ChunkMetadata::new(
                    title.as_str(),
                    author.as_str(),
                    year.as_str(),
                    page.internal_page_number.as_str(),
                );
                blocks.push(inject_metadata(&chunk, &metadata));
            }
        }
        debug!(name = %document.name, chunks = blocks.len(), "chunking complete");

        let artifact = PathBuf::from(format!("{}_processed.txt", local_path.display()));
        fs::write(&artifact, blocks.join("\n\n")).await?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_labels_are_stable() {
        assert_eq!(WorkStage::Downloading.to_string(), "downloading");
        assert_eq!(WorkStage::Recorded.to_string(), "recorded");
        assert_eq!(WorkStage::Failed.to_string(), "failed");
    }

    #[test]
    fn summary_defaults_to_zero() {
        let summary = CycleSummary::default();
        assert_eq!(summary.queued + summary.succeeded + summary.failed + summary.skipped, 0);
    }
}
