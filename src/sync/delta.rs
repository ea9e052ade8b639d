//! Delta comparison between the remote listing and the checksum store.

use tracing::{info, warn};

use crate::store::ChecksumStore;
use crate::types::RemoteDocument;

/// The processing queue for one cycle, with per-category counts.
///
/// A document is queued when it was never recorded ("new") or when its
/// stored checksum differs from the remote one ("modified"). Checksum
/// comparison is byte-exact; documents with a matching checksum perform zero
/// further network or compute work this cycle.
#[derive(Clone, Debug, Default)]
pub struct DeltaPlan {
    /// Documents requiring processing, in listing order.
    pub queue: Vec<RemoteDocument>,
    /// Never-seen documents in the queue.
    pub new: usize,
    /// Re-queued documents whose checksum changed.
    pub modified: usize,
    /// Documents skipped because their stored checksum matches.
    pub unchanged: usize,
}

impl DeltaPlan {
    /// Diffs `listing` against the store.
    pub async fn compute(store: &ChecksumStore, listing: &[RemoteDocument]) -> Self {
        let mut plan = DeltaPlan::default();
        for document in listing {
            match store.get(&document.id).await {
                None => {
                    info!(name = %document.name, "new document detected");
                    plan.new += 1;
                    plan.queue.push(document.clone());
                }
                Some(record) if record.checksum != document.checksum => {
                    warn!(name = %document.name, "document modified (checksum mismatch), re-syncing");
                    plan.modified += 1;
                    plan.queue.push(document.clone());
                }
                Some(_) => plan.unchanged += 1,
            }
        }
        plan
    }

    /// True when nothing needs processing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn listing() -> Vec<RemoteDocument> {
        vec![
            RemoteDocument::new("a", "alpha.pdf", "x1"),
            RemoteDocument::new("b", "beta.pdf", "x2"),
        ]
    }

    #[tokio::test]
    async fn empty_store_selects_everything() {
        let dir = tempdir().unwrap();
        let store = ChecksumStore::open(dir.path().join("state.json"))
            .await
            .unwrap();

        let plan = DeltaPlan::compute(&store, &listing()).await;
        assert_eq!(plan.queue, listing());
        assert_eq!((plan.new, plan.modified, plan.unchanged), (2, 0, 0));
    }

    #[tokio::test]
    async fn recorded_documents_are_skipped() {
        let dir = tempdir().unwrap();
        let store = ChecksumStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        store.upsert("a", "alpha.pdf", "x1").await.unwrap();
        store.upsert("b", "beta.pdf", "x2").await.unwrap();

        let plan = DeltaPlan::compute(&store, &listing()).await;
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 2);
    }

    #[tokio::test]
    async fn checksum_change_requeues_exactly_that_document() {
        let dir = tempdir().unwrap();
        let store = ChecksumStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        store.upsert("a", "alpha.pdf", "x1").await.unwrap();
        store.upsert("b", "beta.pdf", "stale").await.unwrap();

        let plan = DeltaPlan::compute(&store, &listing()).await;
        assert_eq!(plan.queue, vec![RemoteDocument::new("b", "beta.pdf", "x2")]);
        assert_eq!((plan.new, plan.modified, plan.unchanged), (0, 1, 1));
    }

    #[tokio::test]
    async fn plan_is_idempotent_after_commit() {
        let dir = tempdir().unwrap();
        let store = ChecksumStore::open(dir.path().join("state.json"))
            .await
            .unwrap();

        let first = DeltaPlan::compute(&store, &listing()).await;
        for document in &first.queue {
            store
                .upsert(
                    document.id.as_str(),
                    document.name.as_str(),
                    document.checksum.as_str(),
                )
                .await
                .unwrap();
        }

        let second = DeltaPlan::compute(&store, &listing()).await;
        assert!(second.is_empty());
    }
}
