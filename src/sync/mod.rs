//! Delta comparison and cycle orchestration.
//!
//! * [`delta`] — computes the processing queue by diffing the remote listing
//!   against the checksum store.
//! * [`engine`] — drives one full sync cycle with bounded-concurrency
//!   pipeline workers.

pub mod delta;
pub mod engine;

pub use delta::DeltaPlan;
pub use engine::{CycleSummary, SyncEngine, WorkStage};
