//! Sync configuration resolved once at process start.
//!
//! [`SyncConfig`] is an explicit value constructed from the environment (via
//! `.env` when present) and handed by ownership to the
//! [`SyncEngine`](crate::sync::SyncEngine). Nothing in the pipeline reads
//! process-wide state after construction.

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::types::SyncError;

/// Environment variable naming the drive folder to mirror.
pub const ENV_DRIVE_FOLDER_ID: &str = "DRIVE_FOLDER_ID";
/// Environment variable carrying the drive API bearer token.
pub const ENV_DRIVE_TOKEN: &str = "DRIVE_ACCESS_TOKEN";
/// Optional override for the state file location.
pub const ENV_STATE_PATH: &str = "SYNC_STATE_PATH";
/// Optional override for the scratch directory.
pub const ENV_SCRATCH_DIR: &str = "SYNC_SCRATCH_DIR";

/// Configuration for one sync deployment.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Root folder id of the remote corpus.
    pub folder_id: String,
    /// Bearer token for the drive REST API.
    pub access_token: String,
    /// Path of the persistent checksum state file.
    pub state_path: PathBuf,
    /// Directory for downloaded and processed artifacts; recreated empty at
    /// the start of every cycle.
    pub scratch_dir: PathBuf,
    /// Maximum concurrently in-flight pipeline workers.
    pub max_concurrency: usize,
    /// Character ceiling handed to the chunker.
    pub max_chunk_chars: usize,
    /// Backoff policy applied around drive calls.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
    pub const DEFAULT_MAX_CHUNK_CHARS: usize = 3000;

    /// Builds a configuration from environment variables, loading `.env`
    /// first when present.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when a required variable is missing or
    /// empty.
    pub fn from_env() -> Result<Self, SyncError> {
        dotenvy::dotenv().ok();

        let folder_id = require_env(ENV_DRIVE_FOLDER_ID)?;
        let access_token = require_env(ENV_DRIVE_TOKEN)?;
        let state_path = std::env::var(ENV_STATE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("state/checksums.json"));
        let scratch_dir = std::env::var(ENV_SCRATCH_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("temp_data"));

        Ok(Self {
            folder_id,
            access_token,
            state_path,
            scratch_dir,
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
            max_chunk_chars: Self::DEFAULT_MAX_CHUNK_CHARS,
            retry: RetryPolicy::default(),
        })
    }

    /// Creates a configuration with explicit values and default tunables.
    pub fn new(
        folder_id: impl Into<String>,
        access_token: impl Into<String>,
        state_path: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            folder_id: folder_id.into(),
            access_token: access_token.into(),
            state_path: state_path.into(),
            scratch_dir: scratch_dir.into(),
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
            max_chunk_chars: Self::DEFAULT_MAX_CHUNK_CHARS,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the worker admission limit. Zero is clamped to one.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// Overrides the chunk character ceiling.
    #[must_use]
    pub fn with_max_chunk_chars(mut self, chars: usize) -> Self {
        self.max_chunk_chars = chars;
        self
    }

    /// Overrides the retry policy used around drive calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Disables retry delays; used by tests to keep backoff out of wall time.
    #[must_use]
    pub fn with_no_retry_delay(mut self) -> Self {
        self.retry = RetryPolicy::new(self.retry.max_attempts, Duration::ZERO, 1.0);
        self
    }
}

fn require_env(key: &str) -> Result<String, SyncError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SyncError::Config(format!(
            "required environment variable {key} is missing or empty"
        ))),
    }
}
