//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{CanonicalRecord, RawRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The raw log only grows. The canonical table is only ever replaced as a
/// whole.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed)
    }

    // ===== Raw Log =====

    /// Appends occurrences in one transaction
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn append_raw(&mut self, records: &[RawRecord]) -> StorageResult<usize>;

    /// Reads the whole raw log in insertion order
    fn load_raw(&self) -> StorageResult<Vec<RawRecord>>;

    fn count_raw(&self) -> StorageResult<u64>;

    /// Raw rows per extraction channel, most frequent first
    fn count_raw_by_channel(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Canonical Table =====

    /// Replaces the canonical table with `records` in one transaction
    fn replace_canonical(&mut self, records: &[CanonicalRecord]) -> StorageResult<()>;

    /// Reads the canonical table ordered by identifier
    fn load_canonical(&self) -> StorageResult<Vec<CanonicalRecord>>;

    fn count_canonical(&self) -> StorageResult<u64>;

    /// Canonical identifiers per domain, most frequent first
    fn top_domains(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
