//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::HarvestError;

/// Number of domains listed in the statistics
pub const TOP_DOMAINS: usize = 10;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct RunStatistics {
    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Rows in the raw occurrence log
    pub raw_rows: u64,

    /// Unique identifiers in the canonical table
    pub canonical_rows: u64,

    /// Raw rows per extraction channel, most frequent first
    pub by_channel: Vec<(String, u64)>,

    /// Canonical identifiers per domain, most frequent first
    pub top_domains: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<RunStatistics, HarvestError> {
    Ok(RunStatistics {
        latest_run: storage.get_latest_run()?,
        raw_rows: storage.count_raw()?,
        canonical_rows: storage.count_canonical()?,
        by_channel: storage.count_raw_by_channel()?,
        top_domains: storage.top_domains(TOP_DOMAINS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        println!("Latest run:");
        println!("  ID: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!();
    }

    println!("Overview:");
    println!("  Raw occurrences: {}", stats.raw_rows);
    println!("  Unique identifiers: {}", stats.canonical_rows);
    println!();

    if !stats.by_channel.is_empty() {
        println!("Occurrences by Channel:");
        for (channel, count) in &stats.by_channel {
            let percentage = if stats.raw_rows > 0 {
                (*count as f64 / stats.raw_rows as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", channel, count, percentage);
        }
        println!();
    }

    if !stats.top_domains.is_empty() {
        println!("Top Domains:");
        for (domain, count) in &stats.top_domains {
            println!("  {}: {}", domain, count);
        }
    }
}

/// Logs a one-line summary plus the channel breakdown
pub fn log_statistics(stats: &RunStatistics) {
    tracing::info!(
        "Store holds {} raw occurrences and {} unique identifiers",
        stats.raw_rows,
        stats.canonical_rows
    );
    for (channel, count) in &stats.by_channel {
        tracing::debug!("  {}: {}", channel, count);
    }
}
