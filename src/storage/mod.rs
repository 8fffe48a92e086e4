//! Storage module for persisting harvest data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking
//! - The append-only raw identifier log
//! - The canonical table and the dedup pass that rebuilds it

mod dedup;
mod schema;
mod sqlite;
mod traits;

pub use dedup::{merge_records, rebuild_canonical, RebuildSummary};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Separator between source URLs in the canonical table
///
/// A `;` inside a URL is stored percent-encoded (`%3B`), so a stored list
/// splits back into the same number of URLs.
pub const SOURCE_SEPARATOR: char = ';';

/// One identifier occurrence, as appended to the raw log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub run_id: i64,
    /// The identifier as found on the page
    pub identifier: String,
    pub local_part: String,
    pub domain_part: String,
    pub source_url: String,
    /// `static` or `rendered`
    pub source_type: String,
    pub page_title: String,
    pub context_snippet: String,
    pub http_status: Option<u16>,
    /// RFC 3339 UTC timestamp
    pub found_at: String,
    /// Extraction channel name (`mailto_link`, `body_text`, ...)
    pub channel: String,
    pub notes: String,
}

/// A deduplicated identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Case-folded identifier
    pub identifier: String,
    pub domain_part: String,
    /// Earliest `found_at` over all occurrences
    pub first_seen: String,
    /// Distinct source URLs in first-seen order
    pub sources: Vec<String>,
    pub verified: bool,
    pub status: String,
    pub notes: String,
}

impl CanonicalRecord {
    /// Sources serialized for storage
    pub fn joined_sources(&self) -> String {
        self.sources
            .iter()
            .map(|source| source.replace(SOURCE_SEPARATOR, "%3B"))
            .collect::<Vec<_>>()
            .join(&SOURCE_SEPARATOR.to_string())
    }

    /// Parses a serialized source list
    pub fn split_sources(joined: &str) -> Vec<String> {
        joined
            .split(SOURCE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            let db_str = status.to_db_string();
            assert_eq!(Some(*status), RunStatus::from_db_string(db_str));
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("interrupted"), None);
    }

    #[test]
    fn test_sources_serialization() {
        let record = CanonicalRecord {
            identifier: "k.said@univ-x.dz".to_string(),
            domain_part: "univ-x.dz".to_string(),
            first_seen: "2024-01-01T00:00:00Z".to_string(),
            sources: vec!["https://a.dz/".to_string(), "https://b.dz/x".to_string()],
            verified: false,
            status: "unknown".to_string(),
            notes: String::new(),
        };
        assert_eq!(record.joined_sources(), "https://a.dz/;https://b.dz/x");
        assert_eq!(
            CanonicalRecord::split_sources(" https://a.dz/ ;;https://b.dz/x"),
            record.sources
        );
    }

    #[test]
    fn test_separator_inside_url_survives() {
        let record = CanonicalRecord {
            identifier: "k.said@univ-x.dz".to_string(),
            domain_part: "univ-x.dz".to_string(),
            first_seen: "2024-01-01T00:00:00Z".to_string(),
            sources: vec![
                "https://a.dz/list?dept=info;page=2".to_string(),
                "https://b.dz/x".to_string(),
            ],
            verified: false,
            status: "unknown".to_string(),
            notes: String::new(),
        };
        let joined = record.joined_sources();
        assert_eq!(joined, "https://a.dz/list?dept=info%3Bpage=2;https://b.dz/x");

        let split = CanonicalRecord::split_sources(&joined);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0], "https://a.dz/list?dept=info%3Bpage=2");
    }
}
