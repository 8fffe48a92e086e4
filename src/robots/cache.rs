//! Per-host robots.txt policy cache
//!
//! Entries are keyed by host (without `www.`, with port) and expire after
//! 24 hours. Lookups for a host that has not been fetched yet are permissive.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Host-policy lookups consumed by the crawler
pub trait HostPolicy: Send + Sync {
    /// Whether `agent` may fetch `path` on `host`
    fn allowed(&self, host: &str, path: &str, agent: &str) -> bool;

    /// Delay requested by `host` for `agent`, if any
    fn crawl_delay(&self, host: &str, agent: &str) -> Option<Duration>;
}

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new entry stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the entry is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > ChronoDuration::hours(24)
    }
}

/// Computes the cache key for a URL's host
///
/// # Examples
///
/// ```
/// use contact_harvester::robots::host_key;
/// use url::Url;
///
/// let url = Url::parse("https://www.univ-x.dz/staff").unwrap();
/// assert_eq!(host_key(&url), Some("univ-x.dz".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Mutex-guarded map of host policies shared by all workers
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `key` has a fresh entry
    pub fn contains_fresh(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.get(key).is_some_and(|cached| !cached.is_stale()))
            .unwrap_or(false)
    }

    /// Stores (or replaces) the policy for `key`
    pub fn insert(&self, key: &str, robots: ParsedRobots) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), CachedRobots::new(robots));
            }
            Err(_) => tracing::warn!("Robots cache lock poisoned; policy for {} not cached", key),
        }
    }

    /// Number of cached hosts
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_entry<T>(&self, host: &str, f: impl FnOnce(&CachedRobots) -> T) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        entries.get(host).map(f)
    }
}

impl HostPolicy for RobotsCache {
    fn allowed(&self, host: &str, path: &str, agent: &str) -> bool {
        self.with_entry(host, |cached| cached.content.is_allowed(path, agent))
            .unwrap_or(true)
    }

    fn crawl_delay(&self, host: &str, agent: &str) -> Option<Duration> {
        self.with_entry(host, |cached| cached.content.crawl_delay(agent))
            .flatten()
    }
}
