//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files, and exposes the cached result through [`HostPolicy`].

mod cache;
mod parser;

pub use cache::{host_key, CachedRobots, HostPolicy, RobotsCache};
pub use parser::ParsedRobots;

use crate::crawler::{HttpClient, Timeouts};
use crate::url::{is_bare_host, strip_www};
use url::Url;

/// Candidate robots.txt locations for the host of `url`
///
/// Both the bare and the `www.` host are tried, first with the page's scheme
/// and then with the other one.
pub fn robots_candidates(url: &Url) -> Vec<Url> {
    let Some(host) = url.host_str().map(str::to_lowercase) else {
        return Vec::new();
    };

    let hosts: Vec<String> = if is_bare_host(&host) {
        vec![host]
    } else {
        let bare = strip_www(&host).to_string();
        let www = format!("www.{}", bare);
        vec![bare, www]
    };

    let schemes = match url.scheme() {
        "http" => ["http", "https"],
        _ => ["https", "http"],
    };

    let mut candidates = Vec::new();
    for scheme in schemes {
        for host in &hosts {
            let mut candidate = url.clone();
            candidate.set_path("/robots.txt");
            candidate.set_query(None);
            candidate.set_fragment(None);
            if candidate.set_scheme(scheme).is_err() || candidate.set_host(Some(host)).is_err() {
                continue;
            }
            candidates.push(candidate);
        }
    }
    candidates
}

/// Fetches robots.txt for the host of `url`
///
/// The first candidate answering 200 wins. A 4xx means the host has no
/// policy. When nothing answers the host is treated as unrestricted and the
/// configured default delay applies.
pub async fn fetch_robots(client: &dyn HttpClient, url: &Url, timeouts: Timeouts) -> ParsedRobots {
    for candidate in robots_candidates(url) {
        match client.fetch(&candidate, timeouts).await {
            Ok(response) if (200..300).contains(&response.status) => {
                tracing::debug!("Loaded robots.txt from {}", candidate);
                return ParsedRobots::from_content(&String::from_utf8_lossy(&response.body));
            }
            Ok(response) if (400..500).contains(&response.status) => {
                tracing::debug!("No robots.txt at {} (HTTP {})", candidate, response.status);
                return ParsedRobots::allow_all();
            }
            Ok(response) => {
                tracing::debug!("robots.txt at {} returned HTTP {}", candidate, response.status);
            }
            Err(e) => {
                tracing::trace!("robots.txt at {} failed: {}", candidate, e);
            }
        }
    }

    ParsedRobots::allow_all()
}

/// Makes sure the cache holds a fresh policy for the host of `url`
///
/// Returns the cache key. Two workers racing on the same host may both
/// fetch; the later insert wins and both see an equivalent policy.
pub async fn ensure_policy(
    cache: &RobotsCache,
    client: &dyn HttpClient,
    url: &Url,
    timeouts: Timeouts,
) -> Option<String> {
    let key = host_key(url)?;
    if !cache.contains_fresh(&key) {
        let robots = fetch_robots(client, url, timeouts).await;
        cache.insert(&key, robots);
    }
    Some(key)
}

/// Path plus query, the part of a URL robots rules match against
pub fn robots_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
