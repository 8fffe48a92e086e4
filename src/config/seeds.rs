//! Seed list loading
//!
//! One URL per line; blank lines and lines starting with `#` are ignored.
//! A line that is not a usable URL is logged and skipped.

use crate::url::normalize_url;
use crate::ConfigError;
use std::path::Path;
use url::Url;

/// Reads and normalizes the seed list at `path`
///
/// # Returns
///
/// * `Ok(Vec<Url>)` - Normalized seeds in file order, duplicates removed
/// * `Err(ConfigError)` - The file could not be read
pub fn load_seeds(path: &Path) -> Result<Vec<Url>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_seeds(&content))
}

/// Parses seed list text
pub fn parse_seeds(content: &str) -> Vec<Url> {
    let mut seeds: Vec<Url> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let url = match normalize_url(line) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping seed on line {} ('{}'): {}", line_no + 1, line, e);
                continue;
            }
        };

        if !seeds.contains(&url) {
            seeds.push(url);
        }
    }

    seeds
}
