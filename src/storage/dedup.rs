//! Canonical table rebuild
//!
//! The dedup pass reads the whole raw log, re-applies the classifier, groups
//! occurrences by case-folded identifier and overwrites the canonical table.
//! Running it twice over the same log produces the same table.

use crate::extract::{split_identifier, IdentifierClassifier};
use crate::storage::{CanonicalRecord, RawRecord, Storage, StorageResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::{BTreeMap, HashSet};

/// Counts reported by a rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub raw_rows: usize,
    pub rejected: usize,
    pub canonical_rows: usize,
}

/// Sortable form of a timestamp
///
/// RFC 3339 values become fixed-width UTC strings, so string order is
/// chronological; anything else is compared as written.
fn ordering_key(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp.trim()) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        Err(_) => timestamp.to_string(),
    }
}

struct Group {
    domain_part: String,
    first_seen: String,
    sources: Vec<String>,
    seen: HashSet<String>,
}

/// Merges raw occurrences into canonical records
///
/// Rejected identifiers are dropped. Each canonical record keeps the
/// earliest timestamp and its distinct sources in first-seen order. The
/// result is ordered by identifier.
pub fn merge_records(raw: &[RawRecord], classifier: &IdentifierClassifier) -> Vec<CanonicalRecord> {
    let mut accepted: Vec<(String, &RawRecord)> = raw
        .iter()
        .filter(|record| {
            let verdict = classifier.classify(&record.identifier);
            if !verdict.is_accept() {
                tracing::trace!("Dropping {} from canonical table: {}", record.identifier, verdict);
            }
            verdict.is_accept()
        })
        .map(|record| (ordering_key(&record.found_at), record))
        .collect();
    // Stable: equal timestamps keep log order
    accepted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for (_, record) in accepted {
        let identifier = record.identifier.trim().to_lowercase();
        let Some((_, domain)) = split_identifier(&identifier) else {
            continue;
        };
        let domain_part = domain.to_string();

        let group = groups.entry(identifier).or_insert_with(|| Group {
            domain_part,
            first_seen: record.found_at.clone(),
            sources: Vec::new(),
            seen: HashSet::new(),
        });
        if group.seen.insert(record.source_url.clone()) {
            group.sources.push(record.source_url.clone());
        }
    }

    groups
        .into_iter()
        .map(|(identifier, group)| CanonicalRecord {
            identifier,
            domain_part: group.domain_part,
            first_seen: group.first_seen,
            sources: group.sources,
            verified: false,
            status: "unknown".to_string(),
            notes: String::new(),
        })
        .collect()
}

/// Rebuilds the canonical table from the raw log
///
/// # Arguments
///
/// * `storage` - The storage backend
/// * `classifier` - Applied again to every raw row
///
/// # Returns
///
/// * `Ok(RebuildSummary)` - Table replaced
/// * `Err(StorageError)` - Reading or writing failed; the old table is kept
pub fn rebuild_canonical<S: Storage + ?Sized>(
    storage: &mut S,
    classifier: &IdentifierClassifier,
) -> StorageResult<RebuildSummary> {
    let raw = storage.load_raw()?;
    let canonical = merge_records(&raw, classifier);
    storage.replace_canonical(&canonical)?;

    let accepted = raw
        .iter()
        .filter(|r| classifier.is_personal(&r.identifier))
        .count();
    let summary = RebuildSummary {
        raw_rows: raw.len(),
        rejected: raw.len() - accepted,
        canonical_rows: canonical.len(),
    };
    tracing::info!(
        "Canonical table rebuilt: {} raw rows, {} rejected, {} unique identifiers",
        summary.raw_rows,
        summary.rejected,
        summary.canonical_rows
    );
    Ok(summary)
}
