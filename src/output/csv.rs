//! CSV export of the raw log and the canonical table
//!
//! Free-text columns (page title, context snippet, notes) that start with
//! `=`, `+`, `-` or `@` are prefixed with `'` so spreadsheets do not
//! evaluate them as formulas.

use crate::storage::{CanonicalRecord, RawRecord, Storage};
use crate::HarvestError;
use csv::WriterBuilder;
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// File name of the raw occurrence export
pub const RAW_FILE: &str = "emails_raw.csv";

/// File name of the deduplicated export
pub const CLEAN_FILE: &str = "emails_clean.csv";

const RAW_HEADER: [&str; 11] = [
    "identifier",
    "local_part",
    "domain_part",
    "source_url",
    "source_type",
    "page_title",
    "context_snippet",
    "http_status",
    "found_at",
    "channel",
    "notes",
];

const CLEAN_HEADER: [&str; 7] = [
    "identifier",
    "domain_part",
    "first_seen",
    "sources",
    "verified",
    "status",
    "notes",
];

const FORMULA_PREFIXES: &[char] = &['=', '+', '-', '@'];

/// Paths and row counts of a finished export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub raw_path: PathBuf,
    pub raw_rows: usize,
    pub clean_path: PathBuf,
    pub clean_rows: usize,
}

#[derive(Serialize)]
struct RawRow<'a> {
    identifier: &'a str,
    local_part: &'a str,
    domain_part: &'a str,
    source_url: &'a str,
    source_type: &'a str,
    page_title: Cow<'a, str>,
    context_snippet: Cow<'a, str>,
    http_status: Option<u16>,
    found_at: &'a str,
    channel: &'a str,
    notes: Cow<'a, str>,
}

impl<'a> From<&'a RawRecord> for RawRow<'a> {
    fn from(record: &'a RawRecord) -> Self {
        Self {
            identifier: &record.identifier,
            local_part: &record.local_part,
            domain_part: &record.domain_part,
            source_url: &record.source_url,
            source_type: &record.source_type,
            page_title: neutralize_formula(&record.page_title),
            context_snippet: neutralize_formula(&record.context_snippet),
            http_status: record.http_status,
            found_at: &record.found_at,
            channel: &record.channel,
            notes: neutralize_formula(&record.notes),
        }
    }
}

#[derive(Serialize)]
struct CleanRow<'a> {
    identifier: &'a str,
    domain_part: &'a str,
    first_seen: &'a str,
    sources: String,
    verified: bool,
    status: &'a str,
    notes: Cow<'a, str>,
}

impl<'a> From<&'a CanonicalRecord> for CleanRow<'a> {
    fn from(record: &'a CanonicalRecord) -> Self {
        Self {
            identifier: &record.identifier,
            domain_part: &record.domain_part,
            first_seen: &record.first_seen,
            sources: record.joined_sources(),
            verified: record.verified,
            status: &record.status,
            notes: neutralize_formula(&record.notes),
        }
    }
}

/// Quotes a value a spreadsheet would read as a formula
///
/// # Examples
///
/// ```
/// use contact_harvester::output::neutralize_formula;
///
/// assert_eq!(neutralize_formula("=SUM(A1)"), "'=SUM(A1)");
/// assert_eq!(neutralize_formula("Faculté"), "Faculté");
/// ```
pub fn neutralize_formula(value: &str) -> Cow<'_, str> {
    if value.starts_with(FORMULA_PREFIXES) {
        Cow::Owned(format!("'{}", value))
    } else {
        Cow::Borrowed(value)
    }
}

/// Writes both tables as CSV files into `dir`
///
/// Existing files are replaced. The directory is created if needed.
///
/// # Arguments
///
/// * `storage` - The storage backend to read from
/// * `dir` - Output directory
///
/// # Returns
///
/// * `Ok(ExportSummary)` - Both files written
/// * `Err(HarvestError)` - Reading the store or writing a file failed
pub fn export_csv(storage: &dyn Storage, dir: &Path) -> Result<ExportSummary, HarvestError> {
    std::fs::create_dir_all(dir)?;

    let raw = storage.load_raw()?;
    let raw_path = dir.join(RAW_FILE);
    write_rows(&raw_path, &RAW_HEADER, raw.iter().map(RawRow::from))?;

    let canonical = storage.load_canonical()?;
    let clean_path = dir.join(CLEAN_FILE);
    write_rows(&clean_path, &CLEAN_HEADER, canonical.iter().map(CleanRow::from))?;

    tracing::info!(
        "Exported {} raw rows to {} and {} unique identifiers to {}",
        raw.len(),
        raw_path.display(),
        canonical.len(),
        clean_path.display()
    );

    Ok(ExportSummary {
        raw_path,
        raw_rows: raw.len(),
        clean_path,
        clean_rows: canonical.len(),
    })
}

/// Header first, so an empty table still yields a readable file
fn write_rows<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl Iterator<Item = T>,
) -> Result<(), HarvestError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    fn raw_record(run_id: i64, title: &str, context: &str) -> RawRecord {
        RawRecord {
            run_id,
            identifier: "k.said@univ-x.dz".to_string(),
            local_part: "k.said".to_string(),
            domain_part: "univ-x.dz".to_string(),
            source_url: "https://univ-x.dz/annuaire?dept=info;page=2".to_string(),
            source_type: "static".to_string(),
            page_title: title.to_string(),
            context_snippet: context.to_string(),
            http_status: Some(200),
            found_at: "2024-01-01T00:00:00Z".to_string(),
            channel: "body_text".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_neutralize_formula() {
        assert_eq!(neutralize_formula("+213 555"), "'+213 555");
        assert_eq!(neutralize_formula("-5"), "'-5");
        assert_eq!(neutralize_formula("@k.said"), "'@k.said");
        assert_eq!(neutralize_formula("Annuaire"), "Annuaire");
        assert_eq!(neutralize_formula(""), "");
    }

    #[test]
    fn test_export_and_read_back() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h").unwrap();
        storage
            .append_raw(&[
                raw_record(run_id, "=HYPERLINK(\"x\")", "Dr Said, k.said@univ-x.dz"),
                raw_record(run_id, "Annuaire, \"Sciences\"", "-bureau 12"),
            ])
            .unwrap();
        storage
            .replace_canonical(&[CanonicalRecord {
                identifier: "k.said@univ-x.dz".to_string(),
                domain_part: "univ-x.dz".to_string(),
                first_seen: "2024-01-01T00:00:00Z".to_string(),
                sources: vec![
                    "https://univ-x.dz/annuaire?dept=info;page=2".to_string(),
                    "https://univ-x.dz/".to_string(),
                ],
                verified: false,
                status: "unknown".to_string(),
                notes: "@todo".to_string(),
            }])
            .unwrap();

        let dir = TempDir::new().unwrap();
        let summary = export_csv(&storage, &dir.path().join("out")).unwrap();
        assert_eq!(summary.raw_rows, 2);
        assert_eq!(summary.clean_rows, 1);

        let mut reader = csv::Reader::from_path(&summary.raw_path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, RAW_HEADER);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "k.said@univ-x.dz");
        assert_eq!(&rows[0][4], "static");
        assert_eq!(&rows[0][5], "'=HYPERLINK(\"x\")");
        assert_eq!(&rows[0][6], "Dr Said, k.said@univ-x.dz");
        assert_eq!(&rows[0][7], "200");
        assert_eq!(&rows[1][5], "Annuaire, \"Sciences\"");
        assert_eq!(&rows[1][6], "'-bureau 12");

        let mut reader = csv::Reader::from_path(&summary.clean_path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, CLEAN_HEADER);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            &rows[0][3],
            "https://univ-x.dz/annuaire?dept=info%3Bpage=2;https://univ-x.dz/"
        );
        assert_eq!(&rows[0][4], "false");
        assert_eq!(&rows[0][6], "'@todo");
    }

    #[test]
    fn test_empty_store_writes_headers() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let dir = TempDir::new().unwrap();
        let summary = export_csv(&storage, dir.path()).unwrap();

        let content = std::fs::read_to_string(&summary.clean_path).unwrap();
        assert_eq!(
            content.trim_end(),
            "identifier,domain_part,first_seen,sources,verified,status,notes"
        );
    }
}
