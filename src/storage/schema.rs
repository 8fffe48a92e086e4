//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per identifier occurrence; never updated or deleted
CREATE TABLE IF NOT EXISTS raw_identifiers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    identifier TEXT NOT NULL,
    local_part TEXT NOT NULL,
    domain_part TEXT NOT NULL,
    source_url TEXT NOT NULL,
    source_type TEXT NOT NULL,
    page_title TEXT NOT NULL DEFAULT '',
    context_snippet TEXT NOT NULL DEFAULT '',
    http_status INTEGER,
    found_at TEXT NOT NULL,
    channel TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_raw_identifier ON raw_identifiers(identifier);
CREATE INDEX IF NOT EXISTS idx_raw_run ON raw_identifiers(run_id);

CREATE TRIGGER IF NOT EXISTS raw_identifiers_no_update
BEFORE UPDATE ON raw_identifiers
BEGIN
    SELECT RAISE(ABORT, 'raw_identifiers is append-only');
END;

CREATE TRIGGER IF NOT EXISTS raw_identifiers_no_delete
BEFORE DELETE ON raw_identifiers
BEGIN
    SELECT RAISE(ABORT, 'raw_identifiers is append-only');
END;

-- Deduplicated identifiers, rebuilt in full by every dedup pass
CREATE TABLE IF NOT EXISTS canonical_identifiers (
    identifier TEXT PRIMARY KEY,
    domain_part TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    sources TEXT NOT NULL,
    verified INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'unknown',
    notes TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_canonical_domain ON canonical_identifiers(domain_part);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "raw_identifiers", "canonical_identifiers"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_raw_rows_cannot_change() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES ('t', 'h', 'running')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO raw_identifiers (run_id, identifier, local_part, domain_part, source_url,
             source_type, found_at, channel) VALUES (1, 'k.said@univ-x.dz', 'k.said', 'univ-x.dz',
             'https://univ-x.dz/', 'static', '2024-01-01T00:00:00Z', 'body_text')",
            [],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE raw_identifiers SET notes = 'x'", [])
            .is_err());
        assert!(conn.execute("DELETE FROM raw_identifiers", []).is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM raw_identifiers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
