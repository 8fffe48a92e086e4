//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CanonicalRecord, RawRecord, RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection, for tests that need to tamper with the schema
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
    })
}

fn raw_from_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        run_id: row.get(0)?,
        identifier: row.get(1)?,
        local_part: row.get(2)?,
        domain_part: row.get(3)?,
        source_url: row.get(4)?,
        source_type: row.get(5)?,
        page_title: row.get(6)?,
        context_snippet: row.get(7)?,
        http_status: row.get(8)?,
        found_at: row.get(9)?,
        channel: row.get(10)?,
        notes: row.get(11)?,
    })
}

fn canonical_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalRecord> {
    Ok(CanonicalRecord {
        identifier: row.get(0)?,
        domain_part: row.get(1)?,
        first_seen: row.get(2)?,
        sources: CanonicalRecord::split_sources(&row.get::<_, String>(3)?),
        verified: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn counts(conn: &Connection, sql: &str, limit: Option<usize>) -> StorageResult<Vec<(String, u64)>> {
    let mut stmt = conn.prepare(sql)?;
    let limit = limit.map_or(-1, |l| l as i64);
    let rows = stmt.query_map(params![limit], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Raw Log =====

    fn append_raw(&mut self, records: &[RawRecord]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_identifiers (run_id, identifier, local_part, domain_part,
                 source_url, source_type, page_title, context_snippet, http_status, found_at,
                 channel, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.run_id,
                    record.identifier,
                    record.local_part,
                    record.domain_part,
                    record.source_url,
                    record.source_type,
                    record.page_title,
                    record.context_snippet,
                    record.http_status,
                    record.found_at,
                    record.channel,
                    record.notes,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn load_raw(&self) -> StorageResult<Vec<RawRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, identifier, local_part, domain_part, source_url, source_type,
             page_title, context_snippet, http_status, found_at, channel, notes
             FROM raw_identifiers ORDER BY id",
        )?;
        let rows = stmt.query_map([], raw_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_raw(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM raw_identifiers", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_raw_by_channel(&self) -> StorageResult<Vec<(String, u64)>> {
        counts(
            &self.conn,
            "SELECT channel, COUNT(*) AS n FROM raw_identifiers
             GROUP BY channel ORDER BY n DESC, channel LIMIT ?1",
            None,
        )
    }

    // ===== Canonical Table =====

    fn replace_canonical(&mut self, records: &[CanonicalRecord]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM canonical_identifiers", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO canonical_identifiers
                 (identifier, domain_part, first_seen, sources, verified, status, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.identifier,
                    record.domain_part,
                    record.first_seen,
                    record.joined_sources(),
                    record.verified,
                    record.status,
                    record.notes,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_canonical(&self) -> StorageResult<Vec<CanonicalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier, domain_part, first_seen, sources, verified, status, notes
             FROM canonical_identifiers ORDER BY identifier",
        )?;
        let rows = stmt.query_map([], canonical_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_canonical(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM canonical_identifiers", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    fn top_domains(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        counts(
            &self.conn,
            "SELECT domain_part, COUNT(*) AS n FROM canonical_identifiers
             GROUP BY domain_part ORDER BY n DESC, domain_part LIMIT ?1",
            Some(limit),
        )
    }
}
