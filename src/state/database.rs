//! Healthwatch Database
//!
//! SQLite-backed store for the monitor registry and the alert outbox.
//! Uses rusqlite for synchronous, single-process access; independent
//! pollers on other hosts coordinate through the HTTP surface, never
//! through shared memory, so store transactions are the only mutual
//! exclusion that matters.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

use crate::types::{Monitor, OutboxEntry, DEFAULT_TIMEOUT_HOURS};

use super::schema::{CREATE_TABLES, SCHEMA_VERSION};

/// A fully synthesized alert for one expired monitor, ready to be
/// committed by the sweep batch.
#[derive(Clone, Debug)]
pub struct ResolvedAlert {
    pub monitor_id: String,
    pub subject: String,
    pub body: String,
}

/// The healthwatch SQLite database handle.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `db_path`, initialize the
    /// schema, and return the handle.
    pub fn open(db_path: &str) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create db directory: {}", parent.display()))?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database: {db_path}"))?;

        // WAL mode: the ping handlers and the sweep share this file
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute_batch(CREATE_TABLES)
            .context("failed to create tables")?;

        let current_version: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < SCHEMA_VERSION {
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                params![SCHEMA_VERSION],
            )
            .context("failed to update schema version")?;
        }

        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)
            .context("failed to create tables")?;
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            params![SCHEMA_VERSION],
        )?;
        Ok(Self { conn })
    }

    // ─── Monitor Registry ────────────────────────────────────────

    /// Record a heartbeat: idempotent upsert with full overwrite.
    ///
    /// An unknown `id` inserts a new row; a known one has `last_ping`
    /// and every optional field overwritten with the values from this
    /// call. An omitted timeout reverts to the default and omitted
    /// overrides revert to none, so callers must resend overrides on
    /// every ping if they are to persist. The deadline is reset
    /// unconditionally, even if the new timeout is already elapsed.
    pub fn record_heartbeat(
        &self,
        id: &str,
        now: i64,
        timeout_hours: Option<f64>,
        alert_subject: Option<&str>,
        alert_body: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO monitors (id, last_ping, timeout_hours, alert_subject, alert_body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                now,
                timeout_hours.unwrap_or(DEFAULT_TIMEOUT_HOURS),
                alert_subject,
                alert_body,
            ],
        )?;
        Ok(())
    }

    pub fn get_monitor(&self, id: &str) -> Result<Option<Monitor>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, last_ping, timeout_hours, alert_subject, alert_body
                 FROM monitors WHERE id = ?1",
                params![id],
                Self::row_to_monitor,
            )
            .optional()?;
        Ok(result)
    }

    pub fn list_monitors(&self) -> Result<Vec<Monitor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, last_ping, timeout_hours, alert_subject, alert_body
             FROM monitors ORDER BY id ASC",
        )?;
        let monitors = stmt
            .query_map([], Self::row_to_monitor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(monitors)
    }

    /// Delete a monitor outright. Returns whether a row existed.
    pub fn remove_monitor(&self, id: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM monitors WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// Push a monitor's `last_ping` `hours` into the future, extending
    /// its expected death by that much. This is the management-layer
    /// pause: the core itself has no paused state.
    pub fn pause_monitor(&self, id: &str, hours: f64, now: i64) -> Result<bool> {
        let future = now + (hours * 3600.0) as i64;
        let n = self.conn.execute(
            "UPDATE monitors SET last_ping = ?1 WHERE id = ?2",
            params![future, id],
        )?;
        Ok(n > 0)
    }

    /// Every monitor silent past its timeout at `now`. The same `now`
    /// snapshot is applied to every row, so a sweep pass is
    /// deterministic and reproducible in tests. Boundary equality is
    /// not expired.
    pub fn find_expired(&self, now: i64) -> Result<Vec<Monitor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, last_ping, timeout_hours, alert_subject, alert_body
             FROM monitors
             WHERE (?1 - last_ping) > timeout_hours * 3600.0
             ORDER BY id ASC",
        )?;
        let monitors = stmt
            .query_map(params![now], Self::row_to_monitor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(monitors)
    }

    // ─── Sweep batch ─────────────────────────────────────────────

    /// Commit one sweep pass: enqueue every resolved alert and delete
    /// its monitor row, all in a single transaction. Either the whole
    /// batch lands or none of it does; a partial application would
    /// either double-alert or silently drop an alert on retry.
    pub fn expire_monitors(&mut self, alerts: &[ResolvedAlert]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for alert in alerts {
            tx.execute(
                "INSERT INTO outbox (subject, body) VALUES (?1, ?2)",
                params![alert.subject, alert.body],
            )?;
            tx.execute(
                "DELETE FROM monitors WHERE id = ?1",
                params![alert.monitor_id],
            )?;
        }
        tx.commit().context("failed to commit sweep batch")?;
        Ok(())
    }

    // ─── Alert Outbox ────────────────────────────────────────────

    /// Return every queued alert, store unchanged.
    pub fn peek_outbox(&self) -> Result<Vec<OutboxEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, subject, body FROM outbox ORDER BY id ASC")?;
        let entries = stmt
            .query_map([], |row| {
                Ok(OutboxEntry {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    body: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn outbox_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Scoped destructive read: delete only entries a poller has
    /// already seen (`id <= max_id`). An entry enqueued between that
    /// poller's peek and its clear has a higher id and survives.
    pub fn clear_outbox_through(&self, max_id: i64) -> Result<usize> {
        let n = self
            .conn
            .execute("DELETE FROM outbox WHERE id <= ?1", params![max_id])?;
        Ok(n)
    }

    /// Unconditional truncate, kept for pollers that do not scope
    /// their clears. Can drop an alert enqueued in the peek/clear race
    /// window; the bundled poller always scopes instead.
    pub fn clear_outbox_all(&self) -> Result<usize> {
        let n = self.conn.execute("DELETE FROM outbox", [])?;
        Ok(n)
    }

    // ─── Row mapping (private) ───────────────────────────────────

    fn row_to_monitor(row: &rusqlite::Row<'_>) -> rusqlite::Result<Monitor> {
        Ok(Monitor {
            id: row.get(0)?,
            last_ping: row.get(1)?,
            timeout_hours: row.get(2)?,
            alert_subject: row.get(3)?,
            alert_body: row.get(4)?,
        })
    }
}
