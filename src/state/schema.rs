//! SQLite schema for the healthwatch store.

/// Current schema version, recorded in `schema_version` on open.
pub const SCHEMA_VERSION: i64 = 1;

/// Initial table set.
///
/// `monitors` is the heartbeat registry: one row per watched identity,
/// present iff the monitor has pinged and has not been declared dead.
/// `outbox` is the append-only alert queue; ids are AUTOINCREMENT so
/// they stay monotonic even across deletes, which the scoped
/// destructive read relies on.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS monitors (
    id            TEXT PRIMARY KEY,
    last_ping     INTEGER NOT NULL,
    timeout_hours REAL NOT NULL DEFAULT 13.0,
    alert_subject TEXT,
    alert_body    TEXT
);

CREATE TABLE IF NOT EXISTS outbox (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    subject    TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;
