use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS owners (
            id    TEXT PRIMARY KEY,
            name  TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'active'
        );

        CREATE TABLE IF NOT EXISTS items (
            id                    TEXT PRIMARY KEY,
            owner_id              TEXT NOT NULL,
            name                  TEXT NOT NULL DEFAULT '',
            difficulty            TEXT NOT NULL DEFAULT 'average',
            completed_repetitions INTEGER NOT NULL DEFAULT 0,
            foundation_stage      INTEGER NOT NULL DEFAULT 0,
            next_due_date         TEXT,
            interval_days         INTEGER NOT NULL DEFAULT 0,
            last_practice_date    TEXT,
            last_frustration_date TEXT,
            lifecycle             TEXT NOT NULL DEFAULT 'active',
            target_repetitions    INTEGER NOT NULL DEFAULT 0,
            attempts_till_success INTEGER NOT NULL DEFAULT 0,
            tau_calibration       REAL NOT NULL DEFAULT 1.0,
            override_bias         REAL NOT NULL DEFAULT 1.0
        );

        CREATE TABLE IF NOT EXISTS history (
            id                TEXT PRIMARY KEY,
            item_id           TEXT NOT NULL,
            date              TEXT NOT NULL,
            duration          INTEGER NOT NULL DEFAULT 0,
            repetitions       INTEGER NOT NULL DEFAULT 0,
            performance_score REAL NOT NULL DEFAULT 0,
            outcome           TEXT NOT NULL,
            total_failures    INTEGER NOT NULL DEFAULT 0,
            is_deleted        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS overrides (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id        TEXT NOT NULL,
            date           TEXT NOT NULL,
            computed_days  INTEGER NOT NULL,
            requested_days REAL NOT NULL,
            final_days     INTEGER NOT NULL,
            reason         TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id);
        CREATE INDEX IF NOT EXISTS idx_history_item ON history(item_id, date);
        CREATE INDEX IF NOT EXISTS idx_overrides_item ON overrides(item_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
