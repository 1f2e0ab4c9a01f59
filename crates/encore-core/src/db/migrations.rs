//! Database migrations

use crate::error::Result;
use rusqlite::{params, Connection};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate(conn, 1, V1_STATEMENTS)?;
    }
    if version < 2 {
        migrate(conn, 2, V2_STATEMENTS)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Version 1: events with derived conflict columns
const V1_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        kind TEXT NOT NULL CHECK (kind IN ('booking', 'enquiry')),
        client_name TEXT,
        event_date TEXT,
        start_time TEXT,
        end_time TEXT,
        venue_name TEXT,
        venue_address TEXT,
        travel_minutes INTEGER,
        distance_miles REAL,
        status TEXT NOT NULL,
        has_conflicts INTEGER NOT NULL DEFAULT 0,
        conflict_count INTEGER NOT NULL DEFAULT 0,
        conflict_details TEXT NOT NULL DEFAULT '[]',
        conflicts_resolved INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_events_owner ON events(owner_id, kind, id)",
    "CREATE INDEX IF NOT EXISTS idx_events_owner_date ON events(owner_id, event_date)",
];

/// Version 2: resolution ledger, unique per owner and member set
const V2_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS conflict_resolutions (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        group_key TEXT NOT NULL,
        conflict_date TEXT NOT NULL,
        resolved_at INTEGER NOT NULL,
        resolved_by TEXT NOT NULL,
        resolution_type TEXT NOT NULL,
        notes TEXT,
        expires_at INTEGER,
        UNIQUE (owner_id, group_key)
    )",
    "CREATE TABLE IF NOT EXISTS conflict_resolution_members (
        resolution_id TEXT NOT NULL REFERENCES conflict_resolutions(id) ON DELETE CASCADE,
        owner_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        event_id INTEGER NOT NULL,
        PRIMARY KEY (resolution_id, kind, event_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_resolution_members_event
        ON conflict_resolution_members(owner_id, kind, event_id)",
];

/// Apply one version's statements atomically
fn migrate(conn: &mut Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.transaction()?;
    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        params![version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version} of {CURRENT_VERSION}");
    Ok(())
}
