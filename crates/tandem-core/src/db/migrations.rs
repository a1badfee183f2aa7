//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: Initial schema
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // Using a transaction for atomicity

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Users table; email doubles as the login identifier
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            created_at INTEGER NOT NULL
        )",
        // Relationships table, keyed for invite-code lookup
        "CREATE TABLE IF NOT EXISTS relationships (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )",
        // Memberships junction table; rowid order is the user A/user B order
        "CREATE TABLE IF NOT EXISTS memberships (
            relationship_id TEXT NOT NULL REFERENCES relationships(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at INTEGER NOT NULL,
            UNIQUE (relationship_id, user_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_memberships_relationship ON memberships(relationship_id)",
        // Vibes table; the composite unique index is the authoritative
        // one-submission-per-user-per-day enforcement
        "CREATE TABLE IF NOT EXISTS vibes (
            id TEXT PRIMARY KEY,
            relationship_id TEXT NOT NULL REFERENCES relationships(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            mood INTEGER NOT NULL,
            note TEXT,
            date TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (relationship_id, user_id, date)
        )",
        "CREATE INDEX IF NOT EXISTS idx_vibes_relationship_date ON vibes(relationship_id, date)",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
