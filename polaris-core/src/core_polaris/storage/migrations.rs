//! Database migrations for the Polaris state machine
//!
//! Provides versioned migrations for the Polaris schema.
//! Each migration is applied atomically and tracked in the polaris_schema_version table.
//!
//! Per-store queues live in a single schema keyed by `store`; tearing a store
//! down is a bulk delete over that key, not a DROP TABLE.

use crate::core_polaris::errors::PolarisResult;
use rusqlite::{params, Connection};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version for core_polaris
pub const CURRENT_POLARIS_SCHEMA_VERSION: i32 = 2;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Store-spanning tables: versions, epochs, remote links, conflict buffer",
            up_sql: r#"
                -- Schema version tracking for core_polaris
                CREATE TABLE IF NOT EXISTS polaris_schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at INTEGER NOT NULL
                );

                -- Server-issued version of each object
                CREATE TABLE IF NOT EXISTS polaris_central_versions (
                    store INTEGER NOT NULL,
                    oid BLOB NOT NULL,                      -- Oid (16 bytes)
                    tick INTEGER NOT NULL,
                    PRIMARY KEY (store, oid)
                );

                -- Local submission / remote application cursors
                CREATE TABLE IF NOT EXISTS polaris_change_epochs (
                    store INTEGER PRIMARY KEY,
                    local_epoch INTEGER,
                    remote_epoch INTEGER
                );

                -- Parent/name tree as last accepted by the server
                CREATE TABLE IF NOT EXISTS polaris_remote_links (
                    store INTEGER NOT NULL,
                    oid BLOB NOT NULL,
                    parent BLOB NOT NULL,
                    name TEXT NOT NULL,
                    tick INTEGER NOT NULL,
                    PRIMARY KEY (store, oid)
                );

                -- (parent, name) is deliberately not unique
                CREATE INDEX IF NOT EXISTS idx_remote_links_parent
                    ON polaris_remote_links(store, parent, name);

                -- Remote meta changes whose application is deferred
                -- seq is the insertion order
                CREATE TABLE IF NOT EXISTS polaris_buffered_changes (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    store INTEGER NOT NULL,
                    oid BLOB NOT NULL,
                    object_type INTEGER NOT NULL CHECK(object_type IN (0, 1, 2)),
                    merge_boundary INTEGER NOT NULL,
                    UNIQUE (store, oid)
                );

                CREATE INDEX IF NOT EXISTS idx_buffered_changes_boundary
                    ON polaris_buffered_changes(store, merge_boundary);
            "#,
            down_sql: Some(
                r#"
                DROP INDEX IF EXISTS idx_buffered_changes_boundary;
                DROP TABLE IF EXISTS polaris_buffered_changes;
                DROP INDEX IF EXISTS idx_remote_links_parent;
                DROP TABLE IF EXISTS polaris_remote_links;
                DROP TABLE IF EXISTS polaris_change_epochs;
                DROP TABLE IF EXISTS polaris_central_versions;
                DROP TABLE IF EXISTS polaris_schema_version;
            "#,
            ),
        },
        Migration {
            version: 2,
            description: "Per-store queues: local changes, fetch queue, remote content",
            up_sql: r#"
                -- Stores that enabled the protocol
                CREATE TABLE IF NOT EXISTS polaris_stores (
                    store INTEGER PRIMARY KEY,
                    created_at INTEGER NOT NULL
                );

                -- Pending local moves/renames/migrations, in submission order
                CREATE TABLE IF NOT EXISTS polaris_meta_changes (
                    idx INTEGER PRIMARY KEY AUTOINCREMENT,
                    store INTEGER NOT NULL,
                    oid BLOB NOT NULL,
                    new_parent BLOB,
                    new_name TEXT,
                    migrant BLOB
                );

                CREATE INDEX IF NOT EXISTS idx_meta_changes_store
                    ON polaris_meta_changes(store, idx);
                CREATE INDEX IF NOT EXISTS idx_meta_changes_oid
                    ON polaris_meta_changes(store, oid);

                -- At most one pending content change per object
                CREATE TABLE IF NOT EXISTS polaris_content_changes (
                    idx INTEGER PRIMARY KEY AUTOINCREMENT,
                    store INTEGER NOT NULL,
                    oid BLOB NOT NULL,
                    UNIQUE (store, oid)
                );

                CREATE INDEX IF NOT EXISTS idx_content_changes_store
                    ON polaris_content_changes(store, idx);

                -- Objects awaiting content download
                CREATE TABLE IF NOT EXISTS polaris_fetch_queue (
                    idx INTEGER PRIMARY KEY AUTOINCREMENT,
                    store INTEGER NOT NULL,
                    oid BLOB NOT NULL,
                    UNIQUE (store, oid)
                );

                CREATE INDEX IF NOT EXISTS idx_fetch_queue_store
                    ON polaris_fetch_queue(store, idx);

                -- Known but not yet downloaded content versions
                CREATE TABLE IF NOT EXISTS polaris_remote_content (
                    store INTEGER NOT NULL,
                    oid BLOB NOT NULL,
                    did BLOB NOT NULL,                      -- Did (16 bytes)
                    version INTEGER NOT NULL,
                    hash BLOB NOT NULL,
                    length INTEGER NOT NULL,
                    PRIMARY KEY (store, oid, did),
                    UNIQUE (store, oid, version)
                );
            "#,
            down_sql: Some(
                r#"
                DROP TABLE IF EXISTS polaris_remote_content;
                DROP INDEX IF EXISTS idx_fetch_queue_store;
                DROP TABLE IF EXISTS polaris_fetch_queue;
                DROP INDEX IF EXISTS idx_content_changes_store;
                DROP TABLE IF EXISTS polaris_content_changes;
                DROP INDEX IF EXISTS idx_meta_changes_oid;
                DROP INDEX IF EXISTS idx_meta_changes_store;
                DROP TABLE IF EXISTS polaris_meta_changes;
                DROP TABLE IF EXISTS polaris_stores;
            "#,
            ),
        },
    ]
}

/// Get current schema version from database
fn get_current_version(conn: &Connection) -> PolarisResult<i32> {
    // Ensure schema_version table exists
    conn.execute(
        "CREATE TABLE IF NOT EXISTS polaris_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM polaris_schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(conn: &Connection) -> PolarisResult<()> {
    let current_version = get_current_version(conn)?;

    let pending_migrations: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    for migration in pending_migrations {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        tx.execute(
            "INSERT INTO polaris_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied polaris migration"
        );
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}
