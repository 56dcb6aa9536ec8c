/*
    local_change_log.rs - Outgoing local mutations awaiting submission

    Two queues per store:
    - meta changes: append-only, one row per pending move/rename/migration,
      several rows per object allowed, ordered by idx
    - content changes: at most one row per object; re-inserting replaces the
      row and gives it a fresh idx at the back of the queue

    idx comes from AUTOINCREMENT, so it is never reused even after the
    newest row is deleted and a cursor over idx can be resumed safely.
    Each table has one sequence shared by every store: a store's idx values
    increase but are not numbered from 1 or contiguous.
*/

use super::errors::PolarisResult;
use super::types::{Oid, Sidx};
use crate::metrics::record_counter;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

/// A pending local move, rename or cross-store migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaChange {
    pub sidx: Sidx,
    pub idx: i64,
    pub oid: Oid,
    pub new_parent: Option<Oid>,
    pub new_name: Option<String>,
    pub migrant: Option<Oid>,
}

impl MetaChange {
    fn from_row(sidx: Sidx, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MetaChange {
            sidx,
            idx: row.get(0)?,
            oid: row.get(1)?,
            new_parent: row.get(2)?,
            new_name: row.get(3)?,
            migrant: row.get(4)?,
        })
    }
}

/// The latest pending content change of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentChange {
    pub sidx: Sidx,
    pub idx: i64,
    pub oid: Oid,
}

/// Queue of pending meta changes
#[derive(Debug, Default, Clone, Copy)]
pub struct MetaChangeLog;

impl MetaChangeLog {
    pub fn new() -> Self {
        MetaChangeLog
    }

    /// Append a change; returns its idx
    ///
    /// idx is unique across the whole table, not numbered per store.
    pub fn insert_change(
        &self,
        tx: &Transaction<'_>,
        sidx: Sidx,
        oid: &Oid,
        new_parent: Option<&Oid>,
        new_name: Option<&str>,
        migrant: Option<&Oid>,
    ) -> PolarisResult<i64> {
        let idx: Option<i64> = tx
            .query_row(
                "INSERT INTO polaris_meta_changes (store, oid, new_parent, new_name, migrant)
                 VALUES (?, ?, ?, ?, ?)
                 RETURNING idx",
                params![sidx, oid, new_parent, new_name, migrant],
                |row| row.get(0),
            )
            .optional()?;
        let idx = idx.unwrap_or_else(|| panic!("no idx generated for meta change of {}{}", sidx, oid));

        record_counter("polaris.local_changes.inserted", 1);
        tracing::debug!(store = %sidx, oid = %oid, idx, "queued meta change");
        Ok(idx)
    }

    /// Point every pending change of `oid` at `new_parent`
    ///
    /// Used when a folder becomes a store anchor while changes against it are
    /// still queued. Returns the number of rewritten changes.
    pub fn update_changes(
        &self,
        tx: &Transaction<'_>,
        sidx: Sidx,
        oid: &Oid,
        new_parent: &Oid,
    ) -> PolarisResult<usize> {
        let updated = tx.execute(
            "UPDATE polaris_meta_changes SET new_parent = ? WHERE store = ? AND oid = ?",
            params![new_parent, sidx, oid],
        )?;

        tracing::debug!(store = %sidx, oid = %oid, parent = %new_parent, updated, "rewrote meta change parents");
        Ok(updated)
    }

    /// Changes with idx strictly greater than `since`, oldest first
    pub fn get_changes_since(&self, conn: &Connection, sidx: Sidx, since: i64) -> PolarisResult<Vec<MetaChange>> {
        let mut stmt = conn.prepare(
            "SELECT idx, oid, new_parent, new_name, migrant FROM polaris_meta_changes
             WHERE store = ? AND idx > ?
             ORDER BY idx ASC",
        )?;

        let changes = stmt
            .query_map(params![sidx, since], |row| MetaChange::from_row(sidx, row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(changes)
    }

    /// Acknowledge a submitted change
    pub fn delete_change(&self, tx: &Transaction<'_>, sidx: Sidx, idx: i64) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_meta_changes WHERE store = ? AND idx = ?",
            params![sidx, idx],
        )?;
        Ok(deleted > 0)
    }

    /// Drop every pending change of an object
    pub fn delete_changes(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_meta_changes WHERE store = ? AND oid = ?",
            params![sidx, oid],
        )?;

        if deleted > 0 {
            tracing::debug!(store = %sidx, oid = %oid, deleted, "dropped meta changes");
        }
        Ok(deleted > 0)
    }

    pub fn has_changes(&self, conn: &Connection, sidx: Sidx) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_meta_changes WHERE store = ?)",
            params![sidx],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn has_object_changes(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_meta_changes WHERE store = ? AND oid = ?)",
            params![sidx, oid],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

/// Queue of pending content changes, one per object
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentChangeLog;

impl ContentChangeLog {
    pub fn new() -> Self {
        ContentChangeLog
    }

    /// Queue (or re-queue) a content change; returns its fresh idx
    ///
    /// idx is unique across the whole table, not numbered per store.
    pub fn insert_change(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<i64> {
        let idx: Option<i64> = tx
            .query_row(
                "INSERT OR REPLACE INTO polaris_content_changes (store, oid) VALUES (?, ?)
                 RETURNING idx",
                params![sidx, oid],
                |row| row.get(0),
            )
            .optional()?;
        let idx = idx.unwrap_or_else(|| panic!("no idx generated for content change of {}{}", sidx, oid));

        record_counter("polaris.content_changes.inserted", 1);
        tracing::debug!(store = %sidx, oid = %oid, idx, "queued content change");
        Ok(idx)
    }

    /// Drop the object's pending content change, whatever its idx
    pub fn delete_change(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_content_changes WHERE store = ? AND oid = ?",
            params![sidx, oid],
        )?;
        Ok(deleted > 0)
    }

    /// Acknowledge the submitted change at `idx`
    ///
    /// If the object was modified again after submission its row carries a
    /// newer idx and survives.
    pub fn delete_change_at(&self, tx: &Transaction<'_>, sidx: Sidx, idx: i64) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_content_changes WHERE store = ? AND idx = ?",
            params![sidx, idx],
        )?;
        Ok(deleted > 0)
    }

    pub fn has_change(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_content_changes WHERE store = ? AND oid = ?)",
            params![sidx, oid],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// All pending content changes, oldest first
    pub fn get_changes(&self, conn: &Connection, sidx: Sidx) -> PolarisResult<Vec<ContentChange>> {
        self.get_changes_since(conn, sidx, 0)
    }

    /// Content changes with idx strictly greater than `since`, oldest first
    pub fn get_changes_since(&self, conn: &Connection, sidx: Sidx, since: i64) -> PolarisResult<Vec<ContentChange>> {
        let mut stmt = conn.prepare(
            "SELECT idx, oid FROM polaris_content_changes
             WHERE store = ? AND idx > ?
             ORDER BY idx ASC",
        )?;

        let changes = stmt
            .query_map(params![sidx, since], |row| {
                Ok(ContentChange {
                    sidx,
                    idx: row.get(0)?,
                    oid: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(changes)
    }
}
