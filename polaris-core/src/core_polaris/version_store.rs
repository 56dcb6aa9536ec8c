//! Central version ledger
//!
//! One server-issued tick per object. `set` is update-then-insert rather than
//! a single upsert statement, so it relies on the daemon serializing writers.

use super::errors::PolarisResult;
use super::types::{Oid, Sidx};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

/// Tick per (store, object) as last issued by the server
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionStore;

impl VersionStore {
    pub fn new() -> Self {
        VersionStore
    }

    /// Stored tick, or None if no version was ever recorded
    pub fn get(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<Option<i64>> {
        let tick = conn
            .query_row(
                "SELECT tick FROM polaris_central_versions WHERE store = ? AND oid = ?",
                params![sidx, oid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(tick)
    }

    /// Record `tick` as the object's central version
    pub fn set(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid, tick: i64) -> PolarisResult<()> {
        let updated = tx.execute(
            "UPDATE polaris_central_versions SET tick = ? WHERE store = ? AND oid = ?",
            params![tick, sidx, oid],
        )?;

        if updated == 0 {
            let inserted = tx.execute(
                "INSERT INTO polaris_central_versions (store, oid, tick) VALUES (?, ?, ?)",
                params![sidx, oid, tick],
            )?;
            assert_eq!(inserted, 1, "central version insert for {}{} affected {} rows", sidx, oid, inserted);
        }

        tracing::trace!(store = %sidx, oid = %oid, tick, "set central version");
        Ok(())
    }

    /// Forget the object's central version; returns whether a row existed
    pub fn delete(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_central_versions WHERE store = ? AND oid = ?",
            params![sidx, oid],
        )?;
        Ok(deleted > 0)
    }
}
