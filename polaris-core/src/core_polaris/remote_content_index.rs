/*
    remote_content_index.rs - Known but not yet downloaded content versions

    One row per (store, object, device): the newest version that device is
    known to have produced. Versions are also unique per object, so a single
    INSERT OR REPLACE evicts whichever row held either the device slot or
    the version number before inserting the new one.

    Callers only record versions above what the local object already has;
    once content is downloaded, `delete_up_to_version` prunes the superseded
    rows.
*/

use super::errors::PolarisResult;
use super::types::{ContentHash, Did, Oid, Sidx};
use crate::metrics::record_counter;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

/// A pending content version advertised by one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContent {
    pub did: Did,
    pub version: i64,
    pub hash: ContentHash,
    pub length: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteContentIndex;

impl RemoteContentIndex {
    pub fn new() -> Self {
        RemoteContentIndex
    }

    /// Record `version` as the device's latest known version of the object
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &self,
        tx: &Transaction<'_>,
        sidx: Sidx,
        oid: &Oid,
        version: i64,
        did: &Did,
        hash: &ContentHash,
        length: i64,
    ) -> PolarisResult<()> {
        let inserted = tx.execute(
            "INSERT OR REPLACE INTO polaris_remote_content (store, oid, did, version, hash, length)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![sidx, oid, did, version, hash, length],
        )?;
        assert!(inserted >= 1, "remote content insert for {}{} affected no rows", sidx, oid);

        record_counter("polaris.remote_content.inserted", 1);
        tracing::debug!(store = %sidx, oid = %oid, did = %did, version, length, "recorded remote content");
        Ok(())
    }

    /// Delete rows with version strictly below `version`; returns whether any went
    pub fn delete_up_to_version(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid, version: i64) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_remote_content WHERE store = ? AND oid = ? AND version < ?",
            params![sidx, oid, version],
        )?;

        if deleted > 0 {
            tracing::debug!(store = %sidx, oid = %oid, version, deleted, "pruned remote content");
        }
        Ok(deleted > 0)
    }

    /// Whether exactly `version` is recorded
    pub fn has_remote_change(&self, conn: &Connection, sidx: Sidx, oid: &Oid, version: i64) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_remote_content WHERE store = ? AND oid = ? AND version = ?)",
            params![sidx, oid, version],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Whether anything newer than `version` is recorded
    pub fn has_remote_changes(&self, conn: &Connection, sidx: Sidx, oid: &Oid, version: i64) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_remote_content WHERE store = ? AND oid = ? AND version > ?)",
            params![sidx, oid, version],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Device holding the lowest pending version
    pub fn get_originator(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<Option<Did>> {
        let did = conn
            .query_row(
                "SELECT did FROM polaris_remote_content
                 WHERE store = ? AND oid = ?
                 ORDER BY version ASC
                 LIMIT 1",
                params![sidx, oid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(did)
    }

    pub fn get_max_version(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<Option<i64>> {
        let version = conn.query_row(
            "SELECT MAX(version) FROM polaris_remote_content WHERE store = ? AND oid = ?",
            params![sidx, oid],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Every pending version of the object, lowest first
    pub fn get_remote_changes(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<Vec<RemoteContent>> {
        let mut stmt = conn.prepare(
            "SELECT did, version, hash, length FROM polaris_remote_content
             WHERE store = ? AND oid = ?
             ORDER BY version ASC",
        )?;

        let rows = stmt
            .query_map(params![sidx, oid], |row| {
                Ok(RemoteContent {
                    did: row.get(0)?,
                    version: row.get(1)?,
                    hash: row.get(2)?,
                    length: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
