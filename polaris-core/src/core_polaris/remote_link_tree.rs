//! Parent/name tree as last accepted by the server
//!
//! Lags behind unsubmitted local changes and may run ahead of the local tree
//! while received remote changes sit in the conflict buffer. `(parent, name)`
//! is not unique: concurrent renames can collide until the server resolves
//! them, and the higher tick wins.

use super::errors::PolarisResult;
use super::types::{Oid, Sidx};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

/// Server-accepted location of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLink {
    pub parent: Oid,
    pub name: String,
    pub tick: i64,
}

/// Child entry returned by `get_children`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChild {
    pub oid: Oid,
    pub name: String,
    pub tick: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteLinkTree;

impl RemoteLinkTree {
    pub fn new() -> Self {
        RemoteLinkTree
    }

    pub fn get_parent(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<Option<RemoteLink>> {
        let link = conn
            .query_row(
                "SELECT parent, name, tick FROM polaris_remote_links WHERE store = ? AND oid = ?",
                params![sidx, oid],
                |row| {
                    Ok(RemoteLink {
                        parent: row.get(0)?,
                        name: row.get(1)?,
                        tick: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(link)
    }

    /// Children of `parent`, ordered by name then object
    pub fn get_children(&self, conn: &Connection, sidx: Sidx, parent: &Oid) -> PolarisResult<Vec<RemoteChild>> {
        let mut stmt = conn.prepare(
            "SELECT oid, name, tick FROM polaris_remote_links
             WHERE store = ? AND parent = ?
             ORDER BY name ASC, oid ASC",
        )?;

        let children = stmt
            .query_map(params![sidx, parent], |row| {
                Ok(RemoteChild {
                    oid: row.get(0)?,
                    name: row.get(1)?,
                    tick: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(children)
    }

    /// Record the first accepted location of an object
    pub fn insert_parent(
        &self,
        tx: &Transaction<'_>,
        sidx: Sidx,
        oid: &Oid,
        parent: &Oid,
        name: &str,
        tick: i64,
    ) -> PolarisResult<()> {
        let inserted = tx.execute(
            "INSERT INTO polaris_remote_links (store, oid, parent, name, tick) VALUES (?, ?, ?, ?, ?)",
            params![sidx, oid, parent, name, tick],
        )?;
        assert_eq!(inserted, 1, "remote link insert for {}{} affected {} rows", sidx, oid, inserted);

        tracing::trace!(store = %sidx, oid = %oid, parent = %parent, name, tick, "inserted remote link");
        Ok(())
    }

    /// Move/rename an object whose link is known to exist
    pub fn update_parent(
        &self,
        tx: &Transaction<'_>,
        sidx: Sidx,
        oid: &Oid,
        parent: &Oid,
        name: &str,
        tick: i64,
    ) -> PolarisResult<()> {
        let updated = tx.execute(
            "UPDATE polaris_remote_links SET parent = ?, name = ?, tick = ? WHERE store = ? AND oid = ?",
            params![parent, name, tick, sidx, oid],
        )?;
        assert_eq!(updated, 1, "remote link update for {}{} affected {} rows", sidx, oid, updated);

        tracing::trace!(store = %sidx, oid = %oid, parent = %parent, name, tick, "updated remote link");
        Ok(())
    }

    pub fn remove_parent(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<()> {
        let deleted = tx.execute(
            "DELETE FROM polaris_remote_links WHERE store = ? AND oid = ?",
            params![sidx, oid],
        )?;
        assert_eq!(deleted, 1, "remote link delete for {}{} affected {} rows", sidx, oid, deleted);

        tracing::trace!(store = %sidx, oid = %oid, "removed remote link");
        Ok(())
    }
}
