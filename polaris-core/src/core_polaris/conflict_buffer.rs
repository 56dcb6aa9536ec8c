/*
    conflict_buffer.rs - Deferred application of remote meta changes

    Per (store, object) the buffer is either empty or holds exactly one
    change with its merge boundary:

        Unbuffered --insert--> Buffered(type, boundary) --remove--> Unbuffered

    The unique key on (store, oid) turns a second insert for the same object
    into a constraint failure, which is reported as a broken invariant.
    Ready changes come out in `seq` order, i.e. the order they were buffered.
*/

use super::errors::PolarisResult;
use super::types::{ObjectType, Oid, Sidx, Soid};
use crate::metrics::record_counter;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};

/// A buffered change ready for application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferedChange {
    pub oid: Oid,
    pub object_type: ObjectType,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictBuffer;

impl ConflictBuffer {
    pub fn new() -> Self {
        ConflictBuffer
    }

    /// Defer a remote change until the remote cursor reaches `merge_boundary`
    ///
    /// The object must not already be buffered.
    pub fn insert(
        &self,
        tx: &Transaction<'_>,
        sidx: Sidx,
        oid: &Oid,
        object_type: ObjectType,
        merge_boundary: i64,
    ) -> PolarisResult<()> {
        let result = tx.execute(
            "INSERT INTO polaris_buffered_changes (store, oid, object_type, merge_boundary)
             VALUES (?, ?, ?, ?)",
            params![sidx, oid, object_type, merge_boundary],
        );

        match result {
            Ok(inserted) => {
                assert_eq!(inserted, 1, "buffer insert for {}{} affected {} rows", sidx, oid, inserted)
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                panic!("{}{} is already buffered", sidx, oid)
            }
            Err(e) => return Err(e.into()),
        }

        record_counter("polaris.conflict_buffer.buffered", 1);
        tracing::debug!(store = %sidx, oid = %oid, %object_type, merge_boundary, "buffered remote change");
        Ok(())
    }

    /// Clear the buffered change after it was applied; returns whether one existed
    pub fn remove(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_buffered_changes WHERE store = ? AND oid = ?",
            params![sidx, oid],
        )?;

        if deleted > 0 {
            record_counter("polaris.conflict_buffer.applied", 1);
            tracing::debug!(store = %sidx, oid = %oid, "unbuffered remote change");
        }
        Ok(deleted > 0)
    }

    /// Earliest buffered change whose boundary is at or below `until`
    pub fn get_buffered_change(&self, conn: &Connection, sidx: Sidx, until: i64) -> PolarisResult<Option<BufferedChange>> {
        let change = conn
            .query_row(
                "SELECT oid, object_type FROM polaris_buffered_changes
                 WHERE store = ? AND merge_boundary <= ?
                 ORDER BY seq ASC
                 LIMIT 1",
                params![sidx, until],
                |row| {
                    Ok(BufferedChange {
                        oid: row.get(0)?,
                        object_type: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(change)
    }

    /// Whether any change is buffered for the object, regardless of boundary
    pub fn is_buffered(&self, conn: &Connection, soid: &Soid) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_buffered_changes WHERE store = ? AND oid = ?)",
            params![soid.sidx, soid.oid],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn get_merge_boundary(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<Option<i64>> {
        let boundary = conn
            .query_row(
                "SELECT merge_boundary FROM polaris_buffered_changes WHERE store = ? AND oid = ?",
                params![sidx, oid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(boundary)
    }

    /// Apply and clear every change that is ready at `until`, oldest first
    ///
    /// Stops at the first error from `apply`; changes already applied stay
    /// removed within the caller's transaction.
    pub fn drain<F>(&self, tx: &Transaction<'_>, sidx: Sidx, until: i64, mut apply: F) -> PolarisResult<usize>
    where
        F: FnMut(&Transaction<'_>, &BufferedChange) -> PolarisResult<()>,
    {
        let mut applied = 0;
        while let Some(change) = self.get_buffered_change(tx, sidx, until)? {
            apply(tx, &change)?;
            let removed = self.remove(tx, sidx, &change.oid)?;
            assert!(removed, "buffered change for {}{} vanished during apply", sidx, change.oid);
            applied += 1;
        }
        Ok(applied)
    }
}
