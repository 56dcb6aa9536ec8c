//! Objects awaiting content download
//!
//! Insertion is idempotent per object: an object already queued keeps its
//! position. Download workers resume from the last idx they handled.

use super::errors::PolarisResult;
use super::types::{Oid, Sidx};
use crate::metrics::record_counter;
use rusqlite::{params, Connection, Transaction};

/// A queued object and its position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchEntry {
    pub oid: Oid,
    pub idx: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FetchQueue;

impl FetchQueue {
    pub fn new() -> Self {
        FetchQueue
    }

    /// Queue the object; returns false if it was already queued
    pub fn insert(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO polaris_fetch_queue (store, oid) VALUES (?, ?)",
            params![sidx, oid],
        )?;

        if inserted > 0 {
            record_counter("polaris.fetch_queue.enqueued", 1);
            tracing::debug!(store = %sidx, oid = %oid, "queued for fetch");
        }
        Ok(inserted > 0)
    }

    pub fn remove(&self, tx: &Transaction<'_>, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let deleted = tx.execute(
            "DELETE FROM polaris_fetch_queue WHERE store = ? AND oid = ?",
            params![sidx, oid],
        )?;

        if deleted > 0 {
            record_counter("polaris.fetch_queue.dequeued", 1);
        }
        Ok(deleted > 0)
    }

    pub fn contains(&self, conn: &Connection, sidx: Sidx, oid: &Oid) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_fetch_queue WHERE store = ? AND oid = ?)",
            params![sidx, oid],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Entries with idx strictly greater than `from`, in queue order
    pub fn list(&self, conn: &Connection, sidx: Sidx, from: i64) -> PolarisResult<Vec<FetchEntry>> {
        let mut stmt = conn.prepare(
            "SELECT oid, idx FROM polaris_fetch_queue
             WHERE store = ? AND idx > ?
             ORDER BY idx ASC",
        )?;

        let entries = stmt
            .query_map(params![sidx, from], |row| {
                Ok(FetchEntry {
                    oid: row.get(0)?,
                    idx: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_oid, TestDatabase};

    const S: Sidx = Sidx(1);

    #[test]
    fn test_insert_is_idempotent() {
        let mut db = TestDatabase::new();
        let queue = FetchQueue::new();
        let (o1, o2) = (test_oid(1), test_oid(2));

        let tx = db.transaction();
        assert!(queue.insert(&tx, S, &o1).unwrap());
        assert!(queue.insert(&tx, S, &o2).unwrap());
        assert!(!queue.insert(&tx, S, &o1).unwrap());

        let order: Vec<_> = queue.list(&tx, S, 0).unwrap().into_iter().map(|e| e.oid).collect();
        assert_eq!(order, vec![o1, o2]);
    }

    #[test]
    fn test_list_resumes_from_watermark() {
        let mut db = TestDatabase::new();
        let queue = FetchQueue::new();

        let tx = db.transaction();
        for n in 1..=4 {
            queue.insert(&tx, S, &test_oid(n)).unwrap();
        }

        let all = queue.list(&tx, S, 0).unwrap();
        let rest = queue.list(&tx, S, all[1].idx).unwrap();
        assert_eq!(rest, all[2..].to_vec());
        assert!(queue.list(&tx, S, all[3].idx).unwrap().is_empty());
    }

    #[test]
    fn test_remove() {
        let mut db = TestDatabase::new();
        let queue = FetchQueue::new();
        let o = test_oid(1);

        let tx = db.transaction();
        assert!(!queue.remove(&tx, S, &o).unwrap());
        queue.insert(&tx, S, &o).unwrap();
        assert!(queue.contains(&tx, S, &o).unwrap());
        assert!(queue.remove(&tx, S, &o).unwrap());
        assert!(!queue.contains(&tx, S, &o).unwrap());
    }

    #[test]
    fn test_reinsert_after_remove_goes_to_back() {
        let mut db = TestDatabase::new();
        let queue = FetchQueue::new();
        let (o1, o2) = (test_oid(1), test_oid(2));

        let tx = db.transaction();
        queue.insert(&tx, S, &o1).unwrap();
        queue.insert(&tx, S, &o2).unwrap();
        queue.remove(&tx, S, &o1).unwrap();
        queue.insert(&tx, S, &o1).unwrap();

        let order: Vec<_> = queue.list(&tx, S, 0).unwrap().into_iter().map(|e| e.oid).collect();
        assert_eq!(order, vec![o2, o1]);
    }
}
