//! Per-store change-log cursors
//!
//! Every store owns exactly one epoch row, provisioned when the store is
//! created. A missing row is a provisioning bug and panics; a NULL epoch
//! inside an existing row is a legitimate "nothing yet" and reads as None.

use super::errors::PolarisResult;
use super::types::Sidx;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

/// Local submission and remote application cursors per store
#[derive(Debug, Default, Clone, Copy)]
pub struct EpochTracker;

impl EpochTracker {
    pub fn new() -> Self {
        EpochTracker
    }

    /// Insert the store's epoch row with both cursors unset
    pub fn provision(&self, tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<()> {
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO polaris_change_epochs (store, local_epoch, remote_epoch)
             VALUES (?, NULL, NULL)",
            params![sidx],
        )?;
        if inserted > 0 {
            tracing::debug!(store = %sidx, "provisioned change epochs");
        }
        Ok(())
    }

    /// Drop the store's epoch row; returns whether it existed
    pub fn deprovision(&self, tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<bool> {
        let deleted = tx.execute("DELETE FROM polaris_change_epochs WHERE store = ?", params![sidx])?;
        Ok(deleted > 0)
    }

    /// Local change epoch
    pub fn get_change_epoch(&self, conn: &Connection, sidx: Sidx) -> PolarisResult<Option<i64>> {
        self.read_epoch(conn, sidx, "SELECT local_epoch FROM polaris_change_epochs WHERE store = ?")
    }

    /// Remote change epoch
    pub fn get_remote_change_epoch(&self, conn: &Connection, sidx: Sidx) -> PolarisResult<Option<i64>> {
        self.read_epoch(conn, sidx, "SELECT remote_epoch FROM polaris_change_epochs WHERE store = ?")
    }

    pub fn set_change_epoch(&self, tx: &Transaction<'_>, sidx: Sidx, epoch: i64) -> PolarisResult<()> {
        let updated = tx.execute(
            "UPDATE polaris_change_epochs SET local_epoch = ? WHERE store = ?",
            params![epoch, sidx],
        )?;
        assert_eq!(updated, 1, "local epoch update for store {} affected {} rows", sidx, updated);

        tracing::trace!(store = %sidx, epoch, "set local change epoch");
        Ok(())
    }

    pub fn set_remote_change_epoch(&self, tx: &Transaction<'_>, sidx: Sidx, epoch: i64) -> PolarisResult<()> {
        let updated = tx.execute(
            "UPDATE polaris_change_epochs SET remote_epoch = ? WHERE store = ?",
            params![epoch, sidx],
        )?;
        assert_eq!(updated, 1, "remote epoch update for store {} affected {} rows", sidx, updated);

        tracing::trace!(store = %sidx, epoch, "set remote change epoch");
        Ok(())
    }

    fn read_epoch(&self, conn: &Connection, sidx: Sidx, sql: &str) -> PolarisResult<Option<i64>> {
        let row: Option<Option<i64>> = conn
            .query_row(sql, params![sidx], |row| row.get(0))
            .optional()?;

        match row {
            Some(epoch) => Ok(epoch),
            None => panic!("change epoch row missing for store {}", sidx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestDatabase;

    #[test]
    fn test_provisioned_store_has_no_epochs() {
        let mut db = TestDatabase::new();
        let epochs = EpochTracker::new();

        let tx = db.transaction();
        epochs.provision(&tx, Sidx(1)).unwrap();

        assert_eq!(epochs.get_change_epoch(&tx, Sidx(1)).unwrap(), None);
        assert_eq!(epochs.get_remote_change_epoch(&tx, Sidx(1)).unwrap(), None);
    }

    #[test]
    fn test_cursors_are_independent() {
        let mut db = TestDatabase::new();
        let epochs = EpochTracker::new();

        let tx = db.transaction();
        epochs.provision(&tx, Sidx(1)).unwrap();
        epochs.set_change_epoch(&tx, Sidx(1), 12).unwrap();

        assert_eq!(epochs.get_change_epoch(&tx, Sidx(1)).unwrap(), Some(12));
        assert_eq!(epochs.get_remote_change_epoch(&tx, Sidx(1)).unwrap(), None);

        epochs.set_remote_change_epoch(&tx, Sidx(1), 40).unwrap();
        assert_eq!(epochs.get_change_epoch(&tx, Sidx(1)).unwrap(), Some(12));
        assert_eq!(epochs.get_remote_change_epoch(&tx, Sidx(1)).unwrap(), Some(40));
    }

    #[test]
    fn test_provision_is_idempotent() {
        let mut db = TestDatabase::new();
        let epochs = EpochTracker::new();

        let tx = db.transaction();
        epochs.provision(&tx, Sidx(2)).unwrap();
        epochs.set_change_epoch(&tx, Sidx(2), 5).unwrap();
        epochs.provision(&tx, Sidx(2)).unwrap();

        assert_eq!(epochs.get_change_epoch(&tx, Sidx(2)).unwrap(), Some(5));
    }

    #[test]
    #[should_panic(expected = "change epoch row missing")]
    fn test_missing_row_panics() {
        let db = TestDatabase::new();
        let _ = EpochTracker::new().get_change_epoch(db.conn(), Sidx(9));
    }

    #[test]
    #[should_panic(expected = "affected 0 rows")]
    fn test_set_without_row_panics() {
        let mut db = TestDatabase::new();
        let tx = db.transaction();
        let _ = EpochTracker::new().set_remote_change_epoch(&tx, Sidx(9), 1);
    }

    #[test]
    fn test_deprovision() {
        let mut db = TestDatabase::new();
        let epochs = EpochTracker::new();

        let tx = db.transaction();
        epochs.provision(&tx, Sidx(3)).unwrap();
        assert!(epochs.deprovision(&tx, Sidx(3)).unwrap());
        assert!(!epochs.deprovision(&tx, Sidx(3)).unwrap());
    }
}
