//! Store creation and deletion hooks
//!
//! The store lifecycle manager owns an ordered list of listeners and calls
//! them synchronously, in registration order, inside the transaction of the
//! triggering event. Per-store rows share one schema keyed by `store`, so
//! creating a store only provisions rows and deleting one is a bulk delete
//! per table. Deleting a store that never enabled the protocol, or deleting
//! it twice, deletes nothing and succeeds.

use super::conflict_buffer::ConflictBuffer;
use super::epoch_tracker::EpochTracker;
use super::errors::PolarisResult;
use super::fetch_queue::FetchQueue;
use super::local_change_log::{ContentChangeLog, MetaChangeLog};
use super::remote_content_index::RemoteContentIndex;
use super::remote_link_tree::RemoteLinkTree;
use super::types::Sidx;
use super::version_store::VersionStore;
use crate::metrics::{record_counter, Timer};
use rusqlite::{params, Connection, Transaction};
use std::time::{SystemTime, UNIX_EPOCH};

/// Receives store lifecycle events under the caller's transaction
pub trait StoreLifecycleListener: Send + Sync {
    fn on_store_created(&self, tx: &Transaction<'_>, sidx: Sidx, protocol_enabled: bool) -> PolarisResult<()>;

    fn on_store_deleted(&self, tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<()>;
}

/// Records which stores enabled the protocol
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreRegistry;

impl StoreRegistry {
    pub fn new() -> Self {
        StoreRegistry
    }

    pub fn is_provisioned(&self, conn: &Connection, sidx: Sidx) -> PolarisResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM polaris_stores WHERE store = ?)",
            params![sidx],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl StoreLifecycleListener for StoreRegistry {
    fn on_store_created(&self, tx: &Transaction<'_>, sidx: Sidx, protocol_enabled: bool) -> PolarisResult<()> {
        if !protocol_enabled {
            return Ok(());
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        tx.execute(
            "INSERT OR IGNORE INTO polaris_stores (store, created_at) VALUES (?, ?)",
            params![sidx, now],
        )?;
        Ok(())
    }

    fn on_store_deleted(&self, tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<()> {
        purge_store(tx, "polaris_stores", sidx)
    }
}

impl StoreLifecycleListener for EpochTracker {
    fn on_store_created(&self, tx: &Transaction<'_>, sidx: Sidx, _protocol_enabled: bool) -> PolarisResult<()> {
        self.provision(tx, sidx)
    }

    fn on_store_deleted(&self, tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<()> {
        self.deprovision(tx, sidx)?;
        Ok(())
    }
}

/// Listener that only cares about deletion of its table's rows
macro_rules! purge_on_delete {
    ($component:ty, $table:literal) => {
        impl StoreLifecycleListener for $component {
            fn on_store_created(&self, _tx: &Transaction<'_>, _sidx: Sidx, _protocol_enabled: bool) -> PolarisResult<()> {
                Ok(())
            }

            fn on_store_deleted(&self, tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<()> {
                purge_store(tx, $table, sidx)
            }
        }
    };
}

purge_on_delete!(MetaChangeLog, "polaris_meta_changes");
purge_on_delete!(ContentChangeLog, "polaris_content_changes");
purge_on_delete!(FetchQueue, "polaris_fetch_queue");
purge_on_delete!(RemoteContentIndex, "polaris_remote_content");
purge_on_delete!(VersionStore, "polaris_central_versions");
purge_on_delete!(RemoteLinkTree, "polaris_remote_links");
purge_on_delete!(ConflictBuffer, "polaris_buffered_changes");

fn purge_store(tx: &Transaction<'_>, table: &'static str, sidx: Sidx) -> PolarisResult<()> {
    let deleted = tx.execute(&format!("DELETE FROM {} WHERE store = ?", table), params![sidx])?;
    if deleted > 0 {
        tracing::debug!(store = %sidx, table, deleted, "purged store rows");
    }
    Ok(())
}

/// Ordered set of lifecycle listeners
#[derive(Default)]
pub struct StoreLifecycle {
    listeners: Vec<Box<dyn StoreLifecycleListener>>,
}

impl StoreLifecycle {
    /// Empty manager; listeners are added with `register`
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    /// Manager with every Polaris component registered
    pub fn with_defaults() -> Self {
        let mut lifecycle = Self::new();
        lifecycle.register(Box::new(StoreRegistry::new()));
        lifecycle.register(Box::new(EpochTracker::new()));
        lifecycle.register(Box::new(MetaChangeLog::new()));
        lifecycle.register(Box::new(ContentChangeLog::new()));
        lifecycle.register(Box::new(FetchQueue::new()));
        lifecycle.register(Box::new(RemoteContentIndex::new()));
        lifecycle.register(Box::new(VersionStore::new()));
        lifecycle.register(Box::new(RemoteLinkTree::new()));
        lifecycle.register(Box::new(ConflictBuffer::new()));
        lifecycle
    }

    pub fn register(&mut self, listener: Box<dyn StoreLifecycleListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn store_created(&self, tx: &Transaction<'_>, sidx: Sidx, protocol_enabled: bool) -> PolarisResult<()> {
        for listener in &self.listeners {
            listener.on_store_created(tx, sidx, protocol_enabled)?;
        }

        tracing::info!(store = %sidx, protocol_enabled, "store created");
        Ok(())
    }

    pub fn store_deleted(&self, tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<()> {
        let timer = Timer::new("polaris.stores.delete.duration_ms");
        for listener in &self.listeners {
            listener.on_store_deleted(tx, sidx)?;
        }

        timer.stop();
        record_counter("polaris.stores.deleted", 1);
        tracing::info!(store = %sidx, "store deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_oid, TestDatabase};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl StoreLifecycleListener for Recorder {
        fn on_store_created(&self, _tx: &Transaction<'_>, sidx: Sidx, enabled: bool) -> PolarisResult<()> {
            self.events.lock().unwrap().push(format!("{}:created:{}:{}", self.name, sidx, enabled));
            Ok(())
        }

        fn on_store_deleted(&self, _tx: &Transaction<'_>, sidx: Sidx) -> PolarisResult<()> {
            self.events.lock().unwrap().push(format!("{}:deleted:{}", self.name, sidx));
            Ok(())
        }
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let mut db = TestDatabase::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let mut lifecycle = StoreLifecycle::new();
        for name in ["first", "second"] {
            lifecycle.register(Box::new(Recorder { name, events: events.clone() }));
        }

        let tx = db.transaction();
        lifecycle.store_created(&tx, Sidx(4), true).unwrap();
        lifecycle.store_deleted(&tx, Sidx(4)).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["first:created:4:true", "second:created:4:true", "first:deleted:4", "second:deleted:4"]
        );
    }

    #[test]
    fn test_created_store_is_provisioned() {
        let mut db = TestDatabase::new();
        let lifecycle = StoreLifecycle::with_defaults();
        let registry = StoreRegistry::new();

        let tx = db.transaction();
        lifecycle.store_created(&tx, Sidx(1), true).unwrap();
        lifecycle.store_created(&tx, Sidx(2), false).unwrap();

        assert!(registry.is_provisioned(&tx, Sidx(1)).unwrap());
        assert!(!registry.is_provisioned(&tx, Sidx(2)).unwrap());

        // epoch rows exist either way
        assert_eq!(EpochTracker::new().get_change_epoch(&tx, Sidx(1)).unwrap(), None);
        assert_eq!(EpochTracker::new().get_change_epoch(&tx, Sidx(2)).unwrap(), None);
    }

    #[test]
    fn test_delete_unprovisioned_store_succeeds() {
        let mut db = TestDatabase::new();
        let lifecycle = StoreLifecycle::with_defaults();

        let tx = db.transaction();
        lifecycle.store_deleted(&tx, Sidx(77)).unwrap();
        lifecycle.store_deleted(&tx, Sidx(77)).unwrap();
    }

    #[test]
    fn test_delete_leaves_other_stores_alone() {
        let mut db = TestDatabase::new();
        let lifecycle = StoreLifecycle::with_defaults();
        let queue = FetchQueue::new();
        let o = test_oid(1);

        let tx = db.transaction();
        lifecycle.store_created(&tx, Sidx(1), true).unwrap();
        lifecycle.store_created(&tx, Sidx(2), true).unwrap();
        queue.insert(&tx, Sidx(1), &o).unwrap();
        queue.insert(&tx, Sidx(2), &o).unwrap();

        lifecycle.store_deleted(&tx, Sidx(1)).unwrap();

        assert!(!queue.contains(&tx, Sidx(1), &o).unwrap());
        assert!(queue.contains(&tx, Sidx(2), &o).unwrap());
        assert!(StoreRegistry::new().is_provisioned(&tx, Sidx(2)).unwrap());
    }

    #[test]
    fn test_default_listener_count() {
        assert_eq!(StoreLifecycle::with_defaults().len(), 9);
        assert!(StoreLifecycle::new().is_empty());
    }
}
