//! Test fixtures for creating common test objects

use crate::core_polaris::lifecycle::StoreLifecycle;
use crate::core_polaris::storage::migrate;
use crate::core_polaris::types::{ContentHash, Did, Oid, Sidx};
use rusqlite::{Connection, Transaction};

/// Migrated in-memory database owned by a single test
pub struct TestDatabase {
    conn: Connection,
}

impl TestDatabase {
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory database");
        migrate(&conn).expect("migrate test database");
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn transaction(&mut self) -> Transaction<'_> {
        self.conn.transaction().expect("begin transaction")
    }

    /// Create protocol-enabled stores through the default lifecycle
    pub fn with_stores(mut self, stores: &[Sidx]) -> Self {
        let lifecycle = StoreLifecycle::with_defaults();
        let tx = self.transaction();
        for &sidx in stores {
            lifecycle.store_created(&tx, sidx, true).expect("create test store");
        }
        tx.commit().expect("commit test stores");
        self
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic object id; distinct `n` give distinct ids
pub fn test_oid(n: u8) -> Oid {
    let mut bytes = [0u8; 16];
    bytes[0] = 0x0b;
    bytes[15] = n;
    Oid::from_bytes(bytes)
}

/// Deterministic device id; distinct `n` give distinct ids
pub fn test_did(n: u8) -> Did {
    let mut bytes = [0u8; 16];
    bytes[0] = 0xd1;
    bytes[15] = n;
    Did::from_bytes(bytes)
}

/// Content hash of a single byte
pub fn test_hash(n: u8) -> ContentHash {
    ContentHash::digest(&[n])
}
