//! Custom assertions for per-store state

use crate::core_polaris::types::Sidx;
use rusqlite::{params, Connection};

/// Every table holding rows keyed by store
pub const STORE_TABLES: &[&str] = &[
    "polaris_stores",
    "polaris_change_epochs",
    "polaris_meta_changes",
    "polaris_content_changes",
    "polaris_fetch_queue",
    "polaris_remote_content",
    "polaris_central_versions",
    "polaris_remote_links",
    "polaris_buffered_changes",
];

/// Number of rows `table` holds for `sidx`
pub fn count_store_rows(conn: &Connection, table: &str, sidx: Sidx) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE store = ?", table),
        params![sidx],
        |row| row.get(0),
    )
    .unwrap_or_else(|e| panic!("Failed to count rows in {}: {}", table, e))
}

/// Assert that no table holds any row for the store
pub fn assert_store_empty(conn: &Connection, sidx: Sidx) {
    let leftovers: Vec<_> = STORE_TABLES
        .iter()
        .map(|table| (*table, count_store_rows(conn, table, sidx)))
        .filter(|(_, count)| *count > 0)
        .collect();

    if !leftovers.is_empty() {
        panic!("Expected store {} to be empty, found rows in {:?}", sidx, leftovers);
    }
}

/// Assert that the store has rows in every table
pub fn assert_store_populated(conn: &Connection, sidx: Sidx) {
    for table in STORE_TABLES {
        if count_store_rows(conn, table, sidx) == 0 {
            panic!("Expected store {} to have rows in {}", sidx, table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestDatabase;

    #[test]
    fn test_fresh_store_is_empty() {
        let db = TestDatabase::new();
        assert_store_empty(db.conn(), Sidx(1));
    }

    #[test]
    #[should_panic(expected = "to be empty")]
    fn test_provisioned_store_is_not_empty() {
        let db = TestDatabase::new().with_stores(&[Sidx(1)]);
        assert_store_empty(db.conn(), Sidx(1));
    }
}
