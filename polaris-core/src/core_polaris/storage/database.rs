//! Connection pool for the Polaris database
//!
//! Components never open transactions themselves. The daemon takes a pooled
//! connection, opens a transaction on it and threads `&Transaction` through
//! every mutating call; commit and rollback stay with the caller.

use super::migrations;
use crate::config::DatabaseConfig;
use crate::core_polaris::errors::PolarisResult;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

/// Pooled SQLite database holding every Polaris table
#[derive(Clone)]
pub struct PolarisDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl PolarisDatabase {
    /// Open (creating if needed) a file-backed database and run migrations
    pub fn open(config: &DatabaseConfig) -> PolarisResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let busy_timeout = config.busy_timeout;
        let enable_wal = config.enable_wal;
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            if enable_wal {
                // journal_mode reports the resulting mode as a row
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
                conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
            }
            Ok(())
        });

        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;

        tracing::info!(
            path = %config.path.display(),
            pool_size = config.pool_size,
            wal = enable_wal,
            "Opened polaris database"
        );

        Self::with_pool(pool)
    }

    /// Create a new in-memory database
    ///
    /// Every in-memory connection is a separate database, so the pool holds
    /// exactly one.
    pub fn memory() -> PolarisResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;

        Self::with_pool(pool)
    }

    /// Wrap an existing pool, running migrations on it
    pub fn with_pool(pool: Pool<SqliteConnectionManager>) -> PolarisResult<Self> {
        let conn = pool.get()?;
        migrations::migrate(&conn)?;
        drop(conn);

        Ok(Self { pool })
    }

    /// Check out a connection; open a transaction on it for mutating calls
    pub fn connection(&self) -> PolarisResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool<SqliteConnectionManager> {
        &self.pool
    }
}
