//! SQLite-backed shared store.
//! Several processes opening the same database file share one lock table and
//! one auction table, which is what makes the lock distributed.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! bidlock-core = { path = "../bidlock-core", features = ["sqlite"] }
//! ```

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::StoreError;
use crate::infrastructure::{AuctionStore, LockStore};
use crate::types::*;

/// How long a statement waits on another process's write lock before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A shared store backed by SQLite.
///
/// Uses WAL mode so readers in other processes are not blocked by writers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &str, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // In-memory databases report "memory" and ignore WAL
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS locks (
                lock_key    TEXT PRIMARY KEY,
                owner_token TEXT NOT NULL,
                expires_at  INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS auctions (
                item_id        TEXT PRIMARY KEY,
                description    TEXT NOT NULL,
                status         TEXT NOT NULL DEFAULT 'PENDING',
                current_bid    REAL NOT NULL DEFAULT 0,
                current_winner TEXT
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection poisoned".to_string()))
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<(AuctionRecord, String)> {
        let status_str: String = row.get(2)?;
        let record = AuctionRecord {
            item_id: row.get(0)?,
            description: row.get(1)?,
            status: AuctionStatus::Pending,
            current_bid: row.get(3)?,
            current_winner: row.get(4)?,
        };
        Ok((record, status_str))
    }
}

impl LockStore for SqliteStore {
    fn try_acquire(
        &self,
        lock_key: &str,
        owner_token: &str,
        ttl_ms: u64,
        now: u64,
    ) -> Result<bool, StoreError> {
        // One statement: insert when absent, take over only when expired.
        // A live holder makes the DO UPDATE a no-op and zero rows change.
        let rows = self.conn()?.execute(
            "INSERT INTO locks (lock_key, owner_token, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(lock_key) DO UPDATE
                SET owner_token = excluded.owner_token, expires_at = excluded.expires_at
                WHERE locks.expires_at <= ?4",
            params![lock_key, owner_token, now.saturating_add(ttl_ms), now],
        )?;
        Ok(rows > 0)
    }

    fn release(&self, lock_key: &str, owner_token: &str) -> Result<bool, StoreError> {
        let rows = self.conn()?.execute(
            "DELETE FROM locks WHERE lock_key = ?1 AND owner_token = ?2",
            params![lock_key, owner_token],
        )?;
        Ok(rows > 0)
    }

    fn holder(&self, lock_key: &str, now: u64) -> Result<Option<String>, StoreError> {
        let token = self
            .conn()?
            .query_row(
                "SELECT owner_token FROM locks WHERE lock_key = ?1 AND expires_at > ?2",
                params![lock_key, now],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token)
    }

    fn evict_expired(&self, now: u64) -> Result<usize, StoreError> {
        let rows = self
            .conn()?
            .execute("DELETE FROM locks WHERE expires_at <= ?1", params![now])?;
        Ok(rows)
    }
}

impl AuctionStore for SqliteStore {
    fn read(&self, item_id: &str) -> Result<Option<AuctionRecord>, StoreError> {
        let row = self
            .conn()?
            .query_row(
                "SELECT item_id, description, status, current_bid, current_winner
                 FROM auctions WHERE item_id = ?1",
                params![item_id],
                Self::row_to_record,
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((mut record, status_str)) => {
                record.status =
                    AuctionStatus::parse(&status_str).ok_or_else(|| StoreError::Corrupt {
                        key: AuctionRecord::data_key(item_id),
                        message: format!("unknown status '{}'", status_str),
                    })?;
                Ok(Some(record))
            }
        }
    }

    fn write(&self, record: &AuctionRecord) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO auctions (item_id, description, status, current_bid, current_winner)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(item_id) DO UPDATE SET
                description = excluded.description,
                status = excluded.status,
                current_bid = excluded.current_bid,
                current_winner = excluded.current_winner",
            params![
                record.item_id,
                record.description,
                record.status.to_string(),
                record.current_bid,
                record.current_winner,
            ],
        )?;
        Ok(())
    }
}
