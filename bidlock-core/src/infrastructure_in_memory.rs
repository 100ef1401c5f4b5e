use crate::error::StoreError;
use crate::infrastructure::{AuctionStore, LockStore};
use crate::types::AuctionRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct LockEntry {
    owner_token: String,
    expires_at: u64,
}

impl LockEntry {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

/// Process-local stand-in for the shared key-value store.
///
/// Every trait method runs inside one mutex critical section, which is what
/// makes set-if-absent and compare-and-delete atomic here. Share it between
/// threads behind an `Arc`.
pub struct InMemoryStore {
    // Map of lock key -> current holder
    locks: Mutex<HashMap<String, LockEntry>>,
    // Map of data key -> record
    auctions: Mutex<HashMap<String, AuctionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            auctions: Mutex::new(HashMap::new()),
        }
    }

    fn locks(&self) -> Result<MutexGuard<'_, HashMap<String, LockEntry>>, StoreError> {
        self.locks
            .lock()
            .map_err(|_| StoreError::Unavailable("lock table poisoned".to_string()))
    }

    fn auctions(&self) -> Result<MutexGuard<'_, HashMap<String, AuctionRecord>>, StoreError> {
        self.auctions
            .lock()
            .map_err(|_| StoreError::Unavailable("auction table poisoned".to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStore for InMemoryStore {
    fn try_acquire(
        &self,
        lock_key: &str,
        owner_token: &str,
        ttl_ms: u64,
        now: u64,
    ) -> Result<bool, StoreError> {
        let mut locks = self.locks()?;
        if let Some(entry) = locks.get(lock_key) {
            if !entry.is_expired(now) {
                return Ok(false);
            }
        }
        locks.insert(
            lock_key.to_string(),
            LockEntry {
                owner_token: owner_token.to_string(),
                expires_at: now.saturating_add(ttl_ms),
            },
        );
        Ok(true)
    }

    fn release(&self, lock_key: &str, owner_token: &str) -> Result<bool, StoreError> {
        let mut locks = self.locks()?;
        match locks.get(lock_key) {
            Some(entry) if entry.owner_token == owner_token => {
                locks.remove(lock_key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn holder(&self, lock_key: &str, now: u64) -> Result<Option<String>, StoreError> {
        Ok(self
            .locks()?
            .get(lock_key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.owner_token.clone()))
    }

    fn evict_expired(&self, now: u64) -> Result<usize, StoreError> {
        let mut locks = self.locks()?;
        let before = locks.len();
        locks.retain(|_, entry| !entry.is_expired(now));
        Ok(before - locks.len())
    }
}

impl AuctionStore for InMemoryStore {
    fn read(&self, item_id: &str) -> Result<Option<AuctionRecord>, StoreError> {
        Ok(self
            .auctions()?
            .get(&AuctionRecord::data_key(item_id))
            .cloned())
    }

    fn write(&self, record: &AuctionRecord) -> Result<(), StoreError> {
        self.auctions()?
            .insert(AuctionRecord::data_key(&record.item_id), record.clone());
        Ok(())
    }
}
