use crate::error::StoreError;
use crate::types::AuctionRecord;

/// Key-value primitives the lock manager needs from the shared store.
///
/// Each method must be a single atomic operation against the store: there is
/// no read-then-write window between the check and the mutation.
pub trait LockStore: Send + Sync {
    /// Set `lock_key = owner_token` expiring at `now + ttl_ms`, but only if the
    /// key is unset or its current entry expired (`expires_at <= now`).
    fn try_acquire(
        &self,
        lock_key: &str,
        owner_token: &str,
        ttl_ms: u64,
        now: u64,
    ) -> Result<bool, StoreError>;

    /// Delete the entry only if it still holds `owner_token`.
    /// Returns whether anything was deleted.
    fn release(&self, lock_key: &str, owner_token: &str) -> Result<bool, StoreError>;

    /// The token of the current, unexpired holder.
    fn holder(&self, lock_key: &str, now: u64) -> Result<Option<String>, StoreError>;

    /// Drop entries whose TTL elapsed. Returns how many were dropped.
    fn evict_expired(&self, now: u64) -> Result<usize, StoreError>;
}

/// Storage for auction records.
///
/// No locking happens here beyond single-call atomicity: callers hold the
/// item's lock before writing, and concurrent writes are never merged.
pub trait AuctionStore: Send + Sync {
    fn read(&self, item_id: &str) -> Result<Option<AuctionRecord>, StoreError>;

    /// Full-record upsert keyed by `record.item_id`.
    fn write(&self, record: &AuctionRecord) -> Result<(), StoreError>;
}
