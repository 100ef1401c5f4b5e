use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch. All lock expiries are expressed in this clock.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The lock guarding mutations of one auction. Kept apart from
/// [`AuctionRecord::data_key`](super::AuctionRecord::data_key).
pub fn lock_key(item_id: &str) -> String {
    format!("lock:auction:{}", item_id)
}

/// A fresh owner token: process id, wall clock and a random nanoid, so two
/// processes acquiring in the same millisecond still never collide.
pub fn owner_token() -> String {
    format!("{}-{}-{}", std::process::id(), now_ms(), nanoid::nanoid!())
}

/// Proof of a successful acquisition, held only by the acquiring process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHandle {
    pub lock_key: String,
    pub owner_token: String,
    pub ttl: Duration,
    /// When the lock was taken (unix ms)
    pub acquired_at: u64,
    /// How many tries it took
    pub attempts: u32,
}

impl LockHandle {
    /// When the store will consider this lock abandoned.
    pub fn expires_at(&self) -> u64 {
        self.acquired_at + self.ttl.as_millis() as u64
    }
}
