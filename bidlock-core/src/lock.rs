//! TTL-bounded, ownership-checked mutual exclusion over a [`LockStore`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::backoff::{Backoff, ExponentialJitter};
use crate::error::StoreError;
use crate::infrastructure::LockStore;
use crate::types::{now_ms, owner_token, LockHandle};

/// How long a holder may keep a lock before it is considered abandoned.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

/// Tries per acquisition before the operation is skipped.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub ttl: Duration,
    pub max_attempts: u32,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_LOCK_TTL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

pub struct LockManager {
    store: Arc<dyn LockStore>,
    backoff: Arc<dyn Backoff>,
    options: LockOptions,
}

impl LockManager {
    /// A manager with default options and exponential backoff with jitter.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            backoff: Arc::new(ExponentialJitter::default()),
            options: LockOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    pub fn options(&self) -> LockOptions {
        self.options
    }

    /// One atomic set-if-absent-or-expired attempt.
    pub fn try_acquire(
        &self,
        lock_key: &str,
        owner_token: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.store
            .try_acquire(lock_key, owner_token, ttl.as_millis() as u64, now_ms())
    }

    /// Compare-and-delete. Releasing a lock that expired and was taken by
    /// someone else leaves the new holder untouched and is not an error.
    pub fn release(&self, lock_key: &str, owner_token: &str) -> Result<(), StoreError> {
        if !self.store.release(lock_key, owner_token)? {
            debug!(lock_key, owner_token, "Release skipped: lock no longer owned");
        }
        Ok(())
    }

    /// Tries up to `max_attempts` times with a single fresh owner token,
    /// sleeping `backoff.delay(i)` between tries. `None` means the caller
    /// should skip the operation this round.
    pub fn acquire_with_retry(
        &self,
        lock_key: &str,
        ttl: Duration,
        max_attempts: u32,
        backoff: &dyn Backoff,
    ) -> Result<Option<LockHandle>, StoreError> {
        let token = owner_token();

        for attempt in 0..max_attempts {
            let now = now_ms();
            if self
                .store
                .try_acquire(lock_key, &token, ttl.as_millis() as u64, now)?
            {
                debug!(lock_key, attempts = attempt + 1, "Lock acquired");
                return Ok(Some(LockHandle {
                    lock_key: lock_key.to_string(),
                    owner_token: token,
                    ttl,
                    acquired_at: now,
                    attempts: attempt + 1,
                }));
            }

            if attempt + 1 < max_attempts {
                let delay = backoff.delay(attempt);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }

        warn!(lock_key, max_attempts, "Lock not acquired");
        Ok(None)
    }

    /// Scoped acquisition with the manager's options. The returned guard
    /// releases on [`LockGuard::release`] or on drop, whichever comes first.
    pub fn acquire(&self, lock_key: &str) -> Result<Option<LockGuard<'_>>, StoreError> {
        let handle = self.acquire_with_retry(
            lock_key,
            self.options.ttl,
            self.options.max_attempts,
            self.backoff.as_ref(),
        )?;
        Ok(handle.map(|handle| LockGuard {
            manager: self,
            handle,
            released: false,
        }))
    }

    /// Current unexpired holder of `lock_key`.
    pub fn holder(&self, lock_key: &str) -> Result<Option<String>, StoreError> {
        self.store.holder(lock_key, now_ms())
    }

    pub fn evict_expired(&self) -> Result<usize, StoreError> {
        self.store.evict_expired(now_ms())
    }
}

/// A held lock. Released exactly once: explicitly, or when dropped on an
/// early return or unwind.
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    handle: LockHandle,
    released: bool,
}

impl LockGuard<'_> {
    pub fn handle(&self) -> &LockHandle {
        &self.handle
    }

    pub fn release(mut self) -> Result<(), StoreError> {
        self.released = true;
        self.manager
            .release(&self.handle.lock_key, &self.handle.owner_token)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self
            .manager
            .release(&self.handle.lock_key, &self.handle.owner_token)
        {
            // The TTL reclaims the key if this never goes through
            warn!(lock_key = %self.handle.lock_key, error = %e, "Failed to release lock on drop");
        }
    }
}
