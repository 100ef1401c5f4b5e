#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::backoff::{Backoff, ExponentialJitter, NoDelay};
    use crate::infrastructure_in_memory::InMemoryStore;
    use crate::lock::{LockManager, LockOptions};
    use crate::types::owner_token;

    fn manager() -> LockManager {
        LockManager::new(Arc::new(InMemoryStore::new())).with_backoff(NoDelay)
    }

    #[test]
    fn test_try_acquire_excludes_second_owner() {
        let locks = manager();
        let ttl = Duration::from_secs(10);

        assert!(locks.try_acquire("k", "a", ttl).unwrap());
        assert!(!locks.try_acquire("k", "b", ttl).unwrap());
        assert_eq!(locks.holder("k").unwrap().as_deref(), Some("a"));

        locks.release("k", "a").unwrap();
        assert!(locks.try_acquire("k", "b", ttl).unwrap());
    }

    #[test]
    fn test_stale_release_keeps_new_owner() {
        let locks = manager();

        // A acquires with a 50ms TTL and stalls past it
        assert!(locks.try_acquire("k", "token_a", Duration::from_millis(50)).unwrap());
        std::thread::sleep(Duration::from_millis(100));

        // B takes over the expired lock
        assert!(locks.try_acquire("k", "token_b", Duration::from_secs(10)).unwrap());

        // A wakes up and releases with its old token: silent no-op
        locks.release("k", "token_a").unwrap();
        assert_eq!(locks.holder("k").unwrap().as_deref(), Some("token_b"));
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let locks = manager();
        assert!(locks.try_acquire("k", "holder", Duration::from_secs(10)).unwrap());

        let sleeps = AtomicU32::new(0);
        let backoff = |_attempt: u32| {
            sleeps.fetch_add(1, Ordering::SeqCst);
            Duration::ZERO
        };

        let handle = locks
            .acquire_with_retry("k", Duration::from_secs(1), 3, &backoff)
            .unwrap();
        assert!(handle.is_none());
        // No sleep after the final attempt
        assert_eq!(sleeps.load(Ordering::SeqCst), 2);
        assert_eq!(locks.holder("k").unwrap().as_deref(), Some("holder"));
    }

    #[test]
    fn test_retry_zero_attempts_never_acquires() {
        let locks = manager();
        let handle = locks
            .acquire_with_retry("k", Duration::from_secs(1), 0, &NoDelay)
            .unwrap();
        assert!(handle.is_none());
        assert_eq!(locks.holder("k").unwrap(), None);
    }

    #[test]
    fn test_retry_succeeds_once_holder_expires() {
        let locks = manager();
        assert!(locks.try_acquire("k", "crashed", Duration::from_millis(30)).unwrap());

        let backoff = |_attempt: u32| Duration::from_millis(10);
        let handle = locks
            .acquire_with_retry("k", Duration::from_secs(1), 50, &backoff)
            .unwrap()
            .expect("lock should be reclaimed after the TTL");

        assert!(handle.attempts > 1);
        assert_eq!(handle.ttl, Duration::from_secs(1));
        assert_eq!(
            locks.holder("k").unwrap().as_deref(),
            Some(handle.owner_token.as_str())
        );
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let locks = manager();
        {
            let guard = locks.acquire("k").unwrap().expect("uncontended");
            assert_eq!(
                locks.holder("k").unwrap().as_deref(),
                Some(guard.handle().owner_token.as_str())
            );
        }
        assert_eq!(locks.holder("k").unwrap(), None);
    }

    #[test]
    fn test_guard_explicit_release_runs_once() {
        let locks = manager();
        let guard = locks.acquire("k").unwrap().expect("uncontended");
        guard.release().unwrap();

        // Someone else takes the key; nothing left behind may release it
        assert!(locks.try_acquire("k", "next", Duration::from_secs(10)).unwrap());
        assert_eq!(locks.holder("k").unwrap().as_deref(), Some("next"));
    }

    #[test]
    fn test_guard_honours_configured_options() {
        let locks = manager().with_options(LockOptions {
            ttl: Duration::from_millis(250),
            max_attempts: 1,
        });
        let guard = locks.acquire("k").unwrap().expect("uncontended");
        assert_eq!(guard.handle().ttl, Duration::from_millis(250));
        assert_eq!(
            guard.handle().expires_at(),
            guard.handle().acquired_at + 250
        );

        // A single attempt against a held key skips immediately
        assert!(locks.acquire("k").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_guards_never_overlap() {
        let locks = manager()
            .with_options(LockOptions {
                ttl: Duration::from_secs(10),
                max_attempts: 100_000,
            })
            .with_backoff(|_attempt: u32| Duration::from_micros(50));
        let inside = AtomicU32::new(0);
        let entered = AtomicU32::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..25 {
                        let guard = locks.acquire("k").unwrap().expect("eventually acquired");
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        entered.fetch_add(1, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        guard.release().unwrap();
                    }
                });
            }
        });

        assert_eq!(entered.load(Ordering::SeqCst), 200);
        assert_eq!(locks.holder("k").unwrap(), None);
    }

    #[test]
    fn test_owner_tokens_are_unique() {
        let a = owner_token();
        let b = owner_token();
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("{}-", std::process::id())));
    }

    #[test]
    fn test_exponential_jitter_is_bounded() {
        let backoff = ExponentialJitter {
            base: Duration::from_millis(100),
            jitter: Duration::from_millis(100),
            cap: Duration::from_millis(1000),
        };

        for attempt in 0..3 {
            let floor = Duration::from_millis(100 * 2u64.pow(attempt));
            let delay = backoff.delay(attempt);
            assert!(delay >= floor && delay <= floor + Duration::from_millis(100));
        }
        // Capped before jitter is added
        let late = backoff.delay(30);
        assert!(late >= Duration::from_millis(1000) && late <= Duration::from_millis(1100));
    }

    #[test]
    fn test_exponential_without_jitter_is_deterministic() {
        let backoff = ExponentialJitter {
            base: Duration::from_millis(10),
            jitter: Duration::ZERO,
            cap: Duration::from_secs(5),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(10));
        assert_eq!(backoff.delay(3), Duration::from_millis(80));
    }
}
