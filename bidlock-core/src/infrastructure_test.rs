#[cfg(test)]
mod tests {
    use crate::infrastructure::{AuctionStore, LockStore};
    use crate::infrastructure_in_memory::InMemoryStore;
    use crate::types::{AuctionRecord, AuctionStatus};

    #[test]
    fn test_in_memory_lock_set_if_absent() {
        let store = InMemoryStore::new();

        assert!(store.try_acquire("lock:auction:a", "token_1", 5000, 1000).unwrap());
        // Held and unexpired: a second owner is refused, even the same one
        assert!(!store.try_acquire("lock:auction:a", "token_2", 5000, 1000).unwrap());
        assert!(!store.try_acquire("lock:auction:a", "token_1", 5000, 2000).unwrap());

        assert_eq!(
            store.holder("lock:auction:a", 1000).unwrap().as_deref(),
            Some("token_1")
        );
    }

    #[test]
    fn test_in_memory_lock_takeover_after_expiry() {
        let store = InMemoryStore::new();

        // Acquire at t=1000, ttl=5000 -> expires at 6000
        assert!(store.try_acquire("k", "old", 5000, 1000).unwrap());
        assert!(!store.try_acquire("k", "new", 5000, 5999).unwrap());
        assert!(store.try_acquire("k", "new", 5000, 6000).unwrap());
        assert_eq!(store.holder("k", 6000).unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_in_memory_release_is_compare_and_delete() {
        let store = InMemoryStore::new();
        assert!(store.try_acquire("k", "old", 50, 0).unwrap());
        assert!(store.try_acquire("k", "new", 5000, 100).unwrap());

        // The stale owner cannot remove the new owner's entry
        assert!(!store.release("k", "old").unwrap());
        assert_eq!(store.holder("k", 100).unwrap().as_deref(), Some("new"));

        assert!(store.release("k", "new").unwrap());
        assert_eq!(store.holder("k", 100).unwrap(), None);
        // Releasing an absent key is a no-op
        assert!(!store.release("k", "new").unwrap());
    }

    #[test]
    fn test_in_memory_eviction() {
        let store = InMemoryStore::new();
        store.try_acquire("a", "t", 5000, 1000).unwrap();
        store.try_acquire("b", "t", 1000, 1000).unwrap();

        assert_eq!(store.evict_expired(1500).unwrap(), 0);
        assert_eq!(store.evict_expired(2000).unwrap(), 1);
        assert_eq!(store.holder("a", 2000).unwrap().as_deref(), Some("t"));
        assert_eq!(store.evict_expired(7000).unwrap(), 1);
    }

    #[test]
    fn test_in_memory_auction_read_write() {
        let store = InMemoryStore::new();
        assert_eq!(store.read("item1").unwrap(), None);

        let mut record = AuctionRecord::opened("item1", "Chair");
        store.write(&record).unwrap();
        assert_eq!(store.read("item1").unwrap(), Some(record.clone()));

        record.current_bid = 10.0;
        record.current_winner = Some("alice".to_string());
        store.write(&record).unwrap();

        let read = store.read("item1").unwrap().unwrap();
        assert_eq!(read.current_bid, 10.0);
        assert_eq!(read.current_winner.as_deref(), Some("alice"));
        assert_eq!(read.status, AuctionStatus::Active);
    }

    #[cfg(feature = "sqlite")]
    mod sqlite {
        use super::*;
        use crate::infrastructure_sqlite::SqliteStore;

        fn temp_db() -> String {
            std::env::temp_dir()
                .join(format!("bidlock_test_{}.db", nanoid::nanoid!()))
                .to_string_lossy()
                .into_owned()
        }

        #[test]
        fn test_sqlite_lock_semantics() {
            let store = SqliteStore::open(":memory:").unwrap();

            assert!(store.try_acquire("k", "old", 50, 0).unwrap());
            assert!(!store.try_acquire("k", "new", 5000, 10).unwrap());
            assert!(store.try_acquire("k", "new", 5000, 100).unwrap());

            assert!(!store.release("k", "old").unwrap());
            assert_eq!(store.holder("k", 100).unwrap().as_deref(), Some("new"));
            assert!(store.release("k", "new").unwrap());
            assert_eq!(store.holder("k", 100).unwrap(), None);
        }

        #[test]
        fn test_sqlite_auction_roundtrip_with_missing_winner() {
            let store = SqliteStore::open(":memory:").unwrap();
            assert_eq!(store.read("item1").unwrap(), None);

            let record = AuctionRecord::pending("item1", "Chair");
            store.write(&record).unwrap();
            assert_eq!(store.read("item1").unwrap(), Some(record));

            let closed = AuctionRecord {
                status: AuctionStatus::Closed,
                current_bid: 15.5,
                current_winner: Some("bob".to_string()),
                ..AuctionRecord::opened("item1", "Chair")
            };
            store.write(&closed).unwrap();
            assert_eq!(store.read("item1").unwrap(), Some(closed));
        }

        #[test]
        fn test_sqlite_connections_share_one_lock_table() {
            let path = temp_db();
            let first = SqliteStore::open(&path).unwrap();
            let second = SqliteStore::open(&path).unwrap();

            assert!(first.try_acquire("k", "process_a", 5000, 1000).unwrap());
            assert!(!second.try_acquire("k", "process_b", 5000, 1000).unwrap());
            assert!(!second.release("k", "process_b").unwrap());

            assert!(first.release("k", "process_a").unwrap());
            assert!(second.try_acquire("k", "process_b", 5000, 1000).unwrap());

            second.write(&AuctionRecord::opened("item1", "Chair")).unwrap();
            assert!(first.read("item1").unwrap().unwrap().is_active());

            drop(first);
            drop(second);
            let _ = std::fs::remove_file(&path);
        }
    }
}
