use std::sync::Arc;

use anyhow::bail;
#[cfg(feature = "sqlite")]
use anyhow::Context;

use bidlock_core::coordinator::AuctionCoordinator;
use bidlock_core::error::{AuctionError, StoreError};
use bidlock_core::fanout::Fanout;
use bidlock_core::infrastructure::{AuctionStore, LockStore};
use bidlock_core::infrastructure_in_memory::InMemoryStore;
use bidlock_core::lock::{LockOptions, LockManager};

use crate::AuctionArgs;

// ─── Storage Backend Selection ──────────────────────────────────────────────

/// Builds a coordinator over the configured backend. A backend that cannot be
/// opened is fatal: there is no useful fallback for a shared store.
pub fn open_coordinator(args: &AuctionArgs) -> anyhow::Result<AuctionCoordinator> {
    let fanout = Fanout::new(args.mailbox);
    let options = args.lock_options();

    if args.storage == "memory" {
        tracing::info!("💾 Storage backend: in-memory (locks are not shared with other processes)");
        Ok(build(Arc::new(InMemoryStore::new()), options, fanout))
    } else if let Some(path) = args.storage.strip_prefix("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            tracing::info!("💾 Storage backend: SQLite ({})", path);
            let store = bidlock_core::infrastructure_sqlite::SqliteStore::open(path)
                .with_context(|| format!("Failed to open SQLite database at '{}'", path))?;
            Ok(build(Arc::new(store), options, fanout))
        }
        #[cfg(not(feature = "sqlite"))]
        {
            let _ = path;
            bail!(
                "SQLite storage requested but `sqlite` feature is not enabled. \
                 Rebuild with: cargo build --features sqlite"
            )
        }
    } else {
        bail!(
            "Unknown storage backend: '{}'. Use 'memory' or 'sqlite:<path>'",
            args.storage
        )
    }
}

fn build<S>(store: Arc<S>, options: LockOptions, fanout: Fanout) -> AuctionCoordinator
where
    S: LockStore + AuctionStore + 'static,
{
    let locks = LockManager::new(store.clone()).with_options(options);
    AuctionCoordinator::from_parts(locks, store, fanout)
}

/// Runs a blocking coordinator call off the async runtime.
pub async fn blocking<T, F>(coordinator: &Arc<AuctionCoordinator>, f: F) -> Result<T, AuctionError>
where
    F: FnOnce(&AuctionCoordinator) -> Result<T, AuctionError> + Send + 'static,
    T: Send + 'static,
{
    let coordinator = coordinator.clone();
    match tokio::task::spawn_blocking(move || f(&coordinator)).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Unavailable(format!("coordinator task failed: {}", e)).into()),
    }
}
