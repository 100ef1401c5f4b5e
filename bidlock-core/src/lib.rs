//! # bidlock-core
//!
//! Coordination kernel for a single-item auction shared by many processes.
//! Provides a TTL-bounded, ownership-checked distributed lock, the
//! Pending → Active → Closed auction state machine guarded by it, and
//! best-effort fanout of state changes.

pub mod backoff;
pub mod coordinator;
pub mod error;
pub mod fanout;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod lock;
pub mod types;
pub mod wire;

#[cfg(test)]
mod fanout_test;
#[cfg(test)]
mod lock_test;
#[cfg(test)]
#[path = "infrastructure_test.rs"]
mod infrastructure_test;
