use thiserror::Error;

use crate::types::Amount;

/// Failures of the shared store itself. These are the only fatal errors:
/// a process that cannot reach its store should be restarted by its supervisor.
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt entry at '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of an auction command that did not go through.
#[derive(Debug, Error)]
pub enum AuctionError {
    /// Contention: the command was skipped this round and may be resubmitted.
    #[error("lock '{lock_key}' still held after {attempts} attempts; command dropped")]
    LockUnavailable { lock_key: String, attempts: u32 },

    #[error("auction '{item_id}' is not active")]
    AuctionNotActive { item_id: String },

    #[error("bid of {offered} on '{item_id}' does not beat the current bid of {current}")]
    BidTooLow {
        item_id: String,
        offered: Amount,
        current: Amount,
    },

    #[error("auction '{item_id}' is already active")]
    AlreadyActive { item_id: String },

    #[error("malformed command: {0}")]
    MalformedCommand(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuctionError {
    /// User-facing rejections: reported back to the originator, never a system fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuctionError::AuctionNotActive { .. }
                | AuctionError::BidTooLow { .. }
                | AuctionError::AlreadyActive { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, AuctionError::Store(_))
    }

    /// Short machine-readable code, used by the HTTP surface and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::LockUnavailable { .. } => "LOCK_UNAVAILABLE",
            AuctionError::AuctionNotActive { .. } => "AUCTION_NOT_ACTIVE",
            AuctionError::BidTooLow { .. } => "BID_TOO_LOW",
            AuctionError::AlreadyActive { .. } => "ALREADY_ACTIVE",
            AuctionError::MalformedCommand(_) => "MALFORMED_COMMAND",
            AuctionError::Store(_) => "STORE_FAILURE",
        }
    }
}
