//! The auction state machine. Every mutation runs under the item's
//! distributed lock; events go out after the lock is released.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::AuctionError;
use crate::fanout::{Fanout, Subscription};
use crate::infrastructure::{AuctionStore, LockStore};
use crate::lock::LockManager;
use crate::types::*;
use crate::wire::Command;

/// What a lock-guarded step produced: the caller's result, plus the event to
/// publish once the lock is gone. Rejections carry events too.
struct Step<T> {
    outcome: Result<T, AuctionError>,
    event: Option<AuctionEvent>,
}

impl<T> Step<T> {
    fn done(value: T, event: Option<AuctionEvent>) -> Self {
        Self {
            outcome: Ok(value),
            event,
        }
    }

    fn rejected(error: AuctionError, event: Option<AuctionEvent>) -> Self {
        Self {
            outcome: Err(error),
            event,
        }
    }
}

/// Result of a dispatched [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Opened(AuctionRecord),
    BidAccepted(AuctionRecord),
    Closed(AuctionRecord),
    /// `close` on an auction that was not active
    Unchanged,
}

impl Reply {
    pub fn record(&self) -> Option<&AuctionRecord> {
        match self {
            Reply::Opened(r) | Reply::BidAccepted(r) | Reply::Closed(r) => Some(r),
            Reply::Unchanged => None,
        }
    }
}

pub struct AuctionCoordinator {
    auctions: Arc<dyn AuctionStore>,
    locks: LockManager,
    fanout: Fanout,
}

impl AuctionCoordinator {
    /// Coordinator over one store that holds both locks and records.
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: LockStore + AuctionStore + 'static,
    {
        let locks: Arc<dyn LockStore> = store.clone();
        Self::from_parts(LockManager::new(locks), store, Fanout::default())
    }

    pub fn from_parts(locks: LockManager, auctions: Arc<dyn AuctionStore>, fanout: Fanout) -> Self {
        Self {
            auctions,
            locks,
            fanout,
        }
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }

    pub fn subscribe(&self) -> Subscription {
        self.fanout.subscribe()
    }

    /// Lock-free read for display. May be stale; never use it to decide a mutation.
    pub fn snapshot(&self, item_id: &str) -> Result<Option<AuctionRecord>, AuctionError> {
        Ok(self.auctions.read(item_id)?)
    }

    /// Starts a round: Active, bid 0, no winner. Overwrites a pending or
    /// closed record, refuses an active one.
    pub fn open(&self, item_id: &str, description: &str) -> Result<AuctionRecord, AuctionError> {
        self.guarded(item_id, "open", || {
            if let Some(existing) = self.auctions.read(item_id)? {
                if existing.is_active() {
                    info!(item_id, "Auction already active");
                    return Ok(Step::rejected(
                        AuctionError::AlreadyActive {
                            item_id: item_id.to_string(),
                        },
                        None,
                    ));
                }
            }

            let record = AuctionRecord::opened(item_id, description);
            self.auctions.write(&record)?;
            info!(item_id, description, "Auction opened");

            let event = AuctionEvent::Started {
                item_id: record.item_id.clone(),
                description: record.description.clone(),
                current_bid: record.current_bid,
            };
            Ok(Step::done(record, Some(event)))
        })
    }

    /// Applies a bid if it is strictly greater than the current one.
    pub fn submit_bid(&self, bid: &BidCommand) -> Result<AuctionRecord, AuctionError> {
        if let Err(message) = bid.validate() {
            let error = AuctionError::MalformedCommand(message);
            warn!(item_id = %bid.item_id, error = %error, "Malformed command dropped");
            return Err(error);
        }

        self.guarded(&bid.item_id, "submit_bid", || {
            let record = match self.auctions.read(&bid.item_id)? {
                Some(record) if record.is_active() => record,
                other => {
                    info!(
                        item_id = %bid.item_id,
                        bidder_id = %bid.bidder_id,
                        amount = bid.amount,
                        "Auction not active, bid ignored"
                    );
                    let event = AuctionEvent::BidRejected {
                        item_id: bid.item_id.clone(),
                        bidder_id: bid.bidder_id.clone(),
                        amount: bid.amount,
                        current_bid: other.map(|r| r.current_bid).unwrap_or_default(),
                        reason: RejectReason::NotActive,
                    };
                    return Ok(Step::rejected(
                        AuctionError::AuctionNotActive {
                            item_id: bid.item_id.clone(),
                        },
                        Some(event),
                    ));
                }
            };

            if bid.amount <= record.current_bid {
                let reason = RejectReason::compare(bid.amount, record.current_bid);
                info!(
                    item_id = %bid.item_id,
                    bidder_id = %bid.bidder_id,
                    amount = bid.amount,
                    current_bid = record.current_bid,
                    reason = ?reason,
                    "Bid rejected"
                );
                let event = AuctionEvent::BidRejected {
                    item_id: bid.item_id.clone(),
                    bidder_id: bid.bidder_id.clone(),
                    amount: bid.amount,
                    current_bid: record.current_bid,
                    reason,
                };
                return Ok(Step::rejected(
                    AuctionError::BidTooLow {
                        item_id: bid.item_id.clone(),
                        offered: bid.amount,
                        current: record.current_bid,
                    },
                    Some(event),
                ));
            }

            let updated = AuctionRecord {
                current_bid: bid.amount,
                current_winner: Some(bid.bidder_id.clone()),
                ..record
            };
            self.auctions.write(&updated)?;
            info!(
                item_id = %bid.item_id,
                bidder_id = %bid.bidder_id,
                amount = bid.amount,
                "Bid accepted"
            );

            let event = AuctionEvent::BidAccepted {
                item_id: bid.item_id.clone(),
                bidder_id: bid.bidder_id.clone(),
                amount: bid.amount,
            };
            Ok(Step::done(updated, Some(event)))
        })
    }

    /// Ends the round. Returns the final record, or `None` when there was no
    /// active auction (closing twice is a no-op with no event).
    pub fn close(&self, item_id: &str) -> Result<Option<AuctionRecord>, AuctionError> {
        self.guarded(item_id, "close", || {
            let record = match self.auctions.read(item_id)? {
                Some(record) if record.is_active() => record,
                _ => {
                    debug!(item_id, "Close ignored, auction not active");
                    return Ok(Step::done(None, None));
                }
            };

            let closed = AuctionRecord {
                status: AuctionStatus::Closed,
                ..record
            };
            self.auctions.write(&closed)?;
            info!(
                item_id,
                winner = closed.current_winner.as_deref().unwrap_or("none"),
                final_bid = closed.current_bid,
                "Auction closed"
            );

            let event = AuctionEvent::Closed {
                item_id: closed.item_id.clone(),
                winner: closed.current_winner.clone(),
                final_bid: closed.current_bid,
            };
            Ok(Step::done(Some(closed), Some(event)))
        })
    }

    pub fn handle(&self, command: &Command) -> Result<Reply, AuctionError> {
        match command {
            Command::Open {
                item_id,
                description,
            } => self.open(item_id, description).map(Reply::Opened),
            Command::Bid(bid) => self.submit_bid(bid).map(Reply::BidAccepted),
            Command::Close { item_id } => Ok(match self.close(item_id)? {
                Some(record) => Reply::Closed(record),
                None => Reply::Unchanged,
            }),
        }
    }

    /// Entry point for raw transport messages. Unknown `tipo` values yield
    /// `Ok(None)`; malformed payloads are logged and returned as errors.
    pub fn handle_message(
        &self,
        raw: &str,
        fallback_item: Option<&str>,
    ) -> Result<Option<Reply>, AuctionError> {
        let command = match Command::parse(raw, fallback_item) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(raw, "Unknown command tipo, ignored");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Malformed command dropped");
                return Err(e);
            }
        };
        self.handle(&command).map(Some)
    }

    /// Runs `step` while holding the item's lock, releases, then publishes.
    /// Contention past the retry budget skips the operation.
    fn guarded<T>(
        &self,
        item_id: &str,
        operation: &'static str,
        step: impl FnOnce() -> Result<Step<T>, AuctionError>,
    ) -> Result<T, AuctionError> {
        let lock_key = lock_key(item_id);
        let Some(guard) = self.locks.acquire(&lock_key)? else {
            let attempts = self.locks.options().max_attempts;
            warn!(item_id, operation, attempts, "Lock unavailable, command dropped");
            return Err(AuctionError::LockUnavailable { lock_key, attempts });
        };

        // Early returns drop the guard, which releases
        let step = step()?;
        guard.release()?;

        if let Some(event) = step.event {
            self.fanout.publish(event);
        }
        step.outcome
    }
}
