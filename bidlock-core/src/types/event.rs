use serde::{Deserialize, Serialize};

use super::Amount;

/// Why a bid was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Offer below the current bid
    Lower,
    /// Offer equal to the current bid
    Equal,
    /// No active auction for the item
    NotActive,
}

impl RejectReason {
    pub fn compare(offered: Amount, current: Amount) -> Self {
        if offered < current {
            RejectReason::Lower
        } else {
            RejectReason::Equal
        }
    }
}

/// A state change broadcast to subscribers. Delivery is best-effort, so
/// consumers must tolerate duplicates and reordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuctionEvent {
    Started {
        item_id: String,
        description: String,
        current_bid: Amount,
    },
    BidAccepted {
        item_id: String,
        bidder_id: String,
        amount: Amount,
    },
    BidRejected {
        item_id: String,
        bidder_id: String,
        amount: Amount,
        current_bid: Amount,
        reason: RejectReason,
    },
    Closed {
        item_id: String,
        winner: Option<String>,
        final_bid: Amount,
    },
}

impl AuctionEvent {
    pub fn item_id(&self) -> &str {
        match self {
            AuctionEvent::Started { item_id, .. }
            | AuctionEvent::BidAccepted { item_id, .. }
            | AuctionEvent::BidRejected { item_id, .. }
            | AuctionEvent::Closed { item_id, .. } => item_id,
        }
    }
}
