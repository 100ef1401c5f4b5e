use serde::{Deserialize, Serialize};

/// Monetary amount carried on the wire as a JSON number.
pub type Amount = f64;

/// Description used when an `iniciar` command carries none.
pub const DEFAULT_DESCRIPTION: &str = "Produto Padrão";

/// Lifecycle of one auction round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Registered but not yet accepting bids
    Pending,
    /// Accepting bids
    Active,
    /// Terminal for this round; the record is frozen
    Closed,
}

impl AuctionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(AuctionStatus::Pending),
            "ACTIVE" => Some(AuctionStatus::Active),
            "CLOSED" => Some(AuctionStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuctionStatus::Pending => write!(f, "PENDING"),
            AuctionStatus::Active => write!(f, "ACTIVE"),
            AuctionStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// The canonical state of one auctioned item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRecord {
    /// Stable item identifier
    pub item_id: String,
    pub description: String,
    pub status: AuctionStatus,
    /// Highest accepted bid; 0 until the first bid lands
    pub current_bid: Amount,
    /// Bidder holding `current_bid`
    pub current_winner: Option<String>,
}

impl AuctionRecord {
    /// A fresh round: active, no bids.
    pub fn opened(item_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            description: description.into(),
            status: AuctionStatus::Active,
            current_bid: 0.0,
            current_winner: None,
        }
    }

    pub fn pending(item_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status: AuctionStatus::Pending,
            ..Self::opened(item_id, description)
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AuctionStatus::Active
    }

    /// Key of the record in a flat key-value namespace.
    pub fn data_key(item_id: &str) -> String {
        format!("auction:{}", item_id)
    }
}

/// A bid as it arrives from a participant. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidCommand {
    pub item_id: String,
    pub bidder_id: String,
    pub amount: Amount,
}

impl BidCommand {
    pub fn new(item_id: impl Into<String>, bidder_id: impl Into<String>, amount: Amount) -> Self {
        Self {
            item_id: item_id.into(),
            bidder_id: bidder_id.into(),
            amount,
        }
    }

    /// Checks the fields a bid cannot be applied without.
    pub fn validate(&self) -> Result<(), String> {
        if self.item_id.is_empty() {
            return Err("productId is required".to_string());
        }
        if self.bidder_id.is_empty() {
            return Err("nome is required".to_string());
        }
        validate_amount(self.amount)
    }
}

pub fn validate_amount(amount: Amount) -> Result<(), String> {
    if !amount.is_finite() {
        return Err(format!("valor must be a finite number, got {}", amount));
    }
    if amount < 0.0 {
        return Err(format!("valor must not be negative, got {}", amount));
    }
    Ok(())
}
