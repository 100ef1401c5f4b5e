use axum::http::StatusCode;
use serde::Serialize;

use bidlock_core::coordinator::Reply;
use bidlock_core::error::AuctionError;
use bidlock_core::types::{Amount, AuctionRecord};

// ─── Error Mapping ──────────────────────────────────────────────────────────

pub fn status_for(error: &AuctionError) -> StatusCode {
    match error {
        AuctionError::MalformedCommand(_) => StatusCode::BAD_REQUEST,
        AuctionError::LockUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AuctionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::CONFLICT,
    }
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            code: None,
        }
    }

    pub fn from_error(error: &AuctionError) -> Self {
        Self {
            code: Some(error.code()),
            ..Self::err(error.to_string())
        }
    }
}

#[derive(Serialize)]
pub struct AuctionView {
    pub item_id: String,
    pub description: String,
    pub status: String,
    pub current_bid: Amount,
    pub current_winner: Option<String>,
}

impl From<&AuctionRecord> for AuctionView {
    fn from(record: &AuctionRecord) -> Self {
        Self {
            item_id: record.item_id.clone(),
            description: record.description.clone(),
            status: record.status.to_string(),
            current_bid: record.current_bid,
            current_winner: record.current_winner.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct CommandResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auction: Option<AuctionView>,
}

impl CommandResponse {
    /// Well-formed command with a `tipo` nobody handles.
    pub fn ignored() -> Self {
        Self {
            outcome: "IGNORED",
            auction: None,
        }
    }
}

impl From<&Reply> for CommandResponse {
    fn from(reply: &Reply) -> Self {
        let outcome = match reply {
            Reply::Opened(_) => "OPENED",
            Reply::BidAccepted(_) => "BID_ACCEPTED",
            Reply::Closed(_) => "CLOSED",
            Reply::Unchanged => "UNCHANGED",
        };
        Self {
            outcome,
            auction: reply.record().map(AuctionView::from),
        }
    }
}

#[derive(Serialize)]
pub struct EvictResponse {
    pub evicted: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub product_id: String,
    pub subscribers: usize,
    pub version: String,
}
