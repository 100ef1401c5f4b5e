//! JSON wire contract shared with existing auction clients.
//!
//! Field names and `tipo` values are fixed by those clients and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AuctionError;
use crate::types::{
    validate_amount, Amount, AuctionEvent, BidCommand, RejectReason, DEFAULT_DESCRIPTION,
};

// ─── Inbound Commands ───────────────────────────────────────────────────────

pub const TIPO_OPEN: &str = "iniciar";
pub const TIPO_BID: &str = "lance";
pub const TIPO_CLOSE: &str = "finalizar";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { item_id: String, description: String },
    Bid(BidCommand),
    Close { item_id: String },
}

#[derive(Deserialize)]
struct RawCommand {
    tipo: Option<String>,
    #[serde(rename = "productId")]
    product_id: Option<String>,
    nome: Option<String>,
    valor: Option<Value>,
    #[serde(alias = "item")]
    descricao: Option<String>,
}

impl Command {
    /// Parses one inbound message. `Ok(None)` for a well-formed message with a
    /// `tipo` this coordinator does not handle. `fallback_item` stands in for a
    /// missing `productId`.
    pub fn parse(raw: &str, fallback_item: Option<&str>) -> Result<Option<Self>, AuctionError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AuctionError::MalformedCommand(format!("invalid JSON: {}", e)))?;
        Self::from_value(value, fallback_item)
    }

    pub fn from_value(value: Value, fallback_item: Option<&str>) -> Result<Option<Self>, AuctionError> {
        if !value.is_object() {
            return Err(AuctionError::MalformedCommand(
                "command must be a JSON object".to_string(),
            ));
        }
        let raw: RawCommand = serde_json::from_value(value)
            .map_err(|e| AuctionError::MalformedCommand(e.to_string()))?;

        let tipo = raw
            .tipo
            .ok_or_else(|| AuctionError::MalformedCommand("tipo is required".to_string()))?;
        if !matches!(tipo.as_str(), TIPO_OPEN | TIPO_BID | TIPO_CLOSE) {
            return Ok(None);
        }

        let item_id = match raw.product_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => match fallback_item {
                Some(id) => id.to_string(),
                None => {
                    return Err(AuctionError::MalformedCommand(
                        "productId is required".to_string(),
                    ));
                }
            },
        };

        let command = match tipo.as_str() {
            TIPO_OPEN => Command::Open {
                item_id,
                description: raw
                    .descricao
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            },
            TIPO_BID => {
                let bidder_id = raw
                    .nome
                    .ok_or_else(|| AuctionError::MalformedCommand("nome is required".to_string()))?;
                let amount = parse_amount(raw.valor)?;
                let bid = BidCommand::new(item_id, bidder_id, amount);
                bid.validate().map_err(AuctionError::MalformedCommand)?;
                Command::Bid(bid)
            }
            TIPO_CLOSE => Command::Close { item_id },
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    pub fn item_id(&self) -> &str {
        match self {
            Command::Open { item_id, .. } | Command::Close { item_id } => item_id,
            Command::Bid(bid) => &bid.item_id,
        }
    }
}

/// `valor` may be a JSON number or a numeric string.
fn parse_amount(valor: Option<Value>) -> Result<Amount, AuctionError> {
    let amount = match valor {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<Amount>().ok(),
        Some(_) => None,
        None => {
            return Err(AuctionError::MalformedCommand(
                "valor is required".to_string(),
            ));
        }
    }
    .ok_or_else(|| AuctionError::MalformedCommand("valor must be numeric".to_string()))?;
    validate_amount(amount).map_err(AuctionError::MalformedCommand)?;
    Ok(amount)
}

// ─── Outbound Notifications ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum Notification {
    #[serde(rename = "inicio")]
    Inicio {
        #[serde(rename = "productId")]
        product_id: String,
        mensagem: String,
        #[serde(rename = "lanceAtual")]
        lance_atual: Amount,
    },
    #[serde(rename = "lance")]
    Lance {
        nome: String,
        valor: Amount,
        #[serde(rename = "productId")]
        product_id: String,
        #[serde(rename = "lanceAtual")]
        lance_atual: Amount,
        mensagem: String,
    },
    #[serde(rename = "lance_invalido")]
    LanceInvalido {
        nome: String,
        valor: Amount,
        #[serde(rename = "productId")]
        product_id: String,
        #[serde(rename = "lanceAtual")]
        lance_atual: Amount,
        motivo: String,
        mensagem: String,
    },
    #[serde(rename = "fim")]
    Fim {
        vencedor: String,
        lance: String,
        #[serde(rename = "productId")]
        product_id: String,
        mensagem: String,
    },
}

impl Notification {
    pub fn mensagem(&self) -> &str {
        match self {
            Notification::Inicio { mensagem, .. }
            | Notification::Lance { mensagem, .. }
            | Notification::LanceInvalido { mensagem, .. }
            | Notification::Fim { mensagem, .. } => mensagem,
        }
    }

    pub fn to_json(&self) -> String {
        // A derived Serialize over strings and finite numbers cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn motivo(reason: RejectReason) -> &'static str {
    match reason {
        RejectReason::Lower => "menor",
        RejectReason::Equal => "igual",
        RejectReason::NotActive => "inativo",
    }
}

impl From<&AuctionEvent> for Notification {
    fn from(event: &AuctionEvent) -> Self {
        match event {
            AuctionEvent::Started {
                item_id,
                current_bid,
                ..
            } => Notification::Inicio {
                product_id: item_id.clone(),
                mensagem: format!("Leilão iniciado para produto {}", item_id),
                lance_atual: *current_bid,
            },
            AuctionEvent::BidAccepted {
                item_id,
                bidder_id,
                amount,
            } => Notification::Lance {
                nome: bidder_id.clone(),
                valor: *amount,
                product_id: item_id.clone(),
                lance_atual: *amount,
                mensagem: format!("Novo lance de {}: R${}", bidder_id, amount),
            },
            AuctionEvent::BidRejected {
                item_id,
                bidder_id,
                amount,
                current_bid,
                reason,
            } => Notification::LanceInvalido {
                nome: bidder_id.clone(),
                valor: *amount,
                product_id: item_id.clone(),
                lance_atual: *current_bid,
                motivo: motivo(*reason).to_string(),
                mensagem: match reason {
                    RejectReason::NotActive => "Leilão não está ativo. Lance ignorado.".to_string(),
                    _ => format!(
                        "Lance de {} (R${}) é {} ao atual (R${}) - Ignorado",
                        bidder_id,
                        amount,
                        motivo(*reason),
                        current_bid
                    ),
                },
            },
            AuctionEvent::Closed {
                item_id,
                winner,
                final_bid,
            } => {
                let vencedor = winner.clone().unwrap_or_else(|| "none".to_string());
                let lance = final_bid.to_string();
                Notification::Fim {
                    mensagem: format!("Leilão finalizado! Vencedor: {} com R${}", vencedor, lance),
                    vencedor,
                    lance,
                    product_id: item_id.clone(),
                }
            }
        }
    }
}
