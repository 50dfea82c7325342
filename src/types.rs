use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::PriceHistory;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One successful poll: BUY-side prices for both outcome tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSample {
    pub ts_ms: i64,
    pub yes: Decimal,
    pub no: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePair {
    pub yes: Decimal,
    pub no: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// One monitored outcome pair. Owned exclusively by its monitor task after
/// startup; no other task reads or writes it.
#[derive(Debug, Clone)]
pub struct Market {
    pub condition_id: String,
    pub yes_token: String,
    pub no_token: String,
    pub name: String,
    pub history: PriceHistory,
    /// Epoch ms of the last snipe trigger for this market, 0 until the first.
    pub last_snipe_ms: i64,
}

impl Market {
    pub fn new(condition_id: String, yes_token: String, no_token: String, name: String) -> Self {
        Self {
            condition_id,
            yes_token,
            no_token,
            name,
            history: PriceHistory::new(),
            last_snipe_ms: 0,
        }
    }
}

/// The currently leading outcome and its price.
#[derive(Debug, Clone)]
pub struct Winner {
    pub token_id: String,
    pub price: Decimal,
    pub is_yes: bool,
}

/// Signed, submission-ready order. Built once, submitted at most once, then
/// discarded; the payload itself is opaque to this process.
#[derive(Debug, Clone)]
pub struct Order {
    pub client_id: Uuid,
    pub token_id: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderReceipt {
    // The relayer has shipped both spellings.
    #[serde(default, alias = "transactionHash", alias = "txHash")]
    pub tx_hash: Option<String>,
}

/// Resolved trigger settings, read-only after startup and shared by every
/// monitor task.
#[derive(Debug, Clone)]
pub struct SnipeParams {
    pub price_threshold: Decimal,
    pub spike_threshold: Decimal,
    pub max_slippage: Decimal,
    pub snipe_amount_usdc: Decimal,
    pub dry_run: bool,
    pub history_window_sec: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_accepts_both_tx_hash_spellings() {
        let a: OrderReceipt = serde_json::from_str(r#"{"transactionHash": "0xabc"}"#).unwrap();
        assert_eq!(a.tx_hash.as_deref(), Some("0xabc"));

        let b: OrderReceipt = serde_json::from_str(r#"{"txHash": "0xdef"}"#).unwrap();
        assert_eq!(b.tx_hash.as_deref(), Some("0xdef"));

        let c: OrderReceipt = serde_json::from_str("{}").unwrap();
        assert!(c.tx_hash.is_none());
    }

    #[test]
    fn side_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Side::Buy).unwrap(), "BUY");
    }
}
