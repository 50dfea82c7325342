use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::Side;

pub const POLYGON_CHAIN_ID: u64 = 137;
/// Proxy-wallet signatures, the scheme the relayer expects for funder
/// accounts.
const SIGNATURE_TYPE: u8 = 2;

/// Raw order fields handed to the signing capability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderArgs {
    pub token_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub time_in_force: String,
    pub expiration_ts: i64,
    pub max_slippage: Decimal,
    pub signature_type: u8,
    pub chain_id: u64,
}

impl OrderArgs {
    pub fn limit_buy(
        token_id: String,
        price: Decimal,
        size: Decimal,
        max_slippage: Decimal,
        expiration_ts: i64,
    ) -> Self {
        Self {
            token_id,
            side: Side::Buy,
            price,
            size,
            time_in_force: "GTC".to_string(),
            expiration_ts,
            max_slippage,
            signature_type: SIGNATURE_TYPE,
            chain_id: POLYGON_CHAIN_ID,
        }
    }
}

/// Turns raw order fields into a fully signed, submission-ready payload.
/// Implementations own all cryptography; a rejection here aborts the current
/// snipe attempt and nothing else.
#[async_trait]
pub trait OrderSigner: Send + Sync {
    async fn sign(&self, args: &OrderArgs) -> Result<serde_json::Value>;
}

/// Signing service reached over HTTP: POST the raw fields, get the signed
/// payload back verbatim. Not retried — signing failures are never transient
/// from this side.
pub struct RemoteSigner {
    endpoint: String,
    http: reqwest::Client,
}

impl RemoteSigner {
    pub fn new(endpoint: String, http: reqwest::Client) -> Self {
        Self { endpoint, http }
    }
}

#[async_trait]
impl OrderSigner for RemoteSigner {
    async fn sign(&self, args: &OrderArgs) -> Result<serde_json::Value> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(args)
            .send()
            .await
            .context("signer unreachable")?
            .error_for_status()
            .context("signer rejected order")?;
        resp.json().await.context("decode signer response failed")
    }
}
