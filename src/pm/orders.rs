use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::pm::signer::{OrderArgs, OrderSigner};
use crate::retry::{Attempt, RetryPolicy};
use crate::types::{now_ms, Order, OrderReceipt};

const ORDER_EXPIRY_SECONDS: i64 = 600;
const GAS_PRIORITY_FEE_GWEI: u64 = 50;
const GAS_BASE_FEE_MULTIPLIER: u64 = 2;
const GWEI: u64 = 1_000_000_000;

/// Outcome prices live strictly below 1.0; the nudge is capped so an order
/// can never ask for a full dollar of probability.
const PRICE_CEILING: Decimal = dec!(0.9999);
const TICK_NUDGE: Decimal = dec!(0.001);
const QUANTITY_DP: u32 = 4;

/// Headroom over the configured notional so price movement between the check
/// and the first fill cannot leave the account short.
const BALANCE_SAFETY_MARGIN: Decimal = dec!(1.05);

/// One tick above market, capped under 1.0, so the order takes immediately.
pub fn snipe_target_price(winning_price: Decimal) -> Decimal {
    (winning_price + TICK_NUDGE).min(PRICE_CEILING)
}

/// Shares purchasable with `amount_usdc` at `target_price`, rounded down so
/// the notional never exceeds the configured amount.
pub fn compute_order_quantity(amount_usdc: Decimal, target_price: Decimal) -> Result<Decimal> {
    anyhow::ensure!(target_price > Decimal::ZERO, "target_price must be positive");
    Ok((amount_usdc / target_price).round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::ToZero))
}

pub fn required_collateral(snipe_amount_usdc: Decimal) -> Decimal {
    snipe_amount_usdc * BALANCE_SAFETY_MARGIN
}

pub fn check_collateral(available: Decimal, required: Decimal) -> Result<()> {
    anyhow::ensure!(
        available >= required,
        "insufficient USDC balance: available {available}, required {required}"
    );
    Ok(())
}

/// Startup preflight: refuses to monitor when the account cannot cover the
/// configured snipe size plus margin.
pub async fn ensure_balance(client: &OrderClient, minimum: Decimal) -> Result<()> {
    let available = client.available_collateral().await?;
    check_collateral(available, minimum)?;
    tracing::info!(available = %available, required = %minimum, "USDC balance check passed");
    Ok(())
}

/// Shapes and signs limit buys. All cryptography lives behind the signer.
#[derive(Clone)]
pub struct OrderAssembler {
    signer: Arc<dyn OrderSigner>,
}

impl OrderAssembler {
    pub fn new(signer: Arc<dyn OrderSigner>) -> Self {
        Self { signer }
    }

    pub async fn build(
        &self,
        token_id: &str,
        price: Decimal,
        size: Decimal,
        max_slippage: Decimal,
    ) -> Result<Order> {
        let expiration_ts = now_ms() / 1000 + ORDER_EXPIRY_SECONDS;
        let args = OrderArgs::limit_buy(token_id.to_string(), price, size, max_slippage, expiration_ts);
        let mut payload = self.signer.sign(&args).await.context("order signing failed")?;
        let Some(obj) = payload.as_object_mut() else {
            anyhow::bail!("signer returned a non-object payload");
        };
        obj.insert(
            "gasParameters".to_string(),
            json!({
                "maxPriorityFeePerGas": GAS_PRIORITY_FEE_GWEI * GWEI,
                "maxFeePerGas": GAS_BASE_FEE_MULTIPLIER * GAS_PRIORITY_FEE_GWEI * GWEI,
            }),
        );
        Ok(Order {
            client_id: Uuid::new_v4(),
            token_id: token_id.to_string(),
            payload,
        })
    }
}

#[derive(Clone)]
pub struct OrderClient {
    host: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl OrderClient {
    pub fn new(host: String, http: reqwest::Client) -> Self {
        Self {
            host,
            http,
            retry: RetryPolicy::orders(),
        }
    }

    /// Posts a signed order. Exhausting the retry budget here is a hard
    /// failure that must reach the caller: a lost submission after a trigger
    /// is operationally significant, unlike a missed poll. The order is not
    /// resubmitted once its outcome is unknown.
    pub async fn submit(&self, order: &Order) -> Result<OrderReceipt> {
        let url = format!("{}/orders", self.host.trim_end_matches('/'));
        self.retry
            .run("POST /orders", || {
                let http = self.http.clone();
                let url = url.clone();
                let payload = order.payload.clone();
                async move {
                    let resp = match http.post(&url).json(&payload).send().await {
                        Ok(r) => r,
                        Err(err) => return Attempt::Transient(err.into()),
                    };
                    if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                        return Attempt::RateLimited;
                    }
                    let resp = match resp.error_for_status() {
                        Ok(r) => r,
                        Err(err) => return Attempt::Transient(err.into()),
                    };
                    match resp.json::<OrderReceipt>().await {
                        Ok(receipt) => Attempt::Done(receipt),
                        Err(err) => Attempt::Transient(err.into()),
                    }
                }
            })
            .await
    }

    /// Available collateral for the configured account.
    pub async fn available_collateral(&self) -> Result<Decimal> {
        let url = format!("{}/balance", self.host.trim_end_matches('/'));
        let balances: HashMap<String, AssetBalance> = self
            .http
            .get(&url)
            .send()
            .await
            .context("GET /balance failed")?
            .error_for_status()
            .context("GET /balance non-200")?
            .json()
            .await
            .context("decode /balance json failed")?;
        Ok(balances
            .get("USDC")
            .map(|b| b.available)
            .unwrap_or(Decimal::ZERO))
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct AssetBalance {
    #[serde(default)]
    available: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    #[test]
    fn target_price_nudges_one_tick_above_market() {
        assert_eq!(snipe_target_price(dec!(0.97)), dec!(0.971));
    }

    #[test]
    fn target_price_is_capped_below_one() {
        assert_eq!(snipe_target_price(dec!(0.9995)), dec!(0.9999));
        assert_eq!(snipe_target_price(dec!(0.9999)), dec!(0.9999));
    }

    #[test]
    fn quantity_notional_never_exceeds_the_requested_amount() {
        let amount = dec!(100);
        for price in [dec!(0.07), dec!(0.33), dec!(0.5), dec!(0.971), dec!(0.9999)] {
            let size = compute_order_quantity(amount, price).unwrap();
            assert!(size * price <= amount, "overspend at price {price}");
            assert_eq!(size, size.round_dp(QUANTITY_DP), "size not quantized at {price}");
        }
    }

    #[test]
    fn quantity_rounds_down_to_four_decimals() {
        assert_eq!(
            compute_order_quantity(dec!(100), dec!(0.971)).unwrap(),
            dec!(102.9866)
        );
    }

    #[test]
    fn quantity_rejects_non_positive_price() {
        assert!(compute_order_quantity(dec!(10), dec!(0)).is_err());
        assert!(compute_order_quantity(dec!(10), dec!(-0.5)).is_err());
    }

    #[test]
    fn balance_guard_demands_margin_over_notional() {
        let required = required_collateral(dec!(10));
        assert_eq!(required, dec!(10.50));
        assert!(check_collateral(dec!(5), required).is_err());
        assert!(check_collateral(dec!(10.50), required).is_ok());
    }

    struct StubSigner;

    #[async_trait]
    impl OrderSigner for StubSigner {
        async fn sign(&self, args: &OrderArgs) -> Result<serde_json::Value> {
            Ok(json!({
                "order": serde_json::to_value(args)?,
                "signature": "0xstub",
            }))
        }
    }

    struct OpaqueSigner;

    #[async_trait]
    impl OrderSigner for OpaqueSigner {
        async fn sign(&self, _args: &OrderArgs) -> Result<serde_json::Value> {
            Ok(json!("not an object"))
        }
    }

    #[tokio::test]
    async fn build_attaches_gas_parameters_to_the_signed_payload() {
        let assembler = OrderAssembler::new(Arc::new(StubSigner));
        let order = assembler
            .build("tok", dec!(0.971), dec!(10), dec!(0.01))
            .await
            .unwrap();
        assert_eq!(order.token_id, "tok");
        let gas = &order.payload["gasParameters"];
        assert_eq!(gas["maxPriorityFeePerGas"], 50 * GWEI);
        assert_eq!(gas["maxFeePerGas"], 100 * GWEI);
        assert_eq!(order.payload["signature"], "0xstub");
    }

    #[tokio::test]
    async fn build_rejects_a_non_object_signer_payload() {
        let assembler = OrderAssembler::new(Arc::new(OpaqueSigner));
        assert!(assembler
            .build("tok", dec!(0.971), dec!(10), dec!(0.01))
            .await
            .is_err());
    }
}
