use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::retry::{Attempt, RetryPolicy};
use crate::types::{Market, PricePair, Side};

#[derive(Clone)]
pub struct QuoteClient {
    host: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl QuoteClient {
    pub fn new(host: String, http: reqwest::Client) -> Self {
        Self {
            host,
            http,
            retry: RetryPolicy::quotes(),
        }
    }

    /// Fetches current BUY-side prices for both outcome tokens in one
    /// request. An error means this poll produced no usable data; the caller
    /// decides whether to keep looping.
    pub async fn get_prices(&self, market: &Market) -> Result<PricePair> {
        let url = format!("{}/prices", self.host.trim_end_matches('/'));
        let body = [
            PriceReq {
                token_id: market.yes_token.clone(),
                side: Side::Buy,
            },
            PriceReq {
                token_id: market.no_token.clone(),
                side: Side::Buy,
            },
        ];

        self.retry
            .run("POST /prices", || {
                let http = self.http.clone();
                let url = url.clone();
                let body = body.clone();
                async move {
                    let resp = match http.post(&url).json(&body).send().await {
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
                    // Past this point a bad body is a data-integrity problem,
                    // not a transient fault.
                    let entries: Vec<PriceEntry> = match resp.json().await {
                        Ok(v) => v,
                        Err(err) => {
                            return Attempt::Fatal(
                                anyhow::Error::from(err).context("decode /prices json failed"),
                            )
                        }
                    };
                    match extract_pair(&entries, market) {
                        Ok(pair) => Attempt::Done(pair),
                        Err(err) => Attempt::Fatal(err),
                    }
                }
            })
            .await
    }
}

fn extract_pair(entries: &[PriceEntry], market: &Market) -> Result<PricePair> {
    let price_for = |token: &str| -> Result<Decimal> {
        let raw = entries
            .iter()
            .find(|e| e.token_id == token)
            .map(|e| e.price.as_str())
            .ok_or_else(|| anyhow!("token {token} missing from /prices response"))?;
        raw.parse::<Decimal>()
            .with_context(|| format!("bad price {raw:?} for token {token}"))
    };
    Ok(PricePair {
        yes: price_for(&market.yes_token)?,
        no: price_for(&market.no_token)?,
    })
}

#[derive(Debug, Clone, Serialize)]
struct PriceReq {
    token_id: String,
    side: Side,
}

#[derive(Debug, Clone, Deserialize)]
struct PriceEntry {
    token_id: String,
    price: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        Market::new("cond".into(), "111".into(), "222".into(), "Test".into())
    }

    fn entry(token_id: &str, price: &str) -> PriceEntry {
        PriceEntry {
            token_id: token_id.to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn extracts_both_token_prices() {
        let entries = [entry("222", "0.03"), entry("111", "0.97")];
        let pair = extract_pair(&entries, &market()).unwrap();
        assert_eq!(pair.yes, dec!(0.97));
        assert_eq!(pair.no, dec!(0.03));
    }

    #[test]
    fn missing_token_is_an_error() {
        let entries = [entry("111", "0.97")];
        assert!(extract_pair(&entries, &market()).is_err());
    }

    #[test]
    fn unparseable_price_is_an_error() {
        let entries = [entry("111", "0.97"), entry("222", "n/a")];
        assert!(extract_pair(&entries, &market()).is_err());
    }
}
