use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Market;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_clob_host")]
    pub clob_host: String,
    /// Signing service that turns raw order fields into a signed payload.
    pub signer_url: String,
    pub api_key: String,
    pub api_secret: String,

    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    #[serde(default = "default_history_window_sec")]
    pub history_window_sec: u64,

    // Decimal-valued knobs arrive as strings and are parsed in main.
    #[serde(default = "default_price_threshold")]
    pub price_threshold: String,
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold: String,
    #[serde(default = "default_max_slippage")]
    pub max_slippage: String,
    pub snipe_amount_usdc: String,

    #[serde(default)]
    pub dry_run: bool,

    /// JSON object: {slug: {condition_id, yes_token, no_token, name?}}
    pub markets: String,

    // Stats
    #[serde(default = "default_stats_log_sec")]
    pub stats_log_sec: u64,
    pub stats_jsonl_path: Option<String>,
}

fn default_clob_host() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_poll_ms() -> u64 {
    200
}

fn default_history_window_sec() -> u64 {
    10
}

fn default_price_threshold() -> String {
    "0.97".to_string()
}

fn default_spike_threshold() -> String {
    "0.15".to_string()
}

fn default_max_slippage() -> String {
    "0.01".to_string()
}

fn default_stats_log_sec() -> u64 {
    30
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let c = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;
        Ok(c.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MarketEntry {
    condition_id: String,
    yes_token: String,
    no_token: String,
    #[serde(default)]
    name: Option<String>,
}

/// Parses the MARKETS payload into monitorable markets. The display name
/// falls back to the entry's slug key.
pub fn load_markets(raw: &str) -> Result<Vec<Market>> {
    let entries: HashMap<String, MarketEntry> =
        serde_json::from_str(raw).context("decode MARKETS json failed")?;
    Ok(entries
        .into_iter()
        .map(|(slug, e)| {
            Market::new(
                e.condition_id,
                e.yes_token,
                e.no_token,
                e.name.unwrap_or(slug),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_market_entries_with_name_fallback() {
        let raw = r#"{"will-x-happen": {"condition_id": "0xc", "yes_token": "111", "no_token": "222"}}"#;
        let markets = load_markets(raw).unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].condition_id, "0xc");
        assert_eq!(markets[0].yes_token, "111");
        assert_eq!(markets[0].no_token, "222");
        assert_eq!(markets[0].name, "will-x-happen");
        assert_eq!(markets[0].last_snipe_ms, 0);
    }

    #[test]
    fn explicit_name_wins_over_slug() {
        let raw = r#"{"slug": {"condition_id": "0xc", "yes_token": "1", "no_token": "2", "name": "US election"}}"#;
        let markets = load_markets(raw).unwrap();
        assert_eq!(markets[0].name, "US election");
    }

    #[test]
    fn rejects_malformed_markets_json() {
        assert!(load_markets("not json").is_err());
        assert!(load_markets(r#"{"slug": {"condition_id": "0xc"}}"#).is_err());
    }
}
