mod config;
mod history;
mod monitor;
mod retry;
mod stats;
mod types;

mod pm;
mod strategy;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::monitor::MarketMonitor;
use crate::pm::orders::{ensure_balance, required_collateral, OrderAssembler, OrderClient};
use crate::pm::quotes::QuoteClient;
use crate::pm::signer::{OrderSigner, RemoteSigner};
use crate::stats::Stats;
use crate::types::{now_ms, SnipeParams};

/// Per-request ceiling, separate from the retry policy: a timed-out request
/// takes the transient-error path.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

fn parse_decimal(name: &str, s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("{name} is not a valid decimal: {s:?}"))
}

fn auth_headers(api_key: &str, api_secret: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}:{api_secret}"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

async fn maybe_write_jsonl(path: &Option<String>, line: &str) {
    if let Some(p) = path.as_ref().map(|x| x.trim().to_string()).filter(|x| !x.is_empty()) {
        if let Ok(mut f) = tokio::fs::OpenOptions::new().create(true).append(true).open(&p).await {
            use tokio::io::AsyncWriteExt;
            let _ = f.write_all(line.as_bytes()).await;
            let _ = f.write_all(b"\n").await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let s = Settings::from_env()?;

    let params = Arc::new(SnipeParams {
        price_threshold: parse_decimal("PRICE_THRESHOLD", &s.price_threshold)?,
        spike_threshold: parse_decimal("SPIKE_THRESHOLD", &s.spike_threshold)?,
        max_slippage: parse_decimal("MAX_SLIPPAGE", &s.max_slippage)?,
        snipe_amount_usdc: parse_decimal("SNIPE_AMOUNT_USDC", &s.snipe_amount_usdc)?,
        dry_run: s.dry_run,
        history_window_sec: s.history_window_sec,
    });

    let markets = config::load_markets(&s.markets)?;
    anyhow::ensure!(!markets.is_empty(), "no markets configured");

    let http = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .default_headers(auth_headers(&s.api_key, &s.api_secret)?)
        .build()?;

    let quotes = QuoteClient::new(s.clob_host.clone(), http.clone());
    let orders = OrderClient::new(s.clob_host.clone(), http.clone());
    let signer: Arc<dyn OrderSigner> = Arc::new(RemoteSigner::new(s.signer_url.clone(), http));
    let assembler = OrderAssembler::new(signer);

    // Fatal before any monitor starts: a short account means no monitoring.
    ensure_balance(&orders, required_collateral(params.snipe_amount_usdc)).await?;

    let stats = Stats::new(now_ms());
    let poll_interval = Duration::from_millis(s.poll_ms);

    let mut tasks = Vec::with_capacity(markets.len());
    for market in markets {
        let m = MarketMonitor::new(
            market,
            params.clone(),
            quotes.clone(),
            orders.clone(),
            assembler.clone(),
            stats.clone(),
            poll_interval,
        );
        tasks.push(tokio::spawn(m.run()));
    }
    tracing::info!(
        markets = tasks.len(),
        poll_ms = s.poll_ms,
        dry_run = params.dry_run,
        "monitoring started"
    );

    let stats_loop = {
        let stats = stats.clone();
        let every_sec = s.stats_log_sec;
        let jsonl_path = s.stats_jsonl_path.clone();
        async move {
            if every_sec == 0 {
                futures::future::pending::<()>().await;
            }
            loop {
                tokio::time::sleep(Duration::from_secs(every_sec)).await;
                let ss = stats.snapshot(now_ms());
                tracing::info!(
                    up_sec = ss.up_sec,
                    polls_ok = ss.polls_ok,
                    polls_failed = ss.polls_failed,
                    spikes_detected = ss.spikes_detected,
                    orders_submitted = ss.orders_submitted,
                    orders_failed = ss.orders_failed,
                    "stats"
                );
                let line = serde_json::to_string(&ss).unwrap_or_default();
                maybe_write_jsonl(&jsonl_path, &line).await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested, cancelling monitor tasks");
        }
        _ = stats_loop => {}
    }

    for task in &tasks {
        task.abort();
    }
    let _ = futures::future::join_all(tasks).await;
    Ok(())
}
