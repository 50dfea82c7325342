use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::pm::orders::{compute_order_quantity, snipe_target_price, OrderAssembler, OrderClient};
use crate::pm::quotes::QuoteClient;
use crate::stats::Stats;
use crate::strategy::{detect_spike, resolve_winner};
use crate::types::{now_ms, Market, PricePair, PriceSample, SnipeParams, Winner};

/// Per-market control loop: poll, record, evaluate, snipe. Each monitor owns
/// its market outright; nothing is shared across monitors except the
/// read-only params and the stats counters.
pub struct MarketMonitor {
    market: Market,
    params: Arc<SnipeParams>,
    quotes: QuoteClient,
    orders: OrderClient,
    assembler: OrderAssembler,
    stats: Arc<Stats>,
    poll_interval: Duration,
}

impl MarketMonitor {
    pub fn new(
        market: Market,
        params: Arc<SnipeParams>,
        quotes: QuoteClient,
        orders: OrderClient,
        assembler: OrderAssembler,
        stats: Arc<Stats>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            market,
            params,
            quotes,
            orders,
            assembler,
            stats,
            poll_interval,
        }
    }

    /// Runs until the task is aborted. Poll failures and failed snipe
    /// attempts never terminate the loop; the polling cadence is constant
    /// and backoff lives inside the clients.
    pub async fn run(mut self) {
        tracing::info!(
            market = %self.market.name,
            condition = %self.market.condition_id,
            "started monitoring"
        );
        loop {
            self.poll_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn poll_once(&mut self) {
        let prices = match self.quotes.get_prices(&self.market).await {
            Ok(p) => {
                self.stats.inc_poll_ok();
                p
            }
            Err(err) => {
                self.stats.inc_poll_failed();
                tracing::warn!(market = %self.market.name, error = %err, "price poll failed");
                return;
            }
        };

        let now = now_ms();
        self.market.history.push(PriceSample {
            ts_ms: now,
            yes: prices.yes,
            no: prices.no,
        });

        let Some(winner) = snipe_signal(&self.market, now, &prices, &self.params) else {
            return;
        };

        // Commit the cooldown before executing: a slow or failed submission
        // must not re-arm the trigger on the very next poll.
        self.market.last_snipe_ms = now;
        self.stats.inc_spike();
        if let Err(err) = self.snipe(&winner).await {
            self.stats.inc_order_failed();
            tracing::error!(
                market = %self.market.name,
                token = %winner.token_id,
                error = %err,
                "snipe attempt failed"
            );
        }
    }

    async fn snipe(&self, winner: &Winner) -> Result<()> {
        let target_price = snipe_target_price(winner.price);
        let size = compute_order_quantity(self.params.snipe_amount_usdc, target_price)?;
        tracing::info!(
            market = %self.market.name,
            token = %winner.token_id,
            price = %target_price,
            size = %size,
            "spike trigger hit"
        );
        if self.params.dry_run {
            tracing::info!(market = %self.market.name, "dry-run enabled, skipping order submission");
            return Ok(());
        }

        let order = self
            .assembler
            .build(&winner.token_id, target_price, size, self.params.max_slippage)
            .await?;
        let receipt = self.orders.submit(&order).await?;
        self.stats.inc_order_submitted();
        tracing::info!(
            market = %self.market.name,
            order_id = %order.client_id,
            tx = receipt.tx_hash.as_deref().unwrap_or("?"),
            "snipe order submitted"
        );
        Ok(())
    }
}

/// Decides whether this poll should fire a snipe. Inside the cooldown window
/// the signal is not evaluated at all, so one spike cannot trigger twice
/// while the history still reflects it. The cooldown length is the history
/// window itself.
fn snipe_signal(
    market: &Market,
    now_ms: i64,
    prices: &PricePair,
    params: &SnipeParams,
) -> Option<Winner> {
    let window_ms = params.history_window_sec as i64 * 1000;
    if now_ms - market.last_snipe_ms < window_ms {
        return None;
    }
    let winner = resolve_winner(prices, market);
    let spiking = detect_spike(
        &market.history,
        now_ms,
        winner.price,
        winner.is_yes,
        params.spike_threshold,
        params.history_window_sec,
    );
    (winner.price >= params.price_threshold && spiking).then_some(winner)
}
