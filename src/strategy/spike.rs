use rust_decimal::Decimal;

use crate::history::PriceHistory;
use crate::types::{Market, PricePair, Winner};

/// Picks the currently leading outcome. YES wins ties, so a 0.50/0.50 book
/// always resolves to the YES token. Re-evaluated every poll since the
/// leading side can flip right up to resolution.
pub fn resolve_winner(prices: &PricePair, market: &Market) -> Winner {
    if prices.yes >= prices.no {
        Winner {
            token_id: market.yes_token.clone(),
            price: prices.yes,
            is_yes: true,
        }
    } else {
        Winner {
            token_id: market.no_token.clone(),
            price: prices.no,
            is_yes: false,
        }
    }
}

/// Did the winning side gain at least `spike_threshold` (relative) against
/// the oldest sample inside the trailing window?
///
/// The baseline is deliberately the earliest in-window sample rather than a
/// rolling average: a resolution jump happens within seconds, and averaging
/// would smooth it away. Fewer than two in-window samples means no baseline,
/// hence no spike; a non-positive baseline is treated the same.
pub fn detect_spike(
    history: &PriceHistory,
    now_ms: i64,
    winning_price: Decimal,
    winner_is_yes: bool,
    spike_threshold: Decimal,
    window_secs: u64,
) -> bool {
    let window_ms = window_secs as i64 * 1000;
    let mut recent = history.iter().filter(|s| now_ms - s.ts_ms <= window_ms);
    let Some(oldest) = recent.next() else {
        return false;
    };
    if recent.next().is_none() {
        return false;
    }
    let baseline = if winner_is_yes { oldest.yes } else { oldest.no };
    if baseline <= Decimal::ZERO {
        return false;
    }
    (winning_price - baseline) / baseline >= spike_threshold
}
