use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct Stats {
    start_ms: AtomicU64,

    polls_ok: AtomicU64,
    polls_failed: AtomicU64,

    spikes_detected: AtomicU64,
    orders_submitted: AtomicU64,
    orders_failed: AtomicU64,
}

impl Stats {
    pub fn new(now_ms: i64) -> Arc<Self> {
        let s = Arc::new(Self::default());
        s.start_ms.store(now_ms as u64, Ordering::Relaxed);
        s
    }

    pub fn inc_poll_ok(&self) {
        self.polls_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_poll_failed(&self) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_spike(&self) {
        self.spikes_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_order_submitted(&self) {
        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_order_failed(&self) {
        self.orders_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, now_ms: i64) -> StatsSnapshot {
        let now = now_ms as u64;
        let start = self.start_ms.load(Ordering::Relaxed);
        StatsSnapshot {
            now_ms: now,
            up_sec: now.saturating_sub(start) / 1000,
            polls_ok: self.polls_ok.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            spikes_detected: self.spikes_detected.load(Ordering::Relaxed),
            orders_submitted: self.orders_submitted.load(Ordering::Relaxed),
            orders_failed: self.orders_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub now_ms: u64,
    pub up_sec: u64,
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub spikes_detected: u64,
    pub orders_submitted: u64,
    pub orders_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_uptime_and_counters() {
        let stats = Stats::new(10_000);
        stats.inc_poll_ok();
        stats.inc_poll_ok();
        stats.inc_poll_failed();
        stats.inc_spike();
        stats.inc_order_submitted();

        let ss = stats.snapshot(73_000);
        assert_eq!(ss.up_sec, 63);
        assert_eq!(ss.polls_ok, 2);
        assert_eq!(ss.polls_failed, 1);
        assert_eq!(ss.spikes_detected, 1);
        assert_eq!(ss.orders_submitted, 1);
        assert_eq!(ss.orders_failed, 0);
    }
}
