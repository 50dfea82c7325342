use std::collections::VecDeque;

use crate::types::PriceSample;

/// Samples kept per market. At ~5 polls/sec this covers the detection window
/// several times over.
pub const HISTORY_BUFFER_SIZE: usize = 50;

/// Bounded, time-ordered buffer of per-poll price samples. Timestamps are
/// non-decreasing because samples are only appended as they are observed;
/// once the buffer is full the oldest entry is dropped first.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    samples: VecDeque<PriceSample>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_BUFFER_SIZE),
        }
    }

    /// O(1): drops the oldest sample when at capacity, then appends.
    pub fn push(&mut self, sample: PriceSample) {
        if self.samples.len() == HISTORY_BUFFER_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(ts_ms: i64) -> PriceSample {
        PriceSample {
            ts_ms,
            yes: dec!(0.5),
            no: dec!(0.5),
        }
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let mut h = PriceHistory::new();
        for i in 0..(HISTORY_BUFFER_SIZE as i64 + 20) {
            h.push(sample(i));
            assert!(h.len() <= HISTORY_BUFFER_SIZE);
        }
        assert_eq!(h.len(), HISTORY_BUFFER_SIZE);
    }

    #[test]
    fn retains_exactly_the_most_recent_samples_in_order() {
        let mut h = PriceHistory::new();
        for i in 0..(HISTORY_BUFFER_SIZE as i64 + 7) {
            h.push(sample(i));
        }
        let ts: Vec<i64> = h.iter().map(|s| s.ts_ms).collect();
        let expected: Vec<i64> = (7..HISTORY_BUFFER_SIZE as i64 + 7).collect();
        assert_eq!(ts, expected);
    }

    #[test]
    fn short_histories_are_kept_whole() {
        let mut h = PriceHistory::new();
        for i in 0..5 {
            h.push(sample(i));
        }
        assert_eq!(h.len(), 5);
        assert_eq!(h.iter().next().unwrap().ts_ms, 0);
    }
}
