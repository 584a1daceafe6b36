//! Average True Range, updated one bar at a time.
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! Seed with the mean of the first n true ranges, then Wilder smoothing:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub(crate) struct WilderAtr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    count: usize,
    value: Option<f64>,
}

impl WilderAtr {
    pub(crate) fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev_close: None,
            seed_sum: 0.0,
            count: 0,
            value: None,
        }
    }

    pub(crate) fn update(&mut self, bar: &Bar) -> Option<f64> {
        let tr = match self.prev_close {
            None => bar.high - bar.low,
            Some(prev_close) => bar.true_range(prev_close),
        };
        self.prev_close = Some(bar.close);
        self.count += 1;

        let n = self.period as f64;
        self.value = match self.value {
            Some(prev) => Some((prev * (n - 1.0) + tr) / n),
            None => {
                self.seed_sum += tr;
                (self.count == self.period).then(|| self.seed_sum / n)
            }
        };
        self.value
    }
}
