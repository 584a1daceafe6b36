//! OHLCV bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One immutable price/volume observation. Feeds deliver bars in strictly
/// ascending `timestamp` order; spacing between bars is not assumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Widest of the bar's own range and the gaps from the previous close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let span = self.high - self.low;
        span.max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }

    /// All prices finite and positive, high/low bracketing open/close,
    /// volume finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.volume.is_finite()
            && self.volume >= 0.0
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}
