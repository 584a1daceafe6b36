//! Risk-based position sizing.
//!
//! size = min(floor(cash * risk / (atr * stop_multiplier)), floor(cash / price))
//!
//! Zero means "no trade". Missing or non-positive inputs give zero rather
//! than an error so that sizing stays a neutral outcome of the bar.

use super::strategy::StrategyConfig;

pub fn position_size(
    cash: f64,
    atr: Option<f64>,
    stop_multiplier: f64,
    risk_fraction: f64,
    price: f64,
) -> u64 {
    let Some(atr) = atr else {
        return 0;
    };
    let inputs = [cash, atr, stop_multiplier, risk_fraction, price];
    if inputs.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return 0;
    }

    let stop_distance = atr * stop_multiplier;
    if stop_distance <= 0.0 {
        return 0;
    }

    let raw = (cash * risk_fraction / stop_distance).floor();
    let affordable = (cash / price).floor();
    let size = raw.min(affordable);

    if size < 1.0 {
        0
    } else {
        // `as` saturates for values above u64::MAX
        size as u64
    }
}

/// [`position_size`] bound to a strategy's stop multiplier and risk fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    stop_multiplier: f64,
    risk_fraction: f64,
}

impl PositionSizer {
    pub fn new(config: &StrategyConfig) -> Self {
        PositionSizer {
            stop_multiplier: config.stop_loss_atr_multiplier,
            risk_fraction: config.risk_per_trade,
        }
    }

    pub fn size(&self, cash: f64, atr: Option<f64>, price: f64) -> u64 {
        position_size(cash, atr, self.stop_multiplier, self.risk_fraction, price)
    }

    /// Distance between entry and initial stop for the given ATR.
    pub fn stop_distance(&self, atr: f64) -> f64 {
        atr * self.stop_multiplier
    }
}
