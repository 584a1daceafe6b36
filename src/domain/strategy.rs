//! Strategy configuration.
//!
//! Fixed at construction; a [`StrategyController`](crate::domain::controller::StrategyController)
//! refuses a config that fails [`StrategyConfig::validate`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SniperError;

/// Upper bound for the volume confirmation window.
pub const MAX_CONFIRMATION_BARS: usize = 3;

/// How the recent volume window must relate to the volume threshold.
///
/// `All` requires every bar in the window to exceed the threshold and trades
/// less often; `Any` accepts a single qualifying bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeConfirmation {
    #[default]
    All,
    Any,
}

impl fmt::Display for VolumeConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeConfirmation::All => write!(f, "all"),
            VolumeConfirmation::Any => write!(f, "any"),
        }
    }
}

impl FromStr for VolumeConfirmation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "strict" => Ok(VolumeConfirmation::All),
            "any" | "lenient" => Ok(VolumeConfirmation::Any),
            other => Err(format!("unknown volume confirmation policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub trend_period: usize,
    pub vol_ma_period: usize,
    pub vol_multiplier: f64,
    pub atr_period: usize,
    pub stop_loss_atr_multiplier: f64,
    pub risk_per_trade: f64,
    pub breakout_period: usize,
    pub trailing_stop_atr_multiplier: f64,
    pub use_trailing_stop: bool,
    /// Minimum ATR / close ratio; 0 disables the gate.
    pub volatility_threshold: f64,
    pub volume_confirmation: VolumeConfirmation,
    pub volume_confirmation_bars: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "Trend Volume Sniper".into(),
            trend_period: 60,
            vol_ma_period: 20,
            vol_multiplier: 1.5,
            atr_period: 14,
            stop_loss_atr_multiplier: 2.0,
            risk_per_trade: 0.02,
            breakout_period: 20,
            trailing_stop_atr_multiplier: 3.0,
            use_trailing_stop: true,
            volatility_threshold: 0.0,
            volume_confirmation: VolumeConfirmation::All,
            volume_confirmation_bars: 1,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), SniperError> {
        for (key, period) in [
            ("trend_period", self.trend_period),
            ("vol_ma_period", self.vol_ma_period),
            ("atr_period", self.atr_period),
            ("breakout_period", self.breakout_period),
        ] {
            if period == 0 {
                return Err(SniperError::invalid(
                    "strategy",
                    key,
                    format!("{key} must be positive"),
                ));
            }
        }

        positive_finite("vol_multiplier", self.vol_multiplier)?;
        positive_finite("stop_loss_atr_multiplier", self.stop_loss_atr_multiplier)?;
        if self.use_trailing_stop {
            positive_finite(
                "trailing_stop_atr_multiplier",
                self.trailing_stop_atr_multiplier,
            )?;
        }

        if !(self.risk_per_trade > 0.0 && self.risk_per_trade < 1.0) {
            return Err(SniperError::invalid(
                "strategy",
                "risk_per_trade",
                "risk_per_trade must be between 0 and 1 (exclusive)",
            ));
        }

        if !(self.volatility_threshold >= 0.0 && self.volatility_threshold < 1.0) {
            return Err(SniperError::invalid(
                "strategy",
                "volatility_threshold",
                "volatility_threshold must be in [0, 1)",
            ));
        }

        if !(1..=MAX_CONFIRMATION_BARS).contains(&self.volume_confirmation_bars) {
            return Err(SniperError::invalid(
                "strategy",
                "volume_confirmation_bars",
                format!("volume_confirmation_bars must be between 1 and {MAX_CONFIRMATION_BARS}"),
            ));
        }
        if self.volume_confirmation_bars > self.vol_ma_period {
            return Err(SniperError::invalid(
                "strategy",
                "volume_confirmation_bars",
                "volume_confirmation_bars cannot exceed vol_ma_period",
            ));
        }

        Ok(())
    }
}

fn positive_finite(key: &str, value: f64) -> Result<(), SniperError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SniperError::invalid(
            "strategy",
            key,
            format!("{key} must be a positive number"),
        ))
    }
}
