//! Entry conditions for the trend/volume breakout.
//!
//! Long: close above the trend average, close strictly above the prior
//! highest high, recent volume above `volume_avg * vol_multiplier`, and
//! ATR/close not below the volatility floor. Short mirrors with the trend
//! average and prior lowest low. Long is checked first and wins a tie.

use super::indicator::IndicatorSnapshot;
use super::ohlcv::Bar;
use super::position::Direction;
use super::strategy::{StrategyConfig, VolumeConfirmation};

/// Bar history up to and including the current bar, with the current bar's
/// indicator snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    history: &'a [Bar],
    bar: &'a Bar,
    snapshot: &'a IndicatorSnapshot,
}

impl<'a> MarketView<'a> {
    /// `None` for an empty history.
    pub fn new(history: &'a [Bar], snapshot: &'a IndicatorSnapshot) -> Option<Self> {
        let bar = history.last()?;
        Some(MarketView {
            history,
            bar,
            snapshot,
        })
    }

    pub fn bar(&self) -> &'a Bar {
        self.bar
    }

    pub fn history(&self) -> &'a [Bar] {
        self.history
    }

    pub fn snapshot(&self) -> &'a IndicatorSnapshot {
        self.snapshot
    }

    pub fn index(&self) -> usize {
        self.history.len() - 1
    }

    /// Volumes of the last `n` bars (fewer if the history is shorter).
    fn recent_volumes(&self, n: usize) -> impl Iterator<Item = f64> + 'a {
        let start = self.history.len().saturating_sub(n);
        self.history[start..].iter().map(|b| b.volume)
    }
}

/// Per-condition outcome for one direction on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionCheck {
    pub trend: bool,
    pub breakout: bool,
    pub volume: bool,
    pub volatility: bool,
}

impl ConditionCheck {
    pub fn all(&self) -> bool {
        self.trend && self.breakout && self.volume && self.volatility
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvaluator {
    vol_multiplier: f64,
    volume_confirmation: VolumeConfirmation,
    confirmation_bars: usize,
    volatility_threshold: f64,
}

impl SignalEvaluator {
    pub fn new(config: &StrategyConfig) -> Self {
        SignalEvaluator {
            vol_multiplier: config.vol_multiplier,
            volume_confirmation: config.volume_confirmation,
            confirmation_bars: config.volume_confirmation_bars.max(1),
            volatility_threshold: config.volatility_threshold,
        }
    }

    /// Condition breakdown, or `None` while any indicator is warming up.
    pub fn evaluate(&self, view: &MarketView<'_>, direction: Direction) -> Option<ConditionCheck> {
        let snap = view.snapshot();
        let trend_avg = snap.trend_avg?;
        let volume_avg = snap.volume_avg?;
        let atr = snap.volatility_range?;
        let close = view.bar().close;

        let (trend, breakout) = match direction {
            Direction::Long => (close > trend_avg, close > snap.prior_highest_high?),
            Direction::Short => (close < trend_avg, close < snap.prior_lowest_low?),
        };

        Some(ConditionCheck {
            trend,
            breakout,
            volume: self.volume_confirmed(view, volume_avg),
            volatility: self.volatility_ok(atr, close),
        })
    }

    pub fn check_long(&self, view: &MarketView<'_>) -> bool {
        self.evaluate(view, Direction::Long)
            .is_some_and(|c| c.all())
    }

    pub fn check_short(&self, view: &MarketView<'_>) -> bool {
        self.evaluate(view, Direction::Short)
            .is_some_and(|c| c.all())
    }

    /// The entry direction for this bar, long first.
    pub fn entry_signal(&self, view: &MarketView<'_>) -> Option<Direction> {
        if self.check_long(view) {
            Some(Direction::Long)
        } else if self.check_short(view) {
            Some(Direction::Short)
        } else {
            None
        }
    }

    fn volume_confirmed(&self, view: &MarketView<'_>, volume_avg: f64) -> bool {
        let threshold = volume_avg * self.vol_multiplier;
        let mut recent = view.recent_volumes(self.confirmation_bars);
        match self.volume_confirmation {
            VolumeConfirmation::All => recent.all(|v| v > threshold),
            VolumeConfirmation::Any => recent.any(|v| v > threshold),
        }
    }

    fn volatility_ok(&self, atr: f64, close: f64) -> bool {
        if self.volatility_threshold <= 0.0 {
            return true;
        }
        close > 0.0 && atr / close >= self.volatility_threshold
    }
}
