//! Causal rolling indicators.
//!
//! [`IndicatorSet`] is fed one bar at a time and produces an
//! [`IndicatorSnapshot`] whose values depend only on bars seen so far:
//! - trend average: SMA of closes over `trend_period`
//! - volume average: SMA of volumes over `vol_ma_period`
//! - volatility range: Wilder ATR over `atr_period`
//! - prior highest high / lowest low over the `breakout_period` bars
//!   *before* the current one, so a bar never breaks out of a window that
//!   contains its own high or low.
//!
//! A value is `None` until its window is full.

mod atr;
mod ring_buffer;

use crate::domain::ohlcv::Bar;
use crate::domain::strategy::StrategyConfig;
use atr::WilderAtr;
use ring_buffer::RingBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub trend_period: usize,
    pub vol_ma_period: usize,
    pub atr_period: usize,
    pub breakout_period: usize,
}

impl IndicatorParams {
    /// Number of bars consumed before every snapshot value is available.
    /// The prior extremes need a full window that ends one bar earlier.
    pub fn warmup_bars(&self) -> usize {
        self.trend_period
            .max(self.vol_ma_period)
            .max(self.atr_period)
            .max(self.breakout_period + 1)
    }
}

impl From<&StrategyConfig> for IndicatorParams {
    fn from(config: &StrategyConfig) -> Self {
        IndicatorParams {
            trend_period: config.trend_period,
            vol_ma_period: config.vol_ma_period,
            atr_period: config.atr_period,
            breakout_period: config.breakout_period,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    /// Zero-based index of the bar this snapshot belongs to.
    pub index: usize,
    pub trend_avg: Option<f64>,
    pub volume_avg: Option<f64>,
    pub volatility_range: Option<f64>,
    pub prior_highest_high: Option<f64>,
    pub prior_lowest_low: Option<f64>,
}

impl IndicatorSnapshot {
    /// Snapshot for a bar with no usable history.
    pub fn unavailable(index: usize) -> Self {
        IndicatorSnapshot {
            index,
            trend_avg: None,
            volume_avg: None,
            volatility_range: None,
            prior_highest_high: None,
            prior_lowest_low: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.trend_avg.is_some()
            && self.volume_avg.is_some()
            && self.volatility_range.is_some()
            && self.prior_highest_high.is_some()
            && self.prior_lowest_low.is_some()
    }

    /// ATR usable for stop distance and sizing: finite and positive.
    pub fn usable_atr(&self) -> Option<f64> {
        self.volatility_range.filter(|atr| atr.is_finite() && *atr > 0.0)
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSet {
    params: IndicatorParams,
    closes: RingBuffer,
    volumes: RingBuffer,
    highs: RingBuffer,
    lows: RingBuffer,
    atr: WilderAtr,
    bars_seen: usize,
}

impl IndicatorSet {
    pub fn new(params: IndicatorParams) -> Self {
        IndicatorSet {
            params,
            closes: RingBuffer::new(params.trend_period),
            volumes: RingBuffer::new(params.vol_ma_period),
            highs: RingBuffer::new(params.breakout_period),
            lows: RingBuffer::new(params.breakout_period),
            atr: WilderAtr::new(params.atr_period),
            bars_seen: 0,
        }
    }

    pub fn params(&self) -> IndicatorParams {
        self.params
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    /// Consume the next bar and return its snapshot.
    pub fn update(&mut self, bar: &Bar) -> IndicatorSnapshot {
        // Extremes are read before the current bar enters the window.
        let prior_highest_high = self.highs.max();
        let prior_lowest_low = self.lows.min();

        self.highs.push(bar.high);
        self.lows.push(bar.low);
        self.closes.push(bar.close);
        self.volumes.push(bar.volume);
        let volatility_range = self.atr.update(bar);

        let index = self.bars_seen;
        self.bars_seen += 1;

        IndicatorSnapshot {
            index,
            trend_avg: self.closes.mean(),
            volume_avg: self.volumes.mean(),
            volatility_range,
            prior_highest_high,
            prior_lowest_low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(i: usize, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::days(i as i64),
            open: close,
            high,
            low,
            close,
            volume,
        }
    }

    fn params(trend: usize, vol: usize, atr: usize, breakout: usize) -> IndicatorParams {
        IndicatorParams {
            trend_period: trend,
            vol_ma_period: vol,
            atr_period: atr,
            breakout_period: breakout,
        }
    }

    #[test]
    fn warmup_bars_accounts_for_prior_window() {
        assert_eq!(params(60, 20, 14, 20).warmup_bars(), 60);
        assert_eq!(params(5, 5, 5, 5).warmup_bars(), 6);
        assert_eq!(params(3, 2, 2, 10).warmup_bars(), 11);
    }

    #[test]
    fn snapshot_unavailable_during_warmup() {
        let p = params(3, 2, 2, 2);
        let mut set = IndicatorSet::new(p);
        let mut snaps = Vec::new();
        for i in 0..5 {
            snaps.push(set.update(&make_bar(i, 11.0, 9.0, 10.0, 100.0)));
        }
        // warmup_bars = 3 → first ready snapshot at index 2
        assert!(!snaps[0].is_ready());
        assert!(!snaps[1].is_ready());
        assert!(snaps[2].is_ready());
        assert!(snaps[4].is_ready());
        assert_eq!(snaps[4].index, 4);
        assert_eq!(set.bars_seen(), 5);
    }

    #[test]
    fn individual_values_appear_as_windows_fill() {
        let mut set = IndicatorSet::new(params(3, 1, 2, 1));
        let s0 = set.update(&make_bar(0, 11.0, 9.0, 10.0, 100.0));
        assert_eq!(s0.volume_avg, Some(100.0));
        assert_eq!(s0.trend_avg, None);
        assert_eq!(s0.prior_highest_high, None);
        let s1 = set.update(&make_bar(1, 12.0, 10.0, 11.0, 50.0));
        assert_eq!(s1.prior_highest_high, Some(11.0));
        assert_eq!(s1.prior_lowest_low, Some(9.0));
        assert!(s1.volatility_range.is_some());
        assert_eq!(s1.trend_avg, None);
    }

    #[test]
    fn trend_and_volume_averages() {
        let mut set = IndicatorSet::new(params(3, 2, 1, 1));
        set.update(&make_bar(0, 11.0, 9.0, 10.0, 100.0));
        set.update(&make_bar(1, 21.0, 19.0, 20.0, 200.0));
        let snap = set.update(&make_bar(2, 31.0, 29.0, 30.0, 600.0));
        assert!((snap.trend_avg.unwrap() - 20.0).abs() < 1e-12);
        assert!((snap.volume_avg.unwrap() - 400.0).abs() < 1e-12);
    }

    #[test]
    fn prior_extremes_exclude_current_bar() {
        let mut set = IndicatorSet::new(params(1, 1, 1, 3));
        for (i, (h, l)) in [(10.0, 5.0), (12.0, 6.0), (11.0, 4.0)].iter().enumerate() {
            set.update(&make_bar(i, *h, *l, (h + l) / 2.0, 1.0));
        }
        // New all-time high and low on this bar
        let snap = set.update(&make_bar(3, 50.0, 1.0, 25.0, 1.0));
        assert_eq!(snap.prior_highest_high, Some(12.0));
        assert_eq!(snap.prior_lowest_low, Some(4.0));

        // The window now rolls forward and includes bar 3
        let next = set.update(&make_bar(4, 20.0, 10.0, 15.0, 1.0));
        assert_eq!(next.prior_highest_high, Some(50.0));
        assert_eq!(next.prior_lowest_low, Some(1.0));
    }

    #[test]
    fn usable_atr_rejects_zero() {
        let mut snap = IndicatorSnapshot::unavailable(0);
        assert_eq!(snap.usable_atr(), None);
        snap.volatility_range = Some(0.0);
        assert_eq!(snap.usable_atr(), None);
        snap.volatility_range = Some(f64::NAN);
        assert_eq!(snap.usable_atr(), None);
        snap.volatility_range = Some(1.5);
        assert_eq!(snap.usable_atr(), Some(1.5));
    }

    #[test]
    fn params_from_strategy_config() {
        let config = StrategyConfig::default();
        let p = IndicatorParams::from(&config);
        assert_eq!(p.trend_period, 60);
        assert_eq!(p.vol_ma_period, 20);
        assert_eq!(p.atr_period, 14);
        assert_eq!(p.breakout_period, 20);
    }
}
