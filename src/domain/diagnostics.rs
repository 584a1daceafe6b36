//! Entry-condition diagnostics.
//!
//! Replays a series through the indicators and signal predicates without
//! trading, counting how often each condition holds. Useful to see which
//! filter keeps a strategy from ever entering.

use chrono::NaiveDateTime;

use super::indicator::{IndicatorParams, IndicatorSet};
use super::ohlcv::Bar;
use super::position::Direction;
use super::signal::{ConditionCheck, MarketView, SignalEvaluator};
use super::strategy::StrategyConfig;

/// Number of qualifying bars listed in full.
pub const MAX_LISTED_HITS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionStats {
    /// Bars with every indicator available.
    pub evaluated: usize,
    pub trend: usize,
    pub breakout: usize,
    pub volume: usize,
    pub volatility: usize,
    pub all: usize,
}

impl ConditionStats {
    fn record(&mut self, check: &ConditionCheck) {
        self.evaluated += 1;
        self.trend += usize::from(check.trend);
        self.breakout += usize::from(check.breakout);
        self.volume += usize::from(check.volume);
        self.volatility += usize::from(check.volatility);
        self.all += usize::from(check.all());
    }

    /// Share of evaluated bars; 0 when nothing was evaluated.
    pub fn rate(&self, count: usize) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            count as f64 / self.evaluated as f64
        }
    }
}

/// A bar on which every entry condition held.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalHit {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    pub close: f64,
    pub trend_avg: f64,
    pub prior_extreme: f64,
    pub volume: f64,
    pub volume_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub bars: usize,
    pub warmup_bars: usize,
    pub first_ready: Option<usize>,
    pub long: ConditionStats,
    pub short: ConditionStats,
    pub hits: Vec<SignalHit>,
}

impl Diagnostics {
    pub fn has_enough_data(&self) -> bool {
        self.bars >= self.warmup_bars
    }
}

pub fn diagnose(config: &StrategyConfig, bars: &[Bar]) -> Diagnostics {
    let params = IndicatorParams::from(config);
    let mut indicators = IndicatorSet::new(params);
    let evaluator = SignalEvaluator::new(config);

    let mut report = Diagnostics {
        bars: bars.len(),
        warmup_bars: params.warmup_bars(),
        first_ready: None,
        long: ConditionStats::default(),
        short: ConditionStats::default(),
        hits: Vec::new(),
    };

    for (i, bar) in bars.iter().enumerate() {
        let snapshot = indicators.update(bar);
        if !snapshot.is_ready() {
            continue;
        }
        report.first_ready.get_or_insert(i);

        let Some(view) = MarketView::new(&bars[..=i], &snapshot) else {
            continue;
        };
        for direction in [Direction::Long, Direction::Short] {
            let Some(check) = evaluator.evaluate(&view, direction) else {
                continue;
            };
            let stats = match direction {
                Direction::Long => &mut report.long,
                Direction::Short => &mut report.short,
            };
            stats.record(&check);

            if check.all() && report.hits.len() < MAX_LISTED_HITS {
                let prior_extreme = match direction {
                    Direction::Long => snapshot.prior_highest_high,
                    Direction::Short => snapshot.prior_lowest_low,
                };
                report.hits.push(SignalHit {
                    index: i,
                    timestamp: bar.timestamp,
                    direction,
                    close: bar.close,
                    trend_avg: snapshot.trend_avg.unwrap_or_default(),
                    prior_extreme: prior_extreme.unwrap_or_default(),
                    volume: bar.volume,
                    volume_threshold: snapshot.volume_avg.unwrap_or_default() * config.vol_multiplier,
                });
            }
        }
    }

    report
}
