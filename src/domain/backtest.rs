//! Backtest engine and event loop.
//!
//! Per bar, in order:
//! 1. reject malformed or out-of-order bars
//! 2. update indicators and append the bar to history
//! 3. hand the bar to the broker
//! 4. apply events the broker delivered since the last bar
//! 5. decide, and if an intent results, submit it and apply its events
//! 6. record equity
//!
//! An order submitted on bar *i* must be resolved by step 4 of bar *i+1*.

use log::{debug, info};

use super::controller::{HoldReason, StrategyController};
use super::error::SniperError;
use super::indicator::{IndicatorSet, IndicatorSnapshot};
use super::metrics::Metrics;
use super::ohlcv::Bar;
use super::order::{OrderHandle, OrderIntent};
use super::portfolio::EquityPoint;
use super::position::{ClosedTrade, Position, PositionState};
use super::signal::MarketView;
use crate::ports::broker_port::BrokerPort;
use crate::ports::feed_port::FeedPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Percent of traded notional, per side.
    pub commission_pct: f64,
    /// Percent of price, against the order.
    pub slippage_pct: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 1_000_000.0,
            commission_pct: 0.1,
            slippage_pct: 0.1,
            risk_free_rate: 0.0,
        }
    }
}

/// End-of-run figures handed to reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub final_value: f64,
    /// Reported, not force-closed.
    pub open_position: Option<Position>,
    pub bars_processed: usize,
    pub orders_submitted: usize,
    pub orders_rejected: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub summary: RunSummary,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_state: PositionState,
}

impl RunResult {
    pub fn metrics(&self, initial_capital: f64, risk_free_rate: f64) -> Metrics {
        Metrics::compute(&self.equity_curve, &self.trades, initial_capital, risk_free_rate)
    }
}

/// A finished run ready to be written by a report adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub source: String,
    pub strategy_name: String,
    pub result: RunResult,
    pub metrics: Metrics,
}

/// What happened on one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub snapshot: IndicatorSnapshot,
    pub intent: Option<OrderIntent>,
    pub hold: Option<HoldReason>,
    pub closed: Option<ClosedTrade>,
}

/// Order bookkeeping, kept apart from the bar history so both can be
/// borrowed at once.
#[derive(Debug, Default)]
struct Book {
    state: PositionState,
    in_flight: Option<OrderHandle>,
    trades: Vec<ClosedTrade>,
    submitted: usize,
    rejected: usize,
}

impl Book {
    /// Applies every queued broker event; returns the trade closed, if any.
    fn settle(
        &mut self,
        controller: &StrategyController,
        view: &MarketView<'_>,
        broker: &mut dyn BrokerPort,
    ) -> Result<Option<ClosedTrade>, SniperError> {
        let mut closed = None;
        for event in broker.take_events() {
            if self.in_flight != Some(event.handle) {
                return Err(SniperError::Protocol {
                    reason: format!("event for unknown order {} at bar {}", event.handle, view.index()),
                });
            }
            self.in_flight = None;
            if !event.kind.is_fill() {
                self.rejected += 1;
            }
            // On error the previous state stays in place.
            let transition = controller.apply(self.state.clone(), &event.kind, view)?;
            self.state = transition.state;
            if let Some(trade) = transition.closed {
                self.trades.push(trade.clone());
                closed = Some(trade);
            }
        }
        Ok(closed)
    }
}

/// One engine instance per run; instances share nothing.
#[derive(Debug)]
pub struct Engine {
    controller: StrategyController,
    indicators: IndicatorSet,
    history: Vec<Bar>,
    book: Book,
    equity_curve: Vec<EquityPoint>,
}

impl Engine {
    pub fn new(controller: StrategyController) -> Self {
        Engine {
            indicators: IndicatorSet::new(controller.indicator_params()),
            controller,
            history: Vec::new(),
            book: Book::default(),
            equity_curve: Vec::new(),
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.book.state
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.book.trades
    }

    pub fn step(&mut self, bar: Bar, broker: &mut dyn BrokerPort) -> Result<StepOutcome, SniperError> {
        let index = self.history.len();
        if !bar.is_well_formed() {
            return Err(SniperError::Data {
                reason: format!("malformed bar at index {index} ({})", bar.timestamp),
            });
        }
        if let Some(previous) = self.history.last() {
            if bar.timestamp <= previous.timestamp {
                return Err(SniperError::UnorderedBars {
                    index,
                    previous: previous.timestamp,
                    timestamp: bar.timestamp,
                });
            }
        }

        let snapshot = self.indicators.update(&bar);
        self.history.push(bar);
        let Some(view) = MarketView::new(&self.history, &snapshot) else {
            return Err(SniperError::Data {
                reason: "empty history after push".into(),
            });
        };
        broker.on_bar(view.bar());

        let mut closed = self.book.settle(&self.controller, &view, broker)?;
        if let Some(handle) = self.book.in_flight {
            return Err(SniperError::Protocol {
                reason: format!("order {handle} unresolved at bar {index}"),
            });
        }

        let decision = self
            .controller
            .decide(&view, std::mem::take(&mut self.book.state), broker.cash());
        self.book.state = decision.state;

        if let Some(intent) = &decision.intent {
            let handle = broker.submit(intent);
            debug!("bar {index}: submitted {} x{} as {handle}", intent.side, intent.size);
            self.book.in_flight = Some(handle);
            self.book.submitted += 1;
            if let Some(trade) = self.book.settle(&self.controller, &view, broker)? {
                closed = Some(trade);
            }
        }

        self.equity_curve.push(EquityPoint {
            timestamp: view.bar().timestamp,
            equity: broker.value(),
        });

        Ok(StepOutcome {
            snapshot,
            intent: decision.intent,
            hold: decision.hold,
            closed,
        })
    }

    pub fn finish(self, broker: &dyn BrokerPort) -> RunResult {
        let trades = self.book.trades;
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let summary = RunSummary {
            total_trades: trades.len(),
            wins,
            losses: trades.len() - wins,
            final_value: broker.value(),
            open_position: self.book.state.position().cloned(),
            bars_processed: self.history.len(),
            orders_submitted: self.book.submitted,
            orders_rejected: self.book.rejected,
        };
        RunResult {
            summary,
            trades,
            equity_curve: self.equity_curve,
            final_state: self.book.state,
        }
    }
}

/// Runs the whole feed through a fresh engine.
pub fn run_backtest(
    controller: StrategyController,
    feed: &mut dyn FeedPort,
    broker: &mut dyn BrokerPort,
) -> Result<RunResult, SniperError> {
    let mut engine = Engine::new(controller);
    while let Some(bar) = feed.next_bar()? {
        engine.step(bar, broker)?;
    }
    if engine.history.is_empty() {
        return Err(SniperError::NoData {
            source_name: feed.source_name(),
        });
    }

    let result = engine.finish(broker);
    info!(
        "{}: {} bars, {} trades ({} won), final value {:.2}",
        feed.source_name(),
        result.summary.bars_processed,
        result.summary.total_trades,
        result.summary.wins,
        result.summary.final_value
    );
    Ok(result)
}
