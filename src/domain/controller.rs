//! Per-bar decision hook.
//!
//! [`StrategyController::decide`] is a pure function of the market view,
//! the current [`PositionState`] and available cash. It never talks to a
//! broker: the caller submits the returned intent and feeds the outcome
//! back through [`StrategyController::apply`].

use log::{debug, info, warn};
use std::fmt;

use super::error::SniperError;
use super::indicator::IndicatorParams;
use super::order::{ExitReason, OrderEventKind, OrderIntent};
use super::position::{PendingEntry, Position, PositionState, Transition};
use super::signal::{MarketView, SignalEvaluator};
use super::sizing::PositionSizer;
use super::strategy::StrategyConfig;

/// Why a bar produced no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldReason {
    /// An indicator window is still filling.
    InsufficientData,
    /// ATR is zero or undefined.
    InvalidIndicator,
    NoSignal,
    /// Signal fired but the risk budget buys less than one unit.
    ZeroSize,
    /// A previous order has not been resolved.
    OrderInFlight,
    /// Position open and no exit condition met.
    Holding,
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HoldReason::InsufficientData => "insufficient-data",
            HoldReason::InvalidIndicator => "invalid-indicator",
            HoldReason::NoSignal => "no-signal",
            HoldReason::ZeroSize => "zero-size",
            HoldReason::OrderInFlight => "order-in-flight",
            HoldReason::Holding => "holding",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one bar: the next state plus either an intent or the reason
/// there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub state: PositionState,
    pub intent: Option<OrderIntent>,
    pub hold: Option<HoldReason>,
}

impl Decision {
    fn hold(state: PositionState, reason: HoldReason) -> Self {
        Decision {
            state,
            intent: None,
            hold: Some(reason),
        }
    }

    fn submit(state: PositionState, intent: OrderIntent) -> Self {
        Decision {
            state,
            intent: Some(intent),
            hold: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyController {
    config: StrategyConfig,
    signals: SignalEvaluator,
    sizer: PositionSizer,
}

impl StrategyController {
    /// Fails with `ConfigInvalid` if the configuration is inconsistent.
    pub fn new(config: StrategyConfig) -> Result<Self, SniperError> {
        config.validate()?;
        Ok(StrategyController {
            signals: SignalEvaluator::new(&config),
            sizer: PositionSizer::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams::from(&self.config)
    }

    pub fn signals(&self) -> &SignalEvaluator {
        &self.signals
    }

    pub fn decide(&self, view: &MarketView<'_>, state: PositionState, cash: f64) -> Decision {
        match state {
            PositionState::Flat => self.decide_entry(view, cash),
            PositionState::Open(position) => self.manage(view, position),
            pending => Decision::hold(pending, HoldReason::OrderInFlight),
        }
    }

    /// Applies the broker outcome of the order in flight.
    pub fn apply(
        &self,
        state: PositionState,
        event: &OrderEventKind,
        view: &MarketView<'_>,
    ) -> Result<Transition, SniperError> {
        let bar = view.bar();
        let before = state.name();
        let entering = matches!(state, PositionState::PendingEntry(_));
        let transition = state.on_event(event, view.index(), bar.timestamp)?;

        match (&transition.state, &transition.closed) {
            (_, Some(trade)) => info!(
                "{} closed {} {} @ {:.4} ({}), pnl {:.2}",
                bar.timestamp, trade.direction, trade.size, trade.exit_price, trade.reason, trade.pnl
            ),
            (PositionState::Open(p), None) if entering => info!(
                "{} opened {} {} @ {:.4}, stop {:.4}",
                bar.timestamp, p.direction, p.size, p.entry_price, p.stop_loss_price
            ),
            (next, None) => warn!(
                "{} order {} while {}, back to {}",
                bar.timestamp,
                event,
                before,
                next.name()
            ),
        }
        Ok(transition)
    }

    fn decide_entry(&self, view: &MarketView<'_>, cash: f64) -> Decision {
        let snapshot = view.snapshot();
        if !snapshot.is_ready() {
            return Decision::hold(PositionState::Flat, HoldReason::InsufficientData);
        }
        let Some(atr) = snapshot.usable_atr() else {
            debug!("bar {}: unusable ATR {:?}", view.index(), snapshot.volatility_range);
            return Decision::hold(PositionState::Flat, HoldReason::InvalidIndicator);
        };
        let Some(direction) = self.signals.entry_signal(view) else {
            return Decision::hold(PositionState::Flat, HoldReason::NoSignal);
        };

        let price = view.bar().close;
        let size = self.sizer.size(cash, Some(atr), price);
        if size == 0 {
            debug!(
                "bar {}: {direction} signal sized to zero (cash {cash:.2}, atr {atr:.4})",
                view.index()
            );
            return Decision::hold(PositionState::Flat, HoldReason::ZeroSize);
        }

        let intent = OrderIntent::enter(direction, size);
        info!(
            "{} {} signal at {:.4}: {} x{}",
            view.bar().timestamp,
            direction,
            price,
            intent.side,
            size
        );
        Decision::submit(
            PositionState::PendingEntry(PendingEntry {
                direction,
                size,
                stop_distance: self.sizer.stop_distance(atr),
                submitted_at: view.index(),
            }),
            intent,
        )
    }

    /// Trailing update, then stop breach, then trend reversal.
    fn manage(&self, view: &MarketView<'_>, mut position: Position) -> Decision {
        let bar = view.bar();
        let snapshot = view.snapshot();

        let trailing_atr = snapshot
            .usable_atr()
            .filter(|_| self.config.use_trailing_stop);
        if let Some(atr) = trailing_atr {
            let was_active = position.trailing_active;
            if position.update_trailing(
                bar.close,
                atr,
                self.config.trailing_stop_atr_multiplier,
                self.config.stop_loss_atr_multiplier,
            ) {
                debug!("{} trailing stop -> {:.4}", bar.timestamp, position.stop_loss_price);
            }
            if !was_active && position.trailing_active {
                info!("{} trailing stop activated", bar.timestamp);
            }
        }

        let reason = if position.is_stop_breached(bar) {
            Some(ExitReason::StopLoss)
        } else if snapshot
            .trend_avg
            .is_some_and(|avg| position.is_trend_reversed(bar.close, avg))
        {
            Some(ExitReason::TrendReversal)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                info!(
                    "{} {} exit: stop {:.4}, close {:.4}",
                    bar.timestamp, reason, position.stop_loss_price, bar.close
                );
                let intent = OrderIntent::close(position.size, reason);
                Decision::submit(PositionState::PendingExit { position, reason }, intent)
            }
            None => Decision::hold(PositionState::Open(position), HoldReason::Holding),
        }
    }
}
