//! Position lifecycle state machine.
//!
//! ```text
//! Flat --enter--> PendingEntry --fill--> Open --close--> PendingExit --fill--> Flat
//!                      |                   ^                  |
//!                      +--reject--> Flat   +------reject------+
//! ```
//!
//! [`PositionState`] is a plain value: transitions consume the old state and
//! return the new one, so a run can be checkpointed or replayed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::SniperError;
use super::ohlcv::Bar;
use super::order::{ExitReason, OrderEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    pub size: u64,
    pub stop_loss_price: f64,
    pub trailing_active: bool,
    /// Bar index of the entry fill.
    pub opened_at: usize,
    pub opened_time: NaiveDateTime,
    pub entry_commission: f64,
}

impl Position {
    pub fn is_stop_breached(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop_loss_price,
            Direction::Short => bar.high >= self.stop_loss_price,
        }
    }

    pub fn is_trend_reversed(&self, close: f64, trend_avg: f64) -> bool {
        match self.direction {
            Direction::Long => close < trend_avg,
            Direction::Short => close > trend_avg,
        }
    }

    /// Favorable move from entry measured in ATR units.
    pub fn excursion(&self, price: f64, atr: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) / atr
    }

    /// Ratchets the stop toward `price` once the excursion reaches
    /// `activation` ATRs. Returns true when the stop moved.
    pub fn update_trailing(&mut self, price: f64, atr: f64, activation: f64, stop_multiplier: f64) -> bool {
        if !(atr.is_finite() && atr > 0.0) || self.excursion(price, atr) < activation {
            return false;
        }
        self.trailing_active = true;

        let candidate = price - self.direction.sign() * atr * stop_multiplier;
        let tighter = match self.direction {
            Direction::Long => candidate > self.stop_loss_price,
            Direction::Short => candidate < self.stop_loss_price,
        };
        if tighter {
            self.stop_loss_price = candidate;
        }
        tighter
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) * self.size as f64
    }
}

/// An entry order awaiting its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub direction: Direction,
    pub size: u64,
    /// ATR × stop multiplier at decision time; the stop is placed this far
    /// from the fill price.
    pub stop_distance: f64,
    pub submitted_at: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    PendingEntry(PendingEntry),
    Open(Position),
    PendingExit {
        position: Position,
        reason: ExitReason,
    },
}

/// Result of applying a broker notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PositionState,
    pub closed: Option<ClosedTrade>,
}

impl Transition {
    fn to(state: PositionState) -> Self {
        Transition {
            state,
            closed: None,
        }
    }
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    /// An order is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            PositionState::PendingEntry(_) | PositionState::PendingExit { .. }
        )
    }

    /// The position held, including one with a close order in flight.
    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::Open(position) | PositionState::PendingExit { position, .. } => {
                Some(position)
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PositionState::Flat => "flat",
            PositionState::PendingEntry(_) => "pending-entry",
            PositionState::Open(p) => match p.direction {
                Direction::Long => "long",
                Direction::Short => "short",
            },
            PositionState::PendingExit { .. } => "pending-exit",
        }
    }

    /// Applies a broker notification for the order in flight.
    ///
    /// Fills create or destroy the position; rejection, cancellation and
    /// margin failure fall back to the last stable state. An event with no
    /// order in flight is a protocol violation.
    pub fn on_event(
        self,
        event: &OrderEventKind,
        bar_index: usize,
        time: NaiveDateTime,
    ) -> Result<Transition, SniperError> {
        match (self, *event) {
            (
                PositionState::PendingEntry(pending),
                OrderEventKind::Filled {
                    price,
                    size,
                    commission,
                },
            ) => {
                if size == 0 || !(price.is_finite() && price > 0.0) {
                    return Err(SniperError::Protocol {
                        reason: format!("invalid entry fill: {size} @ {price}"),
                    });
                }
                let stop_loss_price = price - pending.direction.sign() * pending.stop_distance;
                Ok(Transition::to(PositionState::Open(Position {
                    direction: pending.direction,
                    entry_price: price,
                    size,
                    stop_loss_price,
                    trailing_active: false,
                    opened_at: bar_index,
                    opened_time: time,
                    entry_commission: commission,
                })))
            }
            (PositionState::PendingEntry(_), _) => Ok(Transition::to(PositionState::Flat)),

            (
                PositionState::PendingExit { position, reason },
                OrderEventKind::Filled {
                    price, commission, ..
                },
            ) => {
                let trade = ClosedTrade::settle(position, price, commission, reason, bar_index, time);
                Ok(Transition {
                    state: PositionState::Flat,
                    closed: Some(trade),
                })
            }
            (PositionState::PendingExit { position, .. }, _) => {
                Ok(Transition::to(PositionState::Open(position)))
            }

            (state, event) => Err(SniperError::Protocol {
                reason: format!("order event '{event}' while {}", state.name()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub direction: Direction,
    pub size: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub opened_at: usize,
    pub closed_at: usize,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    /// Net of entry and exit commissions.
    pub pnl: f64,
    pub reason: ExitReason,
}

impl ClosedTrade {
    fn settle(
        position: Position,
        exit_price: f64,
        exit_commission: f64,
        reason: ExitReason,
        closed_at: usize,
        exit_time: NaiveDateTime,
    ) -> Self {
        let pnl = position.unrealized_pnl(exit_price) - position.entry_commission - exit_commission;
        ClosedTrade {
            direction: position.direction,
            size: position.size,
            entry_price: position.entry_price,
            exit_price,
            opened_at: position.opened_at,
            closed_at,
            entry_time: position.opened_time,
            exit_time,
            pnl,
            reason,
        }
    }

    /// Breakeven counts as a loss.
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.closed_at.saturating_sub(self.opened_at)
    }
}
