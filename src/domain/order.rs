//! Order intents and broker notifications.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    EnterLong,
    EnterShort,
    Close,
}

impl OrderSide {
    pub fn entry(direction: Direction) -> Self {
        match direction {
            Direction::Long => OrderSide::EnterLong,
            Direction::Short => OrderSide::EnterShort,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::EnterLong => write!(f, "enter-long"),
            OrderSide::EnterShort => write!(f, "enter-short"),
            OrderSide::Close => write!(f, "close"),
        }
    }
}

/// Why a position is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TrendReversal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        OrderReason::from(*self).fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderReason {
    Breakout,
    Breakdown,
    StopLoss,
    TrendReversal,
}

impl From<ExitReason> for OrderReason {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::StopLoss => OrderReason::StopLoss,
            ExitReason::TrendReversal => OrderReason::TrendReversal,
        }
    }
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderReason::Breakout => "breakout",
            OrderReason::Breakdown => "breakdown",
            OrderReason::StopLoss => "stop-loss",
            OrderReason::TrendReversal => "trend-reversal",
        };
        write!(f, "{s}")
    }
}

/// A request for the broker. `size` is always at least one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: OrderSide,
    pub size: u64,
    pub reason: OrderReason,
}

impl OrderIntent {
    pub fn enter(direction: Direction, size: u64) -> Self {
        let reason = match direction {
            Direction::Long => OrderReason::Breakout,
            Direction::Short => OrderReason::Breakdown,
        };
        OrderIntent {
            side: OrderSide::entry(direction),
            size,
            reason,
        }
    }

    pub fn close(size: u64, reason: ExitReason) -> Self {
        OrderIntent {
            side: OrderSide::Close,
            size,
            reason: reason.into(),
        }
    }
}

/// Opaque id assigned by the broker on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderHandle(pub u64);

impl fmt::Display for OrderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderEventKind {
    /// `price` includes slippage; `commission` is charged on this fill only.
    Filled {
        price: f64,
        size: u64,
        commission: f64,
    },
    Rejected,
    Cancelled,
    MarginFailure,
}

impl OrderEventKind {
    pub fn is_fill(&self) -> bool {
        matches!(self, OrderEventKind::Filled { .. })
    }
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEventKind::Filled { price, size, .. } => write!(f, "filled {size} @ {price:.4}"),
            OrderEventKind::Rejected => write!(f, "rejected"),
            OrderEventKind::Cancelled => write!(f, "cancelled"),
            OrderEventKind::MarginFailure => write!(f, "margin failure"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub handle: OrderHandle,
    pub kind: OrderEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_intent_reason_follows_direction() {
        let long = OrderIntent::enter(Direction::Long, 10);
        assert_eq!(long.side, OrderSide::EnterLong);
        assert_eq!(long.reason, OrderReason::Breakout);

        let short = OrderIntent::enter(Direction::Short, 5);
        assert_eq!(short.side, OrderSide::EnterShort);
        assert_eq!(short.reason, OrderReason::Breakdown);
        assert_eq!(short.size, 5);
    }

    #[test]
    fn close_intent_carries_exit_reason() {
        let intent = OrderIntent::close(7, ExitReason::StopLoss);
        assert_eq!(intent.side, OrderSide::Close);
        assert_eq!(intent.reason, OrderReason::StopLoss);
        assert_eq!(intent.reason.to_string(), "stop-loss");
    }

    #[test]
    fn display_names() {
        assert_eq!(ExitReason::TrendReversal.to_string(), "trend-reversal");
        assert_eq!(OrderSide::EnterShort.to_string(), "enter-short");
        assert_eq!(OrderHandle(3).to_string(), "#3");
        assert_eq!(OrderEventKind::MarginFailure.to_string(), "margin failure");
    }
}
