//! Broker/account port trait.

use crate::domain::ohlcv::Bar;
use crate::domain::order::{OrderEvent, OrderHandle, OrderIntent};

/// Order routing and account state for a single instrument.
///
/// Commission, slippage and margin are the broker's concern. Every event
/// for an order submitted during a bar must be available from
/// [`take_events`](BrokerPort::take_events) before the next call to
/// [`on_bar`](BrokerPort::on_bar).
pub trait BrokerPort {
    /// Market update for the current bar; called before any decision on it.
    fn on_bar(&mut self, bar: &Bar);

    /// Cash available for new positions.
    fn cash(&self) -> f64;

    /// Cash plus marked-to-market holdings.
    fn value(&self) -> f64;

    fn submit(&mut self, intent: &OrderIntent) -> OrderHandle;

    /// Drains pending notifications in the order they occurred.
    fn take_events(&mut self) -> Vec<OrderEvent>;
}

