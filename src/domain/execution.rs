//! Simulated broker: market fills at the bar close.
//!
//! Buys fill at `close * (1 + slippage_pct / 100)`, sells at
//! `close * (1 - slippage_pct / 100)`. Commission is `commission_pct / 100`
//! of the traded notional on each side. Orders are resolved inside
//! [`submit`](BrokerPort::submit), so their events are always available
//! before the next bar.

use log::debug;

use super::ohlcv::Bar;
use super::order::{OrderEvent, OrderEventKind, OrderHandle, OrderIntent, OrderSide};
use super::portfolio::Account;
use crate::ports::broker_port::BrokerPort;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_pct: 0.1,
            slippage_pct: 0.1,
        }
    }
}

pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    trade_value * config.commission_pct / 100.0
}

/// Slippage always works against the order.
pub fn apply_slippage(market_price: f64, slippage_pct: f64, buying: bool) -> f64 {
    if buying {
        market_price * (1.0 + slippage_pct / 100.0)
    } else {
        market_price * (1.0 - slippage_pct / 100.0)
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedBroker {
    config: ExecutionConfig,
    account: Account,
    next_handle: u64,
    events: Vec<OrderEvent>,
}

impl SimulatedBroker {
    pub fn new(initial_capital: f64, config: ExecutionConfig) -> Self {
        SimulatedBroker {
            config,
            account: Account::new(initial_capital),
            next_handle: 1,
            events: Vec::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    fn execute(&mut self, intent: &OrderIntent) -> OrderEventKind {
        let Some(market_price) = self.account.last_price else {
            return OrderEventKind::Rejected;
        };
        let Ok(units) = i64::try_from(intent.size) else {
            return OrderEventKind::Rejected;
        };
        if units == 0 {
            return OrderEventKind::Rejected;
        }

        match intent.side {
            OrderSide::EnterLong | OrderSide::EnterShort => {
                if !self.account.is_flat() {
                    return OrderEventKind::Rejected;
                }
                let buying = intent.side == OrderSide::EnterLong;
                let price = apply_slippage(market_price, self.config.slippage_pct, buying);
                let notional = units as f64 * price;
                let commission = calculate_commission(notional, &self.config);
                if notional + commission > self.account.cash {
                    return OrderEventKind::MarginFailure;
                }
                let signed = if buying { units } else { -units };
                self.account.open(signed, price, notional + commission);
                OrderEventKind::Filled {
                    price,
                    size: intent.size,
                    commission,
                }
            }
            OrderSide::Close => {
                if self.account.holding.unsigned_abs() != intent.size {
                    return OrderEventKind::Rejected;
                }
                let long = self.account.holding > 0;
                // Closing a long sells, covering a short buys.
                let price = apply_slippage(market_price, self.config.slippage_pct, !long);
                let exit_value = units as f64 * price;
                let commission = calculate_commission(exit_value, &self.config);
                let proceeds = if long {
                    exit_value - commission
                } else {
                    let escrow = units as f64 * self.account.entry_price;
                    escrow + (escrow - exit_value) - commission
                };
                self.account.settle(proceeds);
                OrderEventKind::Filled {
                    price,
                    size: intent.size,
                    commission,
                }
            }
        }
    }
}

impl BrokerPort for SimulatedBroker {
    fn on_bar(&mut self, bar: &Bar) {
        self.account.last_price = Some(bar.close);
    }

    fn cash(&self) -> f64 {
        self.account.cash
    }

    fn value(&self) -> f64 {
        self.account.equity()
    }

    fn submit(&mut self, intent: &OrderIntent) -> OrderHandle {
        let handle = OrderHandle(self.next_handle);
        self.next_handle += 1;
        let kind = self.execute(intent);
        debug!("order {handle} {} x{}: {kind}", intent.side, intent.size);
        self.events.push(OrderEvent { handle, kind });
        handle
    }

    fn take_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }
}
