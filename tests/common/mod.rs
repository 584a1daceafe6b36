#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::VecDeque;
use trendsniper::domain::ohlcv::Bar;
use trendsniper::domain::order::{
    OrderEvent, OrderEventKind, OrderHandle, OrderIntent, OrderSide,
};
use trendsniper::domain::strategy::StrategyConfig;
use trendsniper::ports::broker_port::BrokerPort;

pub fn ts(day: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(day)
}

/// Bar with a one point range centred on `close`.
pub fn bar(day: i64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: ts(day),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume,
    }
}

pub fn bar_hlc(day: i64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: ts(day),
        open: close,
        high,
        low,
        close,
        volume,
    }
}

/// Short windows so scenarios fit in a handful of bars. Warm-up is 4 bars.
pub fn small_config() -> StrategyConfig {
    StrategyConfig {
        trend_period: 3,
        vol_ma_period: 3,
        atr_period: 3,
        breakout_period: 3,
        ..Default::default()
    }
}

/// Rising closes 10, 11, 12, ... with flat volume and a spike on `spike_day`.
pub fn rising_with_spike(days: i64, spike_day: i64) -> Vec<Bar> {
    (0..days)
        .map(|d| {
            let volume = if d == spike_day { 1_000.0 } else { 100.0 };
            bar(d, 10.0 + d as f64, volume)
        })
        .collect()
}

/// How the scripted broker answers one submitted order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    /// Filled at the close of the current bar, immediately.
    Fill,
    Reject,
    MarginFailure,
    Cancel,
    /// Filled at the submission close, delivered on the next `on_bar`.
    FillNextBar,
    /// Never answered.
    Silent,
    /// Reported filled with zero units.
    EmptyFill,
}

/// Broker double with scripted answers; unscripted orders fill.
pub struct ScriptedBroker {
    pub cash: f64,
    pub script: VecDeque<Response>,
    pub submitted: Vec<OrderIntent>,
    last_close: f64,
    next_handle: u64,
    ready: Vec<OrderEvent>,
    deferred: Vec<OrderEvent>,
}

impl ScriptedBroker {
    pub fn new(cash: f64) -> Self {
        ScriptedBroker {
            cash,
            script: VecDeque::new(),
            submitted: Vec::new(),
            last_close: 0.0,
            next_handle: 1,
            ready: Vec::new(),
            deferred: Vec::new(),
        }
    }

    pub fn with_script(mut self, responses: &[Response]) -> Self {
        self.script.extend(responses.iter().copied());
        self
    }

    pub fn entries(&self) -> usize {
        self.submitted
            .iter()
            .filter(|i| i.side != OrderSide::Close)
            .count()
    }

    pub fn closes(&self) -> usize {
        self.submitted
            .iter()
            .filter(|i| i.side == OrderSide::Close)
            .count()
    }
}

impl BrokerPort for ScriptedBroker {
    fn on_bar(&mut self, bar: &Bar) {
        self.last_close = bar.close;
        self.ready.append(&mut self.deferred);
    }

    fn cash(&self) -> f64 {
        self.cash
    }

    fn value(&self) -> f64 {
        self.cash
    }

    fn submit(&mut self, intent: &OrderIntent) -> OrderHandle {
        let handle = OrderHandle(self.next_handle);
        self.next_handle += 1;
        self.submitted.push(*intent);

        let filled = OrderEventKind::Filled {
            price: self.last_close,
            size: intent.size,
            commission: 0.0,
        };
        let response = self.script.pop_front().unwrap_or(Response::Fill);
        let event = |kind| OrderEvent { handle, kind };
        match response {
            Response::Fill => self.ready.push(event(filled)),
            Response::Reject => self.ready.push(event(OrderEventKind::Rejected)),
            Response::MarginFailure => self.ready.push(event(OrderEventKind::MarginFailure)),
            Response::Cancel => self.ready.push(event(OrderEventKind::Cancelled)),
            Response::FillNextBar => self.deferred.push(event(filled)),
            Response::Silent => {}
            Response::EmptyFill => self.ready.push(event(OrderEventKind::Filled {
                price: self.last_close,
                size: 0,
                commission: 0.0,
            })),
        }
        handle
    }

    fn take_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.ready)
    }
}
