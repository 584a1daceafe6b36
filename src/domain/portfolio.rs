//! Single-instrument account used by the simulated broker.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Cash plus at most one signed holding.
///
/// Short entries escrow their notional out of cash; the escrow is returned
/// with the price difference on cover.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub initial_capital: f64,
    /// Units held: positive long, negative short.
    pub holding: i64,
    /// Fill price of the holding, slippage included.
    pub entry_price: f64,
    pub last_price: Option<f64>,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            cash: initial_capital,
            initial_capital,
            holding: 0,
            entry_price: 0.0,
            last_price: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.holding == 0
    }

    /// Marked-to-market value at the last seen price.
    pub fn equity(&self) -> f64 {
        let price = self.last_price.unwrap_or(self.entry_price);
        let units = self.holding.unsigned_abs() as f64;
        if self.holding > 0 {
            self.cash + units * price
        } else if self.holding < 0 {
            // escrowed notional plus open profit
            self.cash + units * self.entry_price + units * (self.entry_price - price)
        } else {
            self.cash
        }
    }

    pub fn open(&mut self, units: i64, price: f64, cost: f64) {
        self.cash -= cost;
        self.holding = units;
        self.entry_price = price;
    }

    pub fn settle(&mut self, proceeds: f64) {
        self.cash += proceeds;
        self.holding = 0;
        self.entry_price = 0.0;
    }
}
