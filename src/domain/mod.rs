//! Core domain types and logic.

pub mod ohlcv;
pub mod error;
pub mod strategy;
pub mod indicator;
pub mod signal;
pub mod sizing;
pub mod order;
pub mod position;
pub mod controller;
pub mod portfolio;
pub mod execution;
pub mod backtest;
pub mod batch;
pub mod metrics;
pub mod diagnostics;
pub mod config_validation;
