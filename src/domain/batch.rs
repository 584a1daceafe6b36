//! Aggregate results of a multi-file backtest.
//!
//! Each file is an independent run; this only collects their headline
//! figures, ranks the ones that traded and keeps the failures.

use std::path::Path;

use super::backtest::RunReport;
use super::error::SniperError;

/// Headline figures of one file's run.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolResult {
    pub symbol: String,
    pub total_return: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchAverages {
    pub total_return: f64,
    pub total_trades: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    results: Vec<SymbolResult>,
    failures: Vec<SymbolFailure>,
}

/// File stem of a data source, falling back to the whole name.
pub fn symbol_of(source: &str) -> String {
    Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string())
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &RunReport) {
        let m = &report.metrics;
        self.results.push(SymbolResult {
            symbol: symbol_of(&report.source),
            total_return: m.total_return,
            total_trades: report.result.summary.total_trades,
            win_rate: m.win_rate,
            sharpe_ratio: m.sharpe_ratio,
            max_drawdown: m.max_drawdown,
        });
    }

    pub fn record_failure(&mut self, source: &str, error: &SniperError) {
        self.failures.push(SymbolFailure {
            symbol: symbol_of(source),
            reason: error.to_string(),
        });
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> &[SymbolFailure] {
        &self.failures
    }

    pub fn no_trade(&self) -> impl Iterator<Item = &SymbolResult> {
        self.results.iter().filter(|r| r.total_trades == 0)
    }

    /// Runs with at least one trade, best return first.
    pub fn ranked(&self) -> Vec<&SymbolResult> {
        let mut traded: Vec<&SymbolResult> =
            self.results.iter().filter(|r| r.total_trades > 0).collect();
        traded.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
        traded
    }

    /// Means over the runs that traded.
    pub fn averages(&self) -> Option<BatchAverages> {
        let traded = self.ranked();
        if traded.is_empty() {
            return None;
        }
        let n = traded.len() as f64;
        let mean = |f: fn(&SymbolResult) -> f64| traded.iter().map(|r| f(r)).sum::<f64>() / n;
        Some(BatchAverages {
            total_return: mean(|r| r.total_return),
            total_trades: mean(|r| r.total_trades as f64),
            win_rate: mean(|r| r.win_rate),
        })
    }

    pub fn best(&self) -> Option<&SymbolResult> {
        self.ranked().first().copied()
    }

    pub fn worst(&self) -> Option<&SymbolResult> {
        self.ranked().last().copied()
    }
}
