//! CSV report adapter implementing ReportPort.
//!
//! Writes closed trades to the requested path and a key/value summary next
//! to it (`trades.csv` -> `trades_summary.csv`).

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::domain::backtest::RunReport;
use crate::domain::error::SniperError;
use crate::domain::position::ClosedTrade;
use crate::ports::report_port::ReportPort;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct TradeRow {
    direction: String,
    size: u64,
    entry_time: String,
    entry_price: f64,
    exit_time: String,
    exit_price: f64,
    bars_held: usize,
    reason: String,
    pnl: f64,
}

impl From<&ClosedTrade> for TradeRow {
    fn from(trade: &ClosedTrade) -> Self {
        TradeRow {
            direction: trade.direction.to_string(),
            size: trade.size,
            entry_time: trade.entry_time.format(TIME_FORMAT).to_string(),
            entry_price: trade.entry_price,
            exit_time: trade.exit_time.format(TIME_FORMAT).to_string(),
            exit_price: trade.exit_price,
            bars_held: trade.bars_held(),
            reason: trade.reason.to_string(),
            pnl: trade.pnl,
        }
    }
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn summary_path(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());
        output_path.with_file_name(format!("{stem}_summary.csv"))
    }

    fn summary_rows(report: &RunReport) -> Vec<(&'static str, String)> {
        let s = &report.result.summary;
        let m = &report.metrics;
        let open = match &s.open_position {
            Some(p) => format!("{} {} @ {:.4} stop {:.4}", p.direction, p.size, p.entry_price, p.stop_loss_price),
            None => "none".to_string(),
        };
        vec![
            ("source", report.source.clone()),
            ("strategy", report.strategy_name.clone()),
            ("bars", s.bars_processed.to_string()),
            ("total_trades", s.total_trades.to_string()),
            ("wins", s.wins.to_string()),
            ("losses", s.losses.to_string()),
            ("final_value", format!("{:.2}", s.final_value)),
            ("open_position", open),
            ("orders_submitted", s.orders_submitted.to_string()),
            ("orders_rejected", s.orders_rejected.to_string()),
            ("total_return", format!("{:.6}", m.total_return)),
            ("annualized_return", format!("{:.6}", m.annualized_return)),
            ("sharpe_ratio", format!("{:.4}", m.sharpe_ratio)),
            ("sortino_ratio", format!("{:.4}", m.sortino_ratio)),
            ("max_drawdown", format!("{:.6}", m.max_drawdown)),
            ("win_rate", format!("{:.4}", m.win_rate)),
            ("profit_factor", format!("{:.4}", m.profit_factor)),
        ]
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> SniperError {
    SniperError::Report {
        reason: format!("failed to write {}: {e}", path.display()),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &RunReport, output_path: &str) -> Result<(), SniperError> {
        let path = Path::new(output_path);

        let mut trades = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
        if report.result.trades.is_empty() {
            // serialize() only emits the header with the first record
            trades
                .write_record([
                    "direction",
                    "size",
                    "entry_time",
                    "entry_price",
                    "exit_time",
                    "exit_price",
                    "bars_held",
                    "reason",
                    "pnl",
                ])
                .map_err(|e| report_error(path, e))?;
        }
        for trade in &report.result.trades {
            trades
                .serialize(TradeRow::from(trade))
                .map_err(|e| report_error(path, e))?;
        }
        trades.flush().map_err(|e| report_error(path, e))?;

        let summary_path = Self::summary_path(path);
        let mut summary =
            csv::Writer::from_path(&summary_path).map_err(|e| report_error(&summary_path, e))?;
        summary
            .write_record(["key", "value"])
            .map_err(|e| report_error(&summary_path, e))?;
        for (key, value) in Self::summary_rows(report) {
            summary
                .write_record([key, value.as_str()])
                .map_err(|e| report_error(&summary_path, e))?;
        }
        summary.flush().map_err(|e| report_error(&summary_path, e))?;
        Ok(())
    }
}
