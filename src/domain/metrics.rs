//! Performance metrics over a finished run.

use serde::Serialize;

use super::portfolio::EquityPoint;
use super::position::ClosedTrade;

const BARS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous equity peak.
    pub max_drawdown_duration: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
}

impl Metrics {
    /// Bars are treated as trading days for annualisation.
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[ClosedTrade],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / BARS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let rf_per_bar = risk_free_rate / BARS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, rf_per_bar);

        let mut trades_won = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars = 0usize;

        for trade in trades {
            if trade.is_win() {
                trades_won += 1;
                gross_profit += trade.pnl;
                largest_win = largest_win.max(trade.pnl);
            } else {
                gross_loss += trade.pnl.abs();
                largest_loss = largest_loss.max(trade.pnl.abs());
            }
            total_bars += trade.bars_held();
        }

        let total_trades = trades.len();
        let trades_lost = total_trades - trades_won;

        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            gross_profit / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            gross_loss / trades_lost as f64
        } else {
            0.0
        };
        let avg_bars_held = if total_trades > 0 {
            total_bars as f64 / total_trades as f64
        } else {
            0.0
        };

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_bars_held,
        }
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            duration = 0;
        } else if peak > 0.0 && point.equity < peak {
            max_dd = max_dd.max((peak - point.equity) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], rf_per_bar: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let bar_returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = bar_returns.len() as f64;
    let mean = bar_returns.iter().sum::<f64>() / n;
    let stddev = (bar_returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    let excess = mean - rf_per_bar;

    let sharpe = if stddev > 0.0 {
        excess / stddev * BARS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_variance = bar_returns
        .iter()
        .filter(|&&r| r < rf_per_bar)
        .map(|&r| (r - rf_per_bar).powi(2))
        .sum::<f64>()
        / n;
    let downside_dev = downside_variance.sqrt();

    let sortino = if downside_dev > 0.0 {
        excess / downside_dev * BARS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
