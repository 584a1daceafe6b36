//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{list_csv_files, load_bars_from_path, CsvFeed};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, RunReport};
use crate::domain::batch::BatchSummary;
use crate::domain::config_validation::{
    build_backtest_config, build_strategy_config, data_path, log_level,
};
use crate::domain::controller::StrategyController;
use crate::domain::diagnostics::{diagnose, ConditionStats, Diagnostics};
use crate::domain::error::SniperError;
use crate::domain::execution::{ExecutionConfig, SimulatedBroker};
use crate::domain::strategy::StrategyConfig;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "trendsniper", about = "Trend and volume breakout backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a CSV file or every CSV in a directory
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides `[backtest] data`
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Write closed trades (and a summary) as CSV
        #[arg(short, long)]
        trades: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Count how often each entry condition holds on a series
    Diagnose {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            trades,
        } => run_backtest_command(&config, data.as_deref(), trades.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Diagnose { config, data } => run_diagnose(&config, data.as_deref()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// Everything a command needs from the configuration file.
struct Settings {
    strategy: StrategyConfig,
    backtest: BacktestConfig,
    data: Option<PathBuf>,
}

fn load_settings(config_path: &Path) -> Result<Settings, SniperError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    init_logging(log_level(&adapter)?);
    info!("loaded config from {}", config_path.display());
    Ok(Settings {
        strategy: build_strategy_config(&adapter)?,
        backtest: build_backtest_config(&adapter)?,
        data: data_path(&adapter).map(PathBuf::from),
    })
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: log::LevelFilter) {
    let env = env_logger::Env::default().default_filter_or(level.to_string());
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("logger already initialised");
    }
}

fn resolve_data(cli_data: Option<&Path>, settings: &Settings) -> Result<PathBuf, SniperError> {
    cli_data
        .map(Path::to_path_buf)
        .or_else(|| settings.data.clone())
        .ok_or_else(|| SniperError::ConfigMissing {
            section: "backtest".into(),
            key: "data".into(),
        })
}

/// A single file, or every `*.csv` under a directory.
fn resolve_files(data: &Path) -> Result<Vec<PathBuf>, SniperError> {
    if !data.is_dir() {
        return Ok(vec![data.to_path_buf()]);
    }
    let files = list_csv_files(data)?;
    if files.is_empty() {
        return Err(SniperError::NoData {
            source_name: data.display().to_string(),
        });
    }
    Ok(files)
}

/// Where the trades of `source` go when several files share one `--trades`.
pub fn trades_path_for(base: &Path, source: &Path, multiple: bool) -> PathBuf {
    if !multiple {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "trades".to_string());
    let source_stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    base.with_file_name(format!("{stem}_{source_stem}.csv"))
}

pub fn backtest_file(
    path: &Path,
    strategy: &StrategyConfig,
    backtest: &BacktestConfig,
) -> Result<RunReport, SniperError> {
    let controller = StrategyController::new(strategy.clone())?;
    let mut feed = CsvFeed::open(path)?;
    let mut broker = SimulatedBroker::new(
        backtest.initial_capital,
        ExecutionConfig {
            commission_pct: backtest.commission_pct,
            slippage_pct: backtest.slippage_pct,
        },
    );
    let result = run_backtest(controller, &mut feed, &mut broker)?;
    let metrics = result.metrics(backtest.initial_capital, backtest.risk_free_rate);
    Ok(RunReport {
        source: path.display().to_string(),
        strategy_name: strategy.name.clone(),
        result,
        metrics,
    })
}

fn run_backtest_command(
    config_path: &Path,
    data: Option<&Path>,
    trades: Option<&Path>,
) -> Result<(), SniperError> {
    let settings = load_settings(config_path)?;
    let data = resolve_data(data, &settings)?;
    let files = resolve_files(&data)?;
    let multiple = files.len() > 1;

    eprintln!("Strategy: {}", settings.strategy.name);
    let mut batch = BatchSummary::new();
    let mut first_failure = None;
    for file in &files {
        let report = match backtest_file(file, &settings.strategy, &settings.backtest) {
            Ok(report) => report,
            Err(e) if multiple => {
                error!("{}: {e}", file.display());
                batch.record_failure(&file.display().to_string(), &e);
                first_failure.get_or_insert(e);
                continue;
            }
            Err(e) => return Err(e),
        };
        print_report(&report, settings.backtest.initial_capital);
        if report.result.summary.total_trades == 0 {
            print_condition_analysis(file, &settings.strategy);
        }
        batch.record(&report);

        if let Some(base) = trades {
            let out = trades_path_for(base, file, multiple);
            CsvReportAdapter.write(&report, &out.display().to_string())?;
            eprintln!("Trades written to: {}", out.display());
        }
    }

    if multiple {
        print_batch(&batch);
    }
    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Why a run never traded: how often each entry condition held.
fn print_condition_analysis(file: &Path, strategy: &StrategyConfig) {
    match load_bars_from_path(file) {
        Ok(bars) => {
            eprintln!("No trades; entry condition analysis follows.");
            print_diagnostics(file, &diagnose(strategy, &bars));
        }
        Err(e) => warn!("{}: condition analysis skipped: {e}", file.display()),
    }
}

const RANKED_ROWS: usize = 20;

fn print_batch(batch: &BatchSummary) {
    let ranked = batch.ranked();
    eprintln!("\n=== Batch Summary ===");
    eprintln!("Files:            {}", batch.total());
    eprintln!("Succeeded:        {}", batch.succeeded());
    eprintln!("Failed:           {}", batch.failures().len());
    eprintln!("No trades:        {}", batch.no_trade().count());
    eprintln!("Traded:           {}", ranked.len());

    if !ranked.is_empty() {
        eprintln!(
            "\n  {:<10}{:>10}{:>8}{:>10}{:>9}{:>10}",
            "Symbol", "Return", "Trades", "Win Rate", "Sharpe", "Max DD"
        );
        for r in ranked.iter().take(RANKED_ROWS) {
            eprintln!(
                "  {:<10}{:>9.2}%{:>8}{:>9.1}%{:>9.2}{:>9.1}%",
                r.symbol,
                r.total_return * 100.0,
                r.total_trades,
                r.win_rate * 100.0,
                r.sharpe_ratio,
                r.max_drawdown * 100.0
            );
        }
        if ranked.len() > RANKED_ROWS {
            eprintln!("  ... {} more", ranked.len() - RANKED_ROWS);
        }
    }

    if let Some(avg) = batch.averages() {
        eprintln!("\nAverage Return:   {:.2}%", avg.total_return * 100.0);
        eprintln!("Average Trades:   {:.1}", avg.total_trades);
        eprintln!("Average Win Rate: {:.1}%", avg.win_rate * 100.0);
    }
    if let (Some(best), Some(worst)) = (batch.best(), batch.worst()) {
        eprintln!("Best:             {} ({:.2}%)", best.symbol, best.total_return * 100.0);
        eprintln!("Worst:            {} ({:.2}%)", worst.symbol, worst.total_return * 100.0);
    }

    if !batch.failures().is_empty() {
        eprintln!("\nFailed:");
        for f in batch.failures() {
            eprintln!("  {}: {}", f.symbol, f.reason);
        }
    }
}

fn print_report(report: &RunReport, initial_capital: f64) {
    let s = &report.result.summary;
    let m = &report.metrics;
    eprintln!("\n=== {} ===", report.source);
    eprintln!("Bars:             {}", s.bars_processed);
    eprintln!("Initial Capital:  {initial_capital:.2}");
    eprintln!("Final Value:      {:.2}", s.final_value);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", s.total_trades);
    eprintln!("Won / Lost:       {} / {}", s.wins, s.losses);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!(
        "Orders:           {} submitted, {} rejected",
        s.orders_submitted, s.orders_rejected
    );
    match &s.open_position {
        Some(p) => eprintln!(
            "Open Position:    {} {} @ {:.2}, stop {:.2}",
            p.direction, p.size, p.entry_price, p.stop_loss_price
        ),
        None => eprintln!("Open Position:    none"),
    }
}

fn run_validate(config_path: &Path) -> Result<(), SniperError> {
    eprintln!("Validating config: {}", config_path.display());
    let settings = load_settings(config_path)?;
    let s = &settings.strategy;

    eprintln!("\nStrategy: {}", s.name);
    eprintln!("  trend_period:                 {}", s.trend_period);
    eprintln!("  breakout_period:              {}", s.breakout_period);
    eprintln!(
        "  volume:                       {:.2}x {}-bar average, {} of {} bar(s)",
        s.vol_multiplier, s.vol_ma_period, s.volume_confirmation, s.volume_confirmation_bars
    );
    eprintln!("  atr_period:                   {}", s.atr_period);
    eprintln!("  stop_loss_atr_multiplier:     {}", s.stop_loss_atr_multiplier);
    eprintln!("  risk_per_trade:               {}", s.risk_per_trade);
    eprintln!(
        "  trailing stop:                {}",
        if s.use_trailing_stop {
            format!("on, activates at {} ATR", s.trailing_stop_atr_multiplier)
        } else {
            "off".to_string()
        }
    );
    eprintln!("  volatility_threshold:         {}", s.volatility_threshold);

    let b = &settings.backtest;
    eprintln!("\nBacktest:");
    eprintln!("  initial_capital:              {:.2}", b.initial_capital);
    eprintln!("  commission_pct:               {}", b.commission_pct);
    eprintln!("  slippage_pct:                 {}", b.slippage_pct);
    match &settings.data {
        Some(d) if !d.exists() => warn!("data path {} does not exist", d.display()),
        Some(d) => eprintln!("  data:                         {}", d.display()),
        None => eprintln!("  data:                         (not set)"),
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_diagnose(config_path: &Path, data: Option<&Path>) -> Result<(), SniperError> {
    let settings = load_settings(config_path)?;
    let data = resolve_data(data, &settings)?;
    for file in resolve_files(&data)? {
        let bars = load_bars_from_path(&file)?;
        let report = diagnose(&settings.strategy, &bars);
        print_diagnostics(&file, &report);
    }
    Ok(())
}

fn print_stats(label: &str, stats: &ConditionStats) {
    eprintln!("\n{label} ({} bars evaluated):", stats.evaluated);
    for (name, count) in [
        ("trend", stats.trend),
        ("breakout", stats.breakout),
        ("volume", stats.volume),
        ("volatility", stats.volatility),
        ("all", stats.all),
    ] {
        eprintln!("  {name:<12}{count:>6}  ({:.1}%)", stats.rate(count) * 100.0);
    }
}

fn print_diagnostics(file: &Path, report: &Diagnostics) {
    eprintln!("\n=== {} ===", file.display());
    eprintln!("Bars: {} (warm-up {})", report.bars, report.warmup_bars);
    if !report.has_enough_data() {
        eprintln!("Not enough bars for every indicator; no signal can fire.");
        return;
    }
    if let Some(first) = report.first_ready {
        eprintln!("Indicators ready from bar {first}");
    }
    print_stats("Long", &report.long);
    print_stats("Short", &report.short);

    if report.hits.is_empty() {
        eprintln!("\nNo bar met every entry condition.");
        return;
    }
    eprintln!("\nFirst qualifying bars:");
    for hit in &report.hits {
        eprintln!(
            "  #{:<5} {}  {:<5} close {:.2} trend {:.2} extreme {:.2} volume {:.0} > {:.0}",
            hit.index,
            hit.timestamp,
            hit.direction,
            hit.close,
            hit.trend_avg,
            hit.prior_extreme,
            hit.volume,
            hit.volume_threshold
        );
    }
}
