//! CLI integration tests with real INI and CSV files on disk.
//!
//! Tests cover:
//! - Config loading through FileConfigAdapter
//! - Single-file and directory backtests, with the batch summary
//! - Trade report output
//! - Validate and diagnose commands
//! - Exit codes for configuration and data errors

mod common;

use clap::Parser;
use common::*;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;
use trendsniper::adapters::csv_adapter::list_csv_files;
use trendsniper::adapters::file_config_adapter::FileConfigAdapter;
use trendsniper::cli::{self, backtest_file, Cli};
use trendsniper::domain::batch::BatchSummary;
use trendsniper::domain::config_validation::{build_backtest_config, build_strategy_config};
use trendsniper::domain::error::SniperError;
use trendsniper::domain::ohlcv::Bar;

const CONFIG: &str = r#"
[strategy]
name = Test Sniper
trend_period = 3
vol_ma_period = 3
atr_period = 3
breakout_period = 3

[backtest]
initial_capital = 100000
commission_pct = 0.0
slippage_pct = 0.0

[logging]
level = warn
"#;

fn write_csv(path: &Path, bars: &[Bar]) {
    let mut content = String::from("Date,Open,High,Low,Close,Volume\n");
    for b in bars {
        writeln!(
            content,
            "{},{},{},{},{},{}",
            b.timestamp.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        )
        .unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Breakout on day 4, stopped out on day 5.
fn round_trip_bars() -> Vec<Bar> {
    let mut bars = rising_with_spike(5, 4);
    bars.push(bar_hlc(5, 12.5, 10.5, 12.0, 100.0));
    bars.extend((6..10).map(|d| bar(d, 12.0, 100.0)));
    bars
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> PathBuf {
        let path = self.path("sniper.ini");
        fs::write(&path, CONFIG).unwrap();
        path
    }
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["trendsniper"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

fn code_of(code: ExitCode) -> String {
    format!("{code:?}")
}

fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(code_of(code), code_of(ExitCode::from(expected)));
}

mod backtest {
    use super::*;

    #[test]
    fn single_file_round_trip() {
        let ws = Workspace::new();
        let config = FileConfigAdapter::from_string(CONFIG).unwrap();
        let strategy = build_strategy_config(&config).unwrap();
        let backtest = build_backtest_config(&config).unwrap();
        let data = ws.path("JM.csv");
        write_csv(&data, &round_trip_bars());

        let report = backtest_file(&data, &strategy, &backtest).unwrap();
        let summary = &report.result.summary;
        assert_eq!(report.strategy_name, "Test Sniper");
        assert_eq!(summary.bars_processed, 10);
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.losses, 1);
        assert!(summary.open_position.is_none());
        assert!(summary.final_value < 100_000.0);
        assert!((report.metrics.win_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn command_writes_trades() {
        let ws = Workspace::new();
        let data = ws.path("JM.csv");
        write_csv(&data, &round_trip_bars());
        let config = ws.config();
        let trades = ws.path("trades.csv");

        let code = run(&[
            "backtest",
            "--config",
            config.to_str().unwrap(),
            "--data",
            data.to_str().unwrap(),
            "--trades",
            trades.to_str().unwrap(),
        ]);
        assert_exit(code, 0);

        let content = fs::read_to_string(&trades).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().nth(1).unwrap().contains("stop-loss"));
        assert!(ws.path("trades_summary.csv").exists());
    }

    #[test]
    fn data_path_from_config() {
        let ws = Workspace::new();
        let data = ws.path("RB.csv");
        write_csv(&data, &round_trip_bars());
        let config = ws.path("with_data.ini");
        let content = CONFIG.replace(
            "[backtest]\n",
            &format!("[backtest]\ndata = {}\n", data.display()),
        );
        fs::write(&config, content).unwrap();

        assert_exit(run(&["backtest", "--config", config.to_str().unwrap()]), 0);
    }

    #[test]
    fn directory_runs_every_csv() {
        let ws = Workspace::new();
        let data_dir = ws.path("data");
        fs::create_dir(&data_dir).unwrap();
        write_csv(&data_dir.join("JM.csv"), &round_trip_bars());
        write_csv(&data_dir.join("RB.csv"), &round_trip_bars());
        let config = ws.config();
        let trades = ws.path("trades.csv");

        let code = run(&[
            "backtest",
            "-c",
            config.to_str().unwrap(),
            "-d",
            data_dir.to_str().unwrap(),
            "-t",
            trades.to_str().unwrap(),
        ]);
        assert_exit(code, 0);
        assert!(ws.path("trades_JM.csv").exists());
        assert!(ws.path("trades_RB.csv").exists());
    }

    #[test]
    fn directory_summary_ranks_and_counts() {
        let ws = Workspace::new();
        let data_dir = ws.path("data");
        fs::create_dir(&data_dir).unwrap();
        write_csv(&data_dir.join("JM.csv"), &round_trip_bars());
        let flat: Vec<Bar> = (0..10).map(|d| bar(d, 20.0, 100.0)).collect();
        write_csv(&data_dir.join("RB.csv"), &flat);
        fs::write(data_dir.join("XX.csv"), "Date,Open,High,Low,Close\n").unwrap();

        let config = FileConfigAdapter::from_string(CONFIG).unwrap();
        let strategy = build_strategy_config(&config).unwrap();
        let backtest = build_backtest_config(&config).unwrap();
        let mut batch = BatchSummary::new();
        for file in list_csv_files(&data_dir).unwrap() {
            match backtest_file(&file, &strategy, &backtest) {
                Ok(report) => batch.record(&report),
                Err(e) => batch.record_failure(&file.display().to_string(), &e),
            }
        }

        assert_eq!(batch.total(), 3);
        assert_eq!(batch.succeeded(), 2);
        assert_eq!(batch.failures()[0].symbol, "XX");
        let idle: Vec<_> = batch.no_trade().map(|r| r.symbol.clone()).collect();
        assert_eq!(idle, vec!["RB".to_string()]);
        let ranked = batch.ranked();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "JM");
        assert!(ranked[0].total_return < 0.0);
        assert_eq!(batch.best(), batch.worst());
        let avg = batch.averages().unwrap();
        assert!((avg.total_trades - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn directory_with_idle_file_succeeds() {
        let ws = Workspace::new();
        let data_dir = ws.path("data");
        fs::create_dir(&data_dir).unwrap();
        write_csv(&data_dir.join("JM.csv"), &round_trip_bars());
        let flat: Vec<Bar> = (0..10).map(|d| bar(d, 20.0, 100.0)).collect();
        write_csv(&data_dir.join("RB.csv"), &flat);
        let config = ws.config();

        let code = run(&[
            "backtest",
            "--config",
            config.to_str().unwrap(),
            "--data",
            data_dir.to_str().unwrap(),
        ]);
        assert_exit(code, 0);
    }

    #[test]
    fn bad_file_in_directory_fails_run() {
        let ws = Workspace::new();
        let data_dir = ws.path("data");
        fs::create_dir(&data_dir).unwrap();
        write_csv(&data_dir.join("JM.csv"), &round_trip_bars());
        fs::write(data_dir.join("XX.csv"), "Date,Open,High,Low,Close\n").unwrap();
        let config = ws.config();

        let code = run(&[
            "backtest",
            "--config",
            config.to_str().unwrap(),
            "--data",
            data_dir.to_str().unwrap(),
        ]);
        assert_exit(code, 3);
    }

    #[test]
    fn missing_data_setting() {
        let ws = Workspace::new();
        let config = ws.config();
        assert_exit(run(&["backtest", "--config", config.to_str().unwrap()]), 2);
    }

    #[test]
    fn empty_directory_is_no_data() {
        let ws = Workspace::new();
        let data_dir = ws.path("empty");
        fs::create_dir(&data_dir).unwrap();
        let config = ws.config();
        let code = run(&[
            "backtest",
            "--config",
            config.to_str().unwrap(),
            "--data",
            data_dir.to_str().unwrap(),
        ]);
        assert_exit(code, 5);
    }

    #[test]
    fn inconsistent_row_is_skipped_not_fatal() {
        let ws = Workspace::new();
        let config = FileConfigAdapter::from_string(CONFIG).unwrap();
        let mut bars = round_trip_bars();
        // High below close.
        bars[7].high = bars[7].close - 1.0;
        let data = ws.path("JM.csv");
        write_csv(&data, &bars);

        let report = backtest_file(
            &data,
            &build_strategy_config(&config).unwrap(),
            &build_backtest_config(&config).unwrap(),
        )
        .unwrap();
        assert_eq!(report.result.summary.bars_processed, 9);
        assert_eq!(report.result.summary.total_trades, 1);
    }

    #[test]
    fn missing_file_is_data_error() {
        let ws = Workspace::new();
        let config = FileConfigAdapter::from_string(CONFIG).unwrap();
        let err = backtest_file(
            &ws.path("nope.csv"),
            &build_strategy_config(&config).unwrap(),
            &build_backtest_config(&config).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, SniperError::Data { .. }));
    }
}

mod validate {
    use super::*;

    #[test]
    fn valid_config() {
        let ws = Workspace::new();
        let config = ws.config();
        assert_exit(run(&["validate", "--config", config.to_str().unwrap()]), 0);
    }

    #[test]
    fn invalid_value_exits_with_config_code() {
        let ws = Workspace::new();
        let path = ws.path("bad.ini");
        fs::write(&path, "[strategy]\nrisk_per_trade = 2.0\n").unwrap();
        assert_exit(run(&["validate", "--config", path.to_str().unwrap()]), 2);
    }

    #[test]
    fn missing_config_file() {
        let ws = Workspace::new();
        let path = ws.path("missing.ini");
        assert_exit(run(&["validate", "--config", path.to_str().unwrap()]), 2);
    }
}

mod diagnose {
    use super::*;

    #[test]
    fn runs_on_file() {
        let ws = Workspace::new();
        let data = ws.path("JM.csv");
        write_csv(&data, &round_trip_bars());
        let config = ws.config();
        let code = run(&[
            "diagnose",
            "--config",
            config.to_str().unwrap(),
            "--data",
            data.to_str().unwrap(),
        ]);
        assert_exit(code, 0);
    }

    #[test]
    fn short_series_still_succeeds() {
        let ws = Workspace::new();
        let data = ws.path("short.csv");
        write_csv(&data, &rising_with_spike(2, 1));
        let config = ws.config();
        let code = run(&[
            "diagnose",
            "--config",
            config.to_str().unwrap(),
            "--data",
            data.to_str().unwrap(),
        ]);
        assert_exit(code, 0);
    }
}
