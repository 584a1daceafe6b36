//! Configuration loading and validation.
//!
//! Builds [`StrategyConfig`] and [`BacktestConfig`] from a [`ConfigPort`].
//! Missing keys fall back to defaults; a present key that fails to parse or
//! breaks a range rule is `ConfigInvalid`.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SniperError;
use crate::domain::strategy::{StrategyConfig, VolumeConfirmation};
use crate::ports::config_port::ConfigPort;

const STRATEGY: &str = "strategy";
const BACKTEST: &str = "backtest";
const LOGGING: &str = "logging";

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, SniperError> {
    let defaults = StrategyConfig::default();

    let volume_confirmation = match config.get_string(STRATEGY, "volume_confirmation") {
        None => defaults.volume_confirmation,
        Some(raw) => raw
            .parse::<VolumeConfirmation>()
            .map_err(|reason| SniperError::invalid(STRATEGY, "volume_confirmation", reason))?,
    };

    let strategy = StrategyConfig {
        name: config
            .get_string(STRATEGY, "name")
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(defaults.name),
        trend_period: period(config, "trend_period", defaults.trend_period)?,
        vol_ma_period: period(config, "vol_ma_period", defaults.vol_ma_period)?,
        vol_multiplier: double(config, STRATEGY, "vol_multiplier", defaults.vol_multiplier)?,
        atr_period: period(config, "atr_period", defaults.atr_period)?,
        stop_loss_atr_multiplier: double(
            config,
            STRATEGY,
            "stop_loss_atr_multiplier",
            defaults.stop_loss_atr_multiplier,
        )?,
        risk_per_trade: double(config, STRATEGY, "risk_per_trade", defaults.risk_per_trade)?,
        breakout_period: period(config, "breakout_period", defaults.breakout_period)?,
        trailing_stop_atr_multiplier: double(
            config,
            STRATEGY,
            "trailing_stop_atr_multiplier",
            defaults.trailing_stop_atr_multiplier,
        )?,
        use_trailing_stop: config
            .get_bool(STRATEGY, "use_trailing_stop")?
            .unwrap_or(defaults.use_trailing_stop),
        volatility_threshold: double(
            config,
            STRATEGY,
            "volatility_threshold",
            defaults.volatility_threshold,
        )?,
        volume_confirmation,
        volume_confirmation_bars: period(
            config,
            "volume_confirmation_bars",
            defaults.volume_confirmation_bars,
        )?,
    };

    strategy.validate()?;
    Ok(strategy)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SniperError> {
    let defaults = BacktestConfig::default();
    let backtest = BacktestConfig {
        initial_capital: double(config, BACKTEST, "initial_capital", defaults.initial_capital)?,
        commission_pct: double(config, BACKTEST, "commission_pct", defaults.commission_pct)?,
        slippage_pct: double(config, BACKTEST, "slippage_pct", defaults.slippage_pct)?,
        risk_free_rate: double(config, BACKTEST, "risk_free_rate", defaults.risk_free_rate)?,
    };
    validate_backtest_config(&backtest)?;
    Ok(backtest)
}

pub fn validate_backtest_config(backtest: &BacktestConfig) -> Result<(), SniperError> {
    if !(backtest.initial_capital.is_finite() && backtest.initial_capital > 0.0) {
        return Err(SniperError::invalid(
            BACKTEST,
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if !(backtest.commission_pct >= 0.0 && backtest.commission_pct < 100.0) {
        return Err(SniperError::invalid(
            BACKTEST,
            "commission_pct",
            "commission_pct must be in [0, 100)",
        ));
    }
    if !(backtest.slippage_pct >= 0.0 && backtest.slippage_pct < 100.0) {
        return Err(SniperError::invalid(
            BACKTEST,
            "slippage_pct",
            "slippage_pct must be in [0, 100)",
        ));
    }
    if !(backtest.risk_free_rate >= 0.0 && backtest.risk_free_rate < 1.0) {
        return Err(SniperError::invalid(
            BACKTEST,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

/// `[backtest] data`, if set.
pub fn data_path(config: &dyn ConfigPort) -> Option<String> {
    config
        .get_string(BACKTEST, "data")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `[logging] level`, defaulting to `info`.
pub fn log_level(config: &dyn ConfigPort) -> Result<log::LevelFilter, SniperError> {
    match config.get_string(LOGGING, "level") {
        None => Ok(log::LevelFilter::Info),
        Some(raw) => raw.trim().parse::<log::LevelFilter>().map_err(|_| {
            SniperError::invalid(
                LOGGING,
                "level",
                format!("unknown level '{raw}' (off, error, warn, info, debug, trace)"),
            )
        }),
    }
}

fn period(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, SniperError> {
    match config.get_int(STRATEGY, key)? {
        None => Ok(default),
        Some(value) => usize::try_from(value)
            .map_err(|_| SniperError::invalid(STRATEGY, key, format!("{key} must be positive"))),
    }
}

fn double(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, SniperError> {
    Ok(config.get_double(section, key)?.unwrap_or(default))
}
