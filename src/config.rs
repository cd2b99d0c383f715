use crate::errors::EngineError;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// Extract a parameter as f64 with a default value
pub fn get_param(params: &HashMap<String, f64>, key: &str, default: f64) -> f64 {
    params.get(key).copied().unwrap_or(default)
}

/// Extract a parameter as usize with a minimum value
pub fn get_param_usize(
    params: &HashMap<String, f64>,
    key: &str,
    default: usize,
    min: usize,
) -> usize {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| v.round().max(min as f64) as usize)
        .unwrap_or(default)
}

/// Parse a `YYYY-MM-DD` date into a UTC midnight timestamp.
pub fn parse_date(key: &str, raw: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        EngineError::InvalidConfiguration(format!(
            "{} must be a date in YYYY-MM-DD format (value: {})",
            key, raw
        ))
    })?;
    Ok(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0).expect("midnight is valid"),
        Utc,
    ))
}

/// Capital, cost and window parameters for one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub commission_rate: f64,
    pub slippage: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            start_date: None,
            end_date: None,
            commission_rate: 0.0005,
            slippage: 0.0001,
        }
    }
}

impl BacktestConfig {
    /// Create a config from a parameter map, falling back to defaults.
    pub fn from_parameters(parameters: &HashMap<String, f64>) -> Self {
        Self {
            initial_capital: get_param(parameters, "initialCapital", 100_000.0),
            start_date: None,
            end_date: None,
            commission_rate: get_param(parameters, "commissionRate", 0.0005),
            slippage: get_param(parameters, "slippage", 0.0001),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "initialCapital must be a positive number (value: {})",
                self.initial_capital
            )));
        }
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "commissionRate must be >= 0 (value: {})",
                self.commission_rate
            )));
        }
        if !self.slippage.is_finite() || self.slippage < 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "slippage must be >= 0 (value: {})",
                self.slippage
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(EngineError::InvalidConfiguration(format!(
                    "endDate {} is before startDate {}",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

/// Position-sizing and risk-control parameters.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub max_position_size: f64,
    pub max_portfolio_risk: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: 0.1,
            max_portfolio_risk: 0.02,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.1,
        }
    }
}

impl RiskConfig {
    pub fn from_parameters(parameters: &HashMap<String, f64>) -> Self {
        Self {
            max_position_size: get_param(parameters, "maxPositionSize", 0.1),
            max_portfolio_risk: get_param(parameters, "maxPortfolioRisk", 0.02),
            stop_loss_pct: get_param(parameters, "stopLossPct", 0.05),
            take_profit_pct: get_param(parameters, "takeProfitPct", 0.1),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.max_position_size.is_finite()
            || self.max_position_size <= 0.0
            || self.max_position_size > 1.0
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "maxPositionSize must be in (0, 1] (value: {})",
                self.max_position_size
            )));
        }
        if !self.max_portfolio_risk.is_finite() || self.max_portfolio_risk <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "maxPortfolioRisk must be > 0 (value: {})",
                self.max_portfolio_risk
            )));
        }
        if !self.stop_loss_pct.is_finite() || self.stop_loss_pct <= 0.0 || self.stop_loss_pct >= 1.0
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "stopLossPct must be in (0, 1) (value: {})",
                self.stop_loss_pct
            )));
        }
        if !self.take_profit_pct.is_finite() || self.take_profit_pct <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "takeProfitPct must be > 0 (value: {})",
                self.take_profit_pct
            )));
        }
        Ok(())
    }
}
