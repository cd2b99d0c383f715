use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One bar of market data for a single symbol and day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Directional instruction produced by a strategy for one symbol and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "buy",
            SignalAction::Sell => "sell",
            SignalAction::Hold => "hold",
        }
    }

    /// Numeric encoding used by weighted signal aggregation.
    pub fn value(&self) -> f64 {
        match self {
            SignalAction::Buy => 1.0,
            SignalAction::Sell => -1.0,
            SignalAction::Hold => 0.0,
        }
    }
}

impl FromStr for SignalAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(SignalAction::Buy),
            "sell" => Ok(SignalAction::Sell),
            "hold" => Ok(SignalAction::Hold),
            other => Err(anyhow!("Unknown signal action '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    Filled,
    PartiallyFilled,
    Canceled,
    Rejected,
    Pending,
}

impl OrderStatus {
    /// Terminal orders can no longer transition to another status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    GoodTillCanceled,
    ImmediateOrCancel,
}

/// A trading order. The simulation path only submits market orders; the
/// remaining variants carry the limit/stop prices a routing layer would use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub order_type: OrderType,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub filled_quantity: f64,
    pub filled_price: Option<f64>,
    pub commission: f64,
}

impl Order {
    fn new(symbol: &str, side: OrderSide, quantity: f64, order_type: OrderType) -> Self {
        Self {
            id: None,
            symbol: symbol.to_string(),
            side,
            quantity,
            order_type,
            limit_price: None,
            stop_price: None,
            time_in_force: TimeInForce::Day,
            status: OrderStatus::New,
            submitted_at: None,
            filled_at: None,
            filled_quantity: 0.0,
            filled_price: None,
            commission: 0.0,
        }
    }

    pub fn market(symbol: &str, side: OrderSide, quantity: f64) -> Self {
        Self::new(symbol, side, quantity, OrderType::Market)
    }

    pub fn limit(symbol: &str, side: OrderSide, quantity: f64, limit_price: f64) -> Self {
        let mut order = Self::new(symbol, side, quantity, OrderType::Limit);
        order.limit_price = Some(limit_price);
        order
    }

    pub fn stop(symbol: &str, side: OrderSide, quantity: f64, stop_price: f64) -> Self {
        let mut order = Self::new(symbol, side, quantity, OrderType::Stop);
        order.stop_price = Some(stop_price);
        order
    }

    pub fn stop_limit(
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        stop_price: f64,
        limit_price: f64,
    ) -> Self {
        let mut order = Self::new(symbol, side, quantity, OrderType::StopLimit);
        order.stop_price = Some(stop_price);
        order.limit_price = Some(limit_price);
        order
    }
}

/// Immutable record of a completed fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub date: DateTime<Utc>,
    pub symbol: String,
    pub action: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub value: f64,
}

/// Quantity and mark-to-market value of one holding on one day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SymbolValuation {
    pub quantity: f64,
    pub value: f64,
}

/// One row of the equity curve: portfolio totals plus per-symbol detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshot {
    pub date: DateTime<Utc>,
    pub portfolio_value: f64,
    pub cash: f64,
    pub positions_value: f64,
    pub positions: BTreeMap<String, SymbolValuation>,
}

/// Summary statistics derived from the equity curve and the trade log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestMetrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub num_trades: usize,
}

/// Complete output of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRun {
    pub id: String,
    pub strategy: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub initial_capital: f64,
    pub results: Vec<DailySnapshot>,
    pub metrics: BacktestMetrics,
    pub trades: Vec<Trade>,
    pub final_value: f64,
    pub execution_time_secs: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_action_round_trips_through_strings() {
        for action in [SignalAction::Buy, SignalAction::Sell, SignalAction::Hold] {
            assert_eq!(action.as_str().parse::<SignalAction>().unwrap(), action);
        }
        assert!("flatten".parse::<SignalAction>().is_err());
    }

    #[test]
    fn order_constructors_set_prices_and_defaults() {
        let market = Order::market("AAPL", OrderSide::Buy, 10.0);
        assert_eq!(market.order_type, OrderType::Market);
        assert_eq!(market.status, OrderStatus::New);
        assert!(market.limit_price.is_none());

        let stop_limit = Order::stop_limit("AAPL", OrderSide::Sell, 5.0, 95.0, 94.5);
        assert_eq!(stop_limit.order_type, OrderType::StopLimit);
        assert_eq!(stop_limit.stop_price, Some(95.0));
        assert_eq!(stop_limit.limit_price, Some(94.5));
        assert_eq!(stop_limit.time_in_force, TimeInForce::Day);
    }

    #[test]
    fn terminal_statuses_are_flagged() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }
}
