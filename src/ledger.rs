use crate::models::{DailySnapshot, SymbolValuation, Trade};
use chrono::{DateTime, Utc};
use log::warn;
use std::collections::{BTreeMap, HashMap};

/// The single mutable portfolio state of a backtest run: cash, open
/// positions, latest equity and the append-only trade log. Mutated only by
/// the execution simulator and by `mark_to_market`.
#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    cash: f64,
    positions: BTreeMap<String, f64>,
    equity: f64,
    trades: Vec<Trade>,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            positions: BTreeMap::new(),
            equity: initial_capital,
            trades: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    /// Held quantity for a symbol, zero when flat.
    pub fn position(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn positions(&self) -> &BTreeMap<String, f64> {
        &self.positions
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub(crate) fn debit_cash(&mut self, amount: f64) {
        self.cash -= amount;
    }

    pub(crate) fn credit_cash(&mut self, amount: f64) {
        self.cash += amount;
    }

    pub(crate) fn add_shares(&mut self, symbol: &str, quantity: f64) {
        *self.positions.entry(symbol.to_string()).or_insert(0.0) += quantity;
    }

    /// Reduce a holding, dropping the entry once it reaches zero so the
    /// position map only ever contains open long positions.
    pub(crate) fn remove_shares(&mut self, symbol: &str, quantity: f64) {
        let remaining = self.position(symbol) - quantity;
        if remaining <= 0.0 {
            self.positions.remove(symbol);
        } else {
            self.positions.insert(symbol.to_string(), remaining);
        }
    }

    pub(crate) fn push_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Revalue every open position at the day's close and record the
    /// result. A held symbol with no price today contributes nothing to the
    /// day's valuation.
    pub fn mark_to_market(
        &mut self,
        date: DateTime<Utc>,
        closes: &HashMap<String, f64>,
    ) -> DailySnapshot {
        let mut positions_value = 0.0;
        let mut valuations = BTreeMap::new();

        for (symbol, &quantity) in &self.positions {
            match closes.get(symbol) {
                Some(&price) => {
                    let value = price * quantity;
                    positions_value += value;
                    valuations.insert(symbol.clone(), SymbolValuation { quantity, value });
                }
                None => {
                    warn!("Symbol {} not found in data for {}", symbol, date);
                }
            }
        }

        self.equity = self.cash + positions_value;

        DailySnapshot {
            date,
            portfolio_value: self.equity,
            cash: self.cash,
            positions_value,
            positions: valuations,
        }
    }
}
