//! The signal-table contract between strategies and the backtest engine:
//! one row per date, carrying a directional signal per symbol plus any
//! indicator values the strategy chooses to expose (keyed
//! `{symbol}_{name}`, e.g. `AAPL_momentum`).

use crate::models::SignalAction;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct SignalRow {
    signals: HashMap<String, SignalAction>,
    indicators: HashMap<String, f64>,
}

impl SignalRow {
    pub fn set_signal(&mut self, symbol: &str, action: SignalAction) {
        self.signals.insert(symbol.to_string(), action);
    }

    /// Signal for a symbol; symbols without an entry hold.
    pub fn signal(&self, symbol: &str) -> SignalAction {
        self.signals
            .get(symbol)
            .copied()
            .unwrap_or(SignalAction::Hold)
    }

    /// Store an indicator value. Non-finite values are dropped so that
    /// warmup NaNs never leak into sizing decisions.
    pub fn set_indicator(&mut self, symbol: &str, name: &str, value: f64) {
        if value.is_finite() {
            self.indicators.insert(format!("{}_{}", symbol, name), value);
        }
    }

    pub fn indicator(&self, symbol: &str, name: &str) -> Option<f64> {
        self.indicators
            .get(&format!("{}_{}", symbol, name))
            .copied()
    }

    pub fn indicators(&self) -> &HashMap<String, f64> {
        &self.indicators
    }
}

/// Read-only after generation: the engine only looks rows up by date.
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    rows: BTreeMap<DateTime<Utc>, SignalRow>,
}

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_mut(&mut self, date: DateTime<Utc>) -> &mut SignalRow {
        self.rows.entry(date).or_default()
    }

    pub fn row(&self, date: DateTime<Utc>) -> Option<&SignalRow> {
        self.rows.get(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (buys, sells, holds) across every symbol entry, for logging.
    pub fn signal_counts(&self) -> (usize, usize, usize) {
        let mut buys = 0;
        let mut sells = 0;
        let mut holds = 0;
        for row in self.rows.values() {
            for action in row.signals.values() {
                match action {
                    SignalAction::Buy => buys += 1,
                    SignalAction::Sell => sells += 1,
                    SignalAction::Hold => holds += 1,
                }
            }
        }
        (buys, sells, holds)
    }
}
