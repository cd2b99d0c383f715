use crate::bar_utils::group_bars_for_symbols;
use crate::config::{get_param, get_param_usize};
use crate::indicators::rate_of_change;
use crate::models::{Bar, SignalAction};
use crate::signals::SignalTable;
use log::info;
use std::collections::HashMap;

/// Buys strength, sells weakness: the lookback-period return is compared
/// against a symmetric threshold. The raw momentum value is exposed as an
/// indicator column so the sizer can use it as signal strength.
#[derive(Debug)]
pub struct MomentumStrategy {
    symbols: Vec<String>,
    lookback_period: usize,
    threshold: f64,
}

impl MomentumStrategy {
    pub fn new(symbols: Vec<String>, parameters: &HashMap<String, f64>) -> Self {
        Self {
            symbols,
            lookback_period: get_param_usize(parameters, "lookbackPeriod", 20, 1),
            threshold: get_param(parameters, "threshold", 0.05),
        }
    }
}

impl super::Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn generate_signals(&self, bars: &[Bar]) -> SignalTable {
        let grouped = group_bars_for_symbols(&self.symbols, bars);
        let mut table = SignalTable::new();

        for symbol in &self.symbols {
            let Some(series) = grouped.get(symbol) else {
                continue;
            };
            let closes: Vec<f64> = series.iter().map(|bar| bar.close).collect();
            let momentum = rate_of_change(&closes, self.lookback_period);

            for (index, bar) in series.iter().enumerate() {
                let value = momentum[index];
                let action = if index < self.lookback_period || !value.is_finite() {
                    SignalAction::Hold
                } else if value > self.threshold {
                    SignalAction::Buy
                } else if value < -self.threshold {
                    SignalAction::Sell
                } else {
                    SignalAction::Hold
                };

                let row = table.row_mut(bar.date);
                row.set_signal(symbol, action);
                row.set_indicator(symbol, "momentum", value);
            }
        }

        let (buys, sells, holds) = table.signal_counts();
        info!(
            "Generated {} momentum signal rows ({} buy, {} sell, {} hold)",
            table.len(),
            buys,
            sells,
            holds
        );
        table
    }

    fn min_data_points(&self) -> usize {
        self.lookback_period + 1
    }
}
