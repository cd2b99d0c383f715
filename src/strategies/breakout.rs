use crate::bar_utils::group_bars_for_symbols;
use crate::config::{get_param, get_param_usize};
use crate::indicators::average_true_range;
use crate::models::{Bar, SignalAction};
use crate::signals::SignalTable;
use log::info;
use std::collections::HashMap;

/// Trades range breaks: buy when the close clears the prior lookback high
/// by the threshold fraction, sell when it breaks the prior low likewise.
/// ATR is exposed as an indicator column for downstream consumers.
#[derive(Debug)]
pub struct BreakoutStrategy {
    symbols: Vec<String>,
    lookback_period: usize,
    breakout_threshold: f64,
    atr_period: usize,
}

impl BreakoutStrategy {
    pub fn new(symbols: Vec<String>, parameters: &HashMap<String, f64>) -> Self {
        Self {
            symbols,
            lookback_period: get_param_usize(parameters, "lookbackPeriod", 20, 1),
            breakout_threshold: get_param(parameters, "breakoutThreshold", 0.02),
            atr_period: get_param_usize(parameters, "atrPeriod", 14, 1),
        }
    }

    /// Highest high over the `lookback` bars ending just before `index`.
    fn prior_resistance(&self, series: &[&Bar], index: usize) -> Option<f64> {
        if index < self.lookback_period {
            return None;
        }
        series[index - self.lookback_period..index]
            .iter()
            .map(|bar| bar.high)
            .fold(None, |acc: Option<f64>, high| {
                Some(acc.map_or(high, |best| best.max(high)))
            })
    }

    fn prior_support(&self, series: &[&Bar], index: usize) -> Option<f64> {
        if index < self.lookback_period {
            return None;
        }
        series[index - self.lookback_period..index]
            .iter()
            .map(|bar| bar.low)
            .fold(None, |acc: Option<f64>, low| {
                Some(acc.map_or(low, |best| best.min(low)))
            })
    }
}

impl super::Strategy for BreakoutStrategy {
    fn name(&self) -> &str {
        "breakout"
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
            let highs: Vec<f64> = series.iter().map(|bar| bar.high).collect();
            let lows: Vec<f64> = series.iter().map(|bar| bar.low).collect();
            let closes: Vec<f64> = series.iter().map(|bar| bar.close).collect();
            let atr = average_true_range(&highs, &lows, &closes, self.atr_period);

            for (index, bar) in series.iter().enumerate() {
                let mut action = SignalAction::Hold;
                if index > self.lookback_period {
                    if let (Some(resistance), Some(support)) = (
                        self.prior_resistance(series, index),
                        self.prior_support(series, index),
                    ) {
                        if resistance > 0.0
                            && (closes[index] - resistance) / resistance > self.breakout_threshold
                        {
                            action = SignalAction::Buy;
                        } else if support > 0.0
                            && (support - closes[index]) / support > self.breakout_threshold
                        {
                            action = SignalAction::Sell;
                        }
                    }
                }

                let row = table.row_mut(bar.date);
                row.set_signal(symbol, action);
                row.set_indicator(symbol, "atr", atr[index]);
            }
        }

        let (buys, sells, holds) = table.signal_counts();
        info!(
            "Generated {} breakout signal rows ({} buy, {} sell, {} hold)",
            table.len(),
            buys,
            sells,
            holds
        );
        table
    }

    fn min_data_points(&self) -> usize {
        self.lookback_period + 2
    }
}
