use crate::bar_utils::group_bars_for_symbols;
use crate::config::{get_param, get_param_usize};
use crate::indicators::{rolling_std, simple_moving_average};
use crate::models::{Bar, SignalAction};
use crate::signals::SignalTable;
use log::info;
use std::collections::HashMap;

/// Trades deviations from a rolling mean: buy when the close sits far
/// below its moving average in z-score terms, sell when far above.
#[derive(Debug)]
pub struct MeanReversionStrategy {
    symbols: Vec<String>,
    lookback_period: usize,
    z_score_threshold: f64,
}

impl MeanReversionStrategy {
    pub fn new(symbols: Vec<String>, parameters: &HashMap<String, f64>) -> Self {
        Self {
            symbols,
            lookback_period: get_param_usize(parameters, "lookbackPeriod", 30, 2),
            z_score_threshold: get_param(parameters, "zScoreThreshold", 2.0),
        }
    }
}

impl super::Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion"
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
            let moving_avg = simple_moving_average(&closes, self.lookback_period);
            let std = rolling_std(&closes, self.lookback_period);

            for (index, bar) in series.iter().enumerate() {
                let z_score = if std[index] > 0.0 {
                    (closes[index] - moving_avg[index]) / std[index]
                } else {
                    f64::NAN
                };

                let action = if index < self.lookback_period || !z_score.is_finite() {
                    SignalAction::Hold
                } else if z_score < -self.z_score_threshold {
                    SignalAction::Buy
                } else if z_score > self.z_score_threshold {
                    SignalAction::Sell
                } else {
                    SignalAction::Hold
                };

                let row = table.row_mut(bar.date);
                row.set_signal(symbol, action);
                row.set_indicator(symbol, "z_score", z_score);
                row.set_indicator(symbol, "mean", moving_avg[index]);
            }
        }

        let (buys, sells, holds) = table.signal_counts();
        info!(
            "Generated {} mean-reversion signal rows ({} buy, {} sell, {} hold)",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<Bar> {
        let start: DateTime<Utc> = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(day, &close)| Bar {
                symbol: symbol.to_string(),
                date: start + Duration::days(day as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    fn strategy(lookback: f64, threshold: f64) -> MeanReversionStrategy {
        let mut params = HashMap::new();
        params.insert("lookbackPeriod".to_string(), lookback);
        params.insert("zScoreThreshold".to_string(), threshold);
        MeanReversionStrategy::new(vec!["AAPL".to_string()], &params)
    }

    #[test]
    fn plunge_below_the_mean_is_a_buy() {
        // Ten stable closes, then a crash well below two sigmas.
        let mut closes = vec![100.0; 10];
        closes.push(80.0);
        let bars = bars_from_closes("AAPL", &closes);
        let table = strategy(10.0, 2.0).generate_signals(&bars);

        let last = *table.dates().last().unwrap();
        let row = table.row(last).unwrap();
        assert_eq!(row.signal("AAPL"), SignalAction::Buy);
        assert!(row.indicator("AAPL", "z_score").unwrap() < -2.0);
        assert!(row.indicator("AAPL", "mean").is_some());
    }

    #[test]
    fn spike_above_the_mean_is_a_sell() {
        let mut closes = vec![100.0; 10];
        closes.push(125.0);
        let bars = bars_from_closes("AAPL", &closes);
        let table = strategy(10.0, 2.0).generate_signals(&bars);

        let last = *table.dates().last().unwrap();
        assert_eq!(table.row(last).unwrap().signal("AAPL"), SignalAction::Sell);
    }

    #[test]
    fn constant_prices_never_signal() {
        let bars = bars_from_closes("AAPL", &[100.0; 10]);
        let table = strategy(4.0, 2.0).generate_signals(&bars);
        for date in table.dates() {
            assert_eq!(table.row(*date).unwrap().signal("AAPL"), SignalAction::Hold);
        }
    }

    #[test]
    fn warmup_rows_hold_regardless_of_z_score() {
        let bars = bars_from_closes("AAPL", &[100.0, 100.0, 100.0, 60.0, 60.0]);
        let table = strategy(4.0, 1.0).generate_signals(&bars);
        let dates: Vec<_> = table.dates().copied().collect();
        for date in &dates[..4.min(dates.len())] {
            assert_eq!(table.row(*date).unwrap().signal("AAPL"), SignalAction::Hold);
        }
    }
}
