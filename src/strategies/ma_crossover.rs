use crate::bar_utils::group_bars_for_symbols;
use crate::config::get_param_usize;
use crate::indicators::simple_moving_average;
use crate::models::{Bar, SignalAction};
use crate::signals::SignalTable;
use log::info;
use std::collections::HashMap;

/// Classic moving-average crossover: buy when the fast average crosses
/// above the slow one, sell on the cross back down. The MACD line and its
/// signal line are exposed as indicator columns.
#[derive(Debug)]
pub struct MaCrossoverStrategy {
    symbols: Vec<String>,
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl MaCrossoverStrategy {
    pub fn new(symbols: Vec<String>, parameters: &HashMap<String, f64>) -> Self {
        Self {
            symbols,
            fast_period: get_param_usize(parameters, "fastPeriod", 20, 1),
            slow_period: get_param_usize(parameters, "slowPeriod", 50, 2),
            signal_period: get_param_usize(parameters, "signalPeriod", 9, 1),
        }
    }
}

impl super::Strategy for MaCrossoverStrategy {
    fn name(&self) -> &str {
        "ma_crossover"
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
            let fast_ma = simple_moving_average(&closes, self.fast_period);
            let slow_ma = simple_moving_average(&closes, self.slow_period);

            let macd: Vec<f64> = fast_ma
                .iter()
                .zip(&slow_ma)
                .map(|(fast, slow)| fast - slow)
                .collect();
            let signal_line = simple_moving_average(&macd, self.signal_period);

            for (index, bar) in series.iter().enumerate() {
                let mut action = SignalAction::Hold;
                if index >= self.slow_period {
                    let crossed_up = fast_ma[index] > slow_ma[index]
                        && fast_ma[index - 1] <= slow_ma[index - 1];
                    let crossed_down = fast_ma[index] < slow_ma[index]
                        && fast_ma[index - 1] >= slow_ma[index - 1];
                    if crossed_up {
                        action = SignalAction::Buy;
                    } else if crossed_down {
                        action = SignalAction::Sell;
                    }
                }

                let row = table.row_mut(bar.date);
                row.set_signal(symbol, action);
                row.set_indicator(symbol, "fast_ma", fast_ma[index]);
                row.set_indicator(symbol, "slow_ma", slow_ma[index]);
                row.set_indicator(symbol, "macd", macd[index]);
                row.set_indicator(symbol, "signal_line", signal_line[index]);
                row.set_indicator(symbol, "histogram", macd[index] - signal_line[index]);
            }
        }

        let (buys, sells, holds) = table.signal_counts();
        info!(
            "Generated {} crossover signal rows ({} buy, {} sell, {} hold)",
            table.len(),
            buys,
            sells,
            holds
        );
        table
    }

    fn min_data_points(&self) -> usize {
        self.slow_period + 1
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

    fn strategy(fast: f64, slow: f64) -> MaCrossoverStrategy {
        let mut params = HashMap::new();
        params.insert("fastPeriod".to_string(), fast);
        params.insert("slowPeriod".to_string(), slow);
        params.insert("signalPeriod".to_string(), 2.0);
        MaCrossoverStrategy::new(vec!["AAPL".to_string()], &params)
    }

    #[test]
    fn upward_crossover_emits_a_single_buy() {
        // Downtrend long enough to pin the fast average below the slow
        // one, then a sharp recovery forcing the cross.
        let closes = vec![
            110.0, 108.0, 106.0, 104.0, 102.0, 100.0, 98.0, 96.0, 94.0, 92.0, 110.0, 120.0, 130.0,
        ];
        let table = strategy(2.0, 5.0).generate_signals(&bars_from_closes("AAPL", &closes));

        let dates: Vec<_> = table.dates().copied().collect();
        let buys: Vec<usize> = dates
            .iter()
            .enumerate()
            .filter(|(_, date)| table.row(**date).unwrap().signal("AAPL") == SignalAction::Buy)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(buys.len(), 1);
        assert!(buys[0] >= 10);
    }

    #[test]
    fn downward_crossover_emits_a_sell() {
        let closes = vec![
            90.0, 92.0, 94.0, 96.0, 98.0, 100.0, 102.0, 104.0, 106.0, 108.0, 90.0, 80.0, 70.0,
        ];
        let table = strategy(2.0, 5.0).generate_signals(&bars_from_closes("AAPL", &closes));

        let sells = table
            .dates()
            .filter(|date| table.row(**date).unwrap().signal("AAPL") == SignalAction::Sell)
            .count();
        assert_eq!(sells, 1);
    }

    #[test]
    fn warmup_rows_never_signal() {
        let closes = vec![100.0, 90.0, 110.0, 95.0, 105.0, 100.0];
        let table = strategy(2.0, 5.0).generate_signals(&bars_from_closes("AAPL", &closes));
        let dates: Vec<_> = table.dates().copied().collect();
        for date in &dates[..5] {
            assert_eq!(table.row(*date).unwrap().signal("AAPL"), SignalAction::Hold);
        }
    }

    #[test]
    fn indicator_columns_are_published_after_warmup() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let table = strategy(2.0, 5.0).generate_signals(&bars_from_closes("AAPL", &closes));
        let last = *table.dates().last().unwrap();
        let row = table.row(last).unwrap();
        assert!(row.indicator("AAPL", "fast_ma").is_some());
        assert!(row.indicator("AAPL", "slow_ma").is_some());
        assert!(row.indicator("AAPL", "macd").is_some());
        assert!(row.indicator("AAPL", "signal_line").is_some());
        assert!(row.indicator("AAPL", "histogram").is_some());
    }
}
