use crate::models::{BacktestMetrics, DailySnapshot, OrderSide, Trade};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Default)]
struct SymbolTradeTotals {
    shares_bought: f64,
    cost_basis: f64,
    shares_sold: f64,
    sell_value: f64,
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Derive summary statistics from the daily equity curve and the trade
    /// log of a completed run.
    pub fn calculate(
        snapshots: &[DailySnapshot],
        trades: &[Trade],
        initial_capital: f64,
    ) -> BacktestMetrics {
        let final_value = snapshots
            .last()
            .map(|snapshot| snapshot.portfolio_value)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            final_value / initial_capital - 1.0
        } else {
            0.0
        };

        let annual_return = if snapshots.is_empty() {
            0.0
        } else {
            (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / snapshots.len() as f64) - 1.0
        };

        let daily_returns = Self::daily_returns(snapshots);
        let volatility = Self::annualized_volatility(&daily_returns);
        let sharpe_ratio = if volatility > 0.0 {
            annual_return / volatility
        } else {
            0.0
        };

        BacktestMetrics {
            initial_value: initial_capital,
            final_value,
            total_return,
            annual_return,
            volatility,
            sharpe_ratio,
            max_drawdown: Self::max_drawdown(&daily_returns),
            win_rate: Self::win_rate(trades),
            num_trades: trades.len(),
        }
    }

    fn daily_returns(snapshots: &[DailySnapshot]) -> Vec<f64> {
        snapshots
            .windows(2)
            .map(|window| {
                let previous = window[0].portfolio_value;
                if previous > 0.0 {
                    window[1].portfolio_value / previous - 1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn annualized_volatility(daily_returns: &[f64]) -> f64 {
        if daily_returns.len() < 2 {
            return 0.0;
        }
        let std_dev = daily_returns.iter().std_dev();
        std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    }

    /// Largest peak-to-trough decline of the cumulative return series.
    /// Always in [-1, 0].
    fn max_drawdown(daily_returns: &[f64]) -> f64 {
        let mut cumulative = 1.0;
        let mut running_max = 1.0;
        let mut max_drawdown = 0.0_f64;

        for &daily_return in daily_returns {
            cumulative *= 1.0 + daily_return;
            if cumulative > running_max {
                running_max = cumulative;
            }
            let drawdown = cumulative / running_max - 1.0;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown
    }

    /// Fraction of symbols whose aggregate average sell price beat their
    /// aggregate average buy price. Symbols that never sold are left out;
    /// no completed round trips yields 0.
    fn win_rate(trades: &[Trade]) -> f64 {
        let mut totals: BTreeMap<&str, SymbolTradeTotals> = BTreeMap::new();

        for trade in trades {
            let entry = totals.entry(trade.symbol.as_str()).or_default();
            match trade.action {
                OrderSide::Buy => {
                    entry.shares_bought += trade.quantity;
                    entry.cost_basis += trade.quantity * trade.price;
                }
                OrderSide::Sell => {
                    entry.shares_sold += trade.quantity;
                    entry.sell_value += trade.quantity * trade.price;
                }
            }
        }

        let mut wins = 0usize;
        let mut losses = 0usize;
        for totals in totals.values() {
            if totals.shares_sold <= 0.0 {
                continue;
            }
            let avg_buy_price = if totals.shares_bought > 0.0 {
                totals.cost_basis / totals.shares_bought
            } else {
                0.0
            };
            let avg_sell_price = totals.sell_value / totals.shares_sold;
            if avg_sell_price > avg_buy_price {
                wins += 1;
            } else {
                losses += 1;
            }
        }

        if wins + losses > 0 {
            wins as f64 / (wins + losses) as f64
        } else {
            0.0
        }
    }
}
