use crate::bar_utils::pct_change;
use crate::config::RiskConfig;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// Direction of an open position, for stop and target placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

/// Position sizing and portfolio risk controls. Stateless: every method is
/// a pure function of its inputs and the configured limits.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Currency amount to deploy for a new position.
    ///
    /// Starts from the per-position cap, tightens it by the volatility
    /// budget when a volatility estimate is supplied, scales by signal
    /// strength, and winds down linearly once more than 70% of equity is
    /// already deployed. Never negative.
    pub fn size_position(
        &self,
        symbol: &str,
        price: f64,
        equity: f64,
        signal_strength: Option<f64>,
        current_positions: &BTreeMap<String, f64>,
        volatility: Option<f64>,
    ) -> f64 {
        let mut size = equity * self.config.max_position_size;

        if let Some(vol) = volatility {
            if vol > 0.0 {
                let risk_based = equity * self.config.max_portfolio_risk / vol;
                size = size.min(risk_based);
            }
        }

        if let Some(strength) = signal_strength {
            size *= strength.abs().clamp(0.0, 1.0);
        }

        let current_exposure: f64 = current_positions.values().sum();
        let utilization = if equity > 0.0 {
            current_exposure / equity
        } else {
            0.0
        };
        if utilization > 0.7 {
            let reduction = 1.0 - (utilization - 0.7) / 0.3;
            size *= reduction.max(0.0);
        }

        let size = size.max(0.0);
        debug!("Sized position for {} at price {:.2}: {:.2}", symbol, price, size);
        size
    }

    pub fn stop_loss_price(&self, entry_price: f64, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => entry_price * (1.0 - self.config.stop_loss_pct),
            PositionSide::Short => entry_price * (1.0 + self.config.stop_loss_pct),
        }
    }

    pub fn take_profit_price(&self, entry_price: f64, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => entry_price * (1.0 + self.config.take_profit_pct),
            PositionSide::Short => entry_price * (1.0 - self.config.take_profit_pct),
        }
    }

    /// Portfolio Value-at-Risk by historical simulation.
    ///
    /// `returns` holds one date-aligned daily return series per symbol;
    /// series are aligned on their most recent overlap. Returns 0 when no
    /// overlapping data exists for the held symbols.
    pub fn portfolio_var(
        &self,
        positions: &BTreeMap<String, f64>,
        returns: &HashMap<String, Vec<f64>>,
        confidence_level: f64,
        horizon_days: u32,
    ) -> f64 {
        let held: Vec<(&String, f64)> = positions
            .iter()
            .filter(|(symbol, _)| returns.get(*symbol).map(|r| !r.is_empty()).unwrap_or(false))
            .map(|(symbol, &weight)| (symbol, weight))
            .collect();

        let overlap = held
            .iter()
            .map(|(symbol, _)| returns[*symbol].len())
            .min()
            .unwrap_or(0);
        if held.is_empty() || held.len() < positions.len() || overlap == 0 {
            warn!("No overlapping returns data available for VaR calculation");
            return 0.0;
        }

        let mut portfolio_returns = vec![0.0; overlap];
        for (symbol, weight) in &held {
            let series = &returns[*symbol];
            let tail = &series[series.len() - overlap..];
            for (day, value) in tail.iter().enumerate() {
                portfolio_returns[day] += weight * value;
            }
        }

        let var = -percentile(&portfolio_returns, (1.0 - confidence_level) * 100.0)
            * (horizon_days as f64).sqrt();
        debug!(
            "Portfolio VaR ({:.0}%, {} day): {:.4}",
            confidence_level * 100.0,
            horizon_days,
            var
        );
        var
    }

    /// Shrink proposed position sizes for highly correlated pairs. Each
    /// pair with return correlation above 0.7 has both sizes multiplied by
    /// a factor falling linearly from 1.0 (corr 0.7) to 0.5 (corr 1.0).
    pub fn derisk_correlated(
        &self,
        position_sizes: &BTreeMap<String, f64>,
        price_history: &HashMap<String, Vec<f64>>,
    ) -> BTreeMap<String, f64> {
        let mut adjusted = position_sizes.clone();
        let symbols: Vec<&String> = position_sizes.keys().collect();
        if symbols.len() < 2 {
            return adjusted;
        }

        let returns: HashMap<&String, Vec<f64>> = symbols
            .iter()
            .filter_map(|symbol| {
                price_history
                    .get(*symbol)
                    .map(|prices| (*symbol, pct_change(prices)))
            })
            .collect();

        for (i, first) in symbols.iter().enumerate() {
            for second in symbols.iter().skip(i + 1) {
                let (Some(a), Some(b)) = (returns.get(*first), returns.get(*second)) else {
                    continue;
                };
                let Some(correlation) = pearson_correlation(a, b) else {
                    continue;
                };
                if correlation > 0.7 {
                    let reduction = 1.0 - ((correlation - 0.7) / 0.3) * 0.5;
                    *adjusted.get_mut(*first).expect("key from same map") *= reduction;
                    *adjusted.get_mut(*second).expect("key from same map") *= reduction;
                    debug!(
                        "Reduced positions for correlated pair {}/{} (correlation {:.2}, factor {:.2})",
                        first, second, correlation, reduction
                    );
                }
            }
        }

        adjusted
    }
}

/// Linear-interpolation percentile, `p` in [0, 100].
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Pearson correlation of two equally long series, aligned on their most
/// recent overlap when lengths differ. None when either side is constant
/// or the overlap is shorter than two points.
fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let overlap = a.len().min(b.len());
    if overlap < 2 {
        return None;
    }
    let a = &a[a.len() - overlap..];
    let b = &b[b.len() - overlap..];

    let mean_a = a.iter().sum::<f64>() / overlap as f64;
    let mean_b = b.iter().sum::<f64>() / overlap as f64;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..overlap {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        covariance += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    Some((covariance / (var_a * var_b).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskConfig;

    fn manager() -> RiskManager {
        RiskManager::new(RiskConfig::default())
    }

    #[test]
    fn base_size_is_capped_by_max_position_size() {
        let size = manager().size_position("AAPL", 100.0, 100_000.0, None, &BTreeMap::new(), None);
        assert!((size - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn volatility_cap_tightens_the_size() {
        // 2% risk budget at 40% volatility: 100_000 * 0.02 / 0.4 = 5_000.
        let size =
            manager().size_position("AAPL", 100.0, 100_000.0, None, &BTreeMap::new(), Some(0.4));
        assert!((size - 5_000.0).abs() < 1e-9);

        // Non-positive volatility skips the cap entirely.
        let size =
            manager().size_position("AAPL", 100.0, 100_000.0, None, &BTreeMap::new(), Some(0.0));
        assert!((size - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn signal_strength_scales_and_clamps() {
        let half =
            manager().size_position("AAPL", 100.0, 100_000.0, Some(0.5), &BTreeMap::new(), None);
        assert!((half - 5_000.0).abs() < 1e-9);

        let saturated =
            manager().size_position("AAPL", 100.0, 100_000.0, Some(-3.0), &BTreeMap::new(), None);
        assert!((saturated - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn heavy_utilization_winds_size_down() {
        let mut positions = BTreeMap::new();
        positions.insert("MSFT".to_string(), 85_000.0);

        // Utilization 0.85 reduces by 1 - (0.85 - 0.7)/0.3 = 0.5.
        let size = manager().size_position("AAPL", 100.0, 100_000.0, None, &positions, None);
        assert!((size - 5_000.0).abs() < 1e-9);

        positions.insert("MSFT".to_string(), 100_000.0);
        let size = manager().size_position("AAPL", 100.0, 100_000.0, None, &positions, None);
        assert!(size.abs() < 1e-9);

        // Over-full portfolios clamp at zero rather than going negative.
        positions.insert("MSFT".to_string(), 200_000.0);
        let size = manager().size_position("AAPL", 100.0, 100_000.0, None, &positions, None);
        assert!(size.abs() < 1e-9);
    }

    #[test]
    fn zero_equity_is_treated_as_unutilized() {
        let mut positions = BTreeMap::new();
        positions.insert("MSFT".to_string(), 1_000.0);
        let size = manager().size_position("AAPL", 100.0, 0.0, None, &positions, None);
        assert!(size.abs() < 1e-9);
    }

    #[test]
    fn stop_and_target_prices_mirror_for_shorts() {
        let risk = manager();
        assert!((risk.stop_loss_price(100.0, PositionSide::Long) - 95.0).abs() < 1e-9);
        assert!((risk.stop_loss_price(100.0, PositionSide::Short) - 105.0).abs() < 1e-9);
        assert!((risk.take_profit_price(100.0, PositionSide::Long) - 110.0).abs() < 1e-9);
        assert!((risk.take_profit_price(100.0, PositionSide::Short) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn var_weights_and_scales_portfolio_returns() {
        let mut positions = BTreeMap::new();
        positions.insert("AAPL".to_string(), 1.0);

        let mut returns = HashMap::new();
        returns.insert(
            "AAPL".to_string(),
            vec![-0.05, -0.02, 0.0, 0.01, 0.01, 0.02, 0.02, 0.03, 0.03, 0.04, 0.05],
        );

        // 95% confidence over 11 sorted points: 5th percentile sits half
        // way between -0.05 and -0.02.
        let var = manager().portfolio_var(&positions, &returns, 0.95, 1);
        assert!((var - 0.035).abs() < 1e-9);

        let four_day = manager().portfolio_var(&positions, &returns, 0.95, 4);
        assert!((four_day - 0.07).abs() < 1e-9);
    }

    #[test]
    fn var_without_overlapping_data_is_zero() {
        let mut positions = BTreeMap::new();
        positions.insert("AAPL".to_string(), 1.0);
        positions.insert("MSFT".to_string(), 1.0);

        let mut returns = HashMap::new();
        returns.insert("AAPL".to_string(), vec![0.01, -0.01]);

        let var = manager().portfolio_var(&positions, &returns, 0.95, 1);
        assert!(var.abs() < 1e-12);
    }

    #[test]
    fn correlated_pair_is_shrunk_together() {
        let mut sizes = BTreeMap::new();
        sizes.insert("AAPL".to_string(), 10_000.0);
        sizes.insert("MSFT".to_string(), 10_000.0);

        let mut history = HashMap::new();
        // Perfectly correlated price paths: factor = 1 - (1.0 - 0.7)/0.3 * 0.5 = 0.5.
        history.insert("AAPL".to_string(), vec![100.0, 101.0, 99.0, 103.0, 104.0]);
        history.insert("MSFT".to_string(), vec![200.0, 202.0, 198.0, 206.0, 208.0]);

        let adjusted = manager().derisk_correlated(&sizes, &history);
        assert!((adjusted["AAPL"] - 5_000.0).abs() < 1e-6);
        assert!((adjusted["MSFT"] - 5_000.0).abs() < 1e-6);
    }

    #[test]
    fn uncorrelated_and_single_positions_are_untouched() {
        let mut sizes = BTreeMap::new();
        sizes.insert("AAPL".to_string(), 10_000.0);
        let history = HashMap::new();
        let adjusted = manager().derisk_correlated(&sizes, &history);
        assert!((adjusted["AAPL"] - 10_000.0).abs() < 1e-9);

        let mut sizes = BTreeMap::new();
        sizes.insert("AAPL".to_string(), 10_000.0);
        sizes.insert("MSFT".to_string(), 10_000.0);
        let mut history = HashMap::new();
        history.insert("AAPL".to_string(), vec![100.0, 101.0, 99.0, 103.0, 104.0]);
        // Anti-correlated path: correlation < 0.7, no shrink.
        history.insert("MSFT".to_string(), vec![200.0, 198.0, 202.0, 194.0, 192.0]);

        let adjusted = manager().derisk_correlated(&sizes, &history);
        assert!((adjusted["AAPL"] - 10_000.0).abs() < 1e-9);
        assert!((adjusted["MSFT"] - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-12);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-12);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
    }
}
