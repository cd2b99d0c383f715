use crate::errors::EngineError;
use crate::models::Bar;
use crate::signals::SignalTable;
use anyhow::Result;
use std::collections::HashMap;

/// A signal strategy: given the full bar history, produce one signal table
/// covering the whole horizon before the simulation starts.
pub trait Strategy: std::fmt::Debug {
    fn name(&self) -> &str;
    fn symbols(&self) -> &[String];
    fn generate_signals(&self, bars: &[Bar]) -> SignalTable;
    /// Bars required per symbol before the strategy can emit a signal.
    fn min_data_points(&self) -> usize;
}

#[path = "strategies/momentum.rs"]
pub mod momentum;

pub use momentum::MomentumStrategy;

#[path = "strategies/mean_reversion.rs"]
pub mod mean_reversion;

pub use mean_reversion::MeanReversionStrategy;

#[path = "strategies/ma_crossover.rs"]
pub mod ma_crossover;

pub use ma_crossover::MaCrossoverStrategy;

#[path = "strategies/breakout.rs"]
pub mod breakout;

pub use breakout::BreakoutStrategy;

#[path = "strategies/combined.rs"]
pub mod combined;

pub use combined::{AggregationMethod, CombinedStrategy};

/// Instantiate a strategy by name. `combined` composes the three
/// indicator strategies under majority voting.
pub fn create_strategy(
    name: &str,
    symbols: Vec<String>,
    parameters: &HashMap<String, f64>,
) -> Result<Box<dyn Strategy + Send + Sync>> {
    match name {
        "momentum" => Ok(Box::new(MomentumStrategy::new(symbols, parameters))),
        "mean_reversion" => Ok(Box::new(MeanReversionStrategy::new(symbols, parameters))),
        "ma_crossover" => Ok(Box::new(MaCrossoverStrategy::new(symbols, parameters))),
        "breakout" => Ok(Box::new(BreakoutStrategy::new(symbols, parameters))),
        "combined" => {
            let members: Vec<Box<dyn Strategy + Send + Sync>> = vec![
                Box::new(MomentumStrategy::new(symbols.clone(), parameters)),
                Box::new(MeanReversionStrategy::new(symbols.clone(), parameters)),
                Box::new(MaCrossoverStrategy::new(symbols.clone(), parameters)),
            ];
            Ok(Box::new(CombinedStrategy::new(
                symbols,
                members,
                AggregationMethod::Majority,
                None,
            )?))
        }
        other => Err(EngineError::UnknownStrategy(other.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_every_known_strategy() {
        let symbols = vec!["AAPL".to_string()];
        let parameters = HashMap::new();
        for name in [
            "momentum",
            "mean_reversion",
            "ma_crossover",
            "breakout",
            "combined",
        ] {
            let strategy = create_strategy(name, symbols.clone(), &parameters).unwrap();
            assert_eq!(strategy.name(), name);
            assert_eq!(strategy.symbols(), symbols.as_slice());
        }
    }

    #[test]
    fn unknown_strategy_name_fails_fast() {
        let result = create_strategy("hodl", vec!["AAPL".to_string()], &HashMap::new());
        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<EngineError>(),
            Some(EngineError::UnknownStrategy(_))
        ));
    }
}
