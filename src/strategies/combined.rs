use crate::errors::EngineError;
use crate::models::{Bar, SignalAction};
use crate::signals::SignalTable;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::{BTreeSet, HashSet};

/// How a combined strategy folds its members' votes into one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMethod {
    Majority,
    Unanimous,
    Weighted,
}

impl AggregationMethod {
    /// Parse an aggregation name. Unknown names fall back to majority
    /// voting with a warning rather than failing the run.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "majority" => AggregationMethod::Majority,
            "unanimous" => AggregationMethod::Unanimous,
            "weighted" => AggregationMethod::Weighted,
            other => {
                warn!("Unknown aggregation method '{}'; using majority", other);
                AggregationMethod::Majority
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Majority => "majority",
            AggregationMethod::Unanimous => "unanimous",
            AggregationMethod::Weighted => "weighted",
        }
    }
}

/// Fold one symbol's per-strategy votes into a single action. `weights`
/// is only consulted for weighted aggregation and must match `votes` in
/// length.
pub fn aggregate_signals(
    votes: &[SignalAction],
    method: AggregationMethod,
    weights: Option<&[f64]>,
) -> SignalAction {
    if votes.is_empty() {
        return SignalAction::Hold;
    }

    match method {
        AggregationMethod::Majority => {
            let buy_votes = votes.iter().filter(|v| **v == SignalAction::Buy).count();
            let sell_votes = votes.iter().filter(|v| **v == SignalAction::Sell).count();
            let hold_votes = votes.len() - buy_votes - sell_votes;
            let max_votes = buy_votes.max(sell_votes).max(hold_votes);

            // Ties prefer action over holding; a buy/sell tie resolves to
            // the sell.
            if sell_votes == max_votes {
                SignalAction::Sell
            } else if buy_votes == max_votes {
                SignalAction::Buy
            } else {
                SignalAction::Hold
            }
        }
        AggregationMethod::Unanimous => {
            if votes.iter().all(|v| *v == SignalAction::Buy) {
                SignalAction::Buy
            } else if votes.iter().all(|v| *v == SignalAction::Sell) {
                SignalAction::Sell
            } else {
                SignalAction::Hold
            }
        }
        AggregationMethod::Weighted => {
            let Some(weights) = weights else {
                return SignalAction::Hold;
            };
            let weighted_sum: f64 = votes
                .iter()
                .zip(weights)
                .map(|(vote, weight)| vote.value() * weight)
                .sum();
            if weighted_sum > 0.5 {
                SignalAction::Buy
            } else if weighted_sum < -0.5 {
                SignalAction::Sell
            } else {
                SignalAction::Hold
            }
        }
    }
}

/// Composes several strategies over the same symbol universe and merges
/// their signals with the configured aggregation policy.
#[derive(Debug)]
pub struct CombinedStrategy {
    symbols: Vec<String>,
    strategies: Vec<Box<dyn super::Strategy + Send + Sync>>,
    aggregation: AggregationMethod,
    weights: Option<Vec<f64>>,
}

impl CombinedStrategy {
    pub fn new(
        symbols: Vec<String>,
        strategies: Vec<Box<dyn super::Strategy + Send + Sync>>,
        aggregation: AggregationMethod,
        weights: Option<Vec<f64>>,
    ) -> Result<Self> {
        if strategies.is_empty() {
            return Err(
                EngineError::InvalidConfiguration("combined strategy needs members".into()).into(),
            );
        }

        let universe: HashSet<&str> = symbols.iter().map(|s| s.as_str()).collect();
        for strategy in &strategies {
            let member: HashSet<&str> = strategy.symbols().iter().map(|s| s.as_str()).collect();
            if member != universe {
                return Err(EngineError::InvalidConfiguration(format!(
                    "strategy '{}' trades {:?}, expected {:?}",
                    strategy.name(),
                    strategy.symbols(),
                    symbols
                ))
                .into());
            }
        }

        let weights = match aggregation {
            AggregationMethod::Weighted => {
                let raw = weights
                    .unwrap_or_else(|| vec![1.0 / strategies.len() as f64; strategies.len()]);
                if raw.len() != strategies.len() {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "expected {} weights, got {}",
                        strategies.len(),
                        raw.len()
                    ))
                    .into());
                }
                let total: f64 = raw.iter().sum();
                if !total.is_finite() || total <= 0.0 {
                    return Err(EngineError::InvalidConfiguration(
                        "aggregation weights must sum to a positive value".into(),
                    )
                    .into());
                }
                Some(raw.into_iter().map(|w| w / total).collect())
            }
            _ => None,
        };

        info!(
            "Initialized combined strategy with {} members, aggregation={}",
            strategies.len(),
            aggregation.as_str()
        );

        Ok(Self {
            symbols,
            strategies,
            aggregation,
            weights,
        })
    }
}

impl super::Strategy for CombinedStrategy {
    fn name(&self) -> &str {
        "combined"
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn generate_signals(&self, bars: &[Bar]) -> SignalTable {
        let member_tables: Vec<SignalTable> = self
            .strategies
            .iter()
            .map(|strategy| strategy.generate_signals(bars))
            .collect();

        let dates: BTreeSet<DateTime<Utc>> = member_tables
            .iter()
            .flat_map(|table| table.dates().copied())
            .collect();

        let mut table = SignalTable::new();
        for date in dates {
            for symbol in &self.symbols {
                let votes: Vec<SignalAction> = member_tables
                    .iter()
                    .map(|member| {
                        member
                            .row(date)
                            .map(|row| row.signal(symbol))
                            .unwrap_or(SignalAction::Hold)
                    })
                    .collect();
                let action = aggregate_signals(&votes, self.aggregation, self.weights.as_deref());
                table.row_mut(date).set_signal(symbol, action);
            }

            // Keep member indicator columns, namespaced by member name.
            for (member, member_table) in self.strategies.iter().zip(&member_tables) {
                let Some(row) = member_table.row(date) else {
                    continue;
                };
                for (key, &value) in row.indicators() {
                    for symbol in &self.symbols {
                        if let Some(rest) = key.strip_prefix(&format!("{}_", symbol)) {
                            let namespaced = format!("{}_{}", member.name(), rest);
                            table.row_mut(date).set_indicator(symbol, &namespaced, value);
                        }
                    }
                }
            }
        }

        let (buys, sells, holds) = table.signal_counts();
        info!(
            "Generated {} combined signal rows ({} buy, {} sell, {} hold)",
            table.len(),
            buys,
            sells,
            holds
        );
        table
    }

    fn min_data_points(&self) -> usize {
        self.strategies
            .iter()
            .map(|strategy| strategy.min_data_points())
            .max()
            .unwrap_or(0)
    }
}
