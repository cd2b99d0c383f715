use crate::bar_utils::{closes_by_day, unique_dates};
use crate::config::{BacktestConfig, RiskConfig};
use crate::data::BarSource;
use crate::errors::EngineError;
use crate::execution::ExecutionSimulator;
use crate::ledger::PortfolioLedger;
use crate::metrics::MetricsCalculator;
use crate::models::BacktestRun;
use crate::orders::OrderGenerator;
use crate::risk::RiskManager;
use crate::strategy::Strategy;
use anyhow::Result;
use chrono::Utc;
use indicatif::ProgressBar;
use log::info;
use std::time::Instant;
use uuid::Uuid;

/// Owns the day-by-day simulation: fetch bars once, ask the strategy for
/// one signal table covering the whole horizon, then replay the days in
/// order against the portfolio ledger.
pub struct BacktestEngine {
    config: BacktestConfig,
    strategy: Box<dyn Strategy + Send + Sync>,
    source: Box<dyn BarSource>,
    orders: OrderGenerator,
    execution: ExecutionSimulator,
    ledger: PortfolioLedger,
}

impl BacktestEngine {
    /// Configuration problems surface here, before any data is touched.
    pub fn new(
        source: Box<dyn BarSource>,
        strategy: Box<dyn Strategy + Send + Sync>,
        config: BacktestConfig,
        risk_config: RiskConfig,
    ) -> Result<Self> {
        config.validate()?;
        risk_config.validate()?;

        let ledger = PortfolioLedger::new(config.initial_capital);
        info!(
            "Initialized backtest engine with {} initial capital",
            config.initial_capital
        );

        Ok(Self {
            orders: OrderGenerator::new(RiskManager::new(risk_config)),
            execution: ExecutionSimulator::new(config.commission_rate, config.slippage),
            ledger,
            config,
            strategy,
            source,
        })
    }

    pub fn ledger(&self) -> &PortfolioLedger {
        &self.ledger
    }

    pub fn run(&mut self, timeframe: &str) -> Result<BacktestRun> {
        info!(
            "Starting backtest from {:?} to {:?}",
            self.config.start_date, self.config.end_date
        );
        let started = Instant::now();

        let bars = self.source.get_bars(
            self.strategy.symbols(),
            timeframe,
            self.config.start_date,
            self.config.end_date,
        )?;
        if bars.is_empty() {
            return Err(EngineError::DataUnavailable.into());
        }

        let dates = unique_dates(&bars);
        let close_table = closes_by_day(&bars);
        let signals = self.strategy.generate_signals(&bars);

        info!("Simulating trading for {} days", dates.len());
        let progress = ProgressBar::new(dates.len() as u64);

        let symbols = self.strategy.symbols().to_vec();
        let mut snapshots = Vec::with_capacity(dates.len());
        for (day_index, &date) in dates.iter().enumerate() {
            let closes = close_table.get(&date).expect("date came from the bars");

            // The first day is valuation-only: there is no prior state to
            // trade against yet.
            if day_index > 0 {
                if let Some(row) = signals.row(date) {
                    let day_orders =
                        self.orders
                            .generate_orders(&symbols, row, closes, &self.ledger, date);
                    for mut order in day_orders {
                        let Some(&close) = closes.get(&order.symbol) else {
                            continue;
                        };
                        self.execution
                            .execute(&mut self.ledger, &mut order, close, date);
                    }
                }
            }

            snapshots.push(self.ledger.mark_to_market(date, closes));
            progress.inc(1);
        }
        progress.finish_and_clear();

        let metrics =
            MetricsCalculator::calculate(&snapshots, self.ledger.trades(), self.config.initial_capital);
        let execution_time_secs = started.elapsed().as_secs_f64();
        info!(
            "Backtest completed in {:.2} seconds. Final portfolio value: ${:.2}",
            execution_time_secs, metrics.final_value
        );

        Ok(BacktestRun {
            id: Uuid::new_v4().to_string(),
            strategy: self.strategy.name().to_string(),
            start_date: *dates.first().expect("bars are not empty"),
            end_date: *dates.last().expect("bars are not empty"),
            initial_capital: self.config.initial_capital,
            final_value: metrics.final_value,
            trades: self.ledger.trades().to_vec(),
            results: snapshots,
            metrics,
            execution_time_secs,
            created_at: Utc::now(),
        })
    }
}
