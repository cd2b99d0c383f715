use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;
use trading_engine::config::{parse_date, BacktestConfig, RiskConfig};
use trading_engine::data::SnapshotBarSource;
use trading_engine::engine::BacktestEngine;
use trading_engine::strategy::create_strategy;

#[derive(Parser)]
#[command(name = "trading-engine")]
#[command(about = "Trading strategy backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a strategy over historical bars and report performance
    Backtest {
        /// Strategy to execute (momentum, mean_reversion, ma_crossover, breakout, combined)
        #[arg(long, default_value = "momentum")]
        strategy: String,
        /// Comma-separated list of symbols to trade
        #[arg(long, value_delimiter = ',', default_value = "AAPL,MSFT,AMZN,GOOGL")]
        symbols: Vec<String>,
        /// Path to the bar snapshot file
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        /// Bar timeframe
        #[arg(long, default_value = "1D")]
        timeframe: String,
        /// Backtest window start (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,
        /// Backtest window end (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,
        /// Starting cash
        #[arg(long, default_value_t = 100_000.0)]
        initial_capital: f64,
        /// Commission rate per trade
        #[arg(long, default_value_t = 0.0005)]
        commission_rate: f64,
        /// Assumed adverse slippage per fill
        #[arg(long, default_value_t = 0.0001)]
        slippage: f64,
        /// Maximum position size as a fraction of equity
        #[arg(long, default_value_t = 0.1)]
        max_position_size: f64,
        /// Maximum portfolio risk fraction for volatility-based sizing
        #[arg(long, default_value_t = 0.02)]
        max_portfolio_risk: f64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            strategy,
            symbols,
            data_file,
            timeframe,
            start_date,
            end_date,
            initial_capital,
            commission_rate,
            slippage,
            max_position_size,
            max_portfolio_risk,
        } => {
            info!("Starting trading engine in backtest mode");
            info!("Trading symbols: {:?}", symbols);

            let config = BacktestConfig {
                initial_capital,
                start_date: start_date
                    .as_deref()
                    .map(|raw| parse_date("startDate", raw))
                    .transpose()?,
                end_date: end_date
                    .as_deref()
                    .map(|raw| parse_date("endDate", raw))
                    .transpose()?,
                commission_rate,
                slippage,
            };
            let risk_config = RiskConfig {
                max_position_size,
                max_portfolio_risk,
                ..RiskConfig::default()
            };

            let parameters: HashMap<String, f64> = HashMap::new();
            let strategy = create_strategy(&strategy, symbols, &parameters)?;
            let source = Box::new(SnapshotBarSource::new(&data_file));

            let mut engine = BacktestEngine::new(source, strategy, config, risk_config)?;
            let run = engine.run(&timeframe)?;

            info!(
                "Backtest completed. Final portfolio value: ${:.2}",
                run.final_value
            );
            println!("{}", serde_json::to_string_pretty(&run.metrics)?);
        }
    }

    Ok(())
}
