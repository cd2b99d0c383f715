use crate::ledger::PortfolioLedger;
use crate::models::{Order, OrderSide, SignalAction};
use crate::risk::RiskManager;
use crate::signals::SignalRow;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashMap;

/// Turns one day's signal row into market orders, sized by the risk
/// manager. At most one order per symbol per day.
#[derive(Debug, Clone)]
pub struct OrderGenerator {
    risk: RiskManager,
}

impl OrderGenerator {
    pub fn new(risk: RiskManager) -> Self {
        Self { risk }
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    /// Entry rules: buy only from flat (no averaging up), sell the whole
    /// holding. Buys use the day's close and, when the strategy exposed
    /// one, the symbol's momentum column as signal strength.
    pub fn generate_orders(
        &self,
        symbols: &[String],
        row: &SignalRow,
        closes: &HashMap<String, f64>,
        ledger: &PortfolioLedger,
        date: DateTime<Utc>,
    ) -> Vec<Order> {
        let mut orders = Vec::new();

        for symbol in symbols {
            let current_position = ledger.position(symbol);
            match row.signal(symbol) {
                SignalAction::Buy if current_position <= 0.0 => {
                    let Some(&price) = closes.get(symbol) else {
                        debug!("No close price for {} on {}; skipping buy", symbol, date);
                        continue;
                    };
                    if price <= 0.0 {
                        continue;
                    }

                    let signal_strength = row.indicator(symbol, "momentum");
                    let position_size = self.risk.size_position(
                        symbol,
                        price,
                        ledger.equity(),
                        signal_strength,
                        ledger.positions(),
                        None,
                    );

                    if position_size > 0.0 {
                        let mut order = Order::market(symbol, OrderSide::Buy, position_size / price);
                        order.submitted_at = Some(date);
                        orders.push(order);
                    }
                }
                SignalAction::Sell if current_position > 0.0 => {
                    let mut order = Order::market(symbol, OrderSide::Sell, current_position);
                    order.submitted_at = Some(date);
                    orders.push(order);
                }
                _ => {}
            }
        }

        orders
    }
}
