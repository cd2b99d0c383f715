use crate::ledger::PortfolioLedger;
use crate::models::{Order, OrderSide, OrderStatus, Trade};
use chrono::{DateTime, Utc};
use log::{debug, warn};

/// Synthetic fill rules: slippage moves the price against the trader,
/// commission is proportional to traded notional, buys are limited by cash
/// and sells by held shares.
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    commission_rate: f64,
    slippage: f64,
}

impl ExecutionSimulator {
    pub fn new(commission_rate: f64, slippage: f64) -> Self {
        Self {
            commission_rate,
            slippage,
        }
    }

    /// Execute an order against the day's close price, mutating the ledger
    /// and returning the recorded trade. Returns `None` when a buy cannot
    /// be financed at all; the order is then marked rejected.
    pub fn execute(
        &self,
        ledger: &mut PortfolioLedger,
        order: &mut Order,
        close: f64,
        date: DateTime<Utc>,
    ) -> Option<Trade> {
        let execution_price = match order.side {
            OrderSide::Buy => close * (1.0 + self.slippage),
            OrderSide::Sell => close * (1.0 - self.slippage),
        };

        let mut quantity = order.quantity;
        // Commission is fixed from the requested quantity; a cash-driven
        // shrink below does not recompute it.
        let commission = execution_price * quantity * self.commission_rate;
        let mut trade_value = execution_price * quantity;

        match order.side {
            OrderSide::Buy => {
                let mut total_cost = trade_value + commission;
                if total_cost > ledger.cash() {
                    quantity = (ledger.cash() - commission) / execution_price;
                    trade_value = execution_price * quantity;
                    total_cost = trade_value + commission;

                    if quantity <= 0.0 {
                        warn!(
                            "Not enough cash to execute BUY order for {}",
                            order.symbol
                        );
                        order.status = OrderStatus::Rejected;
                        return None;
                    }
                }

                ledger.debit_cash(total_cost);
                ledger.add_shares(&order.symbol, quantity);
            }
            OrderSide::Sell => {
                let held = ledger.position(&order.symbol);
                if quantity > held {
                    quantity = held;
                    trade_value = execution_price * quantity;
                }

                ledger.credit_cash(trade_value - commission);
                ledger.remove_shares(&order.symbol, quantity);
            }
        }

        order.status = OrderStatus::Filled;
        order.filled_at = Some(date);
        order.filled_quantity = quantity;
        order.filled_price = Some(execution_price);
        order.commission = commission;

        let trade = Trade {
            date,
            symbol: order.symbol.clone(),
            action: order.side,
            quantity,
            price: execution_price,
            commission,
            value: trade_value,
        };
        ledger.push_trade(trade.clone());

        debug!(
            "Executed {} order for {:.4} shares of {} at {:.2}",
            order.side.as_str(),
            quantity,
            order.symbol,
            execution_price
        );
        Some(trade)
    }
}
