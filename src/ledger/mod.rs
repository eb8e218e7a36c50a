//! Ledger module
//!
//! Simulated orders, aggregate statistics and the rolling operator log.
//! Everything here is append-only with fixed-capacity eviction.

mod types;

pub use types::{LogEntry, LogLevel, Order, OrderStatus, Stats};

use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Bounded store of orders, logs and stats owned by the engine
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Most recent first
    orders: VecDeque<Order>,
    /// Oldest first
    logs: VecDeque<LogEntry>,
    stats: Stats,
    order_capacity: usize,
    log_capacity: usize,
}

impl Ledger {
    pub fn new(initial_balance: Decimal, order_capacity: usize, log_capacity: usize) -> Self {
        Self {
            orders: VecDeque::with_capacity(order_capacity),
            logs: VecDeque::with_capacity(log_capacity),
            stats: Stats::new(initial_balance),
            order_capacity,
            log_capacity,
        }
    }

    /// Record a fill, dropping the oldest order beyond capacity
    pub fn record_order(&mut self, order: Order) {
        tracing::info!(
            order_id = %order.id,
            round = %order.round_id,
            side = ?order.side,
            leg = order.leg,
            price = %order.price,
            amount = %order.amount,
            "Simulated order filled"
        );
        crate::telemetry::increment(crate::telemetry::CounterMetric::Orders, 1);

        self.orders.push_front(order);
        self.orders.truncate(self.order_capacity);
    }

    /// Append to the operator log and mirror it to tracing
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::new(level, message);
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!(level = ?level, "{}", entry.message),
            LogLevel::Warn => tracing::warn!("{}", entry.message),
            LogLevel::Error => tracing::error!("{}", entry.message),
        }

        if self.log_capacity == 0 {
            return;
        }
        while self.logs.len() >= self.log_capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
    }

    /// Fold a completed hedge into the stats
    pub fn record_hedge(&mut self, profit: Decimal, volume: Decimal) {
        self.stats.record_hedge(profit, volume);
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogEntry> {
        self.logs.iter()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}
