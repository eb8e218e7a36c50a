//! Ledger types

use crate::engine::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a ledger log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

/// One line of the rolling operator log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// Fill status. Simulated fills are never partial or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Filled,
}

/// A simulated fill for one leg of a hedge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// Tracked unit the fill belongs to
    pub round_id: String,
    pub symbol: String,
    pub side: Side,
    /// 1 for the entry leg, 2 for the hedge leg
    pub leg: u8,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    /// Opaque settlement reference
    pub tx_hash: String,
}

impl Order {
    /// Create a filled order
    pub fn filled(
        round_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        leg: u8,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id: format!("tx-{}", &id.simple().to_string()[..12]),
            round_id: round_id.into(),
            symbol: symbol.into(),
            side,
            leg,
            price,
            amount,
            status: OrderStatus::Filled,
            timestamp: Utc::now(),
            tx_hash: format!("0x{}", Uuid::new_v4().simple()),
        }
    }
}

/// Aggregate trading statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_trades: u64,
    pub won_trades: u64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_volume: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub net_profit: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub balance: Decimal,
    /// Percentage of won trades, 0 when no trades
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub win_rate: Decimal,
}

impl Stats {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            total_trades: 0,
            won_trades: 0,
            total_volume: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            balance: initial_balance,
            win_rate: Decimal::ZERO,
        }
    }

    /// Fold one completed hedge into the aggregates. Every lock counts as
    /// won, even a losing one under a misconfigured sum target.
    pub fn record_hedge(&mut self, profit: Decimal, volume: Decimal) {
        self.total_trades += 1;
        self.won_trades += 1;
        self.total_volume += volume;
        self.net_profit += profit;
        self.balance += profit;
        self.win_rate = win_rate(self.won_trades, self.total_trades);
    }
}

fn win_rate(won: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(won) / Decimal::from(total) * Decimal::ONE_HUNDRED
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..9].to_string()
}
