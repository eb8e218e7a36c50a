//! Engine types

use crate::pairing::{PairKind, PairedUnit};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Ask assumed for a leg before its first successful quote
pub const DEFAULT_ASK: Decimal = dec!(0.5);

/// Outcome side of a fill. Leg A is always `Up`, leg B always `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Up,
    Down,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Up => Side::Down,
            Side::Down => Side::Up,
        }
    }
}

/// Arbitrage state of a tracked unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitState {
    /// Watching both legs for a drop
    #[default]
    Scanning,
    /// Leg 1 filled, waiting for a cheap enough opposite leg
    Hedging,
    /// Both legs filled, cooling down
    Locked,
}

/// Bounded price history, oldest evicted first
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    prices: VecDeque<Decimal>,
    capacity: usize,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            prices: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, price: Decimal) {
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    /// Most recent price
    pub fn latest(&self) -> Option<Decimal> {
        self.prices.back().copied()
    }

    /// Price from the poll before the latest one
    pub fn previous(&self) -> Option<Decimal> {
        let len = self.prices.len();
        if len < 2 {
            return None;
        }
        self.prices.get(len - 2).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decimal> {
        self.prices.iter()
    }
}

/// The first filled leg of a hedge in progress
#[derive(Debug, Clone, PartialEq)]
pub struct Leg1Fill {
    pub side: Side,
    pub price: Decimal,
    pub filled_at: DateTime<Utc>,
}

/// A paired unit plus the runtime state the engine keeps for it
#[derive(Debug, Clone)]
pub struct TrackedUnit {
    pub unit: PairedUnit,
    /// Last observed ask of leg A
    pub ask_a: Decimal,
    /// Last observed ask of leg B
    pub ask_b: Decimal,
    pub history_a: PriceHistory,
    pub history_b: PriceHistory,
    pub state: UnitState,
    pub leg1: Option<Leg1Fill>,
    /// Time left in the post-lock cool-down
    pub cooldown_remaining: Duration,
}

impl TrackedUnit {
    pub fn new(unit: PairedUnit, history_capacity: usize) -> Self {
        Self {
            unit,
            ask_a: DEFAULT_ASK,
            ask_b: DEFAULT_ASK,
            history_a: PriceHistory::new(history_capacity),
            history_b: PriceHistory::new(history_capacity),
            state: UnitState::Scanning,
            leg1: None,
            cooldown_remaining: Duration::ZERO,
        }
    }

    pub fn id(&self) -> &str {
        &self.unit.id
    }

    pub fn is_cross(&self) -> bool {
        self.unit.kind == PairKind::Cross
    }

    /// Last observed ask for one side
    pub fn ask(&self, side: Side) -> Decimal {
        match side {
            Side::Up => self.ask_a,
            Side::Down => self.ask_b,
        }
    }

    /// Display symbol of the leg carrying `side`
    pub fn leg_symbol(&self, side: Side) -> &str {
        match side {
            Side::Up => &self.unit.leg_a.symbol,
            Side::Down => &self.unit.leg_b.symbol,
        }
    }

    /// Sum of both legs' last asks
    pub fn combined_cost(&self) -> Decimal {
        self.ask_a + self.ask_b
    }

    /// Whole seconds until settlement, never negative
    pub fn countdown(&self, now: DateTime<Utc>) -> i64 {
        (self.unit.settles_at - now).num_seconds().max(0)
    }

    /// Keep runtime state from a previous discovery pass, adopting the
    /// refreshed unit description
    pub fn carry_over(mut self, unit: PairedUnit) -> Self {
        self.unit = unit;
        self
    }
}
