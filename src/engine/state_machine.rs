//! Per-unit arbitrage state machine
//!
//! `SCANNING -> HEDGING -> LOCKED -> SCANNING`. A unit moves at most one step
//! per poll: the tick that fills leg 1 never also fills leg 2. The cool-down
//! is a countdown decremented by the elapsed time the scheduler passes in,
//! so every transition happens inside the poll loop.

use super::types::{Leg1Fill, Side, TrackedUnit, UnitState};
use crate::config::{StrategyConfig, TradeConfig};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

/// Thresholds the state machine reads on every tick
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Minimum percentage drop between consecutive polls to fill leg 1
    pub drop_threshold: Decimal,
    /// Hedge ceiling for the combined cost of both legs
    pub sum_target: Decimal,
    pub bet_amount: Decimal,
    pub auto_bet: bool,
    /// Leg 1 only fills strictly inside (min_entry_price, max_entry_price)
    pub min_entry_price: Decimal,
    pub max_entry_price: Decimal,
    pub cooldown: Duration,
}

impl StrategyParams {
    pub fn new(trade: &TradeConfig, strategy: &StrategyConfig) -> Self {
        Self {
            drop_threshold: trade.drop_threshold,
            sum_target: trade.sum_target,
            bet_amount: trade.bet_amount,
            auto_bet: trade.auto_bet,
            min_entry_price: strategy.min_entry_price,
            max_entry_price: strategy.max_entry_price,
            cooldown: trade.cooldown(),
        }
    }

    fn entry_in_bounds(&self, price: Decimal) -> bool {
        price > self.min_entry_price && price < self.max_entry_price
    }
}

/// A state change the scheduler turns into orders, stats and log entries
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Leg 1 filled on the side that dropped
    Leg1 {
        side: Side,
        price: Decimal,
        drop_pct: Decimal,
    },
    /// Leg 2 filled on the opposite side; the hedge is locked
    Locked {
        side: Side,
        price: Decimal,
        total_cost: Decimal,
        profit: Decimal,
    },
    /// Cool-down elapsed, back to scanning
    Released,
}

/// Percentage drop from the previous poll to the latest.
///
/// `None` until two points exist or when the previous price is not positive.
pub fn drop_pct(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous <= Decimal::ZERO {
        return None;
    }
    Some((previous - current) / previous * Decimal::ONE_HUNDRED)
}

/// Profit of a locked hedge: `(1 - total_cost) * bet_amount`
pub fn hedge_profit(total_cost: Decimal, bet_amount: Decimal) -> Decimal {
    (Decimal::ONE - total_cost) * bet_amount
}

impl TrackedUnit {
    /// Feed one poll's quotes into the unit.
    ///
    /// A `None` quote means the fetch failed: the last known ask is carried
    /// forward and recorded in the history as-is. `elapsed` is the time since
    /// the previous poll and only drives the cool-down.
    pub fn on_prices(
        &mut self,
        quote_a: Option<Decimal>,
        quote_b: Option<Decimal>,
        elapsed: Duration,
        now: DateTime<Utc>,
        params: &StrategyParams,
    ) -> Option<Transition> {
        self.ask_a = quote_a.unwrap_or(self.ask_a);
        self.ask_b = quote_b.unwrap_or(self.ask_b);
        self.history_a.push(self.ask_a);
        self.history_b.push(self.ask_b);

        match self.state {
            UnitState::Locked => self.cool_down(elapsed),
            UnitState::Scanning => self.detect_drop(now, params),
            UnitState::Hedging => self.try_hedge(params),
        }
    }

    fn cool_down(&mut self, elapsed: Duration) -> Option<Transition> {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(elapsed);
        if !self.cooldown_remaining.is_zero() {
            return None;
        }
        self.state = UnitState::Scanning;
        self.leg1 = None;
        Some(Transition::Released)
    }

    fn detect_drop(&mut self, now: DateTime<Utc>, params: &StrategyParams) -> Option<Transition> {
        // Self-pair legs sum to ~1 by construction; never hedge them
        if !params.auto_bet || !self.is_cross() {
            return None;
        }

        let (side, price, drop) = [Side::Up, Side::Down].into_iter().find_map(|side| {
            let history = match side {
                Side::Up => &self.history_a,
                Side::Down => &self.history_b,
            };
            let current = history.latest()?;
            let drop = drop_pct(history.previous()?, current)?;
            (drop >= params.drop_threshold && params.entry_in_bounds(current))
                .then_some((side, current, drop))
        })?;

        self.state = UnitState::Hedging;
        self.leg1 = Some(Leg1Fill {
            side,
            price,
            filled_at: now,
        });
        Some(Transition::Leg1 {
            side,
            price,
            drop_pct: drop,
        })
    }

    fn try_hedge(&mut self, params: &StrategyParams) -> Option<Transition> {
        if !params.auto_bet || !self.is_cross() {
            return None;
        }
        let leg1 = self.leg1.as_ref()?;

        let side = leg1.side.opposite();
        let price = self.ask(side);
        let total_cost = leg1.price + price;
        if total_cost > params.sum_target {
            return None;
        }

        self.state = UnitState::Locked;
        self.cooldown_remaining = params.cooldown;
        Some(Transition::Locked {
            side,
            price,
            total_cost,
            profit: hedge_profit(total_cost, params.bet_amount),
        })
    }
}
