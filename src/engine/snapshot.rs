//! Read-only engine snapshot served by the status surface
//!
//! Built by the engine task after each tick and published whole, so readers
//! never see a half-applied tick.

use super::types::{Side, TrackedUnit, UnitState};
use crate::config::TradeConfig;
use crate::ledger::{LogEntry, Order, Stats};
use crate::pairing::PairKind;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Everything the display client needs, as of one tick
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub config: TradeConfig,
    pub stats: Stats,
    pub rounds: Vec<RoundView>,
    pub logs: Vec<LogEntry>,
    pub orders: Vec<Order>,
    /// Ticks executed since startup
    pub tick: u64,
    pub generated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Snapshot of an engine that has not ticked yet
    pub fn empty(config: TradeConfig, stats: Stats) -> Self {
        Self {
            config,
            stats,
            rounds: Vec::new(),
            logs: Vec::new(),
            orders: Vec::new(),
            tick: 0,
            generated_at: Utc::now(),
        }
    }
}

/// One leg as displayed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegView {
    pub market_id: String,
    pub symbol: String,
    pub token_id: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub ask: Decimal,
}

/// One tracked unit as displayed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub id: String,
    pub kind: PairKind,
    pub asset: String,
    pub symbol: String,
    pub anchor: String,
    pub settles_at: DateTime<Utc>,
    pub state: UnitState,
    pub leg_a: LegView,
    pub leg_b: LegView,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub combined_cost: Decimal,
    /// Seconds until settlement
    pub countdown: i64,
    /// Seconds left in the post-lock cool-down
    pub reset_timer: u64,
    pub history_up: Vec<f64>,
    pub history_down: Vec<f64>,
    pub leg1_side: Option<Side>,
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub leg1_price: Option<Decimal>,
}

impl RoundView {
    pub fn from_unit(unit: &TrackedUnit, now: DateTime<Utc>) -> Self {
        let paired = &unit.unit;
        Self {
            id: paired.id.clone(),
            kind: paired.kind,
            asset: paired.asset.clone(),
            symbol: paired.symbol.clone(),
            anchor: paired.anchor_label.clone(),
            settles_at: paired.settles_at,
            state: unit.state,
            leg_a: LegView {
                market_id: paired.leg_a.market_id.clone(),
                symbol: paired.leg_a.symbol.clone(),
                token_id: paired.leg_a.token_id.clone(),
                ask: unit.ask_a,
            },
            leg_b: LegView {
                market_id: paired.leg_b.market_id.clone(),
                symbol: paired.leg_b.symbol.clone(),
                token_id: paired.leg_b.token_id.clone(),
                ask: unit.ask_b,
            },
            combined_cost: unit.combined_cost(),
            countdown: unit.countdown(now),
            reset_timer: reset_timer(unit),
            history_up: unit.history_a.iter().filter_map(|p| p.to_f64()).collect(),
            history_down: unit.history_b.iter().filter_map(|p| p.to_f64()).collect(),
            leg1_side: unit.leg1.as_ref().map(|l| l.side),
            leg1_price: unit.leg1.as_ref().map(|l| l.price),
        }
    }
}

/// Whole seconds left in the cool-down, rounded up while it is running
fn reset_timer(unit: &TrackedUnit) -> u64 {
    if unit.state != UnitState::Locked {
        return 0;
    }
    let remaining = unit.cooldown_remaining;
    remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
}
