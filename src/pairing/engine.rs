//! Pairing engine
//!
//! Groups catalog markets into tracked units. Two markets form a cross-pair
//! when they name the same asset and anchor, settle within the tolerance and
//! point in opposite directions. Everything else becomes a self-pair over the
//! market's own two outcome tokens.

use super::anchor::{anchor_label, Direction, MarketTraits};
use crate::market::Market;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Matching rules for cross-pairs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PairingRules {
    /// Maximum settlement time difference between two legs
    pub settlement_tolerance_secs: i64,
    /// Fallback anchors must exceed this (skips date/time digits)
    pub anchor_floor: Decimal,
}

impl Default for PairingRules {
    fn default() -> Self {
        Self {
            settlement_tolerance_secs: 60,
            anchor_floor: dec!(100),
        }
    }
}

/// Whether a unit's legs are independent markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PairKind {
    /// Two distinct, complementary markets
    Cross,
    /// One market's own outcome tokens; never hedged
    #[serde(rename = "SELF")]
    SelfPair,
}

/// One side of a paired unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegSpec {
    pub market_id: String,
    pub symbol: String,
    pub token_id: String,
}

/// Identity of a tracked unit as produced by one discovery pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedUnit {
    pub id: String,
    pub kind: PairKind,
    pub asset: String,
    pub symbol: String,
    /// Numeric anchor, when one was extracted
    pub anchor: Option<Decimal>,
    /// Price level and/or settlement time label
    pub anchor_label: String,
    pub settles_at: DateTime<Utc>,
    /// Upper/above/yes-like side
    pub leg_a: LegSpec,
    /// Lower/below/no-like side
    pub leg_b: LegSpec,
}

impl PairedUnit {
    fn cross(above: &Market, below: &Market, asset: &str, anchor: Decimal) -> Self {
        let label = anchor_label(anchor);
        Self {
            id: format!("{}:{}", above.id, below.id),
            kind: PairKind::Cross,
            asset: asset.to_string(),
            symbol: format!("{asset} {label}"),
            anchor: Some(anchor),
            anchor_label: label.clone(),
            settles_at: above.end_date.min(below.end_date),
            leg_a: LegSpec {
                market_id: above.id.clone(),
                symbol: format!("{asset} ABOVE {label}"),
                token_id: above.token_ids[0].clone(),
            },
            leg_b: LegSpec {
                market_id: below.id.clone(),
                symbol: format!("{asset} BELOW {label}"),
                token_id: below.token_ids[0].clone(),
            },
        }
    }

    fn self_pair(market: &Market, traits: &MarketTraits) -> Self {
        let symbol = display_symbol(market);
        let asset = traits
            .asset
            .map(str::to_string)
            .or_else(|| symbol.split_whitespace().next().map(str::to_string))
            .unwrap_or_default();
        let anchor_label = match traits.anchor {
            Some(anchor) => anchor_label(anchor),
            None => market.end_date.format("%b %d %H:%M UTC").to_string(),
        };

        Self {
            id: market.id.clone(),
            kind: PairKind::SelfPair,
            asset,
            symbol: symbol.clone(),
            anchor: traits.anchor,
            anchor_label,
            settles_at: market.end_date,
            leg_a: LegSpec {
                market_id: market.id.clone(),
                symbol: format!("{} {}", symbol, market.outcomes[0].to_uppercase()),
                token_id: market.token_ids[0].clone(),
            },
            leg_b: LegSpec {
                market_id: market.id.clone(),
                symbol: format!("{} {}", symbol, market.outcomes[1].to_uppercase()),
                token_id: market.token_ids[1].clone(),
            },
        }
    }
}

/// Ticker if present, else the first two slug words upper-cased
fn display_symbol(market: &Market) -> String {
    if let Some(ticker) = &market.ticker {
        return ticker.to_uppercase();
    }
    market
        .slug
        .split('-')
        .filter(|w| !w.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

struct Candidate<'a> {
    market: &'a Market,
    traits: MarketTraits,
}

impl Candidate<'_> {
    fn complements(&self, other: &Candidate<'_>, rules: &PairingRules) -> bool {
        if !self.traits.is_pairable() || !other.traits.is_pairable() {
            return false;
        }
        if self.market.token_ids == other.market.token_ids {
            return false;
        }
        let gap = (self.market.end_date - other.market.end_date).num_seconds().abs();
        gap <= rules.settlement_tolerance_secs
            && self.traits.asset == other.traits.asset
            && self.traits.anchor == other.traits.anchor
            && self.traits.direction.map(Direction::opposite) == other.traits.direction
    }
}

/// Group markets into tracked units.
///
/// Greedy, first-match in input order: each market joins at most one unit and
/// duplicate market ids after the first are ignored. Deterministic for a
/// given input order.
pub fn pair_markets(markets: &[Market], rules: &PairingRules) -> Vec<PairedUnit> {
    let mut seen = HashSet::new();
    let candidates: Vec<Candidate<'_>> = markets
        .iter()
        .filter(|m| seen.insert(m.id.as_str()))
        .map(|market| Candidate {
            market,
            traits: MarketTraits::parse(market, rules.anchor_floor),
        })
        .collect();

    let mut consumed = vec![false; candidates.len()];
    let mut units = Vec::with_capacity(candidates.len());

    for i in 0..candidates.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;
        let current = &candidates[i];

        let partner = (i + 1..candidates.len())
            .find(|&j| !consumed[j] && current.complements(&candidates[j], rules));

        let unit = match partner {
            Some(j) => {
                consumed[j] = true;
                let other = &candidates[j];
                let (above, below) = match current.traits.direction {
                    Some(Direction::Above) => (current.market, other.market),
                    _ => (other.market, current.market),
                };
                // is_pairable() guarantees asset and anchor
                match (current.traits.asset, current.traits.anchor) {
                    (Some(asset), Some(anchor)) => PairedUnit::cross(above, below, asset, anchor),
                    _ => PairedUnit::self_pair(current.market, &current.traits),
                }
            }
            None => PairedUnit::self_pair(current.market, &current.traits),
        };
        units.push(unit);
    }

    let cross = units.iter().filter(|u| u.kind == PairKind::Cross).count();
    tracing::debug!(
        markets = candidates.len(),
        units = units.len(),
        cross,
        "Paired markets"
    );

    units
}
