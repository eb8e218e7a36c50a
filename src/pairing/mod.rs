//! Market pairing module
//!
//! Turns a flat market catalog into arbitrage-relevant units: cross-pairs of
//! complementary threshold markets, or self-pairs kept for display.

mod anchor;
mod engine;

pub use anchor::{
    anchor_label, detect_asset, detect_direction, extract_anchor, words, Direction, MarketTraits,
};
pub use engine::{pair_markets, LegSpec, PairKind, PairedUnit, PairingRules};
