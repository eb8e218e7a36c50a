//! Slug and title parsing
//!
//! Pure functions that pull the asset, price anchor and direction out of a
//! market's identifiers. No I/O, so they can be tested against literal slugs.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::market::Market;

/// "above-70000", "below $3,500", "higher than 2.5k"
static DIRECTIONAL_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(above|below|higher|lower)(?:-|\s+)(?:than(?:-|\s+))?\$?(\d[\d,]*(?:\.\d+)?)(?:(k)\b)?")
        .expect("directional anchor regex is valid")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number regex is valid"));

static UPPER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(above|higher)\b").expect("upper word regex is valid"));

static LOWER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(below|lower)\b").expect("lower word regex is valid"));

/// Known underlying assets and the words that name them
const ASSETS: &[(&str, &[&str])] = &[
    ("BTC", &["btc", "bitcoin"]),
    ("ETH", &["eth", "ethereum"]),
    ("SOL", &["sol", "solana"]),
    ("XRP", &["xrp", "ripple"]),
    ("DOGE", &["doge", "dogecoin"]),
    ("BNB", &["bnb"]),
];

/// Directional qualifier of a threshold market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// "above" / "higher"
    Above,
    /// "below" / "lower"
    Below,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Above => Direction::Below,
            Direction::Below => Direction::Above,
        }
    }

    fn from_word(word: &str) -> Self {
        match word.to_ascii_lowercase().as_str() {
            "above" | "higher" => Direction::Above,
            _ => Direction::Below,
        }
    }
}

/// What the parser could read from one market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketTraits {
    pub asset: Option<&'static str>,
    pub anchor: Option<Decimal>,
    pub direction: Option<Direction>,
}

impl MarketTraits {
    /// Read slug first, then the question
    pub fn parse(market: &Market, anchor_floor: Decimal) -> Self {
        let texts = [market.slug.as_str(), market.question.as_str()];

        let asset = texts.iter().find_map(|t| detect_asset(t));

        let directional = texts.iter().find_map(|t| directional_anchor(t));
        let anchor = directional.map(|(_, value)| value).or_else(|| {
            texts
                .iter()
                .find_map(|t| largest_number_above(t, anchor_floor))
        });
        let direction = directional
            .map(|(direction, _)| direction)
            .or_else(|| texts.iter().find_map(|t| detect_direction(t)));

        Self {
            asset,
            anchor,
            direction,
        }
    }

    /// All three traits present: eligible for cross-pairing
    pub fn is_pairable(&self) -> bool {
        self.asset.is_some() && self.anchor.is_some() && self.direction.is_some()
    }
}

/// Lower-cased alphanumeric words of a slug or title
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
}

/// Detect the underlying asset by whole-word match
pub fn detect_asset(text: &str) -> Option<&'static str> {
    words(text).find_map(|word| {
        ASSETS
            .iter()
            .find(|(_, names)| names.contains(&word.as_str()))
            .map(|(tag, _)| *tag)
    })
}

/// Extract the price anchor: the directional pattern first, then the largest
/// number above `floor`
pub fn extract_anchor(text: &str, floor: Decimal) -> Option<Decimal> {
    directional_anchor(text)
        .map(|(_, value)| value)
        .or_else(|| largest_number_above(text, floor))
}

/// Detect a single unambiguous direction word
pub fn detect_direction(text: &str) -> Option<Direction> {
    match (UPPER_WORD.is_match(text), LOWER_WORD.is_match(text)) {
        (true, false) => Some(Direction::Above),
        (false, true) => Some(Direction::Below),
        _ => None,
    }
}

fn directional_anchor(text: &str) -> Option<(Direction, Decimal)> {
    let caps = DIRECTIONAL_ANCHOR.captures(text)?;
    let direction = Direction::from_word(caps.get(1)?.as_str());
    let digits = caps.get(2)?.as_str().replace(',', "");
    let mut value = Decimal::from_str(&digits).ok()?;
    if caps.get(3).is_some() {
        value *= Decimal::ONE_THOUSAND;
    }
    Some((direction, value.normalize()))
}

fn largest_number_above(text: &str, floor: Decimal) -> Option<Decimal> {
    let cleaned = text.replace(',', "");
    NUMBER
        .find_iter(&cleaned)
        .filter_map(|m| Decimal::from_str(m.as_str()).ok())
        .filter(|value| *value > floor)
        .max()
        .map(|value| value.normalize())
}

/// Human label for an anchor, e.g. "70000" or "2.5"
pub fn anchor_label(anchor: Decimal) -> String {
    anchor.normalize().to_string()
}
