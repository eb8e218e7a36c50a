//! Market discovery module
//!
//! Fetches the catalog of active binary markets via the Gamma API and
//! validates each entry at the ingestion boundary.

mod gamma;

pub use gamma::{GammaClient, GammaConfig, GAMMA_API_URL};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A validated binary market from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Catalog identifier
    pub id: String,
    /// Condition identifier
    pub condition_id: String,
    /// URL slug, e.g. "bitcoin-above-70000-on-october-17"
    pub slug: String,
    /// Human-readable question
    pub question: String,
    /// Short ticker, when the catalog provides one
    pub ticker: Option<String>,
    /// Outcome token identifiers; index 0 is the yes-like outcome
    pub token_ids: [String; 2],
    /// Outcome labels matching `token_ids`
    pub outcomes: [String; 2],
    /// Settlement time
    pub end_date: DateTime<Utc>,
    /// 24h traded volume (USD)
    pub volume_24h: Decimal,
    /// Current liquidity (USD)
    pub liquidity: Decimal,
}

/// Catalog sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOrder {
    /// Highest 24h volume first
    #[default]
    Volume24hr,
    /// Soonest settlement first
    EndDate,
}

/// Parameters for one catalog refresh
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    /// Maximum markets to fetch
    pub limit: usize,
    pub order: CatalogOrder,
    /// Asset keywords; a market must mention at least one. Empty means all.
    pub keywords: Vec<String>,
    pub min_volume_24h: Decimal,
    pub min_liquidity: Decimal,
    /// Only markets settling within this window from now
    pub window: chrono::Duration,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            limit: 200,
            order: CatalogOrder::Volume24hr,
            keywords: Vec::new(),
            min_volume_24h: Decimal::ZERO,
            min_liquidity: Decimal::ZERO,
            window: chrono::Duration::days(1),
        }
    }
}

impl CatalogQuery {
    /// Latest settlement time inside the window, if representable
    pub fn horizon(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_add_signed(self.window)
    }

    /// Client-side filters applied after the catalog responds
    pub fn accepts(&self, market: &Market, now: DateTime<Utc>) -> bool {
        if market.end_date <= now {
            return false;
        }
        // An unrepresentable horizon means no upper bound
        if self.horizon(now).is_some_and(|max| market.end_date > max) {
            return false;
        }
        if market.volume_24h < self.min_volume_24h || market.liquidity < self.min_liquidity {
            return false;
        }
        if self.keywords.is_empty() {
            return true;
        }
        let words: Vec<String> = crate::pairing::words(&market.slug)
            .chain(crate::pairing::words(&market.question))
            .collect();
        self.keywords
            .iter()
            .any(|k| words.iter().any(|w| w.eq_ignore_ascii_case(k)))
    }
}

/// Source of active markets
#[async_trait]
pub trait MarketCatalog: Send + Sync {
    /// Fetch active, non-closed markets matching the query.
    ///
    /// An `Err` means the backend was unreachable or answered with an error;
    /// malformed entries are dropped rather than failing the whole batch.
    async fn fetch_active_markets(&self, query: &CatalogQuery) -> anyhow::Result<Vec<Market>>;
}

#[cfg(test)]
pub(crate) fn test_market(id: &str, slug: &str, end_date: DateTime<Utc>) -> Market {
    Market {
        id: id.to_string(),
        condition_id: format!("0x{id}"),
        slug: slug.to_string(),
        question: slug.replace('-', " "),
        ticker: None,
        token_ids: [format!("{id}-yes"), format!("{id}-no")],
        outcomes: ["Yes".to_string(), "No".to_string()],
        end_date,
        volume_24h: Decimal::from(1000),
        liquidity: Decimal::from(500),
    }
}
