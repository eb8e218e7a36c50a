//! Gamma API client for market discovery
//!
//! Fetches active, non-closed binary markets from Polymarket's Gamma API and
//! converts them into validated [`Market`] records. Entries with a missing
//! settlement time or a malformed token list are dropped at this boundary.

use super::{CatalogOrder, CatalogQuery, Market, MarketCatalog};
use crate::config::decimal_from_json;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Gamma API base URL
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Configuration for the Gamma client
#[derive(Debug, Clone)]
pub struct GammaConfig {
    /// Base URL for the Gamma API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            base_url: GAMMA_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for Polymarket's Gamma API
pub struct GammaClient {
    config: GammaConfig,
    client: Client,
}

impl GammaClient {
    /// Create a new Gamma API client with default configuration
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(GammaConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: GammaConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Fetch one page of active markets and validate each entry
    pub async fn fetch_markets(&self, query: &CatalogQuery) -> anyhow::Result<Vec<Market>> {
        let url = format!("{}/markets", self.config.base_url);
        let now = Utc::now();

        let (order, ascending) = match query.order {
            CatalogOrder::Volume24hr => ("volume24hr", "false"),
            CatalogOrder::EndDate => ("endDate", "true"),
        };
        let limit = query.limit.to_string();
        let end_date_min = now.to_rfc3339();
        let end_date_max = query.horizon(now).map(|max| max.to_rfc3339());

        let mut params = vec![
            ("active", "true"),
            ("closed", "false"),
            ("limit", limit.as_str()),
            ("order", order),
            ("ascending", ascending),
            ("end_date_min", end_date_min.as_str()),
        ];
        if let Some(max) = end_date_max.as_deref() {
            params.push(("end_date_max", max));
        }

        tracing::debug!(url = %url, limit = query.limit, order, "Fetching active markets from Gamma API");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gamma API error: {} - {}", status, body);
        }

        let raw: Vec<Value> = response.json().await?;
        let fetched = raw.len();

        let markets: Vec<Market> = raw
            .into_iter()
            .filter_map(|value| match convert_to_market(value) {
                Ok(market) => Some(market),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed catalog entry");
                    None
                }
            })
            .filter(|m| query.accepts(m, now))
            .take(query.limit)
            .collect();

        tracing::info!(
            fetched,
            accepted = markets.len(),
            "Fetched active markets"
        );

        Ok(markets)
    }
}

#[async_trait]
impl MarketCatalog for GammaClient {
    async fn fetch_active_markets(&self, query: &CatalogQuery) -> anyhow::Result<Vec<Market>> {
        self.fetch_markets(query).await
    }
}

/// Raw market response from Gamma API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    /// Catalog identifier (string or number)
    id: Value,
    #[serde(default)]
    condition_id: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    question: String,
    ticker: Option<String>,
    /// JSON-encoded string array, or a plain array
    clob_token_ids: Option<Value>,
    /// JSON-encoded string array, or a plain array
    outcomes: Option<Value>,
    end_date: Option<String>,
    volume24hr: Option<Value>,
    liquidity: Option<Value>,
    liquidity_num: Option<Value>,
    #[serde(default)]
    closed: bool,
}

/// Validate a raw catalog entry
fn convert_to_market(value: Value) -> anyhow::Result<Market> {
    let gamma: GammaMarket = serde_json::from_value(value)?;

    if gamma.closed {
        anyhow::bail!("Market {} is closed", gamma.slug);
    }

    let id = match &gamma.id {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => anyhow::bail!("Missing market id for {}", gamma.slug),
    };

    let token_ids = gamma
        .clob_token_ids
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Missing clobTokenIds"))
        .and_then(parse_string_pair)?;

    let outcomes = gamma
        .outcomes
        .as_ref()
        .and_then(|o| parse_string_pair(o).ok())
        .unwrap_or_else(|| ["Yes".to_string(), "No".to_string()]);

    let end_date = gamma
        .end_date
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow::anyhow!("Missing or invalid endDate for {}", gamma.slug))?;

    let volume_24h = gamma
        .volume24hr
        .as_ref()
        .and_then(decimal_from_json)
        .unwrap_or(Decimal::ZERO);

    let liquidity = gamma
        .liquidity_num
        .as_ref()
        .or(gamma.liquidity.as_ref())
        .and_then(decimal_from_json)
        .unwrap_or(Decimal::ZERO);

    let slug = if gamma.slug.is_empty() { id.clone() } else { gamma.slug };

    Ok(Market {
        id,
        condition_id: gamma.condition_id,
        slug,
        question: gamma.question,
        ticker: gamma.ticker.filter(|t| !t.is_empty()),
        token_ids,
        outcomes,
        end_date,
        volume_24h,
        liquidity,
    })
}

/// Parse a two-element string list, given either as a JSON-encoded string
/// (`"[\"a\", \"b\"]"`) or as a plain array
fn parse_string_pair(value: &Value) -> anyhow::Result<[String; 2]> {
    let items: Vec<String> = match value {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| anyhow::anyhow!("Failed to parse string list: {} - {}", s, e))?,
        Value::Array(_) => serde_json::from_value(value.clone())?,
        other => anyhow::bail!("Expected string list, got {}", other),
    };

    match <[String; 2]>::try_from(items) {
        Ok(pair) if pair.iter().all(|s| !s.is_empty()) => Ok(pair),
        Ok(_) => anyhow::bail!("Empty entry in string list"),
        Err(items) => anyhow::bail!("Expected 2 entries, got {}", items.len()),
    }
}
