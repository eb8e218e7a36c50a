//! Polymarket CLOB REST client for order book snapshots
//!
//! Fetches `/book?token_id=...` and reduces it to the best ask. Every failure
//! mode comes back as a [`QuoteError`]; deciding what to do with a failed
//! quote is the scheduler's job.

use super::{validate_ask, OrderBook, PriceLevel, PriceSource, QuoteError};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Polymarket CLOB REST base URL
pub const CLOB_API_URL: &str = "https://clob.polymarket.com";

/// Configuration for the CLOB client
#[derive(Debug, Clone)]
pub struct ClobClientConfig {
    /// REST base URL (defaults to CLOB_API_URL)
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClobClientConfig {
    fn default() -> Self {
        Self {
            base_url: CLOB_API_URL.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Polymarket CLOB REST client
pub struct ClobClient {
    config: ClobClientConfig,
    client: Client,
}

impl ClobClient {
    /// Create a new client with default configuration
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(ClobClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClobClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Fetch the order book snapshot for one token
    pub async fn fetch_book(&self, token_id: &str) -> Result<OrderBook, QuoteError> {
        let url = format!("{}/book", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("token_id", token_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status()));
        }

        let book: BookResponse = response.json().await?;
        let orderbook = OrderBook::from_levels(
            token_id,
            parse_levels(book.bids),
            parse_levels(book.asks),
        );

        tracing::trace!(
            token_id = %token_id,
            best_bid = ?orderbook.best_bid(),
            best_ask = ?orderbook.best_ask(),
            spread = ?orderbook.spread(),
            "Fetched order book"
        );

        Ok(orderbook)
    }
}

#[async_trait]
impl PriceSource for ClobClient {
    async fn best_ask(&self, token_id: &str) -> Result<Decimal, QuoteError> {
        let book = self.fetch_book(token_id).await?;
        let ask = book.best_ask().ok_or(QuoteError::EmptyBook)?;
        validate_ask(ask)
    }
}

/// Order book response from the CLOB REST API
#[derive(Debug, Deserialize)]
struct BookResponse {
    #[serde(default)]
    bids: Vec<BookLevel>,
    #[serde(default)]
    asks: Vec<BookLevel>,
}

/// Price level as sent by the CLOB (decimal strings)
#[derive(Debug, Deserialize)]
struct BookLevel {
    price: String,
    size: String,
}

/// Convert wire levels, skipping any that do not parse
fn parse_levels(levels: Vec<BookLevel>) -> Vec<PriceLevel> {
    levels
        .into_iter()
        .filter_map(|l| {
            let price = Decimal::from_str(&l.price).ok()?;
            let size = Decimal::from_str(&l.size).ok()?;
            Some(PriceLevel { price, size })
        })
        .collect()
}
