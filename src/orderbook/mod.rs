//! Order book module
//!
//! Best-ask quotes for outcome tokens from the Polymarket CLOB

mod book;
mod client;

pub use book::OrderBook;
pub use client::{ClobClient, ClobClientConfig, CLOB_API_URL};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A price level in the order book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price at this level
    pub price: Decimal,
    /// Total size available
    pub size: Decimal,
}

/// Why a quote could not be produced
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Order book endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("No asks in order book")]
    EmptyBook,

    #[error("Ask {0} outside [0, 1]")]
    OutOfRange(Decimal),

    #[error("Quote timed out")]
    Timeout,
}

/// Source of best-ask quotes for outcome tokens
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Best current ask for one token, in [0, 1]
    async fn best_ask(&self, token_id: &str) -> Result<Decimal, QuoteError>;
}

/// Reject asks outside the probability range
pub(crate) fn validate_ask(price: Decimal) -> Result<Decimal, QuoteError> {
    if price < Decimal::ZERO || price > Decimal::ONE {
        return Err(QuoteError::OutOfRange(price));
    }
    Ok(price)
}
