//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poly_edge::config::TradeConfig;
use poly_edge::engine::{Engine, EngineSettings};
use poly_edge::market::{CatalogQuery, Market, MarketCatalog};
use poly_edge::orderbook::{PriceSource, QuoteError};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn market(id: &str, slug: &str, end_date: DateTime<Utc>) -> Market {
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

/// Catalog serving a fixed, swappable market list
#[derive(Default)]
pub struct FakeCatalog {
    markets: Mutex<Vec<Market>>,
    failing: AtomicBool,
}

impl FakeCatalog {
    pub fn new(markets: Vec<Market>) -> Self {
        Self {
            markets: Mutex::new(markets),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_markets(&self, markets: Vec<Market>) {
        *self.markets.lock().unwrap() = markets;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketCatalog for FakeCatalog {
    async fn fetch_active_markets(&self, _query: &CatalogQuery) -> anyhow::Result<Vec<Market>> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("catalog unavailable");
        }
        Ok(self.markets.lock().unwrap().clone())
    }
}

/// Price source with scripted asks, optional slow tokens and a one-shot panic
#[derive(Default)]
pub struct FakePrices {
    asks: Mutex<HashMap<String, Decimal>>,
    slow: Mutex<HashSet<String>>,
    panic_once: Mutex<Option<String>>,
}

impl FakePrices {
    pub fn set(&self, token: &str, price: Decimal) {
        self.asks.lock().unwrap().insert(token.to_string(), price);
    }

    pub fn remove(&self, token: &str) {
        self.asks.lock().unwrap().remove(token);
    }

    /// Requests for this token hang far beyond any quote timeout
    pub fn make_slow(&self, token: &str) {
        self.slow.lock().unwrap().insert(token.to_string());
    }

    /// The next request for this token panics
    pub fn panic_on(&self, token: &str) {
        *self.panic_once.lock().unwrap() = Some(token.to_string());
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn best_ask(&self, token_id: &str) -> Result<Decimal, QuoteError> {
        let should_panic = {
            let mut panic_once = self.panic_once.lock().unwrap();
            if panic_once.as_deref() == Some(token_id) {
                panic_once.take();
                true
            } else {
                false
            }
        };
        if should_panic {
            panic!("order book decoder exploded on {token_id}");
        }

        let slow = self.slow.lock().unwrap().contains(token_id);
        if slow {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }

        self.asks
            .lock()
            .unwrap()
            .get(token_id)
            .copied()
            .ok_or(QuoteError::EmptyBook)
    }
}

pub fn build_engine(
    catalog: &Arc<FakeCatalog>,
    prices: &Arc<FakePrices>,
    trade: TradeConfig,
) -> Engine<FakeCatalog, FakePrices> {
    let mut settings = EngineSettings::default();
    settings.strategy.quote_timeout_ms = 100;
    Engine::new(Arc::clone(catalog), Arc::clone(prices), trade, settings)
}
