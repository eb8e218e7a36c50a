//! poly-edge: paired-market arbitrage scanner for Polymarket binary markets
//!
//! This library provides the core components for:
//! - Market discovery via the Gamma API
//! - Pairing complementary threshold markets into hedgeable units
//! - Concurrent best-ask polling from the CLOB order book
//! - A per-unit drop/hedge state machine with simulated fills
//! - An in-memory ledger of orders, stats and logs
//! - An HTTP status and control surface
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod market;
pub mod orderbook;
pub mod pairing;
pub mod server;
pub mod telemetry;
