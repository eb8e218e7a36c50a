//! CLI interface for poly-edge
//!
//! Provides subcommands for:
//! - `run`: Start the engine and the status server
//! - `discover`: One-shot market discovery and pairing
//! - `config`: Show the effective configuration

mod discover;
mod run;

pub use discover::DiscoverArgs;
pub use run::RunArgs;

use crate::config::{CatalogConfig, ClobConfig};
use crate::market::{GammaClient, GammaConfig};
use crate::orderbook::{ClobClient, ClobClientConfig};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "poly-edge")]
#[command(about = "Paired-market arbitrage scanner and hedge simulator for Polymarket")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the engine and serve the status surface
    Run(RunArgs),
    /// Fetch the catalog once and print the paired units
    Discover(DiscoverArgs),
    /// Show the effective configuration
    Config,
}

fn gamma_client(config: &CatalogConfig) -> anyhow::Result<GammaClient> {
    GammaClient::with_config(GammaConfig {
        base_url: config.base_url.clone(),
        timeout: Duration::from_secs(config.timeout_secs),
    })
}

fn clob_client(config: &ClobConfig) -> anyhow::Result<ClobClient> {
    ClobClient::with_config(ClobClientConfig {
        base_url: config.base_url.clone(),
        timeout: Duration::from_millis(config.timeout_ms),
    })
}
