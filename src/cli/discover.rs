//! Discover command implementation

use crate::config::Config;
use crate::market::{CatalogQuery, MarketCatalog};
use crate::pairing::{pair_markets, PairKind, PairedUnit};
use clap::Args;

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Print units as JSON
    #[arg(long)]
    pub json: bool,

    /// Override the catalog fetch limit
    #[arg(short, long)]
    pub limit: Option<usize>,
}

impl DiscoverArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let catalog = super::gamma_client(&config.catalog)?;
        let query = CatalogQuery {
            limit: self.limit.unwrap_or(config.catalog.limit),
            order: config.catalog.order,
            keywords: config.catalog.assets.clone(),
            min_volume_24h: config.catalog.min_volume_24h,
            min_liquidity: config.trade.min_liquidity,
            window: config.trade.window(),
        };

        let markets = catalog.fetch_active_markets(&query).await?;
        let units = pair_markets(&markets, &config.pairing);
        tracing::info!(markets = markets.len(), units = units.len(), "Discovery finished");

        if self.json {
            println!("{}", serde_json::to_string_pretty(&units)?);
        } else {
            print!("{}", render_table(&units));
        }
        Ok(())
    }
}

fn render_table(units: &[PairedUnit]) -> String {
    let mut out = format!(
        "{:<6} {:<28} {:<18} {:<22} {}\n",
        "KIND", "SYMBOL", "ANCHOR", "SETTLES", "LEGS"
    );
    for unit in units {
        let kind = match unit.kind {
            PairKind::Cross => "CROSS",
            PairKind::SelfPair => "SELF",
        };
        out.push_str(&format!(
            "{:<6} {:<28} {:<18} {:<22} {} / {}\n",
            kind,
            unit.symbol,
            unit.anchor_label,
            unit.settles_at.format("%Y-%m-%d %H:%M UTC"),
            unit.leg_a.market_id,
            unit.leg_b.market_id,
        ));
    }
    let cross = units.iter().filter(|u| u.kind == PairKind::Cross).count();
    out.push_str(&format!("{} units ({} cross-pairs)\n", units.len(), cross));
    out
}
