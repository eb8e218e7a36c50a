//! Catalog-to-units integration tests: Gamma payloads through the pairing engine

mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::market;
use poly_edge::market::{CatalogQuery, GammaClient, GammaConfig, MarketCatalog};
use poly_edge::pairing::{extract_anchor, pair_markets, MarketTraits, PairKind, PairingRules};
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gamma_entry(id: &str, slug: &str, question: &str, end: &str) -> serde_json::Value {
    json!({
        "id": id,
        "conditionId": format!("0x{id}"),
        "slug": slug,
        "question": question,
        "clobTokenIds": format!("[\"{id}-yes\", \"{id}-no\"]"),
        "outcomes": "[\"Yes\", \"No\"]",
        "endDate": end,
        "volume24hr": 2500,
        "liquidity": "1200.5",
        "active": true,
        "closed": false
    })
}

#[tokio::test]
async fn test_gamma_catalog_to_units() {
    let server = MockServer::start().await;
    let end = (Utc::now() + ChronoDuration::hours(6)).to_rfc3339();
    let end_plus_30s = (Utc::now() + ChronoDuration::hours(6) + ChronoDuration::seconds(30)).to_rfc3339();

    Mock::given(method("GET"))
        .and(path("/markets"))
        .and(query_param("closed", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            gamma_entry("101", "bitcoin-above-70000-on-october-17", "Will Bitcoin be above $70,000?", &end),
            gamma_entry("202", "ethereum-above-3500-on-october-17", "Will Ethereum be above $3,500?", &end),
            gamma_entry("303", "bitcoin-below-70000-on-october-17", "Will Bitcoin be below $70,000?", &end_plus_30s),
            { "id": "404", "slug": "broken-entry", "endDate": end },
            gamma_entry("505", "will-it-rain-in-nyc", "Will it rain in NYC?", &end),
        ])))
        .mount(&server)
        .await;

    let client = GammaClient::with_config(GammaConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let markets = client.fetch_active_markets(&CatalogQuery::default()).await.unwrap();
    assert_eq!(markets.len(), 4);

    let units = pair_markets(&markets, &PairingRules::default());
    assert_eq!(units.len(), 3);

    let btc = &units[0];
    assert_eq!(btc.kind, PairKind::Cross);
    assert_eq!(btc.id, "101:303");
    assert_eq!(btc.leg_a.token_id, "101-yes");
    assert_eq!(btc.leg_b.token_id, "303-yes");
    assert_eq!(btc.anchor, Some(dec!(70000)));

    assert_eq!(units[1].kind, PairKind::SelfPair);
    assert_eq!(units[1].asset, "ETH");
    assert_eq!(units[2].kind, PairKind::SelfPair);
    assert_eq!(units[2].symbol, "WILL IT");
}

#[tokio::test]
async fn test_catalog_keyword_filter_applies_client_side() {
    let server = MockServer::start().await;
    let end = (Utc::now() + ChronoDuration::hours(2)).to_rfc3339();

    Mock::given(method("GET"))
        .and(path("/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            gamma_entry("1", "solana-above-200", "Will Solana be above $200?", &end),
            gamma_entry("2", "the-solution-market", "Is there a solution?", &end),
            gamma_entry("3", "bitcoin-above-70000", "Will Bitcoin be above $70,000?", &end),
        ])))
        .mount(&server)
        .await;

    let client = GammaClient::with_config(GammaConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let query = CatalogQuery {
        keywords: vec!["solana".to_string(), "sol".to_string()],
        ..CatalogQuery::default()
    };

    let markets = client.fetch_active_markets(&query).await.unwrap();
    let ids: Vec<_> = markets.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["1"]);
}

#[tokio::test]
async fn test_catalog_error_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/markets"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = GammaClient::with_config(GammaConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let result = client.fetch_active_markets(&CatalogQuery::default()).await;
    let message = result.unwrap_err().to_string();
    assert!(message.contains("503"));
}

#[test]
fn test_anchor_heuristic_prefers_directional_pattern() {
    assert_eq!(
        extract_anchor("btc-above-70000-on-october-17-2026", dec!(100)),
        Some(dec!(70000))
    );
    // Without a directional phrase the largest number over the floor wins,
    // even when it is a date
    assert_eq!(
        extract_anchor("bitcoin-price-on-october-17-2026", dec!(100)),
        Some(dec!(2026))
    );
    assert_eq!(extract_anchor("btc-updown-15m", dec!(100)), None);
}

#[test]
fn test_pairing_is_stable_across_discovery_passes() {
    let t = Utc.with_ymd_and_hms(2026, 10, 17, 16, 0, 0).unwrap();
    let markets = vec![
        market("e1", "eth-above-3500", t),
        market("x", "will-it-snow", t),
        market("b2", "bitcoin-below-70000", t),
        market("e2", "eth-below-3500", t),
        market("b1", "bitcoin-above-70000", t),
    ];
    let rules = PairingRules::default();

    let first = pair_markets(&markets, &rules);
    let second = pair_markets(&markets, &rules);
    assert_eq!(first, second);

    let ids: Vec<_> = first.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["e1:e2", "x", "b1:b2"]);
}

#[test]
fn test_unparseable_market_stays_visible_as_self_pair() {
    let t = Utc.with_ymd_and_hms(2026, 10, 17, 16, 0, 0).unwrap();
    let m = market("q", "who-wins-the-election", t);
    let traits = MarketTraits::parse(&m, dec!(100));
    assert!(!traits.is_pairable());

    let units = pair_markets(&[m], &PairingRules::default());
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].kind, PairKind::SelfPair);
}
