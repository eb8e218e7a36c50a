//! End-to-end engine tests against in-memory catalog and price fakes

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{build_engine, market, FakeCatalog, FakePrices};
use poly_edge::config::TradeConfig;
use poly_edge::engine::{Side, UnitState};
use poly_edge::ledger::LogLevel;
use poly_edge::pairing::PairKind;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

fn trade() -> TradeConfig {
    TradeConfig {
        drop_threshold: dec!(5),
        sum_target: dec!(0.98),
        bet_amount: dec!(10),
        cooldown_secs: 4,
        ..TradeConfig::default()
    }
}

fn btc_pair() -> Vec<poly_edge::market::Market> {
    let end = Utc::now() + ChronoDuration::hours(3);
    vec![
        market("up", "btc-above-70000", end),
        market("down", "btc-below-70000", end),
    ]
}

#[tokio::test]
async fn test_drop_hedge_lock_and_release() {
    let catalog = Arc::new(FakeCatalog::new(btc_pair()));
    let prices = Arc::new(FakePrices::default());
    let mut engine = build_engine(&catalog, &prices, trade());

    let t0 = Utc::now();
    prices.set("up-yes", dec!(0.50));
    prices.set("down-yes", dec!(0.50));
    engine.tick(t0).await;
    engine.tick(t0 + ChronoDuration::seconds(2)).await;

    // 0.50 -> 0.40 is a 20% drop on the above leg
    prices.set("up-yes", dec!(0.40));
    engine.tick(t0 + ChronoDuration::seconds(4)).await;
    let unit = &engine.units()[0];
    assert_eq!(unit.state, UnitState::Hedging);
    assert_eq!(unit.leg1.as_ref().map(|l| l.side), Some(Side::Up));

    // 0.40 + 0.60 = 1.00 is above the ceiling, keep waiting
    prices.set("down-yes", dec!(0.60));
    engine.tick(t0 + ChronoDuration::seconds(6)).await;
    assert_eq!(engine.units()[0].state, UnitState::Hedging);

    prices.set("down-yes", dec!(0.55));
    engine.tick(t0 + ChronoDuration::seconds(8)).await;
    assert_eq!(engine.units()[0].state, UnitState::Locked);

    let stats = engine.ledger().stats().clone();
    assert_eq!(stats.total_trades, 1);
    assert_eq!(stats.won_trades, 1);
    assert_eq!(stats.net_profit, dec!(0.5));
    assert_eq!(stats.win_rate, dec!(100));

    let orders: Vec<_> = engine.ledger().orders().collect();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].leg, 2);
    assert_eq!(orders[0].side, Side::Down);
    assert_eq!(orders[0].price, dec!(0.55));
    assert_eq!(orders[1].leg, 1);
    assert_eq!(orders[1].price, dec!(0.40));

    // Cool-down of 4s drains over two 2s ticks
    engine.tick(t0 + ChronoDuration::seconds(10)).await;
    assert_eq!(engine.units()[0].state, UnitState::Locked);
    engine.tick(t0 + ChronoDuration::seconds(12)).await;
    assert_eq!(engine.units()[0].state, UnitState::Scanning);
    assert!(engine.units()[0].leg1.is_none());
}

#[tokio::test]
async fn test_self_pairs_are_tracked_but_never_traded() {
    let end = Utc::now() + ChronoDuration::hours(3);
    let catalog = Arc::new(FakeCatalog::new(vec![market("rain", "will-it-rain", end)]));
    let prices = Arc::new(FakePrices::default());
    let mut engine = build_engine(&catalog, &prices, trade());

    let t0 = Utc::now();
    prices.set("rain-yes", dec!(0.80));
    prices.set("rain-no", dec!(0.20));
    engine.tick(t0).await;
    prices.set("rain-yes", dec!(0.30));
    prices.set("rain-no", dec!(0.70));
    engine.tick(t0 + ChronoDuration::seconds(2)).await;

    let unit = &engine.units()[0];
    assert_eq!(unit.unit.kind, PairKind::SelfPair);
    assert_eq!(unit.state, UnitState::Scanning);
    assert_eq!(unit.ask_a, dec!(0.30));
    assert_eq!(engine.ledger().orders().count(), 0);
}

#[tokio::test]
async fn test_slow_unit_does_not_stall_others() {
    let end = Utc::now() + ChronoDuration::hours(3);
    let catalog = Arc::new(FakeCatalog::new(vec![
        market("a", "btc-above-70000", end),
        market("b", "btc-below-70000", end),
        market("c", "eth-above-3500", end),
        market("d", "eth-below-3500", end),
    ]));
    let prices = Arc::new(FakePrices::default());
    prices.set("a-yes", dec!(0.45));
    prices.set("b-yes", dec!(0.52));
    prices.set("c-yes", dec!(0.61));
    prices.set("d-yes", dec!(0.37));
    prices.make_slow("c-yes");
    let mut engine = build_engine(&catalog, &prices, trade());

    let started = Instant::now();
    let report = engine.tick(Utc::now()).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(report.units, 2);
    assert_eq!(report.quote_failures, 1);
    let btc = engine.units().iter().find(|u| u.unit.asset == "BTC").unwrap();
    assert_eq!(btc.ask_a, dec!(0.45));
    let eth = engine.units().iter().find(|u| u.unit.asset == "ETH").unwrap();
    assert_eq!(eth.ask_a, dec!(0.5));
    assert_eq!(eth.ask_b, dec!(0.37));
}

#[tokio::test]
async fn test_panic_in_tick_is_contained() {
    let catalog = Arc::new(FakeCatalog::new(btc_pair()));
    let prices = Arc::new(FakePrices::default());
    prices.set("up-yes", dec!(0.50));
    prices.set("down-yes", dec!(0.50));
    let mut engine = build_engine(&catalog, &prices, trade());

    prices.panic_on("up-yes");
    assert!(engine.step(Utc::now()).await.is_none());
    assert!(engine
        .ledger()
        .logs()
        .any(|l| l.level == LogLevel::Error && l.message.contains("engine tick failed")));

    let report = engine.step(Utc::now()).await.unwrap();
    assert!(report.ran);
    assert_eq!(report.quote_failures, 0);
}

#[tokio::test]
async fn test_catalog_outage_keeps_previous_units() {
    let catalog = Arc::new(FakeCatalog::new(btc_pair()));
    let prices = Arc::new(FakePrices::default());
    let mut engine = build_engine(&catalog, &prices, trade());
    engine.tick(Utc::now()).await;
    assert_eq!(engine.units().len(), 1);

    catalog.set_failing(true);
    assert!(!engine.discover(Utc::now()).await);
    assert_eq!(engine.units().len(), 1);

    catalog.set_failing(false);
    catalog.set_markets(vec![]);
    assert!(engine.discover(Utc::now()).await);
    assert!(engine.units().is_empty());
}

#[tokio::test]
async fn test_hedging_unit_removed_from_catalog_is_abandoned() {
    let catalog = Arc::new(FakeCatalog::new(btc_pair()));
    let prices = Arc::new(FakePrices::default());
    let mut engine = build_engine(&catalog, &prices, trade());

    let t0 = Utc::now();
    prices.set("up-yes", dec!(0.50));
    prices.set("down-yes", dec!(0.70));
    engine.tick(t0).await;
    prices.set("up-yes", dec!(0.40));
    engine.tick(t0 + ChronoDuration::seconds(2)).await;
    assert_eq!(engine.units()[0].state, UnitState::Hedging);

    catalog.set_markets(vec![]);
    engine.discover(t0 + ChronoDuration::seconds(3)).await;
    assert!(engine.units().is_empty());
    assert!(engine
        .ledger()
        .logs()
        .any(|l| l.level == LogLevel::Warn && l.message.contains("mid-hedge")));
}

#[tokio::test]
async fn test_spawned_engine_publishes_snapshots() {
    let catalog = Arc::new(FakeCatalog::new(btc_pair()));
    let prices = Arc::new(FakePrices::default());
    prices.set("up-yes", dec!(0.48));
    prices.set("down-yes", dec!(0.49));
    let config = TradeConfig {
        scan_interval_ms: 100,
        ..trade()
    };
    let engine = build_engine(&catalog, &prices, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (handle, task) = engine.spawn(shutdown_rx);

    let mut snapshot = handle.snapshot();
    for _ in 0..50 {
        if !snapshot.rounds.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        snapshot = handle.snapshot();
    }
    assert_eq!(snapshot.rounds.len(), 1);
    assert!(snapshot.tick >= 1);
    assert_eq!(snapshot.rounds[0].leg_a.ask, dec!(0.48));
    assert_eq!(snapshot.rounds[0].combined_cost, dec!(0.97));

    // Pausing is applied by the engine task and visible in the next snapshot
    assert!(!handle.set_enabled(Some(false)));
    for _ in 0..50 {
        if !handle.snapshot().config.engine_active {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!handle.snapshot().config.engine_active);

    shutdown_tx.send_replace(true);
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
}
