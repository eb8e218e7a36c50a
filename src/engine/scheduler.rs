//! Polling scheduler
//!
//! A single [`Engine`] owns every tracked unit, the ledger and the applied
//! configuration. One task drives it: each tick optionally refreshes the
//! catalog, fans out best-ask requests for both legs of every unit, waits
//! for the whole batch and then runs the state machine unit by unit.
//! Readers only ever see the [`Snapshot`] published after a tick.

use super::snapshot::{RoundView, Snapshot};
use super::state_machine::{StrategyParams, Transition};
use super::types::TrackedUnit;
use crate::config::{CatalogConfig, ConfigError, StrategyConfig, TradeConfig};
use crate::ledger::{Ledger, LogLevel, Order};
use crate::market::{CatalogQuery, MarketCatalog};
use crate::orderbook::{PriceSource, QuoteError};
use crate::pairing::{pair_markets, PairKind, PairingRules};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use futures_util::FutureExt;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// False when the engine was disabled and the tick was skipped
    pub ran: bool,
    /// A catalog refresh succeeded during this tick
    pub discovered: bool,
    pub units: usize,
    pub quote_failures: usize,
    pub transitions: usize,
    /// Units dropped because their settlement countdown reached zero
    pub expired: usize,
}

/// Static engine settings, fixed for the life of the process
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub strategy: StrategyConfig,
    pub catalog: CatalogConfig,
    pub pairing: PairingRules,
}

/// Owner of all mutable engine state
pub struct Engine<C: MarketCatalog, P: PriceSource> {
    catalog: Arc<C>,
    prices: Arc<P>,
    trade: TradeConfig,
    settings: EngineSettings,
    units: Vec<TrackedUnit>,
    ledger: Ledger,
    tick: u64,
    ticks_since_refresh: u32,
    needs_discovery: bool,
    announced: bool,
    last_poll: Option<DateTime<Utc>>,
    /// Off-to-on flips made through any handle
    resumes: Arc<AtomicU64>,
    seen_resumes: u64,
}

impl<C, P> Engine<C, P>
where
    C: MarketCatalog + 'static,
    P: PriceSource + 'static,
{
    pub fn new(catalog: Arc<C>, prices: Arc<P>, trade: TradeConfig, settings: EngineSettings) -> Self {
        let ledger = Ledger::new(
            settings.strategy.initial_balance,
            settings.strategy.order_capacity,
            settings.strategy.log_capacity,
        );
        let mut engine = Self {
            catalog,
            prices,
            trade,
            settings,
            units: Vec::new(),
            ledger,
            tick: 0,
            ticks_since_refresh: 0,
            needs_discovery: true,
            announced: false,
            last_poll: None,
            resumes: Arc::new(AtomicU64::new(0)),
            seen_resumes: 0,
        };
        for warning in engine.trade.warnings() {
            engine.ledger.log(LogLevel::Warn, warning);
        }
        engine
    }

    pub fn units(&self) -> &[TrackedUnit] {
        &self.units
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn trade_config(&self) -> &TradeConfig {
        &self.trade
    }

    /// Apply a new live config, effective from the next tick.
    ///
    /// Re-enabling the engine drops every unit and forces a fresh discovery.
    pub fn set_trade_config(&mut self, next: TradeConfig) {
        let changed = self.trade.diff(&next);
        if changed.is_empty() {
            return;
        }

        let resumed = !self.trade.engine_active && next.engine_active;
        let paused = self.trade.engine_active && !next.engine_active;
        let rescope = changed
            .iter()
            .any(|f| matches!(*f, "windowMinutes" | "minLiquidity"));

        self.trade = next;
        self.ledger.log(
            LogLevel::Warn,
            format!("remote config update applied: {}", changed.join(", ")),
        );
        for warning in self.trade.warnings() {
            self.ledger.log(LogLevel::Warn, warning);
        }

        if paused {
            self.ledger.log(LogLevel::Info, "engine paused");
        }
        if resumed {
            self.resume();
        } else if rescope {
            self.needs_discovery = true;
        }
    }

    /// Apply a config published through an [`EngineHandle`].
    ///
    /// A pause and resume that land between two reads leave the config
    /// unchanged, so the handle's resume counter decides instead.
    fn apply_live_config(&mut self, next: TradeConfig) {
        let was_active = self.trade.engine_active;
        self.set_trade_config(next);

        let resumes = self.resumes.load(Ordering::SeqCst);
        if resumes != self.seen_resumes {
            self.seen_resumes = resumes;
            if was_active && self.trade.engine_active {
                self.resume();
            }
        }
    }

    /// Start over from an empty unit set
    fn resume(&mut self) {
        self.units.clear();
        self.last_poll = None;
        self.needs_discovery = true;
        self.ledger.log(LogLevel::Info, "engine resumed, rediscovering markets");
    }

    /// Run one tick at `now`. Skipped entirely while the engine is disabled.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        if !self.trade.engine_active {
            return report;
        }

        let started = Instant::now();
        report.ran = true;
        self.tick += 1;
        telemetry::increment(CounterMetric::Ticks, 1);

        self.ticks_since_refresh += 1;
        let refresh_due = self.ticks_since_refresh >= self.settings.strategy.refresh_every_ticks;
        if self.needs_discovery || refresh_due {
            report.discovered |= self.discover(now).await;
        }

        let elapsed = self
            .last_poll
            .map(|last| (now - last).to_std().unwrap_or_default())
            .unwrap_or_default();
        self.last_poll = Some(now);

        let quotes = self.poll().await;
        report.quote_failures = quotes
            .iter()
            .map(|(a, b)| usize::from(a.is_none()) + usize::from(b.is_none()))
            .sum();
        if report.quote_failures > 0 {
            telemetry::increment(CounterMetric::QuoteFailures, report.quote_failures as u64);
            tracing::warn!(
                failures = report.quote_failures,
                units = self.units.len(),
                "Some quotes failed, carrying last prices forward"
            );
        }

        let params = StrategyParams::new(&self.trade, &self.settings.strategy);
        for (index, (quote_a, quote_b)) in quotes.into_iter().enumerate() {
            let Some(unit) = self.units.get_mut(index) else {
                break;
            };
            if let Some(transition) = unit.on_prices(quote_a, quote_b, elapsed, now, &params) {
                report.transitions += 1;
                let unit = unit.clone();
                self.apply_transition(&unit, transition);
            }
        }

        report.expired = self.expire(now);
        if report.expired > 0 {
            report.discovered |= self.discover(now).await;
        }

        report.units = self.units.len();
        telemetry::set_gauge(GaugeMetric::TrackedUnits, report.units as f64);
        telemetry::record_latency(LatencyMetric::Tick, started.elapsed());
        tracing::debug!(
            tick = self.tick,
            units = report.units,
            failures = report.quote_failures,
            transitions = report.transitions,
            "Tick complete"
        );
        report
    }

    /// Run one tick, turning a panic into an error log entry
    pub async fn step(&mut self, now: DateTime<Utc>) -> Option<TickReport> {
        match AssertUnwindSafe(self.tick(now)).catch_unwind().await {
            Ok(report) => Some(report),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                telemetry::increment(CounterMetric::TickPanics, 1);
                self.ledger
                    .log(LogLevel::Error, format!("engine tick failed: {reason}"));
                None
            }
        }
    }

    /// Refresh the catalog and rebuild the unit set.
    ///
    /// On failure the previous units are kept. Returns true on success.
    pub async fn discover(&mut self, now: DateTime<Utc>) -> bool {
        self.ticks_since_refresh = 0;
        let query = self.catalog_query();
        let started = Instant::now();

        let markets = match self.catalog.fetch_active_markets(&query).await {
            Ok(markets) => markets,
            Err(e) => {
                telemetry::increment(CounterMetric::CatalogFailures, 1);
                tracing::warn!(error = %e, "Catalog refresh failed, keeping previous units");
                self.ledger
                    .log(LogLevel::Warn, format!("market discovery failed: {e}"));
                return false;
            }
        };
        telemetry::record_latency(LatencyMetric::Catalog, started.elapsed());
        self.needs_discovery = false;

        let paired = pair_markets(&markets, &self.settings.pairing);
        let mut previous: HashMap<String, TrackedUnit> = self
            .units
            .drain(..)
            .map(|u| (u.unit.id.clone(), u))
            .collect();

        let capacity = self.settings.strategy.history_capacity;
        self.units = paired
            .into_iter()
            .filter(|unit| unit.settles_at > now)
            .map(|unit| match previous.remove(&unit.id) {
                Some(existing) => existing.carry_over(unit),
                None => TrackedUnit::new(unit, capacity),
            })
            .collect();

        for dropped in previous.values().filter(|u| u.leg1.is_some()) {
            self.ledger.log(
                LogLevel::Warn,
                format!("{} left the catalog mid-hedge, position abandoned", dropped.unit.symbol),
            );
        }

        let cross = self.units.iter().filter(|u| u.unit.kind == PairKind::Cross).count();
        tracing::info!(
            markets = markets.len(),
            units = self.units.len(),
            cross,
            "Discovery complete"
        );
        if !self.announced {
            self.announced = true;
            self.ledger.log(
                LogLevel::Success,
                format!("discovery complete, monitoring {} units", self.units.len()),
            );
        }
        true
    }

    /// Snapshot of the current state
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            config: self.trade.clone(),
            stats: self.ledger.stats().clone(),
            rounds: self.units.iter().map(|u| RoundView::from_unit(u, now)).collect(),
            logs: self.ledger.logs().cloned().collect(),
            orders: self.ledger.orders().cloned().collect(),
            tick: self.tick,
            generated_at: now,
        }
    }

    fn catalog_query(&self) -> CatalogQuery {
        let catalog = &self.settings.catalog;
        CatalogQuery {
            limit: catalog.limit,
            order: catalog.order,
            keywords: catalog.assets.clone(),
            min_volume_24h: catalog.min_volume_24h,
            min_liquidity: self.trade.min_liquidity,
            window: self.trade.window(),
        }
    }

    /// Fetch both legs of every unit concurrently, one timeout per request
    async fn poll(&self) -> Vec<(Option<Decimal>, Option<Decimal>)> {
        let timeout = self.settings.strategy.quote_timeout();
        let prices = self.prices.as_ref();
        let requests = self.units.iter().map(|unit| async move {
            tokio::join!(
                quote(prices, &unit.unit.leg_a.token_id, timeout),
                quote(prices, &unit.unit.leg_b.token_id, timeout),
            )
        });
        join_all(requests).await
    }

    fn apply_transition(&mut self, unit: &TrackedUnit, transition: Transition) {
        let bet = self.trade.bet_amount;
        match transition {
            Transition::Leg1 {
                side,
                price,
                drop_pct,
            } => {
                self.ledger.log(
                    LogLevel::Warn,
                    format!(
                        "leg 1 triggered: {} dropped {}%",
                        unit.leg_symbol(side),
                        drop_pct.round_dp(1)
                    ),
                );
                self.ledger.record_order(Order::filled(
                    unit.id(),
                    unit.leg_symbol(side),
                    side,
                    1,
                    price,
                    bet,
                ));
            }
            Transition::Locked {
                side,
                price,
                total_cost,
                profit,
            } => {
                self.ledger.record_order(Order::filled(
                    unit.id(),
                    unit.leg_symbol(side),
                    side,
                    2,
                    price,
                    bet,
                ));
                self.ledger.record_hedge(profit, bet * total_cost);
                self.ledger.log(
                    LogLevel::Success,
                    format!(
                        "hedge locked: {} cost {} profit ${}",
                        unit.unit.symbol,
                        total_cost,
                        profit.round_dp(2)
                    ),
                );

                let stats = self.ledger.stats();
                telemetry::increment(CounterMetric::HedgesLocked, 1);
                telemetry::set_gauge(
                    GaugeMetric::NetProfit,
                    stats.net_profit.to_f64().unwrap_or_default(),
                );
                telemetry::set_gauge(GaugeMetric::Balance, stats.balance.to_f64().unwrap_or_default());
            }
            Transition::Released => {
                self.ledger.log(
                    LogLevel::Info,
                    format!("{} cool-down over, scanning", unit.unit.symbol),
                );
            }
        }
    }

    /// Drop units whose settlement countdown reached zero
    fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.units.len();
        let ledger = &mut self.ledger;
        self.units.retain(|unit| {
            let live = unit.countdown(now) > 0;
            if !live {
                ledger.log(LogLevel::Info, format!("{} settled, dropping", unit.unit.symbol));
            }
            live
        });
        before - self.units.len()
    }

    /// Spawn the engine loop and return a handle to it
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> (EngineHandle, JoinHandle<()>) {
        let (handle, config_rx, snapshot_tx) = self.channels();
        let task = tokio::spawn(self.run(config_rx, snapshot_tx, shutdown));
        (handle, task)
    }

    fn channels(
        &self,
    ) -> (EngineHandle, watch::Receiver<TradeConfig>, watch::Sender<Arc<Snapshot>>) {
        let (config_tx, config_rx) = watch::channel(self.trade.clone());
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::empty(
            self.trade.clone(),
            self.ledger.stats().clone(),
        )));
        let handle = EngineHandle {
            config_tx: Arc::new(config_tx),
            snapshot_rx,
            resumes: Arc::clone(&self.resumes),
        };
        (handle, config_rx, snapshot_tx)
    }

    /// Main loop: tick on the interval, apply config changes as they arrive
    pub async fn run(
        mut self,
        mut config_rx: watch::Receiver<TradeConfig>,
        snapshot_tx: watch::Sender<Arc<Snapshot>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = poll_interval(self.trade.scan_interval());
        tracing::info!(
            interval_ms = self.trade.scan_interval().as_millis() as u64,
            "Engine loop started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.step(Utc::now()).await;
                }
                changed = config_rx.changed() => {
                    if changed.is_err() {
                        tracing::info!("Engine handle dropped, stopping");
                        break;
                    }
                    let next = config_rx.borrow_and_update().clone();
                    let reschedule = next.scan_interval() != self.trade.scan_interval();
                    self.apply_live_config(next);
                    if reschedule {
                        interval = poll_interval(self.trade.scan_interval());
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Shutdown requested, stopping engine");
                    break;
                }
            }
            snapshot_tx.send_replace(Arc::new(self.snapshot(Utc::now())));
        }
    }
}

fn poll_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// One best-ask request; any failure or timeout becomes `None`
async fn quote<P: PriceSource + ?Sized>(prices: &P, token_id: &str, timeout: Duration) -> Option<Decimal> {
    let result = tokio::time::timeout(timeout, prices.best_ask(token_id))
        .await
        .unwrap_or(Err(QuoteError::Timeout));
    match result {
        Ok(price) => Some(price),
        Err(e) => {
            tracing::debug!(token_id = %token_id, error = %e, "Quote failed");
            None
        }
    }
}

/// Cloneable handle used by the status surface
#[derive(Clone)]
pub struct EngineHandle {
    config_tx: Arc<watch::Sender<TradeConfig>>,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    resumes: Arc<AtomicU64>,
}

impl EngineHandle {
    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// Live config as last written (may be ahead of the snapshot)
    pub fn trade_config(&self) -> TradeConfig {
        self.config_tx.borrow().clone()
    }

    /// Merge a partial JSON config. Returns the merged config and its
    /// warnings; the engine picks it up before its next tick.
    pub fn update_config(&self, patch: &Value) -> Result<(TradeConfig, Vec<String>), ConfigError> {
        let mut result = Ok(());
        self.config_tx.send_if_modified(|current| {
            let mut next = current.clone();
            match next.apply_patch(patch) {
                Ok(_) if next != *current => {
                    if !current.engine_active && next.engine_active {
                        self.resumes.fetch_add(1, Ordering::SeqCst);
                    }
                    *current = next;
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });
        result?;

        let config = self.trade_config();
        let warnings = config.warnings();
        Ok((config, warnings))
    }

    /// Set the engine flag, or toggle it when `enabled` is `None`.
    /// Returns the resulting flag.
    pub fn set_enabled(&self, enabled: Option<bool>) -> bool {
        let mut state = false;
        self.config_tx.send_if_modified(|current| {
            let next = enabled.unwrap_or(!current.engine_active);
            state = next;
            if current.engine_active == next {
                return false;
            }
            if next {
                self.resumes.fetch_add(1, Ordering::SeqCst);
            }
            current.engine_active = next;
            true
        });
        state
    }
}
