//! Prometheus metrics
//!
//! Recorded through the `metrics` facade. Without an installed recorder every
//! call is a no-op, so tests and the one-shot CLI commands pay nothing.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Engine ticks executed
    Ticks,
    /// Best-ask requests that failed or timed out
    QuoteFailures,
    /// Catalog refreshes that failed
    CatalogFailures,
    /// Simulated fills
    Orders,
    /// Hedges locked
    HedgesLocked,
    /// Ticks aborted by a panic
    TickPanics,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Units currently tracked
    TrackedUnits,
    /// Cumulative simulated P&L
    NetProfit,
    /// Simulated balance
    Balance,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Full engine tick (discovery + polling + state machine)
    Tick,
    /// Catalog refresh round trip
    Catalog,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::Ticks => "polyedge_ticks_total",
            CounterMetric::QuoteFailures => "polyedge_quote_failures_total",
            CounterMetric::CatalogFailures => "polyedge_catalog_failures_total",
            CounterMetric::Orders => "polyedge_orders_total",
            CounterMetric::HedgesLocked => "polyedge_hedges_locked_total",
            CounterMetric::TickPanics => "polyedge_tick_panics_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::TrackedUnits => "polyedge_tracked_units",
            GaugeMetric::NetProfit => "polyedge_net_profit_usd",
            GaugeMetric::Balance => "polyedge_balance_usd",
        }
    }
}

impl LatencyMetric {
    fn name(self) -> &'static str {
        match self {
            LatencyMetric::Tick => "polyedge_tick_duration_ms",
            LatencyMetric::Catalog => "polyedge_catalog_duration_ms",
        }
    }
}

/// Install the Prometheus recorder and its scrape endpoint
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    tracing::info!(addr = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Increment a counter
pub fn increment(metric: CounterMetric, value: u64) {
    metrics::counter!(metric.name()).increment(value);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    metrics::histogram!(metric.name()).record(duration.as_secs_f64() * 1000.0);
}
