//! Configuration types for poly-edge
//!
//! Two layers live here: the static [`Config`] read from TOML at startup, and
//! the live [`TradeConfig`] that the status surface can patch while the engine
//! runs. Every field has a default so a partial (or missing) file still yields
//! a usable configuration.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::market::CatalogOrder;
use crate::pairing::PairingRules;

/// Shortest poll interval the scheduler will honour
const MIN_SCAN_INTERVAL_MS: u64 = 100;

/// Widest discovery window accepted (ten years)
pub const MAX_WINDOW_MINUTES: u64 = 10 * 365 * 24 * 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config patch must be a JSON object, got {0}")]
    InvalidPatch(&'static str),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub trade: TradeConfig,
    pub strategy: StrategyConfig,
    pub pairing: PairingRules,
    pub catalog: CatalogConfig,
    pub clob: ClobConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Operator-tunable parameters, patchable at runtime.
///
/// Serialized in camelCase because this is what the display client reads and
/// writes. Input accepts either the snake_case or the camelCase names.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct TradeConfig {
    /// Poll interval in milliseconds
    #[serde(alias = "scanIntervalMs")]
    pub scan_interval_ms: u64,
    /// Leg-1 trigger: percentage drop between consecutive polls
    #[serde(alias = "dropThreshold", serialize_with = "rust_decimal::serde::float::serialize")]
    pub drop_threshold: Decimal,
    /// Hedge ceiling: maximum combined cost of both legs
    #[serde(alias = "sumTarget", serialize_with = "rust_decimal::serde::float::serialize")]
    pub sum_target: Decimal,
    /// Simulated size per leg
    #[serde(alias = "betAmount", serialize_with = "rust_decimal::serde::float::serialize")]
    pub bet_amount: Decimal,
    /// Allow the state machine to fire simulated fills
    #[serde(alias = "autoBet")]
    pub auto_bet: bool,
    /// Engine enabled flag; when false ticks are skipped
    #[serde(alias = "engineActive")]
    pub engine_active: bool,
    /// Discovery window: max minutes until settlement
    #[serde(alias = "windowMinutes")]
    pub window_minutes: u64,
    /// Minimum market liquidity (USD) for discovery
    #[serde(alias = "minLiquidity", serialize_with = "rust_decimal::serde::float::serialize")]
    pub min_liquidity: Decimal,
    /// Post-lock cool-down in seconds
    #[serde(alias = "cooldownSecs")]
    pub cooldown_secs: u64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 2000,
            drop_threshold: dec!(3),
            sum_target: dec!(0.985),
            bet_amount: dec!(10),
            auto_bet: true,
            engine_active: true,
            window_minutes: 1440,
            min_liquidity: Decimal::ZERO,
            cooldown_secs: 30,
        }
    }
}

impl TradeConfig {
    /// Poll interval, floored so a zeroed value cannot spin the scheduler
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(MIN_SCAN_INTERVAL_MS))
    }

    /// Post-lock cool-down
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Discovery window as a chrono duration
    pub fn window(&self) -> chrono::Duration {
        let minutes = self.window_minutes.min(MAX_WINDOW_MINUTES) as i64;
        chrono::Duration::try_minutes(minutes).unwrap_or(chrono::Duration::MAX)
    }

    /// Settings that are accepted but can never produce a profitable lock
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.sum_target >= Decimal::ONE {
            warnings.push(format!(
                "sumTarget {} >= 1.0: hedges would lock at a loss",
                self.sum_target
            ));
        }
        if self.sum_target <= Decimal::ZERO {
            warnings.push(format!("sumTarget {} <= 0: no hedge can ever lock", self.sum_target));
        }
        if self.drop_threshold <= Decimal::ZERO {
            warnings.push(format!(
                "dropThreshold {} <= 0: every poll will trigger leg 1",
                self.drop_threshold
            ));
        }
        if self.bet_amount <= Decimal::ZERO {
            warnings.push(format!("betAmount {} <= 0: fills carry no size", self.bet_amount));
        }
        if self.scan_interval_ms < MIN_SCAN_INTERVAL_MS {
            warnings.push(format!(
                "scanIntervalMs {} below minimum, using {}",
                self.scan_interval_ms, MIN_SCAN_INTERVAL_MS
            ));
        }
        warnings
    }

    /// Merge a partial JSON object into this config.
    ///
    /// Keys are accepted in camelCase or snake_case, unknown keys are ignored
    /// and numeric values that cannot be read are coerced to 0. Returns the
    /// names of the fields that were present in the patch.
    pub fn apply_patch(&mut self, patch: &Value) -> Result<Vec<&'static str>, ConfigError> {
        let object = match patch {
            Value::Object(map) => map,
            Value::Null => return Err(ConfigError::InvalidPatch("null")),
            Value::Bool(_) => return Err(ConfigError::InvalidPatch("bool")),
            Value::Number(_) => return Err(ConfigError::InvalidPatch("number")),
            Value::String(_) => return Err(ConfigError::InvalidPatch("string")),
            Value::Array(_) => return Err(ConfigError::InvalidPatch("array")),
        };

        let mut applied = Vec::new();
        for (key, value) in object {
            let field = match key.as_str() {
                "scanIntervalMs" | "scan_interval_ms" => {
                    self.scan_interval_ms = coerce_u64(value);
                    "scanIntervalMs"
                }
                "dropThreshold" | "drop_threshold" | "movePct" => {
                    self.drop_threshold = coerce_decimal(value);
                    "dropThreshold"
                }
                "sumTarget" | "sum_target" => {
                    self.sum_target = coerce_decimal(value);
                    "sumTarget"
                }
                "betAmount" | "bet_amount" => {
                    self.bet_amount = coerce_decimal(value);
                    "betAmount"
                }
                "autoBet" | "auto_bet" => {
                    self.auto_bet = coerce_bool(value);
                    "autoBet"
                }
                "engineActive" | "engine_active" => {
                    self.engine_active = coerce_bool(value);
                    "engineActive"
                }
                "windowMinutes" | "window_minutes" | "windowMin" => {
                    self.window_minutes = coerce_u64(value).min(MAX_WINDOW_MINUTES);
                    "windowMinutes"
                }
                "minLiquidity" | "min_liquidity" => {
                    self.min_liquidity = coerce_decimal(value);
                    "minLiquidity"
                }
                "cooldownSecs" | "cooldown_secs" => {
                    self.cooldown_secs = coerce_u64(value);
                    "cooldownSecs"
                }
                _ => continue,
            };
            applied.push(field);
        }
        Ok(applied)
    }

    /// Names of the fields that differ between two configs
    pub fn diff(&self, other: &TradeConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.scan_interval_ms != other.scan_interval_ms {
            changed.push("scanIntervalMs");
        }
        if self.drop_threshold != other.drop_threshold {
            changed.push("dropThreshold");
        }
        if self.sum_target != other.sum_target {
            changed.push("sumTarget");
        }
        if self.bet_amount != other.bet_amount {
            changed.push("betAmount");
        }
        if self.auto_bet != other.auto_bet {
            changed.push("autoBet");
        }
        if self.engine_active != other.engine_active {
            changed.push("engineActive");
        }
        if self.window_minutes != other.window_minutes {
            changed.push("windowMinutes");
        }
        if self.min_liquidity != other.min_liquidity {
            changed.push("minLiquidity");
        }
        if self.cooldown_secs != other.cooldown_secs {
            changed.push("cooldownSecs");
        }
        changed
    }
}

/// Read a JSON number or numeric string as a decimal
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => {
            let trimmed = s.trim();
            Decimal::from_str(trimmed)
                .ok()
                .or_else(|| Decimal::from_scientific(trimmed).ok())
        }
        _ => None,
    }
}

fn coerce_decimal(value: &Value) -> Decimal {
    decimal_from_json(value).unwrap_or(Decimal::ZERO)
}

fn coerce_u64(value: &Value) -> u64 {
    use rust_decimal::prelude::ToPrimitive;

    decimal_from_json(value)
        .filter(|d| d.is_sign_positive())
        .and_then(|d| d.trunc().to_u64())
        .unwrap_or(0)
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(_) => decimal_from_json(value).is_some_and(|d| !d.is_zero()),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on"),
        _ => false,
    }
}

/// Fixed strategy limits, read once at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Ring-buffer capacity of each leg's price history
    pub history_capacity: usize,
    /// Leg-1 fills are refused at or below this price
    pub min_entry_price: Decimal,
    /// Leg-1 fills are refused at or above this price
    pub max_entry_price: Decimal,
    /// Per-request quote timeout in milliseconds
    pub quote_timeout_ms: u64,
    /// Catalog refresh cadence, in poll ticks
    pub refresh_every_ticks: u32,
    /// Retained orders (most recent first)
    pub order_capacity: usize,
    /// Retained log entries (oldest evicted first)
    pub log_capacity: usize,
    /// Simulated starting balance
    pub initial_balance: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            min_entry_price: dec!(0.02),
            max_entry_price: dec!(0.98),
            quote_timeout_ms: 2000,
            refresh_every_ticks: 10,
            order_capacity: 50,
            log_capacity: 100,
            initial_balance: dec!(5000),
        }
    }
}

impl StrategyConfig {
    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }
}

/// Market catalog (Gamma API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Maximum markets fetched per refresh
    pub limit: usize,
    pub order: CatalogOrder,
    /// Asset keywords (e.g. "btc", "ethereum"); empty means all markets
    pub assets: Vec<String>,
    /// Minimum 24h volume (USD)
    pub min_volume_24h: Decimal,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: crate::market::GAMMA_API_URL.to_string(),
            limit: 200,
            order: CatalogOrder::Volume24hr,
            assets: Vec::new(),
            min_volume_24h: Decimal::ZERO,
            timeout_secs: 10,
        }
    }
}

/// Order-book (CLOB REST) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClobConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClobConfig {
    fn default() -> Self {
        Self {
            base_url: crate::orderbook::CLOB_API_URL.to_string(),
            timeout_ms: 2000,
        }
    }
}

/// Status surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            enable_cors: true,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: crate::telemetry::LogFormat,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: crate::telemetry::LogFormat::Pretty,
            metrics_port: None,
        }
    }
}
