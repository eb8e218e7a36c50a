//! Arbitrage engine
//!
//! Tracked units, their per-leg price histories, the drop/hedge state machine
//! and the scheduler that polls prices and publishes snapshots.

mod scheduler;
mod snapshot;
mod state_machine;
mod types;

pub use scheduler::{Engine, EngineHandle, EngineSettings, TickReport};
pub use snapshot::{LegView, RoundView, Snapshot};
pub use state_machine::{drop_pct, hedge_profit, StrategyParams, Transition};
pub use types::{Leg1Fill, PriceHistory, Side, TrackedUnit, UnitState, DEFAULT_ASK};
