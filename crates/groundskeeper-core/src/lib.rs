//! groundskeeper-core: Core library for Groundskeeper
//!
//! This crate implements an adaptive cleanup scheduler for tick-driven
//! game servers: periodic removal of dropped items and hostile mobs,
//! idle-chunk unloading, and population-triggered early cleanups whose
//! thresholds scale with measured server health.
//!
//! # Architecture
//!
//! ```text
//! Host tick loop → Groundskeeper::on_tick
//!       every tick: drive active batch / chunk sweep
//!       every 20:   TPS sample + countdowns (CleanerService)
//!       every 100:  population check (ThresholdAdvisor + selectors)
//!       every 600:  idle-chunk scan (ChunkUnloadService)
//! ```
//!
//! The game server is reached exclusively through the [`host::Host`]
//! trait; [`simulation::SimHost`] is the in-memory implementation used
//! by the tests and the `gk` CLI.
//!
//! # Modules
//!
//! - `host`: the server seam (snapshots, removal, unload requests)
//! - `config`: TOML configuration with defaults and clamping
//! - `tps`: self-measured tick-rate histories
//! - `threshold`: health-scaled threshold policy
//! - `selector`: item/entity candidate filters
//! - `chunks`: idle-chunk selection
//! - `batch`: tick-budgeted batch removal
//! - `cleaner`: countdowns, smart check, batch orchestration
//! - `chunk_unload`: chunk unload sweeps
//! - `events`: veto hooks and the completion bus
//! - `plugin`: the assembled engine
//! - `commands`: operator command surface
//! - `simulation`: deterministic in-memory host
//! - `logging`: tracing setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod batch;
pub mod chunk_unload;
pub mod chunks;
pub mod cleaner;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod selector;
pub mod simulation;
pub mod threshold;
pub mod tps;

pub use batch::{BatchRun, BatchTick};
pub use cleaner::{CleanerService, StartOutcome};
pub use commands::CleanCommand;
pub use config::CleanerConfig;
pub use error::{Error, Result};
pub use events::{
    CleanCompleteEvent, CleanHooks, CleanKind, CleanTrigger, CompletionBus, PreChunkUnloadEvent,
    PreCleanEvent, UnloadReason,
};
pub use host::{ChunkPos, EntityId, EntityKind, Host};
pub use plugin::{Groundskeeper, StatusReport};
pub use simulation::SimHost;
pub use threshold::{ThresholdAdvisor, TpsSeverity};
pub use tps::{TpsEstimator, TpsWindow};

/// Library version, from Cargo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_set() {
        assert!(!super::VERSION.is_empty());
    }
}
