//! Top-level engine facade.
//!
//! [`Groundskeeper`] wires the estimator, advisor, cleaner, and chunk
//! services together and fans one `on_tick` call out to the right
//! cadences: every tick drives active batches, every 20 ticks the
//! countdowns advance and a TPS sample lands, every 100 ticks the
//! population check runs, every 600 ticks chunks are scanned. The host
//! owns the tick loop and the clock; the engine is purely reactive.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::chunk_unload::ChunkUnloadService;
use crate::chunks;
use crate::cleaner::{CleanerService, StartOutcome};
use crate::config::CleanerConfig;
use crate::events::{CleanHooks, CompletionBus, CompletionObserver};
use crate::host::Host;
use crate::selector;
use crate::threshold::{ThresholdAdvisor, TpsSeverity};
use crate::tps::{TpsEstimator, TpsWindow};

const TICKS_PER_SECOND: u64 = 20;
const SMART_CHECK_TICKS: u64 = 100;
const CHUNK_SCAN_TICKS: u64 = 600;

/// Snapshot of engine and world state for operators.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub tps: f64,
    pub tps_severity: TpsSeverity,
    pub item_countdown: i64,
    pub entity_countdown: i64,
    pub in_progress: bool,
    pub items: u32,
    pub mobs: u32,
    pub total_entities: u32,
    pub loaded_chunks: usize,
    pub unloadable_chunks: usize,
}

/// What the population check would see right now.
#[derive(Debug, Clone, Serialize)]
pub struct SmartReport {
    pub items: u32,
    pub mobs: u32,
    pub item_threshold: u32,
    pub entity_threshold: u32,
    pub tps: f64,
    pub tps_severity: TpsSeverity,
}

impl SmartReport {
    pub fn items_over(&self) -> bool {
        self.items > self.item_threshold
    }

    pub fn entities_over(&self) -> bool {
        self.mobs > self.entity_threshold
    }
}

/// The assembled cleanup engine.
pub struct Groundskeeper {
    config: Arc<CleanerConfig>,
    window: TpsWindow,
    estimator: TpsEstimator,
    advisor: ThresholdAdvisor,
    cleaner: CleanerService,
    chunks: ChunkUnloadService,
    hooks: CleanHooks,
    bus: Option<CompletionBus>,
    tick: u64,
    use_native_tps: bool,
}

impl Groundskeeper {
    pub fn new(config: CleanerConfig) -> Self {
        Self::with_observers(config, Vec::new())
    }

    /// Build the engine with completion observers already subscribed.
    pub fn with_observers(mut config: CleanerConfig, observers: Vec<CompletionObserver>) -> Self {
        config.normalize();
        let config = Arc::new(config);
        let window = TpsWindow::parse(&config.tps.sample_window);
        let advisor = ThresholdAdvisor::new(config.tps.clone());
        let cleaner = CleanerService::new(Arc::clone(&config));
        let chunks = ChunkUnloadService::new(Arc::clone(&config));
        Self {
            config,
            window,
            estimator: TpsEstimator::new(),
            advisor,
            cleaner,
            chunks,
            hooks: CleanHooks::new(),
            bus: Some(CompletionBus::spawn(observers)),
            tick: 0,
            use_native_tps: false,
        }
    }

    /// One-time capability probe against the host. Safe to skip; the
    /// engine then self-measures.
    pub fn init(&mut self, host: &dyn Host) {
        match host.native_tps() {
            Some(values) => {
                self.use_native_tps = values.len() >= 3;
                info!(
                    flavor = host.server_flavor(),
                    slots = values.len(),
                    native = self.use_native_tps,
                    "tick-rate source probed"
                );
            }
            None => {
                info!(flavor = host.server_flavor(), "self-measuring tick rate");
            }
        }
    }

    /// Advance the engine by one game tick.
    pub fn on_tick(&mut self, host: &mut dyn Host, now_ms: u64) {
        self.tick += 1;
        if let Some(bus) = &self.bus {
            self.cleaner.drive(host, bus, now_ms);
        }
        self.chunks.drive(host, &mut self.hooks, now_ms);

        if self.tick % TICKS_PER_SECOND == 0 {
            if !self.use_native_tps {
                self.estimator.sample(now_ms);
            }
            self.cleaner.on_second(host, &mut self.hooks, now_ms);
        }
        if self.tick % SMART_CHECK_TICKS == 0 {
            let tps = self.current_tps(&*host);
            self.cleaner
                .smart_check(host, &mut self.hooks, &self.advisor, tps, now_ms);
        }
        if self.tick % CHUNK_SCAN_TICKS == 0 {
            self.chunks.scan(host, &self.cleaner.rules().world_blacklist);
        }
    }

    /// Current TPS reading: 20.0 when adaptive mode is off, otherwise
    /// the native averages or the self-measured window.
    pub fn current_tps(&self, host: &dyn Host) -> f64 {
        if !self.config.tps.adaptive_enabled {
            return 20.0;
        }
        if self.use_native_tps {
            let native = host.native_tps();
            self.estimator.current_tps(self.window, native.as_deref())
        } else {
            self.estimator.window_average(self.window)
        }
    }

    /// Swap in a new configuration.
    pub fn reload(&mut self, mut config: CleanerConfig) {
        config.normalize();
        let config = Arc::new(config);
        self.window = TpsWindow::parse(&config.tps.sample_window);
        self.advisor = ThresholdAdvisor::new(config.tps.clone());
        self.cleaner.reload(Arc::clone(&config));
        self.chunks.reload(Arc::clone(&config));
        self.config = config;
        info!("configuration reloaded");
    }

    /// Abandon in-flight work and flush the completion dispatcher.
    /// The engine accepts no further completion events afterwards.
    pub fn shutdown(&mut self) {
        self.cleaner.abort();
        self.chunks.abort();
        // Dropping the bus joins the dispatcher thread, delivering
        // anything still queued.
        self.bus = None;
        info!("cleanup engine stopped");
    }

    /// Register observers on the veto hooks.
    pub fn hooks_mut(&mut self) -> &mut CleanHooks {
        &mut self.hooks
    }

    pub fn in_progress(&self) -> bool {
        self.cleaner.in_progress()
    }

    pub fn force_items(&mut self, host: &mut dyn Host, now_ms: u64) -> StartOutcome {
        self.cleaner.force_items(host, &mut self.hooks, now_ms)
    }

    pub fn force_entities(&mut self, host: &mut dyn Host, now_ms: u64) -> StartOutcome {
        self.cleaner.force_entities(host, &mut self.hooks, now_ms)
    }

    pub fn force_chunks(&mut self, host: &mut dyn Host) -> u32 {
        self.chunks
            .force_unload(host, &mut self.hooks, &self.cleaner.rules().world_blacklist)
    }

    /// Evaluate the population check without firing it.
    pub fn smart_report(&self, host: &dyn Host) -> SmartReport {
        let tps = self.current_tps(host);
        let counts = selector::population_counts(host, self.cleaner.rules(), true);
        SmartReport {
            items: counts.items,
            mobs: counts.mobs,
            item_threshold: self.advisor.apply_to(self.config.smart.item_threshold, tps),
            entity_threshold: self
                .advisor
                .apply_to(self.config.smart.entity_threshold, tps),
            tps,
            tps_severity: self.advisor.severity_for(tps),
        }
    }

    pub fn status(&self, host: &dyn Host) -> StatusReport {
        let tps = self.current_tps(host);
        let counts = selector::population_counts(host, self.cleaner.rules(), false);
        StatusReport {
            tps,
            tps_severity: self.advisor.severity_for(tps),
            item_countdown: self.cleaner.item_countdown(),
            entity_countdown: self.cleaner.entity_countdown(),
            in_progress: self.cleaner.in_progress(),
            items: counts.items,
            mobs: counts.mobs,
            total_entities: counts.total_entities,
            loaded_chunks: chunks::loaded_chunk_count(host),
            unloadable_chunks: chunks::unloadable_chunks(
                host,
                &self.config.chunk,
                &self.cleaner.rules().world_blacklist,
            )
            .len(),
        }
    }

    /// One-line TPS status, e.g. `19.87 (Normal)`.
    pub fn tps_status_line(&self, host: &dyn Host) -> String {
        self.advisor.status_line(self.current_tps(host))
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}
