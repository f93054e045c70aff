//! Cleanup orchestration for items and entities.
//!
//! Owns the per-category countdowns, the smart population check, and
//! the single active batch slot. Items and entities share that slot:
//! while one batch is draining, any other start request is refused.
//! All timing arrives from the caller as tick cadences and a
//! millisecond clock, so the service itself never reads wall time.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::batch::{BatchRun, BatchTick};
use crate::config::{CleanerConfig, RuleCache};
use crate::events::{
    CleanCompleteEvent, CleanHooks, CleanKind, CleanTrigger, CompletionBus, PreCleanEvent,
};
use crate::host::Host;
use crate::selector;
use crate::threshold::{ThresholdAdvisor, TpsSeverity};

/// Result of asking for a new cleanup batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A batch was created with this many candidates.
    Started { candidates: usize },
    /// Nothing matched the filters (or observers removed everything).
    Empty,
    /// An observer vetoed the cleanup.
    Cancelled,
    /// Another batch is already draining.
    Busy,
}

struct ActiveRun {
    kind: CleanKind,
    trigger: CleanTrigger,
    run: BatchRun,
}

/// Scheduler and executor state for item and entity cleanup.
pub struct CleanerService {
    config: Arc<CleanerConfig>,
    cache: RuleCache,
    item_countdown: i64,
    entity_countdown: i64,
    last_smart_ms: Option<u64>,
    active: Option<ActiveRun>,
}

impl CleanerService {
    pub fn new(config: Arc<CleanerConfig>) -> Self {
        let cache = RuleCache::build(&config);
        let item_countdown = i64::from(config.item.interval);
        let entity_countdown = i64::from(config.entity.interval);
        Self {
            config,
            cache,
            item_countdown,
            entity_countdown,
            last_smart_ms: None,
            active: None,
        }
    }

    /// Abandon the in-flight batch, if any. Nothing further is removed
    /// and no completion event fires.
    pub fn abort(&mut self) {
        if self.active.take().is_some() {
            info!("abandoning an in-flight cleanup batch");
        }
    }

    /// Swap in a new config. Countdowns restart from the new intervals
    /// and an in-flight batch, if any, is abandoned.
    pub fn reload(&mut self, config: Arc<CleanerConfig>) {
        self.abort();
        self.cache = RuleCache::build(&config);
        self.item_countdown = i64::from(config.item.interval);
        self.entity_countdown = i64::from(config.entity.interval);
        self.last_smart_ms = None;
        self.config = config;
    }

    /// Advance both countdowns by one second of game time. Disabled
    /// categories freeze rather than count down.
    pub fn on_second(&mut self, host: &mut dyn Host, hooks: &mut CleanHooks, now_ms: u64) {
        if self.config.item.enabled {
            self.item_countdown -= 1;
            self.warn_if_due(host, CleanKind::Items, self.item_countdown);
            if self.item_countdown <= 0 {
                self.start(host, hooks, CleanKind::Items, CleanTrigger::Scheduled, now_ms);
                self.item_countdown = i64::from(self.config.item.interval);
            }
        }
        if self.config.entity.enabled {
            self.entity_countdown -= 1;
            self.warn_if_due(host, CleanKind::Entities, self.entity_countdown);
            if self.entity_countdown <= 0 {
                self.start(
                    host,
                    hooks,
                    CleanKind::Entities,
                    CleanTrigger::Scheduled,
                    now_ms,
                );
                self.entity_countdown = i64::from(self.config.entity.interval);
            }
        }
    }

    fn warn_if_due(&self, host: &mut dyn Host, kind: CleanKind, countdown: i64) {
        let Ok(seconds) = u32::try_from(countdown) else {
            return;
        };
        let (warn_times, template) = match kind {
            CleanKind::Items => (&self.config.item.warn_times, &self.config.messages.item_warn),
            CleanKind::Entities => (
                &self.config.entity.warn_times,
                &self.config.messages.entity_warn,
            ),
            CleanKind::Chunks => return,
        };
        if warn_times.contains(&seconds) {
            host.broadcast(&self.config.messages.render_warn(template, seconds));
        }
    }

    /// Population check, run every five seconds of game time. Either
    /// category exceeding its health-scaled threshold starts an early
    /// cleanup and arms the shared cooldown.
    pub fn smart_check(
        &mut self,
        host: &mut dyn Host,
        hooks: &mut CleanHooks,
        advisor: &ThresholdAdvisor,
        tps: f64,
        now_ms: u64,
    ) {
        if !self.config.smart.enabled || self.active.is_some() {
            return;
        }
        if let Some(last) = self.last_smart_ms {
            let cooldown_ms = u64::from(self.config.smart.cooldown) * 1000;
            if now_ms.saturating_sub(last) < cooldown_ms {
                return;
            }
        }

        let item_threshold = advisor.apply_to(self.config.smart.item_threshold, tps);
        let entity_threshold = advisor.apply_to(self.config.smart.entity_threshold, tps);
        let counts = selector::population_counts(host, &self.cache, true);
        let items_over = counts.items > item_threshold;
        let entities_over = counts.mobs > entity_threshold;
        if !items_over && !entities_over {
            return;
        }

        self.last_smart_ms = Some(now_ms);
        if advisor.severity_for(tps) != TpsSeverity::Normal {
            info!(
                tps = %advisor.status_line(tps),
                item_threshold,
                entity_threshold,
                "smart thresholds reduced for degraded tick rate"
            );
        }
        info!(
            items = counts.items,
            mobs = counts.mobs,
            item_threshold,
            entity_threshold,
            "population threshold exceeded, starting early cleanup"
        );
        host.broadcast(&self.config.messages.smart_triggered.clone());

        if items_over {
            self.start(host, hooks, CleanKind::Items, CleanTrigger::Smart, now_ms);
        }
        if entities_over {
            // Refused when the item batch above claimed the slot; the
            // next smart check picks entities up once it drains.
            self.start(host, hooks, CleanKind::Entities, CleanTrigger::Smart, now_ms);
        }
    }

    /// Begin a cleanup batch for one category.
    pub fn start(
        &mut self,
        host: &mut dyn Host,
        hooks: &mut CleanHooks,
        kind: CleanKind,
        trigger: CleanTrigger,
        now_ms: u64,
    ) -> StartOutcome {
        if self.active.is_some() {
            debug!(?kind, ?trigger, "cleanup already in progress, refusing start");
            return StartOutcome::Busy;
        }

        let (ids, type_counts) = match kind {
            CleanKind::Items => (
                selector::item_candidates(host, &self.config, &self.cache),
                BTreeMap::new(),
            ),
            CleanKind::Entities => selector::entity_candidates(host, &self.config, &self.cache),
            CleanKind::Chunks => return StartOutcome::Empty,
        };

        let mut event = PreCleanEvent::new(kind, trigger, ids, type_counts);
        hooks.fire_pre_clean(&mut event);
        if event.is_cancelled() {
            info!(?kind, ?trigger, "cleanup cancelled by observer");
            host.broadcast(&self.config.messages.clean_cancelled.clone());
            return StartOutcome::Cancelled;
        }

        let ids = event.ids;
        if ids.is_empty() {
            // Item sweeps announce an empty result; entity sweeps stay quiet.
            if kind == CleanKind::Items {
                let message = self
                    .config
                    .messages
                    .render_count(&self.config.messages.item_cleaned, 0);
                host.broadcast(&message);
            }
            return StartOutcome::Empty;
        }

        let candidates = ids.len();
        info!(?kind, ?trigger, candidates, "starting cleanup batch");
        self.active = Some(ActiveRun {
            kind,
            trigger,
            run: BatchRun::new(ids, self.config.batch.size, now_ms),
        });
        StartOutcome::Started { candidates }
    }

    /// Drive the active batch one tick, if there is one.
    pub fn drive(&mut self, host: &mut dyn Host, bus: &CompletionBus, now_ms: u64) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        match active.run.tick(host) {
            BatchTick::Progress { current, total } => {
                if self.config.batch.show_progress {
                    host.notify_ops(&self.config.messages.render_progress(current, total));
                }
            }
            BatchTick::Done { removed } => {
                let kind = active.kind;
                let trigger = active.trigger;
                let duration_ms = now_ms.saturating_sub(active.run.started_ms());
                self.active = None;
                self.finish(host, bus, kind, trigger, removed, duration_ms);
            }
        }
    }

    fn finish(
        &self,
        host: &mut dyn Host,
        bus: &CompletionBus,
        kind: CleanKind,
        trigger: CleanTrigger,
        removed: u32,
        duration_ms: u64,
    ) {
        let messages = &self.config.messages;
        match kind {
            CleanKind::Items => {
                host.broadcast(&messages.render_count(&messages.item_cleaned, removed));
            }
            CleanKind::Entities if removed > 0 => {
                host.broadcast(&messages.render_count(&messages.entity_cleaned, removed));
            }
            _ => {}
        }
        let event = CleanCompleteEvent {
            kind,
            trigger,
            count: removed,
            duration_ms,
        };
        info!(?kind, ?trigger, removed, duration_ms, "cleanup batch finished");
        bus.publish(event);
    }

    /// Manual item cleanup; restarts the scheduled countdown.
    pub fn force_items(
        &mut self,
        host: &mut dyn Host,
        hooks: &mut CleanHooks,
        now_ms: u64,
    ) -> StartOutcome {
        let outcome = self.start(host, hooks, CleanKind::Items, CleanTrigger::Manual, now_ms);
        self.item_countdown = i64::from(self.config.item.interval);
        outcome
    }

    /// Manual entity cleanup; restarts the scheduled countdown.
    pub fn force_entities(
        &mut self,
        host: &mut dyn Host,
        hooks: &mut CleanHooks,
        now_ms: u64,
    ) -> StartOutcome {
        let outcome = self.start(host, hooks, CleanKind::Entities, CleanTrigger::Manual, now_ms);
        self.entity_countdown = i64::from(self.config.entity.interval);
        outcome
    }

    pub fn in_progress(&self) -> bool {
        self.active.is_some()
    }

    /// Seconds until the next scheduled item cleanup.
    pub fn item_countdown(&self) -> i64 {
        self.item_countdown
    }

    /// Seconds until the next scheduled entity cleanup.
    pub fn entity_countdown(&self) -> i64 {
        self.entity_countdown
    }

    pub fn rules(&self) -> &RuleCache {
        &self.cache
    }
}
