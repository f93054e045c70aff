//! Idle-chunk unload sweeps.
//!
//! A sweep freezes the candidate list, then drains it a few chunks per
//! tick. Each chunk is re-checked against fresh host state and offered
//! to observers before the unload request goes out. Requests resolve
//! asynchronously; a pending request that outlives its deadline counts
//! as failed and is dropped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chunks;
use crate::config::CleanerConfig;
use crate::events::{CleanHooks, PreChunkUnloadEvent, UnloadReason};
use crate::host::{ChunkPos, Host, UnloadTicket};

struct PendingUnload {
    ticket: UnloadTicket,
    pos: ChunkPos,
    deadline_ms: u64,
}

/// Sweep state for chunk unloading, independent of the item/entity
/// batch slot.
pub struct ChunkUnloadService {
    config: Arc<CleanerConfig>,
    queue: Vec<ChunkPos>,
    cursor: usize,
    sweeping: bool,
    unloaded: u32,
    failed: u32,
    pending: Vec<PendingUnload>,
}

impl ChunkUnloadService {
    pub fn new(config: Arc<CleanerConfig>) -> Self {
        Self {
            config,
            queue: Vec::new(),
            cursor: 0,
            sweeping: false,
            unloaded: 0,
            failed: 0,
            pending: Vec::new(),
        }
    }

    /// Abandon the in-flight sweep, if any. Pending unload requests
    /// keep their original deadlines.
    pub fn abort(&mut self) {
        if self.sweeping {
            info!("abandoning an in-flight chunk sweep");
        }
        self.queue.clear();
        self.cursor = 0;
        self.sweeping = false;
        self.unloaded = 0;
        self.failed = 0;
    }

    /// Swap in a new config. An in-flight sweep is abandoned.
    pub fn reload(&mut self, config: Arc<CleanerConfig>) {
        self.abort();
        self.config = config;
    }

    /// Scan for unloadable chunks and begin a sweep. Runs on the slow
    /// cadence (every 30 seconds of game time); a sweep still draining
    /// is left alone.
    pub fn scan(&mut self, host: &dyn Host, world_blacklist: &std::collections::HashSet<String>) {
        if !self.config.chunk.enabled || self.sweeping {
            return;
        }
        let found = chunks::unloadable_chunks(host, &self.config.chunk, world_blacklist);
        if found.is_empty() {
            return;
        }
        debug!(candidates = found.len(), "starting chunk unload sweep");
        self.queue = found;
        self.cursor = 0;
        self.sweeping = true;
        self.unloaded = 0;
        self.failed = 0;
    }

    /// Drive the sweep one tick: issue up to `batch_size` unload
    /// requests, then resolve pending requests. Call every tick.
    pub fn drive(&mut self, host: &mut dyn Host, hooks: &mut CleanHooks, now_ms: u64) {
        if self.sweeping {
            self.issue_slice(host, hooks, now_ms);
        }
        self.poll_pending(host, now_ms);
        if !self.sweeping && self.cursor > 0 && self.pending.is_empty() {
            self.report(host);
        }
    }

    fn issue_slice(&mut self, host: &mut dyn Host, hooks: &mut CleanHooks, now_ms: u64) {
        let quota = self.config.chunk.batch_size.max(1) as usize;
        let end = (self.cursor + quota).min(self.queue.len());
        let timeout_ms = u64::from(self.config.chunk.unload_timeout) * 1000;
        while self.cursor < end {
            let pos = self.queue[self.cursor].clone();
            self.cursor += 1;

            // State may have moved since the scan; re-check before asking.
            let still_safe = host
                .chunk_state(&pos)
                .is_some_and(|state| chunks::is_safe_to_unload(&state));
            if !still_safe {
                debug!(%pos, "chunk no longer unloadable, skipping");
                continue;
            }

            let mut event = PreChunkUnloadEvent::new(pos.clone(), UnloadReason::Distance);
            hooks.fire_pre_chunk_unload(&mut event);
            if event.is_cancelled() {
                debug!(%pos, "chunk unload vetoed by observer");
                continue;
            }

            let ticket = host.request_chunk_unload(&pos);
            self.pending.push(PendingUnload {
                ticket,
                pos,
                deadline_ms: now_ms + timeout_ms,
            });
        }
        if self.cursor >= self.queue.len() {
            self.sweeping = false;
        }
    }

    fn poll_pending(&mut self, host: &mut dyn Host, now_ms: u64) {
        let mut unloaded = 0;
        let mut failed = 0;
        self.pending.retain_mut(|pending| match host.poll_unload(pending.ticket) {
            Some(true) => {
                unloaded += 1;
                false
            }
            Some(false) => {
                warn!(pos = %pending.pos, "chunk unload refused by host");
                failed += 1;
                false
            }
            None if now_ms >= pending.deadline_ms => {
                warn!(pos = %pending.pos, "chunk unload timed out");
                failed += 1;
                false
            }
            None => true,
        });
        self.unloaded += unloaded;
        self.failed += failed;
    }

    fn report(&mut self, host: &mut dyn Host) {
        if self.unloaded > 0 {
            info!(
                unloaded = self.unloaded,
                failed = self.failed,
                "chunk unload sweep finished"
            );
            if self.config.chunk.show_progress {
                let message = self
                    .config
                    .messages
                    .render_count(&self.config.messages.chunk_unloaded, self.unloaded);
                host.notify_ops(&message);
            }
        }
        self.cursor = 0;
        self.queue.clear();
        self.unloaded = 0;
        self.failed = 0;
    }

    /// Synchronous manual sweep: unload everything currently eligible,
    /// ignoring the enabled flag. Returns the number unloaded.
    pub fn force_unload(
        &mut self,
        host: &mut dyn Host,
        hooks: &mut CleanHooks,
        world_blacklist: &std::collections::HashSet<String>,
    ) -> u32 {
        let found = chunks::unloadable_chunks(host, &self.config.chunk, world_blacklist);
        let mut unloaded = 0;
        for pos in found {
            let mut event = PreChunkUnloadEvent::new(pos.clone(), UnloadReason::Manual);
            hooks.fire_pre_chunk_unload(&mut event);
            if event.is_cancelled() {
                continue;
            }
            if host.unload_chunk(&pos) {
                unloaded += 1;
            }
        }
        info!(unloaded, "manual chunk unload finished");
        unloaded
    }

    /// Whether a sweep is issuing requests or awaiting confirmations.
    pub fn busy(&self) -> bool {
        self.sweeping || !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ChunkSnapshot;
    use crate::simulation::SimHost;
    use std::collections::HashSet;

    fn idle(x: i32, z: i32) -> ChunkSnapshot {
        ChunkSnapshot {
            x,
            z,
            force_kept: false,
            in_use: false,
            entities_loaded: true,
            has_player: false,
        }
    }

    fn service(mutate: impl FnOnce(&mut CleanerConfig)) -> ChunkUnloadService {
        let mut config = CleanerConfig::default();
        config.chunk.enabled = true;
        mutate(&mut config);
        ChunkUnloadService::new(Arc::new(config))
    }

    fn grid_host(chunks: i32) -> SimHost {
        let mut host = SimHost::new();
        host.add_world("world");
        for x in 0..chunks {
            host.add_chunk("world", idle(x * 100, 0));
        }
        host
    }

    #[test]
    fn sweep_drains_in_slices_and_confirms() {
        let mut service = service(|c| c.chunk.batch_size = 2);
        let mut host = grid_host(5);
        let mut hooks = CleanHooks::new();
        let blacklist = HashSet::new();

        service.scan(&host, &blacklist);
        assert!(service.busy());
        let mut now = 0;
        for _ in 0..10 {
            now += 50;
            service.drive(&mut host, &mut hooks, now);
        }
        assert!(!service.busy());
        assert_eq!(chunks::loaded_chunk_count(&host), 0);
    }

    #[test]
    fn disabled_service_never_scans() {
        let mut service = service(|c| c.chunk.enabled = false);
        let host = grid_host(3);
        service.scan(&host, &HashSet::new());
        assert!(!service.busy());
    }

    #[test]
    fn chunk_revalidated_before_request() {
        let mut service = service(|_| {});
        let mut host = grid_host(2);
        let mut hooks = CleanHooks::new();
        service.scan(&host, &HashSet::new());
        // A player walks into the first chunk between scan and drain.
        host.add_player("world", 0, 0, false);
        service.drive(&mut host, &mut hooks, 50);
        service.drive(&mut host, &mut hooks, 100);
        assert_eq!(chunks::loaded_chunk_count(&host), 1);
    }

    #[test]
    fn observer_can_veto_an_unload() {
        let mut service = service(|_| {});
        let mut host = grid_host(1);
        let mut hooks = CleanHooks::new();
        hooks.on_pre_chunk_unload(Box::new(|event| event.set_cancelled(true)));
        service.scan(&host, &HashSet::new());
        service.drive(&mut host, &mut hooks, 50);
        service.drive(&mut host, &mut hooks, 100);
        assert_eq!(chunks::loaded_chunk_count(&host), 1);
    }

    #[test]
    fn timed_out_request_counts_as_failed() {
        let mut service = service(|c| c.chunk.unload_timeout = 1);
        let mut host = grid_host(1);
        host.fail_unloads(true);
        let mut hooks = CleanHooks::new();
        service.scan(&host, &HashSet::new());
        service.drive(&mut host, &mut hooks, 0);
        assert!(service.busy());
        // Past the one-second deadline the request is abandoned.
        service.drive(&mut host, &mut hooks, 1_500);
        assert!(!service.busy());
        assert_eq!(chunks::loaded_chunk_count(&host), 1);
    }

    #[test]
    fn operators_hear_about_finished_sweeps() {
        let mut service = service(|c| c.chunk.show_progress = true);
        let mut host = grid_host(3);
        let mut hooks = CleanHooks::new();
        service.scan(&host, &HashSet::new());
        for tick in 1..10 {
            service.drive(&mut host, &mut hooks, tick * 50);
        }
        assert!(host.op_notices().iter().any(|m| m.contains("Unloaded 3")));
    }

    #[test]
    fn force_unload_ignores_enabled_flag() {
        let mut service = service(|c| c.chunk.enabled = false);
        let mut host = grid_host(4);
        let mut hooks = CleanHooks::new();
        let unloaded = service.force_unload(&mut host, &mut hooks, &HashSet::new());
        assert_eq!(unloaded, 4);
        assert_eq!(chunks::loaded_chunk_count(&host), 0);
    }
}
