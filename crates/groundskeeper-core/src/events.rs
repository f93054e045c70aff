//! Cleanup lifecycle events and observer plumbing.
//!
//! Pre-clean and pre-unload events fire synchronously on the tick path
//! and may veto or shrink the pending work. Completion events carry no
//! veto power, so they are handed to a background dispatcher thread and
//! delivered off the tick path.

use std::collections::BTreeMap;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use serde::Serialize;
use tracing::{debug, warn};

use crate::host::{ChunkPos, EntityId, EntityKind};

/// What started a cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanTrigger {
    /// The per-category countdown reached zero.
    Scheduled,
    /// A population threshold was exceeded.
    Smart,
    /// An operator command.
    Manual,
}

/// Which population a cleanup acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanKind {
    Items,
    Entities,
    Chunks,
}

/// Why a chunk unload was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnloadReason {
    /// Beyond the configured distance from every player.
    Distance,
    /// No recent activity in the chunk.
    Idle,
    /// An operator command.
    Manual,
}

/// Fired before a batch starts. Observers may remove ids from the
/// candidate list or cancel the cleanup outright.
#[derive(Debug)]
pub struct PreCleanEvent {
    pub kind: CleanKind,
    pub trigger: CleanTrigger,
    pub ids: Vec<EntityId>,
    /// Per-kind tally of the candidates; empty for item cleanups.
    pub type_counts: BTreeMap<EntityKind, u32>,
    cancelled: bool,
}

impl PreCleanEvent {
    pub fn new(
        kind: CleanKind,
        trigger: CleanTrigger,
        ids: Vec<EntityId>,
        type_counts: BTreeMap<EntityKind, u32>,
    ) -> Self {
        Self {
            kind,
            trigger,
            ids,
            type_counts,
            cancelled: false,
        }
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Fired before each chunk unload request.
#[derive(Debug)]
pub struct PreChunkUnloadEvent {
    pub pos: ChunkPos,
    pub reason: UnloadReason,
    cancelled: bool,
}

impl PreChunkUnloadEvent {
    pub fn new(pos: ChunkPos, reason: UnloadReason) -> Self {
        Self {
            pos,
            reason,
            cancelled: false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Fired after a batch finishes, off the tick path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanCompleteEvent {
    pub kind: CleanKind,
    pub trigger: CleanTrigger,
    /// Entries actually removed, not candidates scanned.
    pub count: u32,
    pub duration_ms: u64,
}

impl CleanCompleteEvent {
    /// Human duration: `123ms` under a second, `1.23s` above.
    pub fn formatted_duration(&self) -> String {
        if self.duration_ms < 1000 {
            format!("{}ms", self.duration_ms)
        } else {
            format!("{:.2}s", self.duration_ms as f64 / 1000.0)
        }
    }
}

/// Synchronous observer of a pre-clean event.
pub type PreCleanHook = Box<dyn FnMut(&mut PreCleanEvent) + Send>;

/// Synchronous observer of a pre-unload event.
pub type PreChunkUnloadHook = Box<dyn FnMut(&mut PreChunkUnloadEvent) + Send>;

/// Registered veto hooks, fired in registration order.
#[derive(Default)]
pub struct CleanHooks {
    pre_clean: Vec<PreCleanHook>,
    pre_chunk_unload: Vec<PreChunkUnloadHook>,
}

impl CleanHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pre_clean(&mut self, hook: PreCleanHook) {
        self.pre_clean.push(hook);
    }

    pub fn on_pre_chunk_unload(&mut self, hook: PreChunkUnloadHook) {
        self.pre_chunk_unload.push(hook);
    }

    pub fn fire_pre_clean(&mut self, event: &mut PreCleanEvent) {
        for hook in &mut self.pre_clean {
            hook(event);
        }
    }

    pub fn fire_pre_chunk_unload(&mut self, event: &mut PreChunkUnloadEvent) {
        for hook in &mut self.pre_chunk_unload {
            hook(event);
        }
    }
}

impl std::fmt::Debug for CleanHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanHooks")
            .field("pre_clean", &self.pre_clean.len())
            .field("pre_chunk_unload", &self.pre_chunk_unload.len())
            .finish()
    }
}

/// Observer of completion events, invoked on the dispatcher thread.
pub type CompletionObserver = Box<dyn Fn(&CleanCompleteEvent) + Send>;

enum BusMessage {
    Event(CleanCompleteEvent),
    Shutdown,
}

/// Delivers completion events on a dedicated thread so observers can
/// do slow work (webhooks, logging sinks) without touching tick time.
pub struct CompletionBus {
    tx: Sender<BusMessage>,
    worker: Option<JoinHandle<()>>,
}

impl CompletionBus {
    pub fn spawn(observers: Vec<CompletionObserver>) -> Self {
        let (tx, rx) = channel::unbounded();
        let worker = thread::spawn(move || {
            while let Ok(message) = rx.recv() {
                match message {
                    BusMessage::Shutdown => break,
                    BusMessage::Event(event) => {
                        debug!(
                            kind = ?event.kind,
                            trigger = ?event.trigger,
                            count = event.count,
                            duration = %event.formatted_duration(),
                            "cleanup complete"
                        );
                        for observer in &observers {
                            observer(&event);
                        }
                    }
                }
            }
        });
        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Queue an event for delivery. Never blocks the tick path.
    pub fn publish(&self, event: CleanCompleteEvent) {
        if self.tx.send(BusMessage::Event(event)).is_err() {
            warn!("completion dispatcher is gone, dropping event");
        }
    }
}

impl Drop for CompletionBus {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.tx.send(BusMessage::Shutdown);
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for CompletionBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionBus").finish_non_exhaustive()
    }
}
