//! Tick-budgeted batch removal.
//!
//! A [`BatchRun`] owns a frozen candidate list and drains it at most
//! `quota` entries per tick, re-validating each id against the host
//! before removal so entities that died, were picked up, or turned out
//! to be players are silently skipped without consuming extra budget.

use tracing::trace;

use crate::host::{EntityId, Host};

/// Result of driving a batch one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTick {
    /// Entries remain; `current` of `total` processed so far.
    Progress { current: usize, total: usize },
    /// The list is drained. Reported exactly once.
    Done { removed: u32 },
}

/// An in-flight batch removal job.
#[derive(Debug)]
pub struct BatchRun {
    ids: Vec<EntityId>,
    cursor: usize,
    removed: u32,
    quota: usize,
    started_ms: u64,
}

impl BatchRun {
    /// Freeze a candidate list into a run. A zero quota is lifted to
    /// one so the run always makes progress.
    pub fn new(ids: Vec<EntityId>, quota: u32, now_ms: u64) -> Self {
        Self {
            ids,
            cursor: 0,
            removed: 0,
            quota: quota.max(1) as usize,
            started_ms: now_ms,
        }
    }

    /// Process up to one quota of entries. Callers stop driving the
    /// run once `Done` is returned.
    pub fn tick(&mut self, host: &mut dyn Host) -> BatchTick {
        let end = (self.cursor + self.quota).min(self.ids.len());
        while self.cursor < end {
            let id = self.ids[self.cursor];
            self.cursor += 1;
            if host.is_removable(id) && host.remove_entity(id) {
                self.removed += 1;
            } else {
                trace!(%id, "batch entry no longer valid, skipping");
            }
        }
        if self.cursor >= self.ids.len() {
            BatchTick::Done {
                removed: self.removed,
            }
        } else {
            BatchTick::Progress {
                current: self.cursor,
                total: self.ids.len(),
            }
        }
    }

    pub fn total(&self) -> usize {
        self.ids.len()
    }

    pub fn removed(&self) -> u32 {
        self.removed
    }

    pub fn started_ms(&self) -> u64 {
        self.started_ms
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.ids.len()
    }
}
