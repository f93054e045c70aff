//! Operator command surface.
//!
//! A thin translation layer from the six cleanup actions to engine
//! calls, returning plain response lines for whatever frontend is
//! driving the engine. Manual cleanups are refused while a batch is
//! draining rather than queued.

use std::str::FromStr;

use crate::cleaner::StartOutcome;
use crate::host::Host;
use crate::plugin::Groundskeeper;

/// One operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanCommand {
    /// Clean dropped items now.
    Items,
    /// Clean hostile mobs now.
    Entities,
    /// Clean items, then mobs.
    All,
    /// Unload idle chunks now.
    Chunks,
    /// Show what the population check would do.
    Check,
    /// Show countdowns, populations, and tick rate.
    Status,
}

impl FromStr for CleanCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "items" => Ok(Self::Items),
            "entities" => Ok(Self::Entities),
            "all" => Ok(Self::All),
            "chunks" => Ok(Self::Chunks),
            "check" => Ok(Self::Check),
            "status" => Ok(Self::Status),
            other => Err(format!(
                "unknown action '{other}' (expected items, entities, all, chunks, check, or status)"
            )),
        }
    }
}

/// Run one command against the engine, returning response lines.
pub fn dispatch(
    gk: &mut Groundskeeper,
    host: &mut dyn Host,
    command: CleanCommand,
    now_ms: u64,
) -> Vec<String> {
    match command {
        CleanCommand::Items => {
            if gk.in_progress() {
                return vec!["A cleanup is already running".to_string()];
            }
            vec![describe_items(gk.force_items(host, now_ms))]
        }
        CleanCommand::Entities => {
            if gk.in_progress() {
                return vec!["A cleanup is already running".to_string()];
            }
            vec![describe_entities(gk.force_entities(host, now_ms))]
        }
        CleanCommand::All => {
            if gk.in_progress() {
                return vec!["A cleanup is already running".to_string()];
            }
            let mut lines = vec![describe_items(gk.force_items(host, now_ms))];
            lines.push(describe_entities(gk.force_entities(host, now_ms)));
            lines
        }
        CleanCommand::Chunks => {
            let unloaded = gk.force_chunks(host);
            vec![format!("Unloaded {unloaded} idle chunks")]
        }
        CleanCommand::Check => {
            let report = gk.smart_report(host);
            let status = gk.status(host);
            vec![
                format!("TPS: {:.2} ({})", report.tps, report.tps_severity.label()),
                format!(
                    "Items: {} / threshold {}{}",
                    report.items,
                    report.item_threshold,
                    if report.items_over() { " (over)" } else { "" }
                ),
                format!(
                    "Mobs: {} / threshold {}{}",
                    report.mobs,
                    report.entity_threshold,
                    if report.entities_over() { " (over)" } else { "" }
                ),
                format!("Entities total: {}", status.total_entities),
                format!(
                    "Chunks: {} loaded, {} unloadable",
                    status.loaded_chunks, status.unloadable_chunks
                ),
            ]
        }
        CleanCommand::Status => {
            let status = gk.status(host);
            let mut lines = vec![
                format!("TPS: {:.2} ({})", status.tps, status.tps_severity.label()),
                format!("Next item cleanup in {}s", status.item_countdown),
                format!("Next entity cleanup in {}s", status.entity_countdown),
                format!(
                    "Cleanup in progress: {}",
                    if status.in_progress { "yes" } else { "no" }
                ),
                format!(
                    "Population: {} items, {} cleanable mobs, {} entities",
                    status.items, status.mobs, status.total_entities
                ),
                format!(
                    "Chunks: {} loaded, {} unloadable",
                    status.loaded_chunks, status.unloadable_chunks
                ),
            ];
            let reduction = match status.tps_severity {
                crate::threshold::TpsSeverity::Low => Some(gk.config().tps.low_reduction),
                crate::threshold::TpsSeverity::Critical => {
                    Some(gk.config().tps.critical_reduction)
                }
                crate::threshold::TpsSeverity::Normal => None,
            };
            if let Some(percent) = reduction {
                lines.push(format!("Smart thresholds reduced by {percent}%"));
            }
            lines
        }
    }
}

fn describe_items(outcome: StartOutcome) -> String {
    match outcome {
        StartOutcome::Started { candidates } => {
            format!("Cleaning {candidates} dropped items")
        }
        StartOutcome::Empty => "No dropped items to clean".to_string(),
        StartOutcome::Cancelled => "Item cleanup was cancelled".to_string(),
        StartOutcome::Busy => "A cleanup is already running".to_string(),
    }
}

fn describe_entities(outcome: StartOutcome) -> String {
    match outcome {
        StartOutcome::Started { candidates } => {
            format!("Cleaning {candidates} hostile mobs")
        }
        StartOutcome::Empty => "No hostile mobs to clean".to_string(),
        StartOutcome::Cancelled => "Entity cleanup was cancelled".to_string(),
        StartOutcome::Busy => "A cleanup is already running".to_string(),
    }
}
