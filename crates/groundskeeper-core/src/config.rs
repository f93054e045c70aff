//! Configuration for the cleanup engine.
//!
//! Loaded from a TOML file with serde; every field has a default so an
//! empty file (or no file) yields a working configuration. Numeric
//! fields are clamped into sane ranges on load rather than rejected,
//! and entity-type names that fail to parse are warned about and
//! dropped.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::host::EntityKind;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CleanerConfig {
    /// Dropped-item cleanup settings
    #[serde(default)]
    pub item: ItemConfig,

    /// Hostile-entity cleanup settings
    #[serde(default)]
    pub entity: EntityConfig,

    /// World filtering
    #[serde(default)]
    pub worlds: WorldsConfig,

    /// Population-triggered (smart) cleanup
    #[serde(default)]
    pub smart: SmartConfig,

    /// Batch execution settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Adaptive TPS settings
    #[serde(default)]
    pub tps: TpsConfig,

    /// Idle-chunk unload settings
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Player-facing message templates
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Dropped-item cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between scheduled item cleanups
    #[serde(default = "default_item_interval")]
    pub interval: u32,

    /// Countdown values (seconds remaining) that trigger a warning
    #[serde(default = "default_warn_times")]
    pub warn_times: Vec<u32>,

    /// Material names never cleaned
    #[serde(default = "default_item_whitelist")]
    pub whitelist: Vec<String>,

    /// Skip items carrying a custom display name
    #[serde(default = "default_true")]
    pub ignore_named: bool,

    /// Skip items dropped within the last N seconds (0 disables)
    #[serde(default = "default_ignore_recent")]
    pub ignore_recent: u32,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_item_interval(),
            warn_times: default_warn_times(),
            whitelist: default_item_whitelist(),
            ignore_named: true,
            ignore_recent: default_ignore_recent(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_item_interval() -> u32 {
    300
}

fn default_warn_times() -> Vec<u32> {
    vec![60, 30, 10, 5, 3, 2, 1]
}

fn default_item_whitelist() -> Vec<String> {
    ["DIAMOND", "EMERALD", "NETHER_STAR", "BEACON", "ELYTRA"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_ignore_recent() -> u32 {
    30
}

/// Hostile-entity cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between scheduled entity cleanups
    #[serde(default = "default_entity_interval")]
    pub interval: u32,

    /// Entity type names eligible for cleanup
    #[serde(default = "default_entity_types")]
    pub types: Vec<String>,

    /// Countdown values (seconds remaining) that trigger a warning
    #[serde(default = "default_warn_times")]
    pub warn_times: Vec<u32>,

    /// Skip entities carrying a custom name
    #[serde(default = "default_true")]
    pub whitelist_named: bool,

    /// Skip leashed entities
    #[serde(default = "default_true")]
    pub whitelist_leashed: bool,

    /// Skip tamed entities
    #[serde(default = "default_true")]
    pub whitelist_tamed: bool,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_entity_interval(),
            types: default_entity_types(),
            warn_times: default_warn_times(),
            whitelist_named: true,
            whitelist_leashed: true,
            whitelist_tamed: true,
        }
    }
}

fn default_entity_interval() -> u32 {
    600
}

fn default_entity_types() -> Vec<String> {
    [
        "ZOMBIE",
        "SKELETON",
        "CREEPER",
        "SPIDER",
        "CAVE_SPIDER",
        "ENDERMAN",
        "WITCH",
        "SLIME",
        "PHANTOM",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// World filtering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldsConfig {
    /// World names exempt from all cleanup
    #[serde(default = "default_world_blacklist")]
    pub blacklist: Vec<String>,
}

impl Default for WorldsConfig {
    fn default() -> Self {
        Self {
            blacklist: default_world_blacklist(),
        }
    }
}

fn default_world_blacklist() -> Vec<String> {
    vec!["world_creative".to_string()]
}

/// Population-triggered cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Item count that triggers an early cleanup
    #[serde(default = "default_item_threshold")]
    pub item_threshold: u32,

    /// Eligible-entity count that triggers an early cleanup
    #[serde(default = "default_entity_threshold")]
    pub entity_threshold: u32,

    /// Seconds between smart-triggered cleanups
    #[serde(default = "default_smart_cooldown")]
    pub cooldown: u32,
}

impl Default for SmartConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            item_threshold: default_item_threshold(),
            entity_threshold: default_entity_threshold(),
            cooldown: default_smart_cooldown(),
        }
    }
}

fn default_item_threshold() -> u32 {
    2000
}

fn default_entity_threshold() -> u32 {
    1000
}

fn default_smart_cooldown() -> u32 {
    60
}

/// Batch execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum removals per tick
    #[serde(default = "default_batch_size")]
    pub size: u32,

    /// Report batch progress to operators
    #[serde(default)]
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            show_progress: false,
        }
    }
}

fn default_batch_size() -> u32 {
    50
}

/// Adaptive TPS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpsConfig {
    /// Scale smart thresholds with server health
    #[serde(default = "default_true")]
    pub adaptive_enabled: bool,

    /// Averaging window: "1m", "5m", or "15m"
    #[serde(default = "default_sample_window")]
    pub sample_window: String,

    /// TPS at or below which the server counts as degraded
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,

    /// TPS at or below which the server counts as critical
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    /// Percent threshold reduction when degraded
    #[serde(default = "default_low_reduction")]
    pub low_reduction: u32,

    /// Percent threshold reduction when critical
    #[serde(default = "default_critical_reduction")]
    pub critical_reduction: u32,
}

impl Default for TpsConfig {
    fn default() -> Self {
        Self {
            adaptive_enabled: true,
            sample_window: default_sample_window(),
            low_threshold: default_low_threshold(),
            critical_threshold: default_critical_threshold(),
            low_reduction: default_low_reduction(),
            critical_reduction: default_critical_reduction(),
        }
    }
}

fn default_sample_window() -> String {
    "1m".to_string()
}

fn default_low_threshold() -> f64 {
    18.0
}

fn default_critical_threshold() -> f64 {
    15.0
}

fn default_low_reduction() -> u32 {
    30
}

fn default_critical_reduction() -> u32 {
    50
}

/// Idle-chunk unload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Chebyshev chunk distance beyond which a chunk counts as far
    #[serde(default = "default_max_distance")]
    pub max_distance: i32,

    /// Chunks unloaded per sweep slice
    #[serde(default = "default_chunk_batch")]
    pub batch_size: u32,

    /// Seconds before a pending unload counts as failed
    #[serde(default = "default_unload_timeout")]
    pub unload_timeout: u32,

    /// Report unload totals to operators
    #[serde(default)]
    pub show_progress: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_distance: default_max_distance(),
            batch_size: default_chunk_batch(),
            unload_timeout: default_unload_timeout(),
            show_progress: false,
        }
    }
}

fn default_max_distance() -> i32 {
    20
}

fn default_chunk_batch() -> u32 {
    5
}

fn default_unload_timeout() -> u32 {
    5
}

/// Player-facing message templates.
///
/// Placeholders: `{TIME}` seconds remaining, `{COUNT}` removal count,
/// `{CURRENT}`/`{TOTAL}` batch progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_item_warn")]
    pub item_warn: String,

    #[serde(default = "default_entity_warn")]
    pub entity_warn: String,

    #[serde(default = "default_item_cleaned")]
    pub item_cleaned: String,

    #[serde(default = "default_entity_cleaned")]
    pub entity_cleaned: String,

    #[serde(default = "default_smart_triggered")]
    pub smart_triggered: String,

    #[serde(default = "default_clean_cancelled")]
    pub clean_cancelled: String,

    #[serde(default = "default_clean_progress")]
    pub clean_progress: String,

    #[serde(default = "default_chunk_unloaded")]
    pub chunk_unloaded: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            item_warn: default_item_warn(),
            entity_warn: default_entity_warn(),
            item_cleaned: default_item_cleaned(),
            entity_cleaned: default_entity_cleaned(),
            smart_triggered: default_smart_triggered(),
            clean_cancelled: default_clean_cancelled(),
            clean_progress: default_clean_progress(),
            chunk_unloaded: default_chunk_unloaded(),
        }
    }
}

fn default_item_warn() -> String {
    "Dropped items will be cleaned in {TIME}s".to_string()
}

fn default_entity_warn() -> String {
    "Hostile mobs will be cleaned in {TIME}s".to_string()
}

fn default_item_cleaned() -> String {
    "Cleaned {COUNT} dropped items".to_string()
}

fn default_entity_cleaned() -> String {
    "Cleaned {COUNT} hostile mobs".to_string()
}

fn default_smart_triggered() -> String {
    "Entity population is high, running an early cleanup".to_string()
}

fn default_clean_cancelled() -> String {
    "Cleanup was cancelled".to_string()
}

fn default_clean_progress() -> String {
    "Cleanup progress: {CURRENT}/{TOTAL}".to_string()
}

fn default_chunk_unloaded() -> String {
    "Unloaded {COUNT} idle chunks".to_string()
}

impl MessagesConfig {
    pub fn render_warn(&self, template: &str, seconds: u32) -> String {
        template.replace("{TIME}", &seconds.to_string())
    }

    pub fn render_count(&self, template: &str, count: u32) -> String {
        template.replace("{COUNT}", &count.to_string())
    }

    pub fn render_progress(&self, current: usize, total: usize) -> String {
        self.clean_progress
            .replace("{CURRENT}", &current.to_string())
            .replace("{TOTAL}", &total.to_string())
    }
}

impl CleanerConfig {
    /// Load configuration from a TOML file and clamp it into range.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text)?;
        config.normalize();
        Ok(config)
    }

    /// Clamp numeric fields into their working ranges. Out-of-range
    /// values are pulled to the nearest bound and logged.
    pub fn normalize(&mut self) {
        clamp_field("item.interval", &mut self.item.interval, 10, 3600);
        clamp_field("entity.interval", &mut self.entity.interval, 10, 3600);
        clamp_field("smart.cooldown", &mut self.smart.cooldown, 10, 3600);
        clamp_field("batch.size", &mut self.batch.size, 1, 1000);
        clamp_field("chunk.max_distance", &mut self.chunk.max_distance, 1, 64);
        clamp_field("chunk.batch_size", &mut self.chunk.batch_size, 1, 100);
        clamp_field("chunk.unload_timeout", &mut self.chunk.unload_timeout, 1, 60);
        if self.tps.critical_threshold > self.tps.low_threshold {
            warn!(
                critical = self.tps.critical_threshold,
                low = self.tps.low_threshold,
                "tps.critical_threshold above tps.low_threshold, lowering it"
            );
            self.tps.critical_threshold = self.tps.low_threshold;
        }
        clamp_field("tps.low_reduction", &mut self.tps.low_reduction, 0, 100);
        clamp_field(
            "tps.critical_reduction",
            &mut self.tps.critical_reduction,
            0,
            100,
        );
    }
}

fn clamp_field<T: PartialOrd + Copy + std::fmt::Display>(
    name: &str,
    value: &mut T,
    min: T,
    max: T,
) {
    if *value < min {
        warn!(%value, %min, "config {name} below minimum, clamping");
        *value = min;
    } else if *value > max {
        warn!(%value, %max, "config {name} above maximum, clamping");
        *value = max;
    }
}

/// Pre-resolved lookup sets derived from the config, rebuilt on reload
/// so the scan paths never parse strings.
#[derive(Debug, Clone, Default)]
pub struct RuleCache {
    pub item_whitelist: HashSet<String>,
    pub entity_types: HashSet<EntityKind>,
    pub world_blacklist: HashSet<String>,
}

impl RuleCache {
    pub fn build(config: &CleanerConfig) -> Self {
        let mut entity_types = HashSet::new();
        for name in &config.entity.types {
            match name.parse::<EntityKind>() {
                Ok(kind) => {
                    entity_types.insert(kind);
                }
                Err(err) => warn!(%err, "ignoring unrecognized entry in entity.types"),
            }
        }
        Self {
            item_whitelist: config
                .item
                .whitelist
                .iter()
                .map(|m| m.to_ascii_uppercase())
                .collect(),
            entity_types,
            world_blacklist: config.worlds.blacklist.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn default_config_matches_shipped_values() {
        let config = CleanerConfig::default();
        assert!(config.item.enabled);
        assert_eq!(config.item.interval, 300);
        assert_eq!(config.item.warn_times, vec![60, 30, 10, 5, 3, 2, 1]);
        assert_eq!(config.entity.interval, 600);
        assert!(!config.smart.enabled);
        assert_eq!(config.smart.item_threshold, 2000);
        assert_eq!(config.batch.size, 50);
        assert_eq!(config.tps.sample_window, "1m");
        assert!(!config.chunk.enabled);
        assert_eq!(config.chunk.max_distance, 20);
        assert_eq!(config.worlds.blacklist, vec!["world_creative"]);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: CleanerConfig = toml::from_str("").unwrap();
        assert_eq!(config.item.interval, 300);
        assert!(config.entity.whitelist_tamed);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: CleanerConfig = toml::from_str(
            "[item]\ninterval = 120\n[smart]\nenabled = true\n",
        )
        .unwrap();
        assert_eq!(config.item.interval, 120);
        assert!(config.smart.enabled);
        assert_eq!(config.entity.interval, 600);
    }

    #[test]
    fn normalize_clamps_out_of_range_values() {
        let mut config = CleanerConfig::default();
        config.item.interval = 1;
        config.batch.size = 100_000;
        config.tps.critical_threshold = 19.5;
        config.normalize();
        assert_eq!(config.item.interval, 10);
        assert_eq!(config.batch.size, 1000);
        assert!(config.tps.critical_threshold <= config.tps.low_threshold);
    }

    #[test]
    fn load_from_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batch]\nsize = 25").unwrap();
        let config = CleanerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.batch.size, 25);
    }

    #[test]
    fn load_from_missing_file_is_an_io_error() {
        let err = CleanerConfig::load_from(Path::new("/nonexistent/gk.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigIo { .. }));
    }

    #[test]
    fn rule_cache_drops_unknown_entity_types() {
        let mut config = CleanerConfig::default();
        config.entity.types.push("NOT_A_MOB".to_string());
        config.item.whitelist.push("beacon".to_string());
        let cache = RuleCache::build(&config);
        assert_eq!(cache.entity_types.len(), 9);
        assert!(cache.item_whitelist.contains("BEACON"));
        assert!(cache.world_blacklist.contains("world_creative"));
    }
}
