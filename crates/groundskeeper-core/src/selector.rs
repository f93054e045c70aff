//! Candidate selection for item and entity cleanup.
//!
//! Pure filters over host snapshots. Selection never mutates anything;
//! the batch executor re-validates every id at removal time, so a
//! candidate list going stale between scan and removal is harmless.

use std::collections::BTreeMap;

use crate::config::{CleanerConfig, RuleCache};
use crate::host::{EntityId, EntityKind, Host};

/// Raw population totals used by smart checks and status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PopulationCounts {
    /// Dropped item stacks.
    pub items: u32,
    /// Entities whose kind is in the configured cleanup set.
    pub mobs: u32,
    /// All non-player entities, cleanable or not.
    pub total_entities: u32,
}

/// Items eligible for removal across all non-blacklisted worlds.
pub fn item_candidates(
    host: &dyn Host,
    config: &CleanerConfig,
    cache: &RuleCache,
) -> Vec<EntityId> {
    let recent_ticks = config.item.ignore_recent.saturating_mul(20);
    let mut out = Vec::new();
    for world in host.world_names() {
        if cache.world_blacklist.contains(&world) {
            continue;
        }
        for item in host.items_in(&world) {
            if cache.item_whitelist.contains(&item.material.to_ascii_uppercase()) {
                continue;
            }
            if config.item.ignore_named && item.custom_named {
                continue;
            }
            if recent_ticks > 0 && item.age_ticks < recent_ticks {
                continue;
            }
            out.push(item.id);
        }
    }
    out
}

/// Entities eligible for removal, plus a per-kind tally of the
/// selected candidates for observers.
pub fn entity_candidates(
    host: &dyn Host,
    config: &CleanerConfig,
    cache: &RuleCache,
) -> (Vec<EntityId>, BTreeMap<EntityKind, u32>) {
    let mut out = Vec::new();
    let mut tally: BTreeMap<EntityKind, u32> = BTreeMap::new();
    for world in host.world_names() {
        if cache.world_blacklist.contains(&world) {
            continue;
        }
        for entity in host.entities_in(&world) {
            if !cache.entity_types.contains(&entity.kind) {
                continue;
            }
            if config.entity.whitelist_named && entity.custom_named {
                continue;
            }
            if config.entity.whitelist_leashed && entity.leashed {
                continue;
            }
            if config.entity.whitelist_tamed && entity.tamed {
                continue;
            }
            out.push(entity.id);
            *tally.entry(entity.kind).or_insert(0) += 1;
        }
    }
    (out, tally)
}

/// Count the current population without applying per-entity whitelist
/// rules. `skip_blacklisted` matches the smart check, which ignores
/// exempt worlds; status reporting counts everything.
pub fn population_counts(
    host: &dyn Host,
    cache: &RuleCache,
    skip_blacklisted: bool,
) -> PopulationCounts {
    let mut counts = PopulationCounts::default();
    for world in host.world_names() {
        if skip_blacklisted && cache.world_blacklist.contains(&world) {
            continue;
        }
        counts.items += host.items_in(&world).len() as u32;
        for entity in host.entities_in(&world) {
            counts.total_entities += 1;
            if cache.entity_types.contains(&entity.kind) {
                counts.mobs += 1;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimHost;

    fn setup() -> (SimHost, CleanerConfig, RuleCache) {
        let mut host = SimHost::new();
        host.add_world("world");
        let config = CleanerConfig::default();
        let cache = RuleCache::build(&config);
        (host, config, cache)
    }

    #[test]
    fn whitelisted_materials_survive() {
        let (mut host, config, cache) = setup();
        host.spawn_item("world", "DIAMOND", false, 10_000);
        host.spawn_item("world", "COBBLESTONE", false, 10_000);
        let ids = item_candidates(&host, &config, &cache);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn named_items_survive_when_configured() {
        let (mut host, mut config, cache) = setup();
        host.spawn_item("world", "DIRT", true, 10_000);
        assert!(item_candidates(&host, &config, &cache).is_empty());
        config.item.ignore_named = false;
        assert_eq!(item_candidates(&host, &config, &cache).len(), 1);
    }

    #[test]
    fn recent_items_survive() {
        let (mut host, mut config, cache) = setup();
        // ignore_recent is 30s = 600 ticks.
        host.spawn_item("world", "DIRT", false, 599);
        host.spawn_item("world", "DIRT", false, 600);
        assert_eq!(item_candidates(&host, &config, &cache).len(), 1);
        config.item.ignore_recent = 0;
        assert_eq!(item_candidates(&host, &config, &cache).len(), 2);
    }

    #[test]
    fn blacklisted_worlds_are_skipped() {
        let (mut host, config, cache) = setup();
        host.add_world("world_creative");
        host.spawn_item("world_creative", "DIRT", false, 10_000);
        host.spawn_mob("world_creative", EntityKind::Zombie);
        assert!(item_candidates(&host, &config, &cache).is_empty());
        let (ids, _) = entity_candidates(&host, &config, &cache);
        assert!(ids.is_empty());
    }

    #[test]
    fn only_configured_kinds_are_selected() {
        let (mut host, config, cache) = setup();
        host.spawn_mob("world", EntityKind::Zombie);
        host.spawn_mob("world", EntityKind::Cow);
        let (ids, tally) = entity_candidates(&host, &config, &cache);
        assert_eq!(ids.len(), 1);
        assert_eq!(tally.get(&EntityKind::Zombie), Some(&1));
        assert!(!tally.contains_key(&EntityKind::Cow));
    }

    #[test]
    fn protected_entities_survive() {
        let (mut host, config, cache) = setup();
        let named = host.spawn_mob("world", EntityKind::Zombie);
        host.set_entity_named(named, true);
        let leashed = host.spawn_mob("world", EntityKind::Skeleton);
        host.set_entity_leashed(leashed, true);
        let tamed = host.spawn_mob("world", EntityKind::Wolf);
        host.set_entity_tamed(tamed, true);
        host.spawn_mob("world", EntityKind::Creeper);
        let (ids, _) = entity_candidates(&host, &config, &cache);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn tamed_wolf_selected_when_kind_configured_and_whitelist_off() {
        let (mut host, mut config, _) = setup();
        config.entity.types.push("WOLF".to_string());
        config.entity.whitelist_tamed = false;
        let cache = RuleCache::build(&config);
        let tamed = host.spawn_mob("world", EntityKind::Wolf);
        host.set_entity_tamed(tamed, true);
        let (ids, _) = entity_candidates(&host, &config, &cache);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn population_counts_ignore_whitelist_rules() {
        let (mut host, _, cache) = setup();
        host.spawn_item("world", "DIAMOND", false, 0);
        let named = host.spawn_mob("world", EntityKind::Zombie);
        host.set_entity_named(named, true);
        host.spawn_mob("world", EntityKind::Villager);
        let counts = population_counts(&host, &cache, true);
        assert_eq!(counts.items, 1);
        assert_eq!(counts.mobs, 1);
        assert_eq!(counts.total_entities, 2);
    }

    #[test]
    fn scanning_is_read_only_and_repeatable() {
        let (mut host, config, cache) = setup();
        host.spawn_item("world", "DIRT", false, 10_000);
        host.spawn_mob("world", EntityKind::Zombie);
        let first = item_candidates(&host, &config, &cache);
        let second = item_candidates(&host, &config, &cache);
        assert_eq!(first, second);
        let (mobs_a, _) = entity_candidates(&host, &config, &cache);
        let (mobs_b, _) = entity_candidates(&host, &config, &cache);
        assert_eq!(mobs_a, mobs_b);
    }

    #[test]
    fn status_counts_include_blacklisted_worlds() {
        let (mut host, _, cache) = setup();
        host.add_world("world_creative");
        host.spawn_item("world_creative", "DIRT", false, 0);
        assert_eq!(population_counts(&host, &cache, true).items, 0);
        assert_eq!(population_counts(&host, &cache, false).items, 1);
    }
}
