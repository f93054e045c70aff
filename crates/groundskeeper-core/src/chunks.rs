//! Idle-chunk selection.
//!
//! A chunk is a candidate when it is far from every player (Chebyshev
//! distance in chunk coordinates, strictly greater than the configured
//! maximum) and safe to drop: not force-kept, not in use, entities
//! loaded, and no player standing inside. A world with no players at
//! all offers every loaded chunk.

use std::collections::HashSet;

use crate::config::ChunkConfig;
use crate::host::{ChunkPos, ChunkSnapshot, Host};

/// Whether `(x, z)` is beyond `max_distance` chunks of every player.
/// Equal distance counts as near.
pub fn is_far_from_all_players(x: i32, z: i32, players: &[(i32, i32)], max_distance: i32) -> bool {
    for &(px, pz) in players {
        let dx = (x - px).abs();
        let dz = (z - pz).abs();
        if dx.max(dz) <= max_distance {
            return false;
        }
    }
    true
}

/// Whether a chunk's own state permits unloading, independent of
/// player distance.
pub fn is_safe_to_unload(snapshot: &ChunkSnapshot) -> bool {
    !snapshot.force_kept && !snapshot.in_use && snapshot.entities_loaded && !snapshot.has_player
}

/// Scan every non-blacklisted world for unloadable chunks.
pub fn unloadable_chunks(
    host: &dyn Host,
    config: &ChunkConfig,
    world_blacklist: &HashSet<String>,
) -> Vec<ChunkPos> {
    let mut out = Vec::new();
    for world in host.world_names() {
        if world_blacklist.contains(&world) {
            continue;
        }
        let players = host.player_chunk_positions(&world);
        for chunk in host.loaded_chunks(&world) {
            if !players.is_empty()
                && !is_far_from_all_players(chunk.x, chunk.z, &players, config.max_distance)
            {
                continue;
            }
            if !is_safe_to_unload(&chunk) {
                continue;
            }
            out.push(ChunkPos {
                world: world.clone(),
                x: chunk.x,
                z: chunk.z,
            });
        }
    }
    out
}

/// Total loaded chunks across all worlds, blacklisted included.
pub fn loaded_chunk_count(host: &dyn Host) -> usize {
    host.world_names()
        .iter()
        .map(|world| host.loaded_chunks(world).len())
        .sum()
}
