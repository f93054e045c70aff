//! Property-based tests for idle-chunk selection.
//!
//! Validates:
//! 1. Distance is Chebyshev: far iff max(|dx|, |dz|) > max_distance
//! 2. The boundary is strict: distance equal to the maximum is near
//! 3. Adding a player never turns a near chunk far
//! 4. With no players, every chunk is far
//! 5. Safety requires all four flags simultaneously
//! 6. Selected chunks are always both far and safe

use std::collections::HashSet;

use proptest::prelude::*;

use groundskeeper_core::chunks::{is_far_from_all_players, is_safe_to_unload, unloadable_chunks};
use groundskeeper_core::config::ChunkConfig;
use groundskeeper_core::host::ChunkSnapshot;
use groundskeeper_core::simulation::SimHost;

const COORD: std::ops::Range<i32> = -10_000..10_000;

fn arb_players(max: usize) -> impl Strategy<Value = Vec<(i32, i32)>> {
    proptest::collection::vec((COORD, COORD), 0..max)
}

fn arb_snapshot() -> impl Strategy<Value = ChunkSnapshot> {
    (COORD, COORD, any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(x, z, force_kept, in_use, entities_loaded, has_player)| ChunkSnapshot {
            x,
            z,
            force_kept,
            in_use,
            entities_loaded,
            has_player,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn far_iff_chebyshev_exceeds_maximum(
        x in COORD,
        z in COORD,
        players in arb_players(8),
        max_distance in 1_i32..64,
    ) {
        let far = is_far_from_all_players(x, z, &players, max_distance);
        let min_chebyshev = players
            .iter()
            .map(|&(px, pz)| (x - px).abs().max((z - pz).abs()))
            .min();
        match min_chebyshev {
            None => prop_assert!(far, "no players means every chunk is far"),
            Some(d) => prop_assert_eq!(far, d > max_distance),
        }
    }

    #[test]
    fn boundary_is_strict(px in COORD, pz in COORD, max_distance in 1_i32..64) {
        let players = [(px, pz)];
        prop_assert!(!is_far_from_all_players(px + max_distance, pz, &players, max_distance));
        prop_assert!(is_far_from_all_players(px + max_distance + 1, pz, &players, max_distance));
    }

    #[test]
    fn extra_players_never_make_a_chunk_far(
        x in COORD,
        z in COORD,
        players in arb_players(6),
        extra in (COORD, COORD),
        max_distance in 1_i32..64,
    ) {
        let before = is_far_from_all_players(x, z, &players, max_distance);
        let mut more = players.clone();
        more.push(extra);
        let after = is_far_from_all_players(x, z, &more, max_distance);
        prop_assert!(!after || before, "adding a player must only shrink the far set");
    }

    #[test]
    fn safety_is_the_conjunction_of_flags(snapshot in arb_snapshot()) {
        let expected = !snapshot.force_kept
            && !snapshot.in_use
            && snapshot.entities_loaded
            && !snapshot.has_player;
        prop_assert_eq!(is_safe_to_unload(&snapshot), expected);
    }

    #[test]
    fn selected_chunks_are_far_and_safe(
        snapshots in proptest::collection::vec(arb_snapshot(), 0..40),
        players in arb_players(4),
        max_distance in 1_i32..64,
    ) {
        let mut host = SimHost::new();
        host.add_world("world");
        for snapshot in &snapshots {
            host.add_chunk("world", *snapshot);
        }
        for &(px, pz) in &players {
            host.add_player("world", px, pz, false);
        }
        let mut config = ChunkConfig::default();
        config.max_distance = max_distance;

        for pos in unloadable_chunks(&host, &config, &HashSet::new()) {
            let player_positions: Vec<(i32, i32)> =
                players.iter().copied().collect();
            if !player_positions.is_empty() {
                prop_assert!(is_far_from_all_players(
                    pos.x, pos.z, &player_positions, max_distance
                ));
            }
            // A player standing in the chunk also blocks it via the
            // safety flags, so selected chunks never hold one.
            prop_assert!(!player_positions.iter().any(|&(px, pz)| px == pos.x && pz == pos.z));
        }
    }
}
