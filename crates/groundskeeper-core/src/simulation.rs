//! In-memory host for tests and the simulation CLI.
//!
//! `SimHost` models just enough of a game server to exercise the
//! engine: worlds holding items, entities, chunks, and players, plus a
//! deterministic async unload queue. Unload requests resolve after a
//! configurable number of polls (zero by default), or never when
//! `fail_unloads` is set, which is how the timeout path is tested.

use std::collections::{BTreeMap, HashMap};

use crate::host::{
    ChunkPos, ChunkSnapshot, EntityId, EntityKind, EntitySnapshot, Host, ItemSnapshot,
    UnloadTicket,
};

#[derive(Debug, Clone)]
struct SimItem {
    id: EntityId,
    material: String,
    custom_named: bool,
    age_ticks: u32,
    valid: bool,
}

#[derive(Debug, Clone)]
struct SimEntity {
    id: EntityId,
    kind: EntityKind,
    custom_named: bool,
    leashed: bool,
    tamed: bool,
    valid: bool,
}

#[derive(Debug, Clone)]
struct SimChunk {
    state: ChunkSnapshot,
    loaded: bool,
}

#[derive(Debug, Clone)]
struct SimPlayer {
    chunk_x: i32,
    chunk_z: i32,
    op: bool,
}

#[derive(Debug, Default)]
struct SimWorld {
    items: Vec<SimItem>,
    entities: Vec<SimEntity>,
    chunks: Vec<SimChunk>,
    players: Vec<SimPlayer>,
}

struct PendingUnload {
    pos: ChunkPos,
    polls_left: u32,
}

/// Deterministic in-memory game server.
#[derive(Default)]
pub struct SimHost {
    worlds: BTreeMap<String, SimWorld>,
    broadcasts: Vec<String>,
    op_notices: Vec<String>,
    pending: HashMap<u64, PendingUnload>,
    next_ticket: u64,
    unload_delay_polls: u32,
    fail_unloads: bool,
    native_tps: Option<Vec<f64>>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_world(&mut self, name: &str) {
        self.worlds.entry(name.to_string()).or_default();
    }

    pub fn spawn_item(
        &mut self,
        world: &str,
        material: &str,
        custom_named: bool,
        age_ticks: u32,
    ) -> EntityId {
        let id = EntityId::new_v4();
        self.world_mut(world).items.push(SimItem {
            id,
            material: material.to_string(),
            custom_named,
            age_ticks,
            valid: true,
        });
        id
    }

    pub fn spawn_mob(&mut self, world: &str, kind: EntityKind) -> EntityId {
        let id = EntityId::new_v4();
        self.world_mut(world).entities.push(SimEntity {
            id,
            kind,
            custom_named: false,
            leashed: false,
            tamed: false,
            valid: true,
        });
        id
    }

    pub fn set_entity_named(&mut self, id: EntityId, named: bool) {
        if let Some(entity) = self.entity_mut(id) {
            entity.custom_named = named;
        }
    }

    pub fn set_entity_leashed(&mut self, id: EntityId, leashed: bool) {
        if let Some(entity) = self.entity_mut(id) {
            entity.leashed = leashed;
        }
    }

    pub fn set_entity_tamed(&mut self, id: EntityId, tamed: bool) {
        if let Some(entity) = self.entity_mut(id) {
            entity.tamed = tamed;
        }
    }

    /// Invalidate an entity without removing it, as a death or pickup
    /// between scan and removal would.
    pub fn despawn(&mut self, id: EntityId) {
        for world in self.worlds.values_mut() {
            for item in &mut world.items {
                if item.id == id {
                    item.valid = false;
                }
            }
            for entity in &mut world.entities {
                if entity.id == id {
                    entity.valid = false;
                }
            }
        }
    }

    pub fn add_chunk(&mut self, world: &str, state: ChunkSnapshot) {
        self.world_mut(world).chunks.push(SimChunk {
            state,
            loaded: true,
        });
    }

    pub fn add_player(&mut self, world: &str, chunk_x: i32, chunk_z: i32, op: bool) {
        self.world_mut(world).players.push(SimPlayer {
            chunk_x,
            chunk_z,
            op,
        });
    }

    /// When set, unload requests stay pending forever.
    pub fn fail_unloads(&mut self, fail: bool) {
        self.fail_unloads = fail;
    }

    /// Number of polls an unload request stays pending before
    /// confirming. Zero confirms on the first poll.
    pub fn set_unload_delay_polls(&mut self, polls: u32) {
        self.unload_delay_polls = polls;
    }

    pub fn set_native_tps(&mut self, tps: Option<Vec<f64>>) {
        self.native_tps = tps;
    }

    pub fn broadcasts(&self) -> &[String] {
        &self.broadcasts
    }

    pub fn op_notices(&self) -> &[String] {
        &self.op_notices
    }

    pub fn clear_messages(&mut self) {
        self.broadcasts.clear();
        self.op_notices.clear();
    }

    /// Count of operators currently online, used by frontends.
    pub fn op_count(&self) -> usize {
        self.worlds
            .values()
            .flat_map(|w| &w.players)
            .filter(|p| p.op)
            .count()
    }

    fn world_mut(&mut self, name: &str) -> &mut SimWorld {
        self.worlds.entry(name.to_string()).or_default()
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut SimEntity> {
        self.worlds
            .values_mut()
            .flat_map(|w| w.entities.iter_mut())
            .find(|e| e.id == id)
    }

    fn chunk_has_player(world: &SimWorld, x: i32, z: i32) -> bool {
        world
            .players
            .iter()
            .any(|p| p.chunk_x == x && p.chunk_z == z)
    }

    fn mark_unloaded(&mut self, pos: &ChunkPos) -> bool {
        let Some(world) = self.worlds.get_mut(&pos.world) else {
            return false;
        };
        for chunk in &mut world.chunks {
            if chunk.state.x == pos.x && chunk.state.z == pos.z && chunk.loaded {
                chunk.loaded = false;
                return true;
            }
        }
        false
    }
}

impl Host for SimHost {
    fn world_names(&self) -> Vec<String> {
        self.worlds.keys().cloned().collect()
    }

    fn items_in(&self, world: &str) -> Vec<ItemSnapshot> {
        let Some(world) = self.worlds.get(world) else {
            return Vec::new();
        };
        world
            .items
            .iter()
            .filter(|i| i.valid)
            .map(|i| ItemSnapshot {
                id: i.id,
                material: i.material.clone(),
                custom_named: i.custom_named,
                age_ticks: i.age_ticks,
            })
            .collect()
    }

    fn entities_in(&self, world: &str) -> Vec<EntitySnapshot> {
        let Some(world) = self.worlds.get(world) else {
            return Vec::new();
        };
        world
            .entities
            .iter()
            .filter(|e| e.valid)
            .map(|e| EntitySnapshot {
                id: e.id,
                kind: e.kind,
                custom_named: e.custom_named,
                leashed: e.leashed,
                tamed: e.tamed,
            })
            .collect()
    }

    fn loaded_chunks(&self, world: &str) -> Vec<ChunkSnapshot> {
        let Some(world_ref) = self.worlds.get(world) else {
            return Vec::new();
        };
        world_ref
            .chunks
            .iter()
            .filter(|c| c.loaded)
            .map(|c| ChunkSnapshot {
                has_player: c.state.has_player
                    || Self::chunk_has_player(world_ref, c.state.x, c.state.z),
                ..c.state
            })
            .collect()
    }

    fn chunk_state(&self, pos: &ChunkPos) -> Option<ChunkSnapshot> {
        let world = self.worlds.get(&pos.world)?;
        world
            .chunks
            .iter()
            .find(|c| c.loaded && c.state.x == pos.x && c.state.z == pos.z)
            .map(|c| ChunkSnapshot {
                has_player: c.state.has_player
                    || Self::chunk_has_player(world, c.state.x, c.state.z),
                ..c.state
            })
    }

    fn player_chunk_positions(&self, world: &str) -> Vec<(i32, i32)> {
        let Some(world) = self.worlds.get(world) else {
            return Vec::new();
        };
        world.players.iter().map(|p| (p.chunk_x, p.chunk_z)).collect()
    }

    fn is_removable(&self, id: EntityId) -> bool {
        self.worlds.values().any(|world| {
            world.items.iter().any(|i| i.id == id && i.valid)
                || world.entities.iter().any(|e| e.id == id && e.valid)
        })
    }

    fn remove_entity(&mut self, id: EntityId) -> bool {
        for world in self.worlds.values_mut() {
            if let Some(idx) = world.items.iter().position(|i| i.id == id && i.valid) {
                world.items.swap_remove(idx);
                return true;
            }
            if let Some(idx) = world.entities.iter().position(|e| e.id == id && e.valid) {
                world.entities.swap_remove(idx);
                return true;
            }
        }
        false
    }

    fn request_chunk_unload(&mut self, pos: &ChunkPos) -> UnloadTicket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(
            ticket,
            PendingUnload {
                pos: pos.clone(),
                polls_left: self.unload_delay_polls,
            },
        );
        UnloadTicket(ticket)
    }

    fn poll_unload(&mut self, ticket: UnloadTicket) -> Option<bool> {
        if self.fail_unloads {
            return None;
        }
        let pending = self.pending.get_mut(&ticket.0)?;
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return None;
        }
        let pos = pending.pos.clone();
        self.pending.remove(&ticket.0);
        Some(self.mark_unloaded(&pos))
    }

    fn unload_chunk(&mut self, pos: &ChunkPos) -> bool {
        self.mark_unloaded(pos)
    }

    fn broadcast(&mut self, message: &str) {
        self.broadcasts.push(message.to_string());
    }

    fn notify_ops(&mut self, message: &str) {
        self.op_notices.push(message.to_string());
    }

    fn native_tps(&self) -> Option<Vec<f64>> {
        self.native_tps.clone()
    }

    fn server_flavor(&self) -> &str {
        "sim"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_takes_items_and_entities() {
        let mut host = SimHost::new();
        host.add_world("world");
        let item = host.spawn_item("world", "DIRT", false, 0);
        let mob = host.spawn_mob("world", EntityKind::Zombie);
        assert!(host.remove_entity(item));
        assert!(host.remove_entity(mob));
        assert!(!host.remove_entity(item));
        assert!(host.items_in("world").is_empty());
    }

    #[test]
    fn despawned_entities_are_not_removable() {
        let mut host = SimHost::new();
        host.add_world("world");
        let mob = host.spawn_mob("world", EntityKind::Slime);
        host.despawn(mob);
        assert!(!host.is_removable(mob));
        assert!(!host.remove_entity(mob));
    }

    #[test]
    fn unload_confirms_after_configured_polls() {
        let mut host = SimHost::new();
        host.add_world("world");
        host.add_chunk(
            "world",
            ChunkSnapshot {
                x: 0,
                z: 0,
                force_kept: false,
                in_use: false,
                entities_loaded: true,
                has_player: false,
            },
        );
        host.set_unload_delay_polls(2);
        let pos = ChunkPos {
            world: "world".into(),
            x: 0,
            z: 0,
        };
        let ticket = host.request_chunk_unload(&pos);
        assert_eq!(host.poll_unload(ticket), None);
        assert_eq!(host.poll_unload(ticket), None);
        assert_eq!(host.poll_unload(ticket), Some(true));
        assert!(host.chunk_state(&pos).is_none());
    }

    #[test]
    fn players_mark_their_chunk_occupied() {
        let mut host = SimHost::new();
        host.add_world("world");
        host.add_chunk(
            "world",
            ChunkSnapshot {
                x: 3,
                z: 4,
                force_kept: false,
                in_use: false,
                entities_loaded: true,
                has_player: false,
            },
        );
        host.add_player("world", 3, 4, true);
        let state = host
            .chunk_state(&ChunkPos {
                world: "world".into(),
                x: 3,
                z: 4,
            })
            .unwrap();
        assert!(state.has_player);
        assert_eq!(host.op_count(), 1);
    }
}
