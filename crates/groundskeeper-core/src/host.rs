//! The seam between the cleanup engine and the game server.
//!
//! Everything the services know about the world arrives through the
//! [`Host`] trait as plain snapshot structs captured at call time. The
//! engine never holds live references into server state: a snapshot may
//! be stale by the time a removal lands, which is why removal goes back
//! through [`Host::is_removable`] before it counts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an item or mob, unique for the life of the server.
pub type EntityId = Uuid;

/// Mob and creature categories the engine can match against config.
///
/// Parsing accepts the conventional upper-snake spelling
/// (`CAVE_SPIDER`) case-insensitively; unknown names are rejected so
/// the config layer can warn and drop them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Zombie,
    Skeleton,
    Creeper,
    Spider,
    CaveSpider,
    Enderman,
    Witch,
    Slime,
    Phantom,
    Drowned,
    Husk,
    Stray,
    Blaze,
    Ghast,
    MagmaCube,
    WitherSkeleton,
    Pillager,
    Vindicator,
    Evoker,
    Vex,
    Ravager,
    Guardian,
    Silverfish,
    Endermite,
    Cow,
    Sheep,
    Pig,
    Chicken,
    Rabbit,
    Horse,
    Wolf,
    Cat,
    Parrot,
    Fox,
    Villager,
    IronGolem,
    Bat,
    Squid,
}

impl EntityKind {
    /// Canonical upper-snake name, matching the config spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zombie => "ZOMBIE",
            Self::Skeleton => "SKELETON",
            Self::Creeper => "CREEPER",
            Self::Spider => "SPIDER",
            Self::CaveSpider => "CAVE_SPIDER",
            Self::Enderman => "ENDERMAN",
            Self::Witch => "WITCH",
            Self::Slime => "SLIME",
            Self::Phantom => "PHANTOM",
            Self::Drowned => "DROWNED",
            Self::Husk => "HUSK",
            Self::Stray => "STRAY",
            Self::Blaze => "BLAZE",
            Self::Ghast => "GHAST",
            Self::MagmaCube => "MAGMA_CUBE",
            Self::WitherSkeleton => "WITHER_SKELETON",
            Self::Pillager => "PILLAGER",
            Self::Vindicator => "VINDICATOR",
            Self::Evoker => "EVOKER",
            Self::Vex => "VEX",
            Self::Ravager => "RAVAGER",
            Self::Guardian => "GUARDIAN",
            Self::Silverfish => "SILVERFISH",
            Self::Endermite => "ENDERMITE",
            Self::Cow => "COW",
            Self::Sheep => "SHEEP",
            Self::Pig => "PIG",
            Self::Chicken => "CHICKEN",
            Self::Rabbit => "RABBIT",
            Self::Horse => "HORSE",
            Self::Wolf => "WOLF",
            Self::Cat => "CAT",
            Self::Parrot => "PARROT",
            Self::Fox => "FOX",
            Self::Villager => "VILLAGER",
            Self::IronGolem => "IRON_GOLEM",
            Self::Bat => "BAT",
            Self::Squid => "SQUID",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let kind = match upper.as_str() {
            "ZOMBIE" => Self::Zombie,
            "SKELETON" => Self::Skeleton,
            "CREEPER" => Self::Creeper,
            "SPIDER" => Self::Spider,
            "CAVE_SPIDER" => Self::CaveSpider,
            "ENDERMAN" => Self::Enderman,
            "WITCH" => Self::Witch,
            "SLIME" => Self::Slime,
            "PHANTOM" => Self::Phantom,
            "DROWNED" => Self::Drowned,
            "HUSK" => Self::Husk,
            "STRAY" => Self::Stray,
            "BLAZE" => Self::Blaze,
            "GHAST" => Self::Ghast,
            "MAGMA_CUBE" => Self::MagmaCube,
            "WITHER_SKELETON" => Self::WitherSkeleton,
            "PILLAGER" => Self::Pillager,
            "VINDICATOR" => Self::Vindicator,
            "EVOKER" => Self::Evoker,
            "VEX" => Self::Vex,
            "RAVAGER" => Self::Ravager,
            "GUARDIAN" => Self::Guardian,
            "SILVERFISH" => Self::Silverfish,
            "ENDERMITE" => Self::Endermite,
            "COW" => Self::Cow,
            "SHEEP" => Self::Sheep,
            "PIG" => Self::Pig,
            "CHICKEN" => Self::Chicken,
            "RABBIT" => Self::Rabbit,
            "HORSE" => Self::Horse,
            "WOLF" => Self::Wolf,
            "CAT" => Self::Cat,
            "PARROT" => Self::Parrot,
            "FOX" => Self::Fox,
            "VILLAGER" => Self::Villager,
            "IRON_GOLEM" => Self::IronGolem,
            "BAT" => Self::Bat,
            "SQUID" => Self::Squid,
            _ => return Err(UnknownEntityKind(s.trim().to_owned())),
        };
        Ok(kind)
    }
}

/// Returned when a config names an entity type the engine does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntityKind(pub String);

impl fmt::Display for UnknownEntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entity type: {}", self.0)
    }
}

impl std::error::Error for UnknownEntityKind {}

/// A dropped item stack as seen at scan time.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub id: EntityId,
    /// Material name in upper-snake form, e.g. `DIAMOND`.
    pub material: String,
    /// True when the stack carries a custom display name.
    pub custom_named: bool,
    /// Ticks since the stack hit the ground.
    pub age_ticks: u32,
}

/// A non-player entity as seen at scan time.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub custom_named: bool,
    pub leashed: bool,
    /// False for kinds that cannot be tamed.
    pub tamed: bool,
}

/// A loaded chunk as seen at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSnapshot {
    /// Chunk coordinate (block coordinate right-shifted by four).
    pub x: i32,
    pub z: i32,
    /// Pinned by the server or another plugin; never unload.
    pub force_kept: bool,
    /// Actively ticking on behalf of something (spawners, redstone).
    pub in_use: bool,
    /// Entities for this chunk are fully loaded; required before unload.
    pub entities_loaded: bool,
    /// A player is standing in this chunk.
    pub has_player: bool,
}

/// World-qualified chunk coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkPos {
    pub world: String,
    pub x: i32,
    pub z: i32,
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.world, self.x, self.z)
    }
}

/// Handle for an asynchronous chunk-unload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnloadTicket(pub u64);

/// Server-side surface the cleanup engine runs against.
///
/// Implementations are expected to be cheap for the count/snapshot
/// methods; the engine calls them on scheduled cadences, never per tick.
pub trait Host {
    /// Names of all loaded worlds.
    fn world_names(&self) -> Vec<String>;

    /// Dropped items currently in `world`.
    fn items_in(&self, world: &str) -> Vec<ItemSnapshot>;

    /// Non-player entities currently in `world` (items excluded).
    fn entities_in(&self, world: &str) -> Vec<EntitySnapshot>;

    /// Every loaded chunk in `world`.
    fn loaded_chunks(&self, world: &str) -> Vec<ChunkSnapshot>;

    /// Fresh state for one chunk, or `None` if it is no longer loaded.
    fn chunk_state(&self, pos: &ChunkPos) -> Option<ChunkSnapshot>;

    /// Chunk coordinates of every player in `world`.
    fn player_chunk_positions(&self, world: &str) -> Vec<(i32, i32)>;

    /// Whether the entity still exists, is valid, and is not a player.
    fn is_removable(&self, id: EntityId) -> bool;

    /// Remove the entity. Returns false if it vanished first.
    fn remove_entity(&mut self, id: EntityId) -> bool;

    /// Queue an asynchronous unload for the chunk.
    fn request_chunk_unload(&mut self, pos: &ChunkPos) -> UnloadTicket;

    /// Poll an unload request: `Some(success)` once resolved, `None`
    /// while still pending.
    fn poll_unload(&mut self, ticket: UnloadTicket) -> Option<bool>;

    /// Synchronous best-effort unload, used by the manual path.
    fn unload_chunk(&mut self, pos: &ChunkPos) -> bool;

    /// Message every player on the server.
    fn broadcast(&mut self, message: &str);

    /// Message operators only.
    fn notify_ops(&mut self, message: &str);

    /// Native tick-rate averages (1m, 5m, 15m) when the server exposes
    /// them. `None` means the engine falls back to self-measured TPS.
    fn native_tps(&self) -> Option<Vec<f64>> {
        None
    }

    /// Short server flavor tag for logs, e.g. `"paper"`.
    fn server_flavor(&self) -> &str {
        "generic"
    }
}
