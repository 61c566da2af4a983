//! The entity model: `World`, `Tile`, `Group`, `Structure`, `Battle`, and the
//! per-player world record, plus the shared item-bag type they all store.

pub mod battle;
pub mod chat;
pub mod crafting;
pub mod group;
pub mod item;
pub mod player;
pub mod structure;
pub mod tile;
pub mod upgrade;
pub mod world;

pub use battle::{Battle, BattleEvent, BattleEventKind, BattleParticipant, BattleStatus, Side, TargetType};
pub use chat::ChatEvent;
pub use crafting::CraftingJob;
pub use group::{BattleRole, Group, GroupStatus, Motion, StorageDestination, Unit};
pub use item::ItemBag;
pub use player::PlayerWorldRecord;
pub use structure::{BuildingSlot, RecruitmentEntry, Structure, StructureStatus};
pub use tile::{PlayerPresence, Tile};
pub use upgrade::{Upgrade, UpgradeStatus, UpgradeTarget};
pub use world::World;

/// Opaque id types. All are plain strings at rest — the store is untyped —
/// but newtypes would buy little here since nearly every handler juggles
/// several id kinds together; plain aliases keep call sites readable.
pub type WorldId = String;
pub type PlayerId = String;
pub type GroupId = String;
pub type StructureId = String;
pub type BattleId = String;
pub type UpgradeId = String;
pub type CraftId = String;
pub type RecruitId = String;
pub type ItemCode = String;
