//! Mobile groups: the unit that moves, gathers, fights, and builds.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::{BattleId, GroupId, ItemBag, PlayerId, StructureId};

/// A group's lifecycle status; drives which tick phase picks it up and
/// which commands are legal against it (spec §4.4 group state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupStatus {
    Idle,
    Mobilizing,
    Demobilising,
    Moving,
    Gathering,
    Building,
    Crafting,
    Fighting,
    Fleeing,
    /// Transitional: a cancel was requested but the tick hasn't observed it yet.
    Cancelling,
    /// Transitional: cancelling a gather specifically, distinct from
    /// `Cancelling` since an in-progress gather also owes a partial refund.
    CancellingGather,
}

/// Terrain a unit can traverse. Stored as a set rather than bitflags since
/// the dependency carrying that crate was dropped; a handful of variants
/// make a `BTreeSet` no heavier in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    Ground,
    Water,
    Flying,
}

/// A single unit within a group. Player-controlled units are identified by
/// convention (`unit_type == "player"`) rather than a separate flag, mirroring
/// how the catalog keys every other unit type by its type string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub unit_type: String,
    pub strength: Option<u32>,
    #[serde(default)]
    pub motion: BTreeSet<Motion>,
    /// Boat capacity, for units that can ferry other units.
    pub capacity: Option<u32>,
    /// Present only on player-controlled units.
    pub player_id: Option<PlayerId>,
}

impl Unit {
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.unit_type == "player"
    }

    /// Default strength when a unit record carries none: spec §4.6 step 2.
    #[must_use]
    pub fn effective_strength(&self) -> u32 {
        self.strength.unwrap_or(1)
    }
}

/// Where a gather's spoils, or a demobilised group's items, should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageDestination {
    Shared,
    Personal,
}

/// A group's role within a battle it has joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleRole {
    Attacker,
    Defender,
    Supporter,
}

/// A mobile group of units occupying a tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub owner: PlayerId,
    pub name: Option<String>,
    pub race: Option<String>,
    pub status: GroupStatus,
    pub x: i32,
    pub y: i32,
    pub units: HashMap<String, Unit>,
    #[serde(default)]
    pub items: ItemBag,
    #[serde(default)]
    pub motion: BTreeSet<Motion>,

    // Moving
    pub movement_path: Vec<(i32, i32)>,
    pub path_index: Option<usize>,
    pub move_started: Option<u64>,
    pub next_move_time: Option<u64>,
    pub target_x: Option<i32>,
    pub target_y: Option<i32>,

    // Gathering
    pub gathering_biome: Option<String>,
    pub gathering_ticks_remaining: Option<u32>,

    // Building
    pub build_structure_id: Option<StructureId>,

    // Demobilising
    pub demobilise_structure_id: Option<StructureId>,
    pub storage_destination: Option<StorageDestination>,

    // Battle
    pub battle_id: Option<BattleId>,
    pub battle_role: Option<BattleRole>,
    pub battle_side: Option<super::Side>,
    pub flee_tick_requested: Option<u64>,

    // Cancellation (transitional statuses)
    pub cancel_request_time: Option<u64>,

    pub created_at: u64,
}

impl Group {
    /// Total strength summed across all units, used for battle power and
    /// monster-AI aggression comparisons. Per spec §4.6 step 2, a group's
    /// power is never below 1 while it holds any units.
    #[must_use]
    pub fn total_strength(&self) -> u32 {
        if self.units.is_empty() {
            return 0;
        }
        self.units.values().map(Unit::effective_strength).sum::<u32>().max(1)
    }

    #[must_use]
    pub fn is_empty_of_units(&self) -> bool {
        self.units.is_empty()
    }

    #[must_use]
    pub fn in_battle(&self) -> bool {
        self.battle_id.is_some()
    }

    #[must_use]
    pub fn player_unit(&self) -> Option<&Unit> {
        self.units.values().find(|u| u.is_player())
    }
}
