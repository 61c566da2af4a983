//! The monster AI contract: a pluggable decision-maker the tick engine
//! consults once per idle monster-owned group, each tick.
//!
//! A production deployment is expected to bring its own, likely far more
//! elaborate, implementation; [`ReflexMonsterAi`] is a minimal reference
//! that satisfies the contract well enough to drive end-to-end tests.

use crate::entities::{Group, Tile};

/// A monster group's decision for the tick that just ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonsterDecision {
    Stay,
    MoveTo { x: i32, y: i32 },
    Gather { resource: String },
    /// Attack whichever group or structure already occupies the tile the
    /// monster is standing on.
    AttackHere,
}

/// Implemented by whatever decides monster behavior. Called once per idle
/// monster group per tick, with a read-only view of the tile it occupies.
pub trait MonsterAi: Send + Sync {
    fn decide(&self, group: &Group, tile: &Tile) -> MonsterDecision;
}

/// A minimal, deterministic reference implementation: attacks if it shares
/// the tile with a hostile group or a structure it doesn't own, otherwise
/// wanders one step toward the origin, otherwise stays put.
pub struct ReflexMonsterAi;

impl MonsterAi for ReflexMonsterAi {
    fn decide(&self, group: &Group, tile: &Tile) -> MonsterDecision {
        let hostile_group_present = tile.groups.values().any(|g| g.id != group.id && g.owner != group.owner);
        let hostile_structure_present = tile
            .structure
            .as_ref()
            .is_some_and(|s| s.owner.as_deref() != Some(group.owner.as_str()));

        if hostile_group_present || hostile_structure_present {
            return MonsterDecision::AttackHere;
        }

        if group.x == 0 && group.y == 0 {
            return MonsterDecision::Stay;
        }

        let step_x = group.x - group.x.signum();
        let step_y = group.y - group.y.signum();
        MonsterDecision::MoveTo { x: step_x, y: step_y }
    }
}
