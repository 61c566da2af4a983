//! Tile-local battles: groups (and, for the defending side, a structure)
//! locked in combat until one side is destroyed or flees.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::{BattleId, GroupId};

/// Which side of a battle a participant is on. Tile-local battles are always
/// two-sided (spec's open question on tile-local vs global indexing was
/// resolved in favor of tile-local; `Side` just labels the two camps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    One,
    Two,
}

impl Side {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

/// What kind of target a battle's side-two is fighting over: the occupying
/// group, a structure, or both simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Group,
    Structure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Active,
    Resolved,
}

/// A single group's standing within the battle: its last-known power
/// contribution, tracked so casualty allocation can be proportional even
/// after a participant is destroyed mid-battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleParticipant {
    pub group_id: GroupId,
    pub power: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleEventKind {
    Started,
    Joined,
    Casualties,
    Fled,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleEvent {
    pub kind: BattleEventKind,
    pub tick: u64,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    pub id: BattleId,
    pub x: i32,
    pub y: i32,
    pub side1: HashMap<GroupId, BattleParticipant>,
    pub side2: HashMap<GroupId, BattleParticipant>,
    /// Non-group power contributed by a defended structure, folded into
    /// side2's totals during resolution.
    pub structure_power: u32,
    pub structure_id: Option<super::StructureId>,
    pub target_types: BTreeSet<TargetType>,
    pub events: Vec<BattleEvent>,
    pub tick_count: u64,
    pub status: BattleStatus,
    pub started_at: u64,
}

impl Battle {
    #[must_use]
    pub fn side_power(&self, side: Side) -> u32 {
        let groups: u32 = match side {
            Side::One => self.side1.values().map(|p| p.power).sum(),
            Side::Two => self.side2.values().map(|p| p.power).sum(),
        };
        let structure = if side == Side::Two { self.structure_power } else { 0 };
        groups + structure
    }

    #[must_use]
    pub fn side_of(&self, group_id: &str) -> Option<Side> {
        if self.side1.contains_key(group_id) {
            Some(Side::One)
        } else if self.side2.contains_key(group_id) {
            Some(Side::Two)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_side_destroyed(&self, side: Side) -> bool {
        let groups_empty = match side {
            Side::One => self.side1.is_empty(),
            Side::Two => self.side2.is_empty(),
        };
        groups_empty && !(side == Side::Two && self.structure_power > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_power_folds_in_structure_power() {
        let mut battle = Battle {
            id: "b1".to_string(),
            x: 0,
            y: 0,
            side1: HashMap::from([(
                "g1".to_string(),
                BattleParticipant { group_id: "g1".to_string(), power: 10 },
            )]),
            side2: HashMap::new(),
            structure_power: 5,
            structure_id: Some("s1".to_string()),
            target_types: BTreeSet::from([TargetType::Structure]),
            events: Vec::new(),
            tick_count: 0,
            status: BattleStatus::Active,
            started_at: 0,
        };
        assert_eq!(battle.side_power(Side::One), 10);
        assert_eq!(battle.side_power(Side::Two), 5);

        battle.side2.insert(
            "g2".to_string(),
            BattleParticipant { group_id: "g2".to_string(), power: 3 },
        );
        assert_eq!(battle.side_power(Side::Two), 8);
    }
}
