//! A single world tile: the groups, players, structure, battles, and loose
//! items located at one `(x, y)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Battle, BattleId, Group, GroupId, ItemBag, PlayerId, Structure};

/// A player's mere presence on a tile (distinct from owning a group there —
/// a player can stand on a tile between group actions, e.g. right after
/// `spawnPlayer` and before their first `mobilise`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPresence {
    pub player_id: PlayerId,
    pub since: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub groups: HashMap<GroupId, Group>,
    #[serde(default)]
    pub players: HashMap<PlayerId, PlayerPresence>,
    pub structure: Option<Structure>,
    #[serde(default)]
    pub battles: HashMap<BattleId, Battle>,
    /// Loose items dropped on the ground, distinct from a structure's
    /// warehouse or a player's personal bank.
    #[serde(default)]
    pub items: ItemBag,
}

impl Tile {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
            && self.players.is_empty()
            && self.structure.is_none()
            && self.battles.is_empty()
            && self.items.is_empty()
    }

    #[must_use]
    pub fn groups_owned_by<'a>(&'a self, player_id: &'a str) -> impl Iterator<Item = &'a Group> {
        self.groups.values().filter(move |g| g.owner == player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tile_is_empty() {
        assert!(Tile::new(3, 4).is_empty());
    }
}
