//! A player's per-world record (`players/{uid}/worlds/{worldId}`).

use serde::{Deserialize, Serialize};

use super::{CraftingJob, GroupId, PlayerId, WorldId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerWorldRecord {
    pub uid: PlayerId,
    pub world_id: WorldId,
    pub last_location: Option<(i32, i32)>,
    pub in_group: Option<GroupId>,
    /// `false` once the player's last group is destroyed in battle without
    /// surviving units; the player record itself is never deleted, it just
    /// stops being a combatant until they `spawnPlayer` again.
    pub alive: bool,
    pub race: String,
    pub display_name: String,
    #[serde(default)]
    pub achievements: Vec<String>,
    pub crafting_current: Option<CraftingJob>,
    pub skills_crafting_xp: u64,
    pub skills_crafting_level: u32,
}

impl PlayerWorldRecord {
    #[must_use]
    pub fn new(uid: impl Into<PlayerId>, world_id: impl Into<WorldId>, race: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            world_id: world_id.into(),
            last_location: None,
            in_group: None,
            alive: true,
            race: race.into(),
            display_name: display_name.into(),
            achievements: Vec::new(),
            crafting_current: None,
            skills_crafting_xp: 0,
            skills_crafting_level: 1,
        }
    }
}
