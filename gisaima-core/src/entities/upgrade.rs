//! In-progress structure and building upgrades
//! (`worlds/{worldId}/upgrades/{upgradeId}`).

use serde::{Deserialize, Serialize};

use super::{ItemBag, StructureId, UpgradeId, WorldId};

/// What an upgrade job targets: the structure itself, or one of its
/// building slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UpgradeTarget {
    Structure,
    Building { building_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeStatus {
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub id: UpgradeId,
    pub world_id: WorldId,
    pub structure_id: StructureId,
    pub x: i32,
    pub y: i32,
    pub target: UpgradeTarget,
    pub from_level: u32,
    pub to_level: u32,
    pub started_at: u64,
    pub completes_at: u64,
    pub resources: ItemBag,
    pub status: UpgradeStatus,
}

impl Upgrade {
    #[must_use]
    pub fn is_complete_at(&self, now: u64) -> bool {
        now >= self.completes_at
    }
}
