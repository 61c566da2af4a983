//! In-progress crafting jobs (`worlds/{worldId}/crafting/{craftId}`).

use serde::{Deserialize, Serialize};

use super::{CraftId, ItemBag, PlayerId, StructureId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftingJob {
    pub id: CraftId,
    pub player_id: PlayerId,
    pub recipe_id: String,
    /// A structure-bound craft (e.g. a workshop recipe) or `None` for a
    /// field craft performed by a group directly.
    pub structure_id: Option<StructureId>,
    pub started_at: u64,
    pub completes_at: u64,
    /// Materials committed at start time, refunded in full on cancellation.
    pub materials_committed: ItemBag,
}

impl CraftingJob {
    #[must_use]
    pub fn is_complete_at(&self, now: u64) -> bool {
        now >= self.completes_at
    }
}
