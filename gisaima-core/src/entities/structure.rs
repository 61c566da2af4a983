//! Stationary structures: outposts, watchtowers, fortresses, strongholds,
//! and the per-world spawn.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{GroupId, ItemBag, PlayerId, RecruitId, StructureId, Unit, UpgradeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructureStatus {
    Building,
    Active,
    /// A structure upgrade is in progress; the structure stays usable.
    Upgrading,
    Destroyed,
}

/// A building slot within a structure (e.g. a barracks, a workshop), each
/// independently levelable via `startBuildingUpgrade`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingSlot {
    pub building_type: String,
    pub level: u32,
    #[serde(default)]
    pub upgrade_in_progress: bool,
    pub upgrade_id: Option<UpgradeId>,
    pub upgrade_completes_at: Option<u64>,
}

/// One entry in a structure's recruitment queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitmentEntry {
    pub id: RecruitId,
    pub player_id: PlayerId,
    pub unit_type: String,
    pub quantity: u32,
    pub started_at: u64,
    pub completes_at: u64,
    /// What was actually drawn from bank/shared storage to pay for this
    /// entry, so `cancelRecruitment` can refund the right amounts.
    pub resource_deduction: ItemBag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub id: StructureId,
    pub x: i32,
    pub y: i32,
    pub owner: Option<PlayerId>,
    pub structure_type: String,
    pub name: String,
    pub race: Option<String>,
    pub level: u32,
    pub status: StructureStatus,

    // Under-construction fields; `None` once status leaves `Building`.
    pub build_progress: Option<u64>,
    pub build_total_time: Option<u64>,
    pub builder: Option<GroupId>,

    // Structure-level upgrade in progress; `None` unless `status=Upgrading`.
    #[serde(default)]
    pub upgrade_in_progress: bool,
    pub upgrade_id: Option<UpgradeId>,
    pub upgrade_completes_at: Option<u64>,

    #[serde(default)]
    pub items: ItemBag,
    #[serde(default)]
    pub banks: HashMap<PlayerId, ItemBag>,
    #[serde(default)]
    pub buildings: HashMap<String, BuildingSlot>,
    #[serde(default)]
    pub recruitment_queue: HashMap<RecruitId, RecruitmentEntry>,
    /// Units merged in by demobilised groups; a standing garrison rather
    /// than a mobile group, not itself picked up by the group tick phases.
    #[serde(default)]
    pub units: HashMap<String, Unit>,

    pub in_battle: Option<super::BattleId>,

    pub created_at: u64,
}

impl Structure {
    #[must_use]
    pub fn is_owned_by(&self, player_id: &str) -> bool {
        self.owner.as_deref() == Some(player_id)
    }

    /// Draws `amount` of `code`, preferring `player`'s personal bank and
    /// falling back to shared storage when the player owns the structure
    /// (spec's two-stage resource deduction policy). Returns the amount
    /// actually drawn.
    pub fn draw_resource(&mut self, player: &str, code: &str, amount: u64) -> u64 {
        let mut remaining = amount;
        let mut drawn = 0;

        if let Some(bank) = self.banks.get_mut(player) {
            let have = bank.get(code).copied().unwrap_or(0);
            let take = have.min(remaining);
            if take > 0 {
                let left = have - take;
                if left == 0 {
                    bank.remove(code);
                } else {
                    bank.insert(code.to_string(), left);
                }
                drawn += take;
                remaining -= take;
            }
        }

        if remaining > 0 && self.is_owned_by(player) {
            let have = self.items.get(code).copied().unwrap_or(0);
            let take = have.min(remaining);
            if take > 0 {
                let left = have - take;
                if left == 0 {
                    self.items.remove(code);
                } else {
                    self.items.insert(code.to_string(), left);
                }
                drawn += take;
            }
        }

        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Structure {
        Structure {
            id: "s1".to_string(),
            x: 0,
            y: 0,
            owner: Some("p1".to_string()),
            structure_type: "outpost".to_string(),
            name: "Outpost".to_string(),
            race: None,
            level: 1,
            status: StructureStatus::Active,
            build_progress: None,
            build_total_time: None,
            builder: None,
            upgrade_in_progress: false,
            upgrade_id: None,
            upgrade_completes_at: None,
            items: ItemBag::new(),
            banks: HashMap::new(),
            buildings: HashMap::new(),
            recruitment_queue: HashMap::new(),
            units: HashMap::new(),
            in_battle: None,
            created_at: 0,
        }
    }

    #[test]
    fn draw_resource_prefers_personal_bank_then_shared() {
        let mut s = base();
        s.banks
            .insert("p1".to_string(), ItemBag::from([("wood".to_string(), 2)]));
        s.items.insert("wood".to_string(), 10);

        let drawn = s.draw_resource("p1", "wood", 5);
        assert_eq!(drawn, 5);
        assert!(!s.banks["p1"].contains_key("wood"));
        assert_eq!(s.items["wood"], 7);
    }

    #[test]
    fn non_owner_cannot_draw_shared_storage() {
        let mut s = base();
        s.items.insert("wood".to_string(), 10);
        let drawn = s.draw_resource("other", "wood", 5);
        assert_eq!(drawn, 0);
    }
}
