//! Step 6 (spec §4.5): completion passes for structure/building upgrades,
//! crafting jobs, and recruitment queue entries — the tick-driven half of
//! each, the command handlers in `crate::command` own the other half
//! (starting and cancelling).

use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::entities::{
    CraftingJob, PlayerWorldRecord, StructureStatus, Unit, Upgrade, UpgradeStatus, UpgradeTarget,
};

use super::battles::ChatDraft;

/// Completes every in-progress upgrade whose `completesAt` has passed:
/// bumps the target's level, grants it the catalog's `max_level`-gated
/// features implicitly (level itself is the feature gate; nothing else to
/// apply), and clears the structure's upgrading state.
pub fn complete_upgrades(
    upgrades: &mut HashMap<String, Upgrade>,
    structures: &mut HashMap<(i32, i32), crate::entities::Structure>,
    now: u64,
    drafts: &mut Vec<ChatDraft>,
) -> usize {
    let mut completed = 0;
    for upgrade in upgrades.values_mut() {
        if upgrade.status != UpgradeStatus::InProgress || !upgrade.is_complete_at(now) {
            continue;
        }
        let Some(structure) = structures.get_mut(&(upgrade.x, upgrade.y)) else {
            continue;
        };
        if structure.id != upgrade.structure_id {
            continue;
        }

        match &upgrade.target {
            UpgradeTarget::Structure => {
                structure.level = upgrade.to_level;
                structure.status = StructureStatus::Active;
                structure.upgrade_in_progress = false;
                structure.upgrade_id = None;
                structure.upgrade_completes_at = None;
            }
            UpgradeTarget::Building { building_id } => {
                if let Some(slot) = structure.buildings.get_mut(building_id) {
                    slot.level = upgrade.to_level;
                    slot.upgrade_in_progress = false;
                    slot.upgrade_id = None;
                    slot.upgrade_completes_at = None;
                }
            }
        }

        upgrade.status = UpgradeStatus::Completed;
        completed += 1;
        drafts.push(ChatDraft {
            kind: "upgrade_complete",
            x: upgrade.x,
            y: upgrade.y,
            message: format!("an upgrade completed on ({}, {})", upgrade.x, upgrade.y),
            data: serde_json::json!({ "upgradeId": upgrade.id, "toLevel": upgrade.to_level }),
        });
    }
    completed
}

/// Completes every crafting job whose `completesAt` has passed, crediting
/// the owning player's crafting XP/level and clearing `craftingCurrent`.
pub fn complete_crafting(
    jobs: &mut HashMap<String, CraftingJob>,
    players: &mut HashMap<String, PlayerWorldRecord>,
    now: u64,
    drafts: &mut Vec<ChatDraft>,
) -> Vec<String> {
    let mut finished_ids = Vec::new();
    for job in jobs.values() {
        if !job.is_complete_at(now) {
            continue;
        }
        finished_ids.push(job.id.clone());

        let Some(player) = players.get_mut(&job.player_id) else { continue };
        if player.crafting_current.as_ref().map(|c| &c.id) != Some(&job.id) {
            continue;
        }
        player.crafting_current = None;
        player.skills_crafting_xp += xp_for(job);
        while player.skills_crafting_xp >= xp_to_next_level(player.skills_crafting_level) {
            player.skills_crafting_xp -= xp_to_next_level(player.skills_crafting_level);
            player.skills_crafting_level += 1;
        }

        drafts.push(ChatDraft {
            kind: "craft_complete",
            x: 0,
            y: 0,
            message: format!("{} finished crafting {}", job.player_id, job.recipe_id),
            data: serde_json::json!({ "craftId": job.id }),
        });
    }
    finished_ids
}

fn xp_for(job: &CraftingJob) -> u64 {
    job.materials_committed.values().sum::<u64>().max(1)
}

fn xp_to_next_level(level: u32) -> u64 {
    u64::from(level) * 100
}

/// Completes every recruitment entry whose `completesAt` has passed,
/// adding the recruited units to the structure's garrison (the same
/// `units` collection a demobilising group merges into).
pub fn complete_recruitment(
    structures: &mut HashMap<(i32, i32), crate::entities::Structure>,
    catalog: &dyn Catalog,
    now: u64,
    drafts: &mut Vec<ChatDraft>,
) -> usize {
    let mut completed = 0;
    for structure in structures.values_mut() {
        let finished: Vec<String> = structure
            .recruitment_queue
            .iter()
            .filter(|(_, entry)| now >= entry.completes_at)
            .map(|(id, _)| id.clone())
            .collect();

        for id in finished {
            let Some(entry) = structure.recruitment_queue.remove(&id) else { continue };
            let strength = catalog.unit_stats(&entry.unit_type).map(|s| s.base_strength);
            for i in 0..entry.quantity {
                let key = format!("{}-{}", entry.id, i);
                structure.units.insert(
                    key,
                    Unit {
                        unit_type: entry.unit_type.clone(),
                        strength,
                        motion: Default::default(),
                        capacity: None,
                        player_id: None,
                    },
                );
            }
            completed += 1;
            drafts.push(ChatDraft {
                kind: "recruit_complete",
                x: structure.x,
                y: structure.y,
                message: format!("{} recruited {} {}", entry.player_id, entry.quantity, entry.unit_type),
                data: serde_json::json!({ "recruitId": entry.id }),
            });
        }
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::entities::{ItemBag, RecruitmentEntry, Structure, UpgradeTarget};
    use std::collections::HashMap;

    fn base_structure() -> Structure {
        Structure {
            id: "s1".to_string(),
            x: 0,
            y: 0,
            owner: Some("p1".to_string()),
            structure_type: "outpost".to_string(),
            name: "Outpost".to_string(),
            race: None,
            level: 1,
            status: StructureStatus::Upgrading,
            build_progress: None,
            build_total_time: None,
            builder: None,
            upgrade_in_progress: true,
            upgrade_id: Some("u1".to_string()),
            upgrade_completes_at: Some(10),
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
    fn completes_structure_upgrade_once_due() {
        let mut structures = HashMap::from([((0, 0), base_structure())]);
        let mut upgrades = HashMap::from([(
            "u1".to_string(),
            Upgrade {
                id: "u1".to_string(),
                world_id: "w1".to_string(),
                structure_id: "s1".to_string(),
                x: 0,
                y: 0,
                target: UpgradeTarget::Structure,
                from_level: 1,
                to_level: 2,
                started_at: 0,
                completes_at: 10,
                resources: ItemBag::new(),
                status: UpgradeStatus::InProgress,
            },
        )]);
        let mut drafts = Vec::new();

        let completed = complete_upgrades(&mut upgrades, &mut structures, 10, &mut drafts);
        assert_eq!(completed, 1);
        assert_eq!(structures[&(0, 0)].level, 2);
        assert_eq!(structures[&(0, 0)].status, StructureStatus::Active);
        assert_eq!(upgrades["u1"].status, UpgradeStatus::Completed);
    }

    #[test]
    fn leaves_upgrade_untouched_before_completes_at() {
        let mut structures = HashMap::from([((0, 0), base_structure())]);
        let mut upgrades = HashMap::from([(
            "u1".to_string(),
            Upgrade {
                id: "u1".to_string(),
                world_id: "w1".to_string(),
                structure_id: "s1".to_string(),
                x: 0,
                y: 0,
                target: UpgradeTarget::Structure,
                from_level: 1,
                to_level: 2,
                started_at: 0,
                completes_at: 10,
                resources: ItemBag::new(),
                status: UpgradeStatus::InProgress,
            },
        )]);
        let mut drafts = Vec::new();

        let completed = complete_upgrades(&mut upgrades, &mut structures, 5, &mut drafts);
        assert_eq!(completed, 0);
        assert_eq!(structures[&(0, 0)].level, 1);
    }

    #[test]
    fn completes_recruitment_and_adds_units_to_garrison() {
        let mut structure = base_structure();
        structure.status = StructureStatus::Active;
        structure.recruitment_queue.insert(
            "r1".to_string(),
            RecruitmentEntry {
                id: "r1".to_string(),
                player_id: "p1".to_string(),
                unit_type: "human_warrior".to_string(),
                quantity: 2,
                started_at: 0,
                completes_at: 5,
                resource_deduction: ItemBag::new(),
            },
        );
        let mut structures = HashMap::from([((0, 0), structure)]);
        let catalog = StaticCatalog::new();
        let mut drafts = Vec::new();

        let completed = complete_recruitment(&mut structures, &catalog, 5, &mut drafts);
        assert_eq!(completed, 1);
        assert!(structures[&(0, 0)].recruitment_queue.is_empty());
        assert_eq!(structures[&(0, 0)].units.len(), 2);
    }
}
