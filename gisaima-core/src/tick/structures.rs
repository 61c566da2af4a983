//! Phase B (spec §4.5 step 4): advances a tile's under-construction
//! structure by one tick's worth of build progress.

use crate::catalog::Catalog;
use crate::entities::{GroupStatus, StructureStatus, Tile};

/// Advances `tile`'s structure build progress, completing it and freeing
/// its builder group when `buildProgress` reaches `buildTotalTime`. Returns
/// `true` if a structure was advanced (building or just completed).
pub fn advance_building(tile: &mut Tile, catalog: &dyn Catalog) -> bool {
    let Some(structure) = tile.structure.as_mut() else { return false };
    if structure.status != StructureStatus::Building {
        return false;
    }

    let progress = structure.build_progress.unwrap_or(0) + 1;
    let total = structure
        .build_total_time
        .or_else(|| catalog.structure_defaults(&structure.structure_type).map(|d| d.base_build_time_ticks))
        .unwrap_or(1);

    if progress >= total {
        structure.status = StructureStatus::Active;
        structure.build_progress = None;
        structure.build_total_time = None;
        let builder = structure.builder.take();
        if let Some(builder_id) = builder {
            if let Some(group) = tile.groups.get_mut(&builder_id) {
                group.status = GroupStatus::Idle;
                group.build_structure_id = None;
            }
        }
    } else {
        structure.build_progress = Some(progress);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::entities::{Group, GroupStatus, ItemBag, Structure, StructureStatus};
    use std::collections::HashMap;

    fn building_structure(progress: u64, total: u64, builder: Option<&str>) -> Structure {
        Structure {
            id: "s1".to_string(),
            x: 0,
            y: 0,
            owner: Some("p1".to_string()),
            structure_type: "outpost".to_string(),
            name: "Outpost".to_string(),
            race: None,
            level: 1,
            status: StructureStatus::Building,
            build_progress: Some(progress),
            build_total_time: Some(total),
            builder: builder.map(str::to_string),
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

    fn idle_group(id: &str) -> Group {
        Group {
            id: id.to_string(),
            owner: "p1".to_string(),
            name: None,
            race: None,
            status: GroupStatus::Building,
            x: 0,
            y: 0,
            units: HashMap::new(),
            items: ItemBag::new(),
            motion: Default::default(),
            movement_path: Vec::new(),
            path_index: None,
            move_started: None,
            next_move_time: None,
            target_x: None,
            target_y: None,
            gathering_biome: None,
            gathering_ticks_remaining: None,
            build_structure_id: Some("s1".to_string()),
            demobilise_structure_id: None,
            storage_destination: None,
            battle_id: None,
            battle_role: None,
            battle_side: None,
            flee_tick_requested: None,
            cancel_request_time: None,
            created_at: 0,
        }
    }

    #[test]
    fn advances_progress_without_completing() {
        let mut tile = Tile::new(0, 0);
        tile.structure = Some(building_structure(0, 3, Some("g1")));
        tile.groups.insert("g1".to_string(), idle_group("g1"));
        let catalog = StaticCatalog::new();

        assert!(advance_building(&mut tile, &catalog));
        assert_eq!(tile.structure.unwrap().build_progress, Some(1));
    }

    #[test]
    fn completes_and_frees_builder_once_progress_reaches_total() {
        let mut tile = Tile::new(0, 0);
        tile.structure = Some(building_structure(2, 3, Some("g1")));
        tile.groups.insert("g1".to_string(), idle_group("g1"));
        let catalog = StaticCatalog::new();

        assert!(advance_building(&mut tile, &catalog));
        let structure = tile.structure.unwrap();
        assert_eq!(structure.status, StructureStatus::Active);
        assert!(structure.builder.is_none());
        let builder = &tile.groups["g1"];
        assert_eq!(builder.status, GroupStatus::Idle);
        assert_eq!(builder.build_structure_id, None);
    }
}
