//! Phase C (spec §4.5 step 5): dispatches every group not already claimed
//! by a battle this tick, by its current `status`.

use std::collections::{HashMap, HashSet};

use gisaima_utils::config::GisaimaConfig;

use crate::entities::{item, GroupId, GroupStatus, StorageDestination, Tile, World};

use super::battles::ChatDraft;

/// Items rolled per completed gather, keyed by biome. A stand-in for real
/// terrain-driven loot tables (out of scope, spec §4.5 step 5).
fn biome_yield(biome: &str) -> Vec<(&'static str, u64)> {
    match biome {
        "plains" => vec![("wooden_sticks", 3), ("stone_pieces", 1)],
        _ => vec![("wooden_sticks", 1)],
    }
}

struct RelocatePlan {
    group_id: GroupId,
    from: (i32, i32),
    to: (i32, i32),
    /// The path index the group will occupy once this plan is applied.
    next_index: usize,
    /// Whether `to` is the path's final tile, so the group should finalize
    /// straight to `Idle` the same tick it physically gets there instead of
    /// waiting for a further same-tile tick to notice.
    arrived: bool,
}

/// Dispatches every unprocessed group on every tile. Returns the number of
/// groups dispatched and any chat events the dispatch produced.
pub fn dispatch_groups(
    tiles: &mut HashMap<(i32, i32), Tile>,
    world: &World,
    now: u64,
    config: &GisaimaConfig,
    processed: &HashSet<GroupId>,
) -> (usize, Vec<ChatDraft>) {
    let mut dispatched = 0usize;
    let mut drafts = Vec::new();
    let mut relocations = Vec::new();

    let positions: Vec<(i32, i32)> = tiles.keys().copied().collect();
    for pos in positions {
        let Some(tile) = tiles.get_mut(&pos) else { continue };
        let group_ids: Vec<GroupId> = tile.groups.keys().cloned().collect();
        for gid in group_ids {
            if processed.contains(&gid) {
                continue;
            }
            let Some(status) = tile.groups.get(&gid).map(|g| g.status) else { continue };
            match status {
                GroupStatus::Mobilizing => {
                    if let Some(group) = tile.groups.get_mut(&gid) {
                        group.status = GroupStatus::Idle;
                        dispatched += 1;
                    }
                }
                GroupStatus::Gathering => {
                    if dispatch_gathering(tile, &gid, &mut drafts) {
                        dispatched += 1;
                    }
                }
                GroupStatus::Demobilising => {
                    if dispatch_demobilising(tile, &gid, now, &mut drafts) {
                        dispatched += 1;
                    }
                }
                GroupStatus::Moving => {
                    if let Some(plan) = plan_move(tile, &gid, now, world, config) {
                        relocations.push(plan);
                        dispatched += 1;
                    }
                }
                GroupStatus::Idle
                | GroupStatus::Building
                | GroupStatus::Crafting
                | GroupStatus::Fighting
                | GroupStatus::Fleeing
                | GroupStatus::Cancelling
                | GroupStatus::CancellingGather => {}
            }
        }
    }

    for plan in relocations {
        relocate(tiles, plan, now, world, config);
    }

    (dispatched, drafts)
}

fn dispatch_gathering(tile: &mut Tile, gid: &str, drafts: &mut Vec<ChatDraft>) -> bool {
    let Some(group) = tile.groups.get_mut(gid) else { return false };
    let Some(remaining) = group.gathering_ticks_remaining else { return false };

    if remaining > 1 {
        group.gathering_ticks_remaining = Some(remaining - 1);
        return true;
    }

    let biome = group.gathering_biome.clone().unwrap_or_else(|| "plains".to_string());
    for (code, amount) in biome_yield(&biome) {
        item::add(&mut group.items, code, amount);
    }
    group.status = GroupStatus::Idle;
    group.gathering_biome = None;
    group.gathering_ticks_remaining = None;

    drafts.push(ChatDraft {
        kind: "gather_complete",
        x: tile.x,
        y: tile.y,
        message: format!("a group finished gathering on ({}, {})", tile.x, tile.y),
        data: serde_json::json!({ "groupId": gid }),
    });
    true
}

fn dispatch_demobilising(tile: &mut Tile, gid: &str, now: u64, drafts: &mut Vec<ChatDraft>) -> bool {
    let Some(group) = tile.groups.get(gid) else { return false };
    let storage_destination = group.storage_destination.unwrap_or(StorageDestination::Shared);
    let owner = group.owner.clone();

    let Some(group) = tile.groups.remove(gid) else { return false };

    let Some(structure) = tile.structure.as_mut() else {
        // Structure vanished between the command and this tick; put the
        // group back rather than deleting units with nowhere to land.
        tile.groups.insert(gid.to_string(), group);
        if let Some(g) = tile.groups.get_mut(gid) {
            g.status = GroupStatus::Idle;
        }
        return true;
    };

    let mut player_unit_id = None;
    for (key, unit) in group.units {
        if unit.is_player() {
            player_unit_id = unit.player_id.clone();
        }
        structure.units.insert(key, unit);
    }

    for (code, amount) in group.items {
        match storage_destination {
            StorageDestination::Shared => item::add(&mut structure.items, code.as_str(), amount),
            StorageDestination::Personal => item::add(structure.banks.entry(owner.clone()).or_default(), code.as_str(), amount),
        }
    }

    if let Some(player_id) = player_unit_id {
        tile.players.insert(
            player_id.clone(),
            crate::entities::PlayerPresence { player_id, since: now },
        );
    }

    drafts.push(ChatDraft {
        kind: "demobilise_complete",
        x: tile.x,
        y: tile.y,
        message: format!("a group demobilised into a structure on ({}, {})", tile.x, tile.y),
        data: serde_json::json!({ "groupId": gid }),
    });
    true
}

fn plan_move(tile: &Tile, gid: &str, now: u64, world: &World, config: &GisaimaConfig) -> Option<RelocatePlan> {
    let group = tile.groups.get(gid)?;
    if now < group.next_move_time.unwrap_or(0) {
        return None;
    }

    let next_index = group.path_index.unwrap_or(0) + 1;
    let last_index = group.movement_path.len().saturating_sub(1);
    let to = group.movement_path.get(next_index).copied().unwrap_or((tile.x, tile.y));
    Some(RelocatePlan {
        group_id: gid.to_string(),
        from: (tile.x, tile.y),
        to,
        next_index,
        arrived: next_index >= last_index,
    })
}

fn relocate(tiles: &mut HashMap<(i32, i32), Tile>, plan: RelocatePlan, now: u64, world: &World, config: &GisaimaConfig) {
    let Some(mut group) = tiles.get_mut(&plan.from).and_then(|t| t.groups.remove(&plan.group_id)) else { return };

    group.x = plan.to.0;
    group.y = plan.to.1;

    if plan.arrived {
        group.status = GroupStatus::Idle;
        group.movement_path.clear();
        group.path_index = None;
        group.move_started = None;
        group.next_move_time = None;
        group.target_x = None;
        group.target_y = None;
    } else {
        group.path_index = Some(plan.next_index);
        group.next_move_time = Some(now + world.scaled_duration(world.tick_interval_ms));
    }

    let dest = tiles.entry(plan.to).or_insert_with(|| Tile::new(plan.to.0, plan.to.1));
    dest.groups.insert(plan.group_id.clone(), group);
}
