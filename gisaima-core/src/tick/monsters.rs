//! Step 7 (spec §4.5) and the monster AI external-collaborator contract
//! (spec §4.7): `spawn_monsters`, `monster_strategy_tick`, and
//! `merge_world_monster_groups` are the bulk, world-level passes; per-group
//! decisions still go through [`crate::monster_ai::MonsterAi`], invoked
//! here once per idle monster-owned group.

use std::collections::{HashMap, HashSet};

use gisaima_utils::ids::new_id;

use crate::command::attack::defensive_power;
use crate::entities::{
    Battle, BattleEvent, BattleEventKind, BattleParticipant, BattleRole, BattleStatus, Group, GroupId,
    GroupStatus, Side, TargetType, Tile, Unit,
};
use crate::monster_ai::{MonsterAi, MonsterDecision};

use super::battles::ChatDraft;

pub const MONSTER_OWNER: &str = "monster";

/// With probability `spawn_chance` (checked once per tick, not per tile),
/// adds a single fresh monster group to an arbitrary already-loaded tile
/// that has neither a structure nor an existing monster group. A no-op
/// when every loaded tile is unsuitable.
pub fn spawn_monsters(tiles: &mut HashMap<(i32, i32), Tile>, now: u64, spawn_chance: f64) -> Option<ChatDraft> {
    if rand::random::<f64>() >= spawn_chance {
        return None;
    }

    let target = tiles.iter().find(|(_, tile)| {
        tile.structure.is_none() && !tile.groups.values().any(|g| g.owner == MONSTER_OWNER)
    });
    let (&pos, _) = target?;
    let tile = tiles.get_mut(&pos)?;

    let group_id = new_id();
    let mut units = HashMap::new();
    units.insert(
        "u1".to_string(),
        Unit { unit_type: "monster_brute".to_string(), strength: Some(4), motion: Default::default(), capacity: None, player_id: None },
    );
    tile.groups.insert(
        group_id.clone(),
        Group {
            id: group_id.clone(),
            owner: MONSTER_OWNER.to_string(),
            name: None,
            race: None,
            status: GroupStatus::Idle,
            x: pos.0,
            y: pos.1,
            units,
            items: Default::default(),
            motion: Default::default(),
            movement_path: Vec::new(),
            path_index: None,
            move_started: None,
            next_move_time: None,
            target_x: None,
            target_y: None,
            gathering_biome: None,
            gathering_ticks_remaining: None,
            build_structure_id: None,
            demobilise_structure_id: None,
            storage_destination: None,
            battle_id: None,
            battle_role: None,
            battle_side: None,
            flee_tick_requested: None,
            cancel_request_time: None,
            created_at: now,
        },
    );

    Some(ChatDraft {
        kind: "monster_spawn",
        x: pos.0,
        y: pos.1,
        message: format!("a monster group appeared on ({}, {})", pos.0, pos.1),
        data: serde_json::json!({ "groupId": group_id }),
    })
}

/// Placeholder for the external collaborator hook: a production deployment
/// replaces this with real monster strategy (raiding, territory control,
/// etc); the reference engine drives individual monster groups entirely
/// through [`apply_monster_ai`] instead, so this pass is intentionally a
/// no-op.
pub fn monster_strategy_tick(_tiles: &mut HashMap<(i32, i32), Tile>) {}

/// Coalesces co-located idle monster groups on each tile into one, so a
/// tile never accumulates many fragmentary monster groups over time.
pub fn merge_world_monster_groups(tiles: &mut HashMap<(i32, i32), Tile>) -> usize {
    let mut merged = 0;
    for tile in tiles.values_mut() {
        let monster_ids: Vec<GroupId> = tile
            .groups
            .values()
            .filter(|g| g.owner == MONSTER_OWNER && g.status == GroupStatus::Idle)
            .map(|g| g.id.clone())
            .collect();
        if monster_ids.len() < 2 {
            continue;
        }

        let mut survivor = tile.groups.remove(&monster_ids[0]).expect("just collected");
        for id in &monster_ids[1..] {
            if let Some(other) = tile.groups.remove(id) {
                for (key, unit) in other.units {
                    survivor.units.insert(format!("{id}-{key}"), unit);
                }
                for (code, amount) in other.items {
                    crate::entities::item::add(&mut survivor.items, &code, amount);
                }
                merged += 1;
            }
        }
        tile.groups.insert(survivor.id.clone(), survivor);
    }
    merged
}

/// Invokes `ai` once per idle monster-owned group not already claimed by
/// battle processing, and applies its decision.
pub fn apply_monster_ai(
    tiles: &mut HashMap<(i32, i32), Tile>,
    ai: &dyn MonsterAi,
    now: u64,
    processed: &HashSet<GroupId>,
) -> (usize, Vec<ChatDraft>) {
    let mut decided = 0;
    let mut drafts = Vec::new();

    let positions: Vec<(i32, i32)> = tiles.keys().copied().collect();
    for pos in positions {
        let Some(tile) = tiles.get(&pos) else { continue };
        let monster_ids: Vec<GroupId> = tile
            .groups
            .values()
            .filter(|g| g.owner == MONSTER_OWNER && g.status == GroupStatus::Idle && !processed.contains(&g.id))
            .map(|g| g.id.clone())
            .collect();

        for gid in monster_ids {
            let Some(tile) = tiles.get(&pos) else { continue };
            let Some(group) = tile.groups.get(&gid) else { continue };
            let decision = ai.decide(group, tile);
            decided += 1;
            apply_decision(tiles, pos, &gid, decision, now, &mut drafts);
        }
    }

    (decided, drafts)
}

fn apply_decision(
    tiles: &mut HashMap<(i32, i32), Tile>,
    pos: (i32, i32),
    gid: &str,
    decision: MonsterDecision,
    now: u64,
    drafts: &mut Vec<ChatDraft>,
) {
    match decision {
        MonsterDecision::Stay => {}
        MonsterDecision::MoveTo { x, y } => {
            let Some(mut group) = tiles.get_mut(&pos).and_then(|t| t.groups.remove(gid)) else { return };
            group.x = x;
            group.y = y;
            let dest = tiles.entry((x, y)).or_insert_with(|| Tile::new(x, y));
            dest.groups.insert(gid.to_string(), group);
        }
        MonsterDecision::Gather { resource } => {
            let Some(tile) = tiles.get_mut(&pos) else { return };
            let Some(group) = tile.groups.get_mut(gid) else { return };
            group.status = GroupStatus::Gathering;
            group.gathering_biome = Some(resource);
            group.gathering_ticks_remaining = Some(2);
        }
        MonsterDecision::AttackHere => {
            let Some(tile) = tiles.get_mut(&pos) else { return };
            open_monster_battle(tile, gid, now, drafts);
        }
    }
}

fn open_monster_battle(tile: &mut Tile, attacker_id: &str, now: u64, drafts: &mut Vec<ChatDraft>) {
    let Some(mut attacker) = tile.groups.remove(attacker_id) else { return };
    let attacker_power = attacker.total_strength();

    let mut side2 = HashMap::new();
    let mut target_types = std::collections::BTreeSet::new();
    let defender_ids: Vec<GroupId> = tile
        .groups
        .values()
        .filter(|g| g.owner != MONSTER_OWNER && g.status == GroupStatus::Idle)
        .map(|g| g.id.clone())
        .collect();
    for id in &defender_ids {
        if let Some(group) = tile.groups.get_mut(id) {
            group.status = GroupStatus::Fighting;
            let power = group.total_strength();
            side2.insert(id.clone(), BattleParticipant { group_id: id.clone(), power });
        }
    }
    if !defender_ids.is_empty() {
        target_types.insert(TargetType::Group);
    }

    let mut structure_power = 0;
    let mut structure_id = None;
    if let Some(structure) = tile.structure.as_mut() {
        if structure.owner.as_deref() != Some(MONSTER_OWNER) && structure.in_battle.is_none() {
            structure_power = defensive_power(&structure.structure_type);
            structure_id = Some(structure.id.clone());
            target_types.insert(TargetType::Structure);
        }
    }

    if side2.is_empty() && structure_power == 0 {
        // Nothing to fight; put the group back idle.
        attacker.status = GroupStatus::Idle;
        tile.groups.insert(attacker_id.to_string(), attacker);
        return;
    }

    let battle_id = new_id();
    attacker.status = GroupStatus::Fighting;
    attacker.battle_id = Some(battle_id.clone());
    attacker.battle_side = Some(Side::One);
    attacker.battle_role = Some(BattleRole::Attacker);
    let mut side1 = HashMap::new();
    side1.insert(attacker_id.to_string(), BattleParticipant { group_id: attacker_id.to_string(), power: attacker_power });
    tile.groups.insert(attacker_id.to_string(), attacker);

    if let Some(id) = &structure_id {
        if let Some(structure) = tile.structure.as_mut() {
            if &structure.id == id {
                structure.in_battle = Some(battle_id.clone());
            }
        }
    }

    let battle = Battle {
        id: battle_id.clone(),
        x: tile.x,
        y: tile.y,
        side1,
        side2,
        structure_power,
        structure_id,
        target_types,
        events: vec![BattleEvent {
            kind: BattleEventKind::Started,
            tick: 0,
            detail: serde_json::json!({ "attackerPower": attacker_power, "defenderPower": structure_power }),
        }],
        tick_count: 0,
        status: BattleStatus::Active,
        started_at: now,
    };
    drafts.push(ChatDraft {
        kind: "battle_start",
        x: tile.x,
        y: tile.y,
        message: format!("a monster group attacked on ({}, {})", tile.x, tile.y),
        data: serde_json::json!({ "battleId": battle_id }),
    });
    tile.battles.insert(battle_id, battle);
}
