//! The battle resolver (spec §4.6): advances every active battle on a tile
//! by one round. Pure and synchronous — it only mutates the `Tile` it is
//! given — so the async tick driver can call it without a store round trip
//! per battle.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::entities::{
    Battle, BattleEvent, BattleEventKind, BattleStatus, Group, GroupId, GroupStatus, PlayerId, Side, Tile,
};

/// Fraction of a fleeing group's non-player units lost to the flee attempt.
const FLEE_CASUALTY_RATE: f64 = 0.20;
/// Fraction of the opposing side's power each side inflicts on the other per round.
const ROUND_DAMAGE_FRACTION: f64 = 0.25;

/// A chat-worthy event produced while resolving battles, staged for the
/// caller to emit through [`crate::chat`] once the async layer is reached.
pub struct ChatDraft {
    pub kind: &'static str,
    pub x: i32,
    pub y: i32,
    pub message: String,
    pub data: serde_json::Value,
}

#[derive(Default)]
pub struct BattleOutcome {
    pub resolved: usize,
    /// `(player_id, x, y)` for every player-controlled unit whose group was
    /// destroyed this round, for the caller to mark `alive=false` on their
    /// world record.
    pub player_defeats: Vec<(PlayerId, i32, i32)>,
    pub chat_drafts: Vec<ChatDraft>,
}

/// Resolves every active battle on `tile` by one round, folding newly
/// touched group ids into `processed_groups` so phase C skips them.
pub fn resolve_tile_battles(tile: &mut Tile, now: u64, processed_groups: &mut HashSet<GroupId>) -> BattleOutcome {
    let mut outcome = BattleOutcome::default();
    let battle_ids: Vec<String> = tile.battles.keys().cloned().collect();

    for battle_id in battle_ids {
        let Some(mut battle) = tile.battles.remove(&battle_id) else { continue };
        if battle.status != BattleStatus::Active {
            continue;
        }

        for gid in battle.side1.keys().chain(battle.side2.keys()) {
            processed_groups.insert(gid.clone());
        }

        battle.tick_count += 1;

        handle_flees(&battle_id, &mut battle, tile, now, &mut outcome);
        refresh_sides(&mut battle, tile);

        let side1_power = battle.side_power(Side::One);
        let side2_power = battle.side_power(Side::Two);
        if side1_power > 0 && side2_power > 0 {
            let damage_to_two = (f64::from(side1_power) * ROUND_DAMAGE_FRACTION).ceil() as u32;
            let damage_to_one = (f64::from(side2_power) * ROUND_DAMAGE_FRACTION).ceil() as u32;
            apply_casualties(Side::Two, damage_to_two, &mut battle, tile);
            apply_casualties(Side::One, damage_to_one, &mut battle, tile);
        }

        refresh_sides(&mut battle, tile);
        let side1_destroyed = battle.is_side_destroyed(Side::One);
        let side2_destroyed = battle.is_side_destroyed(Side::Two);

        if !side1_destroyed && !side2_destroyed {
            battle.events.push(BattleEvent {
                kind: BattleEventKind::Casualties,
                tick: battle.tick_count,
                detail: serde_json::json!({
                    "side1Power": battle.side_power(Side::One),
                    "side2Power": battle.side_power(Side::Two),
                }),
            });
            tile.battles.insert(battle_id, battle);
            continue;
        }

        let (winner, loser) = if side1_destroyed { (Side::Two, Side::One) } else { (Side::One, Side::Two) };
        finish_battle(&battle, winner, loser, tile, &mut outcome);
        outcome.chat_drafts.push(ChatDraft {
            kind: "battle_end",
            x: tile.x,
            y: tile.y,
            message: format!("a battle on ({}, {}) has ended", tile.x, tile.y),
            data: serde_json::json!({ "battleId": battle_id, "winner": winner }),
        });
        outcome.resolved += 1;
        // battle record is not reinserted; it is deleted by resolution.
    }

    outcome
}

fn refresh_sides(battle: &mut Battle, tile: &Tile) {
    refresh_side(&mut battle.side1, tile);
    refresh_side(&mut battle.side2, tile);
}

fn refresh_side(participants: &mut std::collections::HashMap<GroupId, crate::entities::BattleParticipant>, tile: &Tile) {
    participants.retain(|gid, participant| {
        let Some(group) = tile.groups.get(gid) else { return false };
        if group.status != GroupStatus::Fighting {
            return false;
        }
        participant.power = group.total_strength();
        true
    });
}

fn handle_flees(battle_id: &str, battle: &mut Battle, tile: &mut Tile, now: u64, outcome: &mut BattleOutcome) {
    let fleeing_ids: Vec<GroupId> = tile
        .groups
        .values()
        .filter(|g| g.battle_id.as_deref() == Some(battle_id) && g.status == GroupStatus::Fleeing)
        .map(|g| g.id.clone())
        .collect();

    for gid in fleeing_ids {
        let Some(group) = tile.groups.get_mut(&gid) else { continue };
        apply_flee_casualties(group);
        group.status = GroupStatus::Idle;
        group.battle_id = None;
        group.battle_role = None;
        group.battle_side = None;
        group.flee_tick_requested = None;

        battle.side1.remove(&gid);
        battle.side2.remove(&gid);
        battle.events.push(BattleEvent {
            kind: BattleEventKind::Fled,
            tick: battle.tick_count,
            detail: serde_json::json!({ "groupId": gid }),
        });
        outcome.chat_drafts.push(ChatDraft {
            kind: "flee",
            x: tile.x,
            y: tile.y,
            message: format!("a group fled a battle on ({}, {})", tile.x, tile.y),
            data: serde_json::json!({ "battleId": battle_id, "groupId": gid, "requestedAt": now }),
        });
    }
}

fn apply_flee_casualties(group: &mut Group) {
    let non_player_keys: Vec<String> = group
        .units
        .iter()
        .filter(|(_, u)| !u.is_player())
        .map(|(k, _)| k.clone())
        .collect();
    if non_player_keys.is_empty() {
        return;
    }
    let losses = ((non_player_keys.len() as f64) * FLEE_CASUALTY_RATE).floor() as usize;
    let mut rng = rand::rng();
    let mut shuffled = non_player_keys;
    shuffled.shuffle(&mut rng);
    for key in shuffled.into_iter().take(losses) {
        group.units.remove(&key);
    }
}

/// Removes non-player units from the losing side's groups until `damage` is
/// absorbed, distributed proportionally to each group's current power
/// share. Player units are never deleted; once a group has none left to
/// lose, a player unit it carries is reduced to 0 strength instead.
fn apply_casualties(losing_side: Side, damage: u32, battle: &mut Battle, tile: &mut Tile) {
    if damage == 0 {
        return;
    }
    let group_ids: Vec<GroupId> = match losing_side {
        Side::One => battle.side1.keys().cloned().collect(),
        Side::Two => battle.side2.keys().cloned().collect(),
    };
    let total_power: u32 = group_ids.iter().filter_map(|gid| tile.groups.get(gid)).map(Group::total_strength).sum();
    if total_power == 0 {
        return;
    }

    let mut destroyed = Vec::new();
    for gid in &group_ids {
        let Some(group) = tile.groups.get_mut(gid) else { continue };
        let share = (f64::from(damage) * f64::from(group.total_strength()) / f64::from(total_power)).round() as u32;
        absorb_damage(group, share);
        if group.is_empty_of_units() {
            destroyed.push(gid.clone());
        }
    }
    for gid in destroyed {
        tile.groups.remove(&gid);
        match losing_side {
            Side::One => battle.side1.remove(&gid),
            Side::Two => battle.side2.remove(&gid),
        };
    }
}

fn absorb_damage(group: &mut Group, mut remaining: u32) {
    if remaining == 0 {
        return;
    }
    let mut non_player_keys: Vec<(String, u32)> = group
        .units
        .iter()
        .filter(|(_, u)| !u.is_player())
        .map(|(k, u)| (k.clone(), u.effective_strength()))
        .collect();
    non_player_keys.sort_by_key(|(_, strength)| *strength);

    for (key, strength) in non_player_keys {
        if remaining == 0 {
            break;
        }
        group.units.remove(&key);
        remaining = remaining.saturating_sub(strength.max(1));
    }

    if remaining > 0 {
        for unit in group.units.values_mut().filter(|u| u.is_player()) {
            unit.strength = Some(0);
        }
    }
}

fn finish_battle(battle: &Battle, winner: Side, loser: Side, tile: &mut Tile, outcome: &mut BattleOutcome) {
    let winner_ids: Vec<GroupId> = match winner {
        Side::One => battle.side1.keys().cloned().collect(),
        Side::Two => battle.side2.keys().cloned().collect(),
    };
    for gid in &winner_ids {
        if let Some(group) = tile.groups.get_mut(gid) {
            group.status = GroupStatus::Idle;
            group.battle_id = None;
            group.battle_role = None;
            group.battle_side = None;
            group.flee_tick_requested = None;
        }
    }

    let loser_ids: Vec<GroupId> = match loser {
        Side::One => battle.side1.keys().cloned().collect(),
        Side::Two => battle.side2.keys().cloned().collect(),
    };
    for gid in &loser_ids {
        if let Some(group) = tile.groups.remove(gid) {
            for unit in group.units.into_values() {
                if let Some(uid) = unit.player_id {
                    outcome.player_defeats.push((uid, tile.x, tile.y));
                }
            }
        }
    }

    if let Some(structure) = tile.structure.as_mut() {
        if battle.structure_id.as_deref() == Some(structure.id.as_str()) {
            structure.in_battle = None;
            if loser == Side::Two && structure.structure_type != "spawn" {
                if let Some(dominant_owner) = winner_ids
                    .iter()
                    .filter_map(|gid| tile.groups.get(gid))
                    .max_by_key(|g| g.total_strength())
                    .map(|g| g.owner.clone())
                {
                    structure.owner = Some(dominant_owner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BattleParticipant, BattleRole, ItemBag, TargetType, Unit};
    use std::collections::{BTreeSet, HashMap};

    fn warrior(strength: u32) -> Unit {
        Unit { unit_type: "human_warrior".to_string(), strength: Some(strength), motion: Default::default(), capacity: None, player_id: None }
    }

    fn group(id: &str, owner: &str, power: u32, side: Side) -> Group {
        let mut units = HashMap::new();
        units.insert("u1".to_string(), warrior(power));
        Group {
            id: id.to_string(),
            owner: owner.to_string(),
            name: None,
            race: None,
            status: GroupStatus::Fighting,
            x: 0,
            y: 0,
            units,
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
            build_structure_id: None,
            demobilise_structure_id: None,
            storage_destination: None,
            battle_id: Some("b1".to_string()),
            battle_role: Some(if side == Side::One { BattleRole::Attacker } else { BattleRole::Defender }),
            battle_side: Some(side),
            flee_tick_requested: None,
            cancel_request_time: None,
            created_at: 0,
        }
    }

    fn lopsided_battle_tile() -> Tile {
        let mut tile = Tile::new(0, 0);
        tile.groups.insert("attacker".to_string(), group("attacker", "p1", 100, Side::One));
        tile.groups.insert("defender".to_string(), group("defender", "p2", 1, Side::Two));
        let battle = Battle {
            id: "b1".to_string(),
            x: 0,
            y: 0,
            side1: HashMap::from([("attacker".to_string(), BattleParticipant { group_id: "attacker".to_string(), power: 100 })]),
            side2: HashMap::from([("defender".to_string(), BattleParticipant { group_id: "defender".to_string(), power: 1 })]),
            structure_power: 0,
            structure_id: None,
            target_types: BTreeSet::from([TargetType::Group]),
            events: Vec::new(),
            tick_count: 0,
            status: BattleStatus::Active,
            started_at: 0,
        };
        tile.battles.insert("b1".to_string(), battle);
        tile
    }

    #[test]
    fn lopsided_battle_resolves_within_one_round() {
        let mut tile = lopsided_battle_tile();
        let mut processed = HashSet::new();
        let outcome = resolve_tile_battles(&mut tile, 10, &mut processed);

        assert_eq!(outcome.resolved, 1);
        assert!(tile.battles.is_empty());
        assert!(processed.contains("attacker"));
        assert!(processed.contains("defender"));
        assert!(!tile.groups.contains_key("defender"));
        let winner = tile.groups.get("attacker").expect("winner survives");
        assert_eq!(winner.status, GroupStatus::Idle);
        assert_eq!(winner.battle_id, None);
    }

    #[test]
    fn fleeing_group_leaves_the_battle_with_casualties() {
        let mut tile = Tile::new(0, 0);
        let mut fleeing = group("fleeing", "p2", 10, Side::Two);
        fleeing.status = GroupStatus::Fleeing;
        // 20% casualties are floored (spec §8 scenario 3): 5 non-player
        // units guarantees exactly one loss (floor(5 * 0.20) = 1).
        for i in 2..=5 {
            fleeing.units.insert(format!("u{i}"), warrior(5));
        }
        tile.groups.insert("fleeing".to_string(), fleeing);
        tile.groups.insert("attacker".to_string(), group("attacker", "p1", 1, Side::One));
        let battle = Battle {
            id: "b1".to_string(),
            x: 0,
            y: 0,
            side1: HashMap::from([("attacker".to_string(), BattleParticipant { group_id: "attacker".to_string(), power: 1 })]),
            side2: HashMap::from([("fleeing".to_string(), BattleParticipant { group_id: "fleeing".to_string(), power: 15 })]),
            structure_power: 0,
            structure_id: None,
            target_types: BTreeSet::from([TargetType::Group]),
            events: Vec::new(),
            tick_count: 0,
            status: BattleStatus::Active,
            started_at: 0,
        };
        tile.battles.insert("b1".to_string(), battle);

        let mut processed = HashSet::new();
        let _ = resolve_tile_battles(&mut tile, 10, &mut processed);

        let fled = tile.groups.get("fleeing").expect("group survives a flee");
        assert_eq!(fled.status, GroupStatus::Idle);
        assert_eq!(fled.battle_id, None);
        assert_eq!(fled.units.len(), 4, "exactly one of five non-player units should be lost to the floored flee penalty");
    }
}
