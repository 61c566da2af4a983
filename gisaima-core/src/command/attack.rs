//! `attack`: opens a battle between the caller's groups and a defending
//! group set and/or structure occupying the same tile.

use std::collections::{BTreeSet, HashMap};

use gisaima_store::Update;
use gisaima_utils::error::GisaimaError;
use gisaima_utils::ids::new_id;
use serde::Deserialize;

use crate::entities::{
    Battle, BattleParticipant, BattleRole, BattleStatus, Group, GroupStatus, Side, Structure, TargetType,
};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequest {
    pub x: i32,
    pub y: i32,
    pub attacker_group_ids: Vec<String>,
    #[serde(default)]
    pub defender_group_ids: Vec<String>,
    pub structure_id: Option<String>,
}

pub async fn handle(ctx: &CommandContext<'_>, req: AttackRequest) -> CommandResult {
    if req.attacker_group_ids.is_empty() {
        return Err(GisaimaError::invalid_argument("attack requires at least one attacker group"));
    }
    if req.defender_group_ids.is_empty() && req.structure_id.is_none() {
        return Err(GisaimaError::invalid_argument("attack requires a defender group or a structure"));
    }

    let mut attackers = HashMap::new();
    let mut attacker_power = 0u32;
    for id in &req.attacker_group_ids {
        let group = read_group(ctx, req.x, req.y, id).await?;
        if group.owner != ctx.uid {
            return Err(GisaimaError::permission_denied("attacker group not owned by caller"));
        }
        if group.status != GroupStatus::Idle {
            return Err(GisaimaError::failed_precondition("attacker group is not idle"));
        }
        attacker_power += group.total_strength();
        attackers.insert(id.clone(), group);
    }

    let mut defenders = HashMap::new();
    let mut defender_power = 0u32;
    for id in &req.defender_group_ids {
        let group = read_group(ctx, req.x, req.y, id).await?;
        if group.owner == ctx.uid {
            return Err(GisaimaError::permission_denied("cannot attack your own group"));
        }
        if group.in_battle() {
            return Err(GisaimaError::failed_precondition("defender group already in battle"));
        }
        defender_power += group.total_strength();
        defenders.insert(id.clone(), group);
    }

    let mut structure: Option<Structure> = None;
    let mut structure_power = 0u32;
    let mut target_types = BTreeSet::new();
    if let Some(structure_id) = &req.structure_id {
        let path = paths::tile_structure(ctx.world_id, req.x, req.y);
        let value = ctx
            .store
            .read(&path)
            .await
            .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
            .ok_or_else(|| GisaimaError::not_found("structure"))?;
        let s: Structure = serde_json::from_value(value).map_err(|_| GisaimaError::Internal)?;
        if &s.id != structure_id {
            return Err(GisaimaError::not_found("structure"));
        }
        if s.structure_type == "spawn" {
            return Err(GisaimaError::permission_denied("spawn structures cannot be attacked"));
        }
        if s.is_owned_by(ctx.uid) {
            return Err(GisaimaError::permission_denied("cannot attack your own structure"));
        }
        if s.in_battle.is_some() {
            return Err(GisaimaError::failed_precondition("structure already in battle"));
        }
        structure_power = defensive_power(&s.structure_type);
        target_types.insert(TargetType::Structure);
        structure = Some(s);
    }
    if !defenders.is_empty() {
        target_types.insert(TargetType::Group);
    }

    let battle_id = new_id();
    let mut updates = Update::new();

    // Each attacking group is credited with its own strength, not the side
    // total, so later casualty allocation can scale per-group.
    let mut side1 = HashMap::new();
    for (id, mut group) in attackers {
        let power = group.total_strength();
        group.status = GroupStatus::Fighting;
        group.battle_id = Some(battle_id.clone());
        group.battle_side = Some(Side::One);
        group.battle_role = Some(BattleRole::Attacker);
        side1.insert(id.clone(), BattleParticipant { group_id: id.clone(), power });
        let value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
        updates.insert(paths::tile_group(ctx.world_id, req.x, req.y, &id), Some(value));
    }

    let mut side2 = HashMap::new();
    for (id, mut group) in defenders {
        group.status = GroupStatus::Fighting;
        group.battle_id = Some(battle_id.clone());
        group.battle_side = Some(Side::Two);
        group.battle_role = Some(BattleRole::Defender);
        let power = group.total_strength();
        side2.insert(id.clone(), BattleParticipant { group_id: id.clone(), power });
        let value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
        updates.insert(paths::tile_group(ctx.world_id, req.x, req.y, &id), Some(value));
    }

    if let Some(mut s) = structure {
        s.in_battle = Some(battle_id.clone());
        let value = serde_json::to_value(&s).map_err(|_| GisaimaError::Internal)?;
        updates.insert(paths::tile_structure(ctx.world_id, req.x, req.y), Some(value));
    }

    let battle = Battle {
        id: battle_id.clone(),
        x: req.x,
        y: req.y,
        side1,
        side2,
        structure_power,
        structure_id: req.structure_id.clone(),
        target_types,
        events: vec![crate::entities::BattleEvent {
            kind: crate::entities::BattleEventKind::Started,
            tick: 0,
            detail: serde_json::json!({ "attackerPower": attacker_power, "defenderPower": defender_power + structure_power }),
        }],
        tick_count: 0,
        status: BattleStatus::Active,
        started_at: ctx.now,
    };
    let battle_value = serde_json::to_value(&battle).map_err(|_| GisaimaError::Internal)?;
    updates.insert(paths::tile_battle(ctx.world_id, req.x, req.y, &battle_id), Some(battle_value));

    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "battle_start",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} started a battle", ctx.uid),
        serde_json::json!({ "battleId": battle_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "battleId": battle_id })))
}

async fn read_group(ctx: &CommandContext<'_>, x: i32, y: i32, id: &str) -> Result<Group, GisaimaError> {
    let path = paths::tile_group(ctx.world_id, x, y, id);
    let value = ctx
        .store
        .read(&path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found(format!("group {id}")))?;
    serde_json::from_value(value).map_err(|_| GisaimaError::Internal)
}

/// Type-derived defensive power (spec §3): spawn=15, fortress=30,
/// watchtower=10, stronghold=25, else 5. Spawns are unattackable so this
/// branch is only reachable for the other four.
#[must_use]
pub fn defensive_power(structure_type: &str) -> u32 {
    match structure_type {
        "spawn" => 15,
        "fortress" => 30,
        "watchtower" => 10,
        "stronghold" => 25,
        _ => 5,
    }
}
