//! `fleeBattle`: requests an exit from an active battle. The actual
//! departure, casualty roll, and field cleanup happen in the battle
//! resolver on the next battle tick (spec §4.6 step 3).

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::{Battle, BattleStatus, Group, GroupStatus};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleeBattleRequest {
    pub group_id: String,
    pub x: i32,
    pub y: i32,
}

pub async fn handle(ctx: &CommandContext<'_>, req: FleeBattleRequest) -> CommandResult {
    let group_path = paths::tile_group(ctx.world_id, req.x, req.y, &req.group_id);
    let group_value = ctx
        .store
        .read(&group_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found(format!("group {}", req.group_id)))?;
    let mut group: Group = serde_json::from_value(group_value).map_err(|_| GisaimaError::Internal)?;

    if group.owner != ctx.uid {
        return Err(GisaimaError::permission_denied("group not owned by caller"));
    }
    if group.status != GroupStatus::Fighting {
        return Err(GisaimaError::failed_precondition("group is not fighting"));
    }
    let battle_id = group
        .battle_id
        .clone()
        .ok_or_else(|| GisaimaError::failed_precondition("group has no battle to flee"))?;

    let battle_path = paths::tile_battle(ctx.world_id, req.x, req.y, &battle_id);
    let battle_value = ctx
        .store
        .read(&battle_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("battle"))?;
    let battle: Battle = serde_json::from_value(battle_value).map_err(|_| GisaimaError::Internal)?;
    if battle.status != BattleStatus::Active {
        return Err(GisaimaError::failed_precondition("battle is not active"));
    }

    group.status = GroupStatus::Fleeing;
    group.flee_tick_requested = Some(battle.tick_count);

    let value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
    ctx.store
        .commit(gisaima_store::Update::from([(group_path, Some(value))]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "flee_attempt",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} is fleeing a battle", ctx.uid),
        serde_json::json!({ "battleId": battle_id, "groupId": req.group_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "battleId": battle_id })))
}
