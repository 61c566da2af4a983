//! `joinBattle`: adds a supporting group to one side of an active battle.

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::{Battle, BattleParticipant, BattleRole, BattleStatus, Group, GroupStatus, Side};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinBattleRequest {
    pub group_id: String,
    pub battle_id: String,
    pub side: Side,
    pub x: i32,
    pub y: i32,
}

pub async fn handle(ctx: &CommandContext<'_>, req: JoinBattleRequest) -> CommandResult {
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
    if group.status != GroupStatus::Idle {
        return Err(GisaimaError::failed_precondition("group is not idle"));
    }

    let battle_path = paths::tile_battle(ctx.world_id, req.x, req.y, &req.battle_id);
    let battle_value = ctx
        .store
        .read(&battle_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found(format!("battle {}", req.battle_id)))?;
    let mut battle: Battle = serde_json::from_value(battle_value).map_err(|_| GisaimaError::Internal)?;

    if battle.status != BattleStatus::Active {
        return Err(GisaimaError::failed_precondition("battle is not active"));
    }

    let power = group.total_strength();
    group.status = GroupStatus::Fighting;
    group.battle_id = Some(req.battle_id.clone());
    group.battle_side = Some(req.side);
    group.battle_role = Some(BattleRole::Supporter);

    let participant = BattleParticipant { group_id: req.group_id.clone(), power };
    match req.side {
        Side::One => battle.side1.insert(req.group_id.clone(), participant),
        Side::Two => battle.side2.insert(req.group_id.clone(), participant),
    };
    battle.events.push(crate::entities::BattleEvent {
        kind: crate::entities::BattleEventKind::Joined,
        tick: battle.tick_count,
        detail: serde_json::json!({ "groupId": req.group_id, "side": req.side }),
    });

    let updates = gisaima_store::Update::from([
        (group_path, Some(serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?)),
        (battle_path, Some(serde_json::to_value(&battle).map_err(|_| GisaimaError::Internal)?)),
    ]);
    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "join",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} joined a battle", ctx.uid),
        serde_json::json!({ "battleId": req.battle_id, "groupId": req.group_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "battleId": req.battle_id })))
}
