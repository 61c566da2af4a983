//! `gather`: starts resource collection for an idle group on its tile.

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::{Group, GroupStatus};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

/// Default biome assumed when the tile carries no terrain data (terrain
/// generation is an external collaborator, out of scope here).
const DEFAULT_BIOME: &str = "plains";
const GATHER_TICKS: u32 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatherRequest {
    pub group_id: String,
    pub x: i32,
    pub y: i32,
}

pub async fn handle(ctx: &CommandContext<'_>, req: GatherRequest) -> CommandResult {
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

    group.status = GroupStatus::Gathering;
    group.gathering_biome = Some(DEFAULT_BIOME.to_string());
    group.gathering_ticks_remaining = Some(GATHER_TICKS);

    let value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
    ctx.store
        .commit(gisaima_store::Update::from([(group_path, Some(value))]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "gather",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} started gathering", ctx.uid),
        serde_json::json!({ "groupId": req.group_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "groupId": req.group_id })))
}
