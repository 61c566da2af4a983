//! `cancelMove` / `cancelGather`: two-phase cancellation so an in-flight
//! tick never observes (and contradicts) a half-applied cancel.
//!
//! Phase one commits a transitional status (`cancelling` / `cancellingGather`)
//! with a timestamp; phase two, committed immediately after, finalises the
//! group back to `idle` and clears the in-progress fields. The tick treats
//! the transitional statuses as "already being handled" and skips them
//! (spec §4.5 step 5), so even if it runs between the two commits it cannot
//! race either write.

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::{Group, GroupStatus};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub group_id: String,
    pub x: i32,
    pub y: i32,
}

pub async fn cancel_move(ctx: &CommandContext<'_>, req: CancelRequest) -> CommandResult {
    cancel(ctx, req, GroupStatus::Moving, GroupStatus::Cancelling, "cancelMove", clear_movement).await
}

pub async fn cancel_gather(ctx: &CommandContext<'_>, req: CancelRequest) -> CommandResult {
    cancel(
        ctx,
        req,
        GroupStatus::Gathering,
        GroupStatus::CancellingGather,
        "cancelGather",
        clear_gathering,
    )
    .await
}

async fn cancel(
    ctx: &CommandContext<'_>,
    req: CancelRequest,
    expected: GroupStatus,
    transitional: GroupStatus,
    kind: &str,
    clear: fn(&mut Group),
) -> CommandResult {
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
    if group.status != expected {
        return Err(GisaimaError::failed_precondition(format!(
            "group is not {expected:?}, already {:?}",
            group.status
        )));
    }

    group.status = transitional;
    group.cancel_request_time = Some(ctx.now);
    let transitional_value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
    ctx.store
        .commit(gisaima_store::Update::from([(group_path.clone(), Some(transitional_value))]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    group.status = GroupStatus::Idle;
    group.cancel_request_time = None;
    clear(&mut group);
    let final_value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
    ctx.store
        .commit(gisaima_store::Update::from([(group_path, Some(final_value))]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        kind,
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} cancelled a group's activity", ctx.uid),
        serde_json::json!({ "groupId": req.group_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "groupId": req.group_id })))
}

fn clear_movement(group: &mut Group) {
    group.movement_path.clear();
    group.path_index = None;
    group.move_started = None;
    group.next_move_time = None;
    group.target_x = None;
    group.target_y = None;
}

fn clear_gathering(group: &mut Group) {
    group.gathering_biome = None;
    group.gathering_ticks_remaining = None;
}
