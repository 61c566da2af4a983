//! `demobilise`: stages a group for dissolution into a tile's structure.
//! The actual unit merge and item transfer happen on the next tick
//! (spec §4.5 phase C), not here — this handler only flips status.

use gisaima_store::Value;
use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::{Group, GroupStatus, StorageDestination};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemobiliseRequest {
    pub group_id: String,
    pub x: i32,
    pub y: i32,
    pub storage_destination: Option<StorageDestination>,
}

pub async fn handle(ctx: &CommandContext<'_>, req: DemobiliseRequest) -> CommandResult {
    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
    let structure = ctx
        .store
        .read(&structure_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;
    if structure.is_none() {
        return Err(GisaimaError::failed_precondition("no structure on this tile"));
    }

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

    group.status = GroupStatus::Demobilising;
    group.demobilise_structure_id = structure_id_of(&structure);
    group.storage_destination = Some(req.storage_destination.unwrap_or(StorageDestination::Shared));

    let value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
    ctx.store
        .commit(gisaima_store::Update::from([(group_path, Some(value))]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "demobilise",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} is demobilising a group", ctx.uid),
        serde_json::json!({ "groupId": req.group_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "groupId": req.group_id })))
}

fn structure_id_of(structure: &Option<Value>) -> Option<String> {
    structure
        .as_ref()
        .and_then(|v| v.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
