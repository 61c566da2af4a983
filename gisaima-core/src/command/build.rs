//! `build`: spends a group's carried items to start construction of a new
//! structure on its (currently empty) tile.

use gisaima_utils::error::GisaimaError;
use gisaima_utils::ids::new_id;
use serde::Deserialize;

use gisaima_store::TransactionOutcome;

use crate::entities::item::transfer;
use crate::entities::{Group, GroupStatus, Structure, StructureStatus};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub group_id: String,
    pub x: i32,
    pub y: i32,
    pub structure_type: String,
    pub structure_name: String,
}

pub async fn handle(ctx: &CommandContext<'_>, req: BuildRequest) -> CommandResult {
    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
    if ctx
        .store
        .read(&structure_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .is_some()
    {
        return Err(GisaimaError::failed_precondition("tile already has a structure"));
    }

    let defaults = ctx
        .catalog
        .structure_defaults(&req.structure_type)
        .ok_or_else(|| GisaimaError::invalid_argument(format!("unknown structure type {}", req.structure_type)))?;

    let group_path = paths::tile_group(ctx.world_id, req.x, req.y, &req.group_id);
    let structure_id = new_id();
    let mut precondition_error = None;

    ctx.store
        .transact(&group_path, |current| {
            let Some(value) = current else {
                precondition_error = Some(GisaimaError::not_found(format!("group {}", req.group_id)));
                return TransactionOutcome::Abort;
            };
            let mut group: Group = match serde_json::from_value(value) {
                Ok(g) => g,
                Err(_) => {
                    precondition_error = Some(GisaimaError::Internal);
                    return TransactionOutcome::Abort;
                }
            };

            if group.owner != ctx.uid {
                precondition_error = Some(GisaimaError::permission_denied("group not owned by caller"));
                return TransactionOutcome::Abort;
            }
            if group.status != GroupStatus::Idle {
                precondition_error = Some(GisaimaError::failed_precondition("group is not idle"));
                return TransactionOutcome::Abort;
            }
            for (code, amount) in &defaults.build_cost {
                if group.items.get(code).copied().unwrap_or(0) < *amount {
                    precondition_error = Some(GisaimaError::failed_precondition(format!("insufficient {code} to build")));
                    return TransactionOutcome::Abort;
                }
            }

            let mut spent = crate::entities::ItemBag::new();
            for (code, amount) in &defaults.build_cost {
                transfer(&mut group.items, &mut spent, code, *amount);
            }

            group.status = GroupStatus::Building;
            group.build_structure_id = Some(structure_id.clone());

            match serde_json::to_value(&group) {
                Ok(v) => TransactionOutcome::Commit(v),
                Err(_) => {
                    precondition_error = Some(GisaimaError::Internal);
                    TransactionOutcome::Abort
                }
            }
        })
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    if let Some(err) = precondition_error {
        return Err(err);
    }

    let structure = Structure {
        id: structure_id.clone(),
        x: req.x,
        y: req.y,
        owner: Some(ctx.uid.to_string()),
        structure_type: req.structure_type.clone(),
        name: req.structure_name.clone(),
        race: None,
        level: 1,
        status: StructureStatus::Building,
        build_progress: Some(0),
        build_total_time: Some(defaults.base_build_time_ticks),
        builder: Some(req.group_id.clone()),
        upgrade_in_progress: false,
        upgrade_id: None,
        upgrade_completes_at: None,
        items: Default::default(),
        banks: Default::default(),
        buildings: Default::default(),
        recruitment_queue: Default::default(),
        units: Default::default(),
        in_battle: None,
        created_at: ctx.now,
    };

    ctx.store
        .commit(gisaima_store::Update::from([(
            structure_path,
            Some(serde_json::to_value(&structure).map_err(|_| GisaimaError::Internal)?),
        )]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "build",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} started building {}", ctx.uid, req.structure_name),
        serde_json::json!({ "structureId": structure_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "structureId": structure_id })))
}
