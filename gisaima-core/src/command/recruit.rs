//! `recruit`: queues new units at an owned (or public spawn) structure,
//! paid for with the caller's personal bank then shared storage.

use gisaima_utils::error::GisaimaError;
use gisaima_utils::ids::new_id;
use serde::Deserialize;

use gisaima_store::TransactionOutcome;

use crate::entities::{ItemBag, RecruitmentEntry, Structure, StructureStatus, World};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitRequest {
    pub structure_id: String,
    pub x: i32,
    pub y: i32,
    pub unit_type: String,
    pub quantity: u32,
    pub cost: ItemBag,
}

pub async fn handle(ctx: &CommandContext<'_>, req: RecruitRequest) -> CommandResult {
    if req.quantity < 1 || req.quantity > 100 {
        return Err(GisaimaError::invalid_argument("quantity must be in 1..=100"));
    }

    let unit_stats = ctx
        .catalog
        .unit_stats(&req.unit_type)
        .ok_or_else(|| GisaimaError::invalid_argument(format!("unknown unit type {}", req.unit_type)))?;

    let world_value = ctx
        .store
        .read(&paths::world_info(ctx.world_id))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("world"))?;
    let world: World = serde_json::from_value(world_value).map_err(|_| GisaimaError::Internal)?;
    let speed = if world.speed > 0.0 { world.speed } else { 1.0 };
    let raw_ticks = (unit_stats.recruit_ticks_per_unit as f64) * (req.quantity as f64) / speed;
    let ticks_required = raw_ticks.ceil() as u64;

    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
    let recruit_id = new_id();
    let mut precondition_error = None;

    ctx.store
        .transact(&structure_path, |current| {
            let Some(value) = current else {
                precondition_error = Some(GisaimaError::not_found("structure"));
                return TransactionOutcome::Abort;
            };
            let mut structure: Structure = match serde_json::from_value(value) {
                Ok(s) => s,
                Err(_) => {
                    precondition_error = Some(GisaimaError::Internal);
                    return TransactionOutcome::Abort;
                }
            };

            if structure.id != req.structure_id {
                precondition_error = Some(GisaimaError::not_found("structure"));
                return TransactionOutcome::Abort;
            }
            if structure.status == StructureStatus::Building || structure.status == StructureStatus::Destroyed {
                precondition_error = Some(GisaimaError::failed_precondition("structure cannot recruit in its current state"));
                return TransactionOutcome::Abort;
            }
            let is_spawn = structure.structure_type == "spawn";
            if !is_spawn && !structure.is_owned_by(ctx.uid) {
                precondition_error = Some(GisaimaError::permission_denied("structure not owned by caller"));
                return TransactionOutcome::Abort;
            }
            if let Some(required_race) = unit_stats.race {
                if structure.race.as_deref() != Some(required_race) {
                    precondition_error = Some(GisaimaError::failed_precondition(format!(
                        "structure race does not match {required_race} unit"
                    )));
                    return TransactionOutcome::Abort;
                }
            }
            if structure.recruitment_queue.len() >= ctx.config.max_recruit_queue {
                precondition_error = Some(GisaimaError::failed_precondition("recruitment queue is full"));
                return TransactionOutcome::Abort;
            }

            let is_owner = structure.is_owned_by(ctx.uid);
            for (code, amount) in &req.cost {
                let bank_have = structure.banks.get(ctx.uid).and_then(|b| b.get(code)).copied().unwrap_or(0);
                let shared_have = if is_owner { structure.items.get(code).copied().unwrap_or(0) } else { 0 };
                if bank_have + shared_have < *amount {
                    precondition_error = Some(GisaimaError::failed_precondition(format!("insufficient {code} to recruit")));
                    return TransactionOutcome::Abort;
                }
            }

            let mut deduction = ItemBag::new();
            for (code, amount) in &req.cost {
                let drawn = structure.draw_resource(ctx.uid, code, *amount);
                deduction.insert(code.clone(), drawn);
            }

            let entry = RecruitmentEntry {
                id: recruit_id.clone(),
                player_id: ctx.uid.to_string(),
                unit_type: req.unit_type.clone(),
                quantity: req.quantity,
                started_at: ctx.now,
                completes_at: ctx.now + ticks_required,
                resource_deduction: deduction,
            };
            structure.recruitment_queue.insert(recruit_id.clone(), entry);

            match serde_json::to_value(&structure) {
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

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "recruit",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} queued {} {}", ctx.uid, req.quantity, req.unit_type),
        serde_json::json!({ "recruitId": recruit_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "recruitId": recruit_id })))
}
