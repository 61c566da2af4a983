//! `startCrafting`: begins a craft bound to the calling player (not a
//! group), subject to one in-flight craft per (player, world).

use gisaima_utils::error::GisaimaError;
use gisaima_utils::ids::new_id;
use serde::Deserialize;

use gisaima_store::TransactionOutcome;

use crate::entities::{CraftingJob, ItemBag, PlayerWorldRecord, Structure};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCraftingRequest {
    pub recipe_id: String,
    pub x: i32,
    pub y: i32,
    pub structure_id: Option<String>,
}

pub async fn handle(ctx: &CommandContext<'_>, req: StartCraftingRequest) -> CommandResult {
    let recipe = ctx
        .catalog
        .recipe(&req.recipe_id)
        .ok_or_else(|| GisaimaError::invalid_argument(format!("unknown recipe {}", req.recipe_id)))?;

    let player_path = paths::player_world_record(ctx.uid, ctx.world_id);
    let player_value = ctx
        .store
        .read(&player_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("player world record"))?;
    let mut player: PlayerWorldRecord = serde_json::from_value(player_value).map_err(|_| GisaimaError::Internal)?;

    if player.crafting_current.is_some() {
        return Err(GisaimaError::failed_precondition("a craft is already in progress"));
    }

    let structure_id = req
        .structure_id
        .clone()
        .ok_or_else(|| GisaimaError::invalid_argument("crafting requires a structure with a personal bank"))?;
    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);

    let precheck_value = ctx
        .store
        .read(&structure_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("structure"))?;
    let precheck: Structure = serde_json::from_value(precheck_value).map_err(|_| GisaimaError::Internal)?;
    if precheck.id != structure_id {
        return Err(GisaimaError::not_found("structure"));
    }
    let structure_bonus = ctx.catalog.structure_defaults(&precheck.structure_type).map(|d| d.crafting_bonus).unwrap_or(0.0);

    let level_discount = (0.05 * (player.skills_crafting_level.saturating_sub(1)) as f64).min(0.5);
    let fraction = (1.0 - level_discount - structure_bonus).max(0.1);
    let time_ticks = ((recipe.base_time_ticks as f64) * fraction).ceil() as u64;

    let craft_id = new_id();
    let mut precondition_error = None;
    let mut materials_committed = ItemBag::new();

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
            if structure.id != structure_id {
                precondition_error = Some(GisaimaError::not_found("structure"));
                return TransactionOutcome::Abort;
            }

            for (code, amount) in &recipe.materials {
                let bank_have = structure.banks.get(ctx.uid).and_then(|b| b.get(code)).copied().unwrap_or(0);
                if bank_have < *amount {
                    precondition_error = Some(GisaimaError::failed_precondition(format!("insufficient {code} to craft")));
                    return TransactionOutcome::Abort;
                }
            }

            materials_committed = ItemBag::new();
            for (code, amount) in &recipe.materials {
                let drawn = structure.draw_resource(ctx.uid, code, *amount);
                materials_committed.insert(code.clone(), drawn);
            }

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

    let job = CraftingJob {
        id: craft_id.clone(),
        player_id: ctx.uid.to_string(),
        recipe_id: req.recipe_id.clone(),
        structure_id: req.structure_id.clone(),
        started_at: ctx.now,
        completes_at: ctx.now + time_ticks,
        materials_committed,
    };
    player.crafting_current = Some(job.clone());

    let updates = gisaima_store::Update::from([
        (player_path, Some(serde_json::to_value(&player).map_err(|_| GisaimaError::Internal)?)),
        (paths::craft(ctx.world_id, &craft_id), Some(serde_json::to_value(&job).map_err(|_| GisaimaError::Internal)?)),
    ]);
    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "craft",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} started crafting {}", ctx.uid, req.recipe_id),
        serde_json::json!({ "craftId": craft_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "craftId": craft_id })))
}
