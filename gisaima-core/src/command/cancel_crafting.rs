//! `cancelCrafting`: aborts the caller's in-flight craft, refunding half of
//! the committed materials.

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::item::add;
use crate::entities::{PlayerWorldRecord, Structure};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelCraftingRequest {
    pub x: i32,
    pub y: i32,
}

pub async fn handle(ctx: &CommandContext<'_>, req: CancelCraftingRequest) -> CommandResult {
    let player_path = paths::player_world_record(ctx.uid, ctx.world_id);
    let player_value = ctx
        .store
        .read(&player_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("player world record"))?;
    let mut player: PlayerWorldRecord = serde_json::from_value(player_value).map_err(|_| GisaimaError::Internal)?;

    let job = player
        .crafting_current
        .take()
        .ok_or_else(|| GisaimaError::failed_precondition("no craft in progress"))?;
    let craft_id = job.id.clone();

    let mut updates = gisaima_store::Update::from([(paths::craft(ctx.world_id, &craft_id), None)]);

    if let Some(structure_id) = &job.structure_id {
        let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
        let structure_value = ctx
            .store
            .read(&structure_path)
            .await
            .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
            .ok_or_else(|| GisaimaError::not_found("structure"))?;
        let mut structure: Structure = serde_json::from_value(structure_value).map_err(|_| GisaimaError::Internal)?;
        if &structure.id == structure_id {
            let bank = structure.banks.entry(ctx.uid.to_string()).or_default();
            for (code, amount) in &job.materials_committed {
                // Round up so a cancelled craft always refunds at least half
                // of each material, even when the committed amount is odd.
                add(bank, code, amount.div_ceil(2));
            }
            updates.insert(structure_path, Some(serde_json::to_value(&structure).map_err(|_| GisaimaError::Internal)?));
        }
    }

    updates.insert(player_path, Some(serde_json::to_value(&player).map_err(|_| GisaimaError::Internal)?));
    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "cancel_craft",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} cancelled a craft", ctx.uid),
        serde_json::json!({ "craftId": craft_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "craftId": craft_id })))
}
