//! `cancelRecruitment`: withdraws a queued recruitment entry, refunding a
//! fraction of its cost to the caller's personal bank.

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::Structure;
use crate::entities::item::add;
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRecruitmentRequest {
    pub recruitment_id: String,
    pub structure_id: String,
    pub x: i32,
    pub y: i32,
}

pub async fn handle(ctx: &CommandContext<'_>, req: CancelRecruitmentRequest) -> CommandResult {
    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
    let structure_value = ctx
        .store
        .read(&structure_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("structure"))?;
    let mut structure: Structure = serde_json::from_value(structure_value).map_err(|_| GisaimaError::Internal)?;
    if structure.id != req.structure_id {
        return Err(GisaimaError::not_found("structure"));
    }

    let entry = structure
        .recruitment_queue
        .get(&req.recruitment_id)
        .cloned()
        .ok_or_else(|| GisaimaError::not_found("recruitment entry"))?;
    if entry.player_id != ctx.uid {
        return Err(GisaimaError::permission_denied("recruitment not owned by caller"));
    }

    let total_span = entry.completes_at.saturating_sub(entry.started_at).max(1);
    let elapsed = ctx.now.saturating_sub(entry.started_at).min(total_span);
    let elapsed_pct = (elapsed * 100) / total_span;
    let refund_pct = (100u64.saturating_sub(elapsed_pct)).max(50);

    let bank = structure.banks.entry(ctx.uid.to_string()).or_default();
    for (code, amount) in &entry.resource_deduction {
        let refund = (*amount * refund_pct) / 100;
        add(bank, code, refund);
    }

    structure.recruitment_queue.remove(&req.recruitment_id);

    let value = serde_json::to_value(&structure).map_err(|_| GisaimaError::Internal)?;
    ctx.store
        .commit(gisaima_store::Update::from([(structure_path, Some(value))]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "cancel_recruitment",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} cancelled a recruitment", ctx.uid),
        serde_json::json!({ "recruitmentId": req.recruitment_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "recruitmentId": req.recruitment_id })))
}
