//! `startStructureUpgrade` / `startBuildingUpgrade` / `cancelUpgrade`.

use gisaima_utils::error::GisaimaError;
use gisaima_utils::ids::new_id;
use serde::Deserialize;

use crate::entities::{ItemBag, Structure, StructureStatus, Upgrade, UpgradeStatus, UpgradeTarget};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStructureUpgradeRequest {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBuildingUpgradeRequest {
    pub x: i32,
    pub y: i32,
    pub building_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelUpgradeRequest {
    pub upgrade_id: String,
    pub x: i32,
    pub y: i32,
}

fn check_caller(structure: &Structure, uid: &str) -> Result<(), GisaimaError> {
    if structure.structure_type != "spawn" && !structure.is_owned_by(uid) {
        return Err(GisaimaError::permission_denied("structure not owned by caller"));
    }
    Ok(())
}

fn draw_with_feasibility_check(
    structure: &mut Structure,
    uid: &str,
    cost: &ItemBag,
) -> Result<ItemBag, GisaimaError> {
    let is_owner = structure.is_owned_by(uid);
    for (code, amount) in cost {
        let bank_have = structure.banks.get(uid).and_then(|b| b.get(code)).copied().unwrap_or(0);
        let shared_have = if is_owner { structure.items.get(code).copied().unwrap_or(0) } else { 0 };
        if bank_have + shared_have < *amount {
            return Err(GisaimaError::failed_precondition(format!("insufficient {code} for upgrade")));
        }
    }
    let mut drawn = ItemBag::new();
    for (code, amount) in cost {
        drawn.insert(code.clone(), structure.draw_resource(uid, code, *amount));
    }
    Ok(drawn)
}

pub async fn start_structure_upgrade(ctx: &CommandContext<'_>, req: StartStructureUpgradeRequest) -> CommandResult {
    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
    let structure_value = ctx
        .store
        .read(&structure_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("structure"))?;
    let mut structure: Structure = serde_json::from_value(structure_value).map_err(|_| GisaimaError::Internal)?;

    check_caller(&structure, ctx.uid)?;
    if structure.status == StructureStatus::Upgrading {
        return Err(GisaimaError::failed_precondition("structure is already upgrading"));
    }

    let defaults = ctx
        .catalog
        .structure_defaults(&structure.structure_type)
        .ok_or_else(|| GisaimaError::Internal)?;
    if structure.level >= defaults.max_level {
        return Err(GisaimaError::failed_precondition("structure is already at max level"));
    }

    let resources = draw_with_feasibility_check(&mut structure, ctx.uid, &defaults.upgrade_cost)?;

    let upgrade_id = new_id();
    let upgrade = Upgrade {
        id: upgrade_id.clone(),
        world_id: ctx.world_id.to_string(),
        structure_id: structure.id.clone(),
        x: req.x,
        y: req.y,
        target: UpgradeTarget::Structure,
        from_level: structure.level,
        to_level: structure.level + 1,
        started_at: ctx.now,
        completes_at: ctx.now + defaults.upgrade_time_ticks,
        resources,
        status: UpgradeStatus::InProgress,
    };

    structure.status = StructureStatus::Upgrading;
    structure.upgrade_in_progress = true;
    structure.upgrade_id = Some(upgrade_id.clone());
    structure.upgrade_completes_at = Some(upgrade.completes_at);

    commit_upgrade(ctx, &structure_path, &structure, &upgrade_id, &upgrade).await?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "upgrade",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} started a structure upgrade", ctx.uid),
        serde_json::json!({ "upgradeId": upgrade_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "upgradeId": upgrade_id })))
}

pub async fn start_building_upgrade(ctx: &CommandContext<'_>, req: StartBuildingUpgradeRequest) -> CommandResult {
    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
    let structure_value = ctx
        .store
        .read(&structure_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("structure"))?;
    let mut structure: Structure = serde_json::from_value(structure_value).map_err(|_| GisaimaError::Internal)?;

    check_caller(&structure, ctx.uid)?;

    let defaults = ctx
        .catalog
        .structure_defaults(&structure.structure_type)
        .ok_or_else(|| GisaimaError::Internal)?;

    let slot = structure
        .buildings
        .get(&req.building_id)
        .ok_or_else(|| GisaimaError::not_found("building"))?;
    if slot.upgrade_in_progress {
        return Err(GisaimaError::failed_precondition("building is already upgrading"));
    }
    if slot.level >= defaults.max_level {
        return Err(GisaimaError::failed_precondition("building is already at max level"));
    }
    let from_level = slot.level;

    let resources = draw_with_feasibility_check(&mut structure, ctx.uid, &defaults.upgrade_cost)?;

    let upgrade_id = new_id();
    let upgrade = Upgrade {
        id: upgrade_id.clone(),
        world_id: ctx.world_id.to_string(),
        structure_id: structure.id.clone(),
        x: req.x,
        y: req.y,
        target: UpgradeTarget::Building { building_id: req.building_id.clone() },
        from_level,
        to_level: from_level + 1,
        started_at: ctx.now,
        completes_at: ctx.now + defaults.upgrade_time_ticks,
        resources,
        status: UpgradeStatus::InProgress,
    };

    if let Some(slot) = structure.buildings.get_mut(&req.building_id) {
        slot.upgrade_in_progress = true;
        slot.upgrade_id = Some(upgrade_id.clone());
        slot.upgrade_completes_at = Some(upgrade.completes_at);
    }

    commit_upgrade(ctx, &structure_path, &structure, &upgrade_id, &upgrade).await?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "upgrade",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} started a building upgrade", ctx.uid),
        serde_json::json!({ "upgradeId": upgrade_id, "buildingId": req.building_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "upgradeId": upgrade_id })))
}

async fn commit_upgrade(
    ctx: &CommandContext<'_>,
    structure_path: &gisaima_store::Path,
    structure: &Structure,
    upgrade_id: &str,
    upgrade: &Upgrade,
) -> Result<(), GisaimaError> {
    let updates = gisaima_store::Update::from([
        (structure_path.clone(), Some(serde_json::to_value(structure).map_err(|_| GisaimaError::Internal)?)),
        (
            paths::upgrade(ctx.world_id, upgrade_id),
            Some(serde_json::to_value(upgrade).map_err(|_| GisaimaError::Internal)?),
        ),
    ]);
    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))
}

pub async fn cancel_upgrade(ctx: &CommandContext<'_>, req: CancelUpgradeRequest) -> CommandResult {
    let upgrade_path = paths::upgrade(ctx.world_id, &req.upgrade_id);
    let upgrade_value = ctx
        .store
        .read(&upgrade_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("upgrade"))?;
    let mut upgrade: Upgrade = serde_json::from_value(upgrade_value).map_err(|_| GisaimaError::Internal)?;
    if upgrade.status != UpgradeStatus::InProgress {
        return Err(GisaimaError::failed_precondition("upgrade is not in progress"));
    }

    let structure_path = paths::tile_structure(ctx.world_id, req.x, req.y);
    let structure_value = ctx
        .store
        .read(&structure_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("structure"))?;
    let mut structure: Structure = serde_json::from_value(structure_value).map_err(|_| GisaimaError::Internal)?;

    if !structure.is_owned_by(ctx.uid) {
        return Err(GisaimaError::permission_denied("structure not owned by caller"));
    }

    let bank = structure.banks.entry(ctx.uid.to_string()).or_default();
    for (code, amount) in &upgrade.resources {
        crate::entities::item::add(bank, code, *amount);
    }

    match &upgrade.target {
        UpgradeTarget::Structure => {
            structure.status = StructureStatus::Active;
            structure.upgrade_in_progress = false;
            structure.upgrade_id = None;
            structure.upgrade_completes_at = None;
        }
        UpgradeTarget::Building { building_id } => {
            if let Some(slot) = structure.buildings.get_mut(building_id) {
                slot.upgrade_in_progress = false;
                slot.upgrade_id = None;
                slot.upgrade_completes_at = None;
            }
        }
    }
    upgrade.status = UpgradeStatus::Cancelled;

    let updates = gisaima_store::Update::from([
        (structure_path, Some(serde_json::to_value(&structure).map_err(|_| GisaimaError::Internal)?)),
        (upgrade_path, Some(serde_json::to_value(&upgrade).map_err(|_| GisaimaError::Internal)?)),
    ]);
    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "cancel_upgrade",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} cancelled an upgrade", ctx.uid),
        serde_json::json!({ "upgradeId": req.upgrade_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "upgradeId": req.upgrade_id })))
}
