//! `joinWorld` / `spawnPlayer`: onboarding a player into a world and
//! placing them on the map.

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::{PlayerPresence, PlayerWorldRecord, World};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinWorldRequest {
    pub race: String,
    pub display_name: Option<String>,
    pub spawn_position: Option<(i32, i32)>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPlayerRequest {
    pub spawn_x: i32,
    pub spawn_y: i32,
}

pub async fn join_world(ctx: &CommandContext<'_>, req: JoinWorldRequest) -> CommandResult {
    let player_path = paths::player_world_record(ctx.uid, ctx.world_id);
    let existing = ctx
        .store
        .read(&player_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;
    let is_new = existing.is_none();

    let (spawn_x, spawn_y) = req.spawn_position.unwrap_or((0, 0));
    let mut record = PlayerWorldRecord::new(
        ctx.uid,
        ctx.world_id,
        req.race,
        req.display_name.unwrap_or_else(|| ctx.uid.to_string()),
    );
    record.alive = false;
    record.last_location = Some((spawn_x, spawn_y));

    let mut updates = gisaima_store::Update::from([(
        player_path,
        Some(serde_json::to_value(&record).map_err(|_| GisaimaError::Internal)?),
    )]);

    if is_new {
        let world_path = paths::world_info(ctx.world_id);
        let world_value = ctx
            .store
            .read(&world_path)
            .await
            .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
            .ok_or_else(|| GisaimaError::not_found("world"))?;
        let mut world: World = serde_json::from_value(world_value).map_err(|_| GisaimaError::Internal)?;
        world.player_count += 1;
        updates.insert(world_path, Some(serde_json::to_value(&world).map_err(|_| GisaimaError::Internal)?));
    }

    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "join_world",
        ctx.now,
        Some(spawn_x),
        Some(spawn_y),
        format!("{} joined the world", ctx.uid),
        serde_json::json!({}),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "isNew": is_new })))
}

pub async fn spawn_player(ctx: &CommandContext<'_>, req: SpawnPlayerRequest) -> CommandResult {
    let player_path = paths::player_world_record(ctx.uid, ctx.world_id);
    let player_value = ctx
        .store
        .read(&player_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("player world record"))?;
    let mut record: PlayerWorldRecord = serde_json::from_value(player_value).map_err(|_| GisaimaError::Internal)?;

    if record.alive {
        return Err(GisaimaError::failed_precondition("player is already alive"));
    }

    record.alive = true;
    record.last_location = Some((req.spawn_x, req.spawn_y));

    let presence = PlayerPresence { player_id: ctx.uid.to_string(), since: ctx.now };
    let updates = gisaima_store::Update::from([
        (player_path, Some(serde_json::to_value(&record).map_err(|_| GisaimaError::Internal)?)),
        (
            paths::tile_player(ctx.world_id, req.spawn_x, req.spawn_y, ctx.uid),
            Some(serde_json::to_value(&presence).map_err(|_| GisaimaError::Internal)?),
        ),
    ]);
    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "spawn_player",
        ctx.now,
        Some(req.spawn_x),
        Some(req.spawn_y),
        format!("{} spawned into the world", ctx.uid),
        serde_json::json!({}),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({})))
}
