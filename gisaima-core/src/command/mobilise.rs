//! `mobilise`: assembles a new group from units pulled out of existing
//! groups (and optionally the caller's own player presence) on a tile.

use std::collections::HashMap;

use gisaima_store::{Update, Value};
use gisaima_utils::error::GisaimaError;
use gisaima_utils::ids::new_id;
use serde::Deserialize;

use crate::entities::{Group, GroupStatus, Motion, PlayerWorldRecord, Unit};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobiliseRequest {
    pub x: i32,
    pub y: i32,
    /// Source group id -> unit keys within that group to pull out.
    pub units: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub include_player: bool,
    pub name: Option<String>,
    pub race: Option<String>,
}

pub async fn handle(ctx: &CommandContext<'_>, req: MobiliseRequest) -> CommandResult {
    if req.units.is_empty() && !req.include_player {
        return Err(GisaimaError::invalid_argument("mobilise requires at least one unit or the player"));
    }

    let groups_path = paths::tile_groups(ctx.world_id, req.x, req.y);
    let existing = ctx
        .store
        .read(&groups_path)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .unwrap_or(Value::Object(serde_json::Map::new()));
    let mut groups: HashMap<String, Group> =
        serde_json::from_value(existing).map_err(|_| GisaimaError::Internal)?;

    let mut pulled: HashMap<String, Unit> = HashMap::new();
    let mut updates = Update::new();

    for (source_id, unit_keys) in &req.units {
        let source = groups
            .get_mut(source_id)
            .ok_or_else(|| GisaimaError::not_found(format!("group {source_id}")))?;

        if source.owner != ctx.uid {
            return Err(GisaimaError::permission_denied("group not owned by caller"));
        }

        for key in unit_keys {
            let unit = source
                .units
                .remove(key)
                .ok_or_else(|| GisaimaError::not_found(format!("unit {key} in group {source_id}")))?;
            if unit.is_player() {
                return Err(GisaimaError::invalid_argument("player units cannot be selected directly"));
            }
            pulled.insert(key.clone(), unit);
        }

        if source.units.is_empty() {
            updates.insert(paths::tile_group(ctx.world_id, req.x, req.y, source_id), None);
        } else {
            let value = serde_json::to_value(&source).map_err(|_| GisaimaError::Internal)?;
            updates.insert(paths::tile_group(ctx.world_id, req.x, req.y, source_id), Some(value));
        }
    }

    let mut player_record = None;
    if req.include_player {
        let presence_path = paths::tile_player(ctx.world_id, req.x, req.y, ctx.uid);
        let presence = ctx
            .store
            .read(&presence_path)
            .await
            .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;
        if presence.is_none() {
            return Err(GisaimaError::failed_precondition("player is not present on this tile"));
        }

        let record_path = paths::player_world_record(ctx.uid, ctx.world_id);
        let record_value = ctx
            .store
            .read(&record_path)
            .await
            .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
            .ok_or_else(|| GisaimaError::not_found("player world record"))?;
        let record: PlayerWorldRecord =
            serde_json::from_value(record_value).map_err(|_| GisaimaError::Internal)?;

        pulled.insert(
            "player".to_string(),
            Unit {
                unit_type: "player".to_string(),
                strength: None,
                motion: std::iter::once(Motion::Ground).collect(),
                capacity: None,
                player_id: Some(ctx.uid.to_string()),
            },
        );
        updates.insert(presence_path, None);
        player_record = Some(record);
    }

    // boat capacity check: total non-boat passengers must not exceed the
    // combined capacity of any water-capable units with a declared capacity.
    let boat_capacity: u32 = pulled
        .values()
        .filter(|u| u.motion.contains(&Motion::Water))
        .filter_map(|u| u.capacity)
        .sum();
    let passenger_count = pulled.values().filter(|u| u.capacity.is_none()).count() as u32;
    if boat_capacity > 0 && passenger_count > boat_capacity {
        return Err(GisaimaError::failed_precondition("boat capacity exceeded"));
    }

    let motion: std::collections::BTreeSet<Motion> = if pulled.values().all(|u| u.motion.contains(&Motion::Water)) {
        std::iter::once(Motion::Water).collect()
    } else {
        std::iter::once(Motion::Ground).collect()
    };

    let group_id = new_id();
    let group = Group {
        id: group_id.clone(),
        owner: ctx.uid.to_string(),
        name: req.name,
        race: req.race.or_else(|| player_record.as_ref().map(|r| r.race.clone())),
        status: GroupStatus::Mobilizing,
        x: req.x,
        y: req.y,
        units: pulled,
        items: Default::default(),
        motion,
        movement_path: Vec::new(),
        path_index: None,
        move_started: None,
        next_move_time: None,
        target_x: None,
        target_y: None,
        gathering_biome: None,
        gathering_ticks_remaining: None,
        build_structure_id: None,
        demobilise_structure_id: None,
        storage_destination: None,
        battle_id: None,
        battle_role: None,
        battle_side: None,
        flee_tick_requested: None,
        cancel_request_time: None,
        created_at: ctx.now,
    };

    let group_value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
    updates.insert(paths::tile_group(ctx.world_id, req.x, req.y, &group_id), Some(group_value));

    ctx.store
        .commit(updates)
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "mobilise",
        ctx.now,
        Some(req.x),
        Some(req.y),
        format!("{} mobilised a new group", ctx.uid),
        serde_json::json!({ "groupId": group_id }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "groupId": group_id })))
}
