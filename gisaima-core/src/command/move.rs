//! `move`: paths a group from its current tile to a destination.

use gisaima_utils::error::GisaimaError;
use serde::Deserialize;

use crate::entities::{Group, GroupStatus, World};
use crate::paths;

use super::{effect, CommandContext, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub group_id: String,
    pub from_x: i32,
    pub from_y: i32,
    pub to_x: i32,
    pub to_y: i32,
    pub path: Option<Vec<(i32, i32)>>,
}

pub async fn handle(ctx: &CommandContext<'_>, req: MoveRequest) -> CommandResult {
    let group_path = paths::tile_group(ctx.world_id, req.from_x, req.from_y, &req.group_id);
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

    let path = match req.path {
        Some(p) => p,
        None => bresenham_line(req.from_x, req.from_y, req.to_x, req.to_y),
    };

    if path.first() != Some(&(req.from_x, req.from_y)) || path.last() != Some(&(req.to_x, req.to_y)) {
        return Err(GisaimaError::invalid_argument("path must start at `from` and end at `to`"));
    }
    if path.len() > ctx.config.max_path_len {
        return Err(GisaimaError::invalid_argument(format!(
            "path length {} exceeds maximum {}",
            path.len(),
            ctx.config.max_path_len
        )));
    }

    let world_value = ctx
        .store
        .read(&paths::world_info(ctx.world_id))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?
        .ok_or_else(|| GisaimaError::not_found("world"))?;
    let world: World = serde_json::from_value(world_value).map_err(|_| GisaimaError::Internal)?;

    group.status = GroupStatus::Moving;
    group.movement_path = path;
    group.path_index = Some(0);
    group.move_started = Some(ctx.now);
    group.next_move_time = Some(ctx.now + world.scaled_duration(world.tick_interval_ms));
    group.target_x = Some(req.to_x);
    group.target_y = Some(req.to_y);

    let value = serde_json::to_value(&group).map_err(|_| GisaimaError::Internal)?;
    ctx.store
        .commit(gisaima_store::Update::from([(group_path, Some(value))]))
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    let event = crate::chat::emit(
        ctx.store,
        ctx.world_id,
        "move",
        ctx.now,
        Some(req.from_x),
        Some(req.from_y),
        format!("{} set a group moving", ctx.uid),
        serde_json::json!({ "groupId": req.group_id, "toX": req.to_x, "toY": req.to_y }),
        ctx.config,
    )
    .await?;

    Ok(effect(event.id, serde_json::json!({ "groupId": req.group_id })))
}

/// Integer Bresenham line from `(x0,y0)` to `(x1,y1)`, inclusive of both
/// endpoints. Used when a caller doesn't supply an explicit path.
#[must_use]
pub fn bresenham_line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    let mut points = Vec::new();
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        points.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_includes_every_step() {
        assert_eq!(bresenham_line(0, 0, 3, 0), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn diagonal_line_starts_and_ends_correctly() {
        let path = bresenham_line(-1, -1, 2, 2);
        assert_eq!(path.first(), Some(&(-1, -1)));
        assert_eq!(path.last(), Some(&(2, 2)));
    }
}
