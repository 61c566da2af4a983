//! Store path builders for every entity the engine reads or writes.
//!
//! Centralizing these keeps the on-disk layout (spec §6) in one place;
//! handlers and the tick engine should never hand-build a [`Path`].

use gisaima_store::Path;
use gisaima_utils::coord::chunk_key_of;

#[must_use]
pub fn worlds_root() -> Path {
    Path::new(["worlds"])
}

#[must_use]
pub fn world_info(world_id: &str) -> Path {
    Path::new(["worlds", world_id, "info"])
}

#[must_use]
pub fn world_chunks(world_id: &str) -> Path {
    Path::new(["worlds", world_id, "chunks"])
}

#[must_use]
pub fn world_upgrades(world_id: &str) -> Path {
    Path::new(["worlds", world_id, "upgrades"])
}

#[must_use]
pub fn world_crafting(world_id: &str) -> Path {
    Path::new(["worlds", world_id, "crafting"])
}

#[must_use]
pub fn chunk(world_id: &str, x: i32, y: i32) -> Path {
    let key = chunk_key_of(x, y).to_string();
    Path::new(["worlds", world_id, "chunks", &key])
}

#[must_use]
pub fn tile(world_id: &str, x: i32, y: i32) -> Path {
    chunk(world_id, x, y).join(x.to_string()).join(y.to_string())
}

#[must_use]
pub fn tile_group(world_id: &str, x: i32, y: i32, group_id: &str) -> Path {
    tile(world_id, x, y).join("groups").join(group_id)
}

#[must_use]
pub fn tile_groups(world_id: &str, x: i32, y: i32) -> Path {
    tile(world_id, x, y).join("groups")
}

#[must_use]
pub fn tile_player(world_id: &str, x: i32, y: i32, uid: &str) -> Path {
    tile(world_id, x, y).join("players").join(uid)
}

#[must_use]
pub fn tile_structure(world_id: &str, x: i32, y: i32) -> Path {
    tile(world_id, x, y).join("structure")
}

#[must_use]
pub fn tile_battle(world_id: &str, x: i32, y: i32, battle_id: &str) -> Path {
    tile(world_id, x, y).join("battles").join(battle_id)
}

#[must_use]
pub fn tile_battles(world_id: &str, x: i32, y: i32) -> Path {
    tile(world_id, x, y).join("battles")
}

#[must_use]
pub fn tile_items(world_id: &str, x: i32, y: i32) -> Path {
    tile(world_id, x, y).join("items")
}

#[must_use]
pub fn structure_recruit(world_id: &str, x: i32, y: i32, recruit_id: &str) -> Path {
    tile_structure(world_id, x, y).join("recruitmentQueue").join(recruit_id)
}

#[must_use]
pub fn upgrade(world_id: &str, upgrade_id: &str) -> Path {
    Path::new(["worlds", world_id, "upgrades", upgrade_id])
}

#[must_use]
pub fn craft(world_id: &str, craft_id: &str) -> Path {
    Path::new(["worlds", world_id, "crafting", craft_id])
}

#[must_use]
pub fn chat(world_id: &str, event_id: &str) -> Path {
    Path::new(["worlds", world_id, "chat", event_id])
}

#[must_use]
pub fn chat_root(world_id: &str) -> Path {
    Path::new(["worlds", world_id, "chat"])
}

#[must_use]
pub fn player_world_record(uid: &str, world_id: &str) -> Path {
    Path::new(["players", uid, "worlds", world_id])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_path_nests_under_its_chunk() {
        let t = tile("w1", -21, 5);
        let c = chunk("w1", -21, 5);
        assert!(t.is_within(&c));
        assert_eq!(t.to_string(), "worlds/w1/chunks/-2,0/-21/5");
    }
}
