//! The tick engine (spec §4.5): discovers worlds, loads each world's tiles
//! into memory, runs the nine-step per-world contract, and commits the
//! result in a single store write. Worlds are independent; the caller
//! (the `gisaima` binary) is expected to run [`TickEngine::tick_world`] for
//! each discovered world concurrently, one `tokio` task per world,
//! mirroring the teacher's `spawn_blocking`-per-world tick fan-out.

pub mod battles;
pub mod groups;
pub mod monsters;
pub mod sanitiser;
pub mod structures;
pub mod upgrades_crafting;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use gisaima_store::{Store, Update};
use gisaima_utils::config::GisaimaConfig;
use gisaima_utils::error::GisaimaError;
use gisaima_store::error::StoreError;

use crate::catalog::Catalog;
use crate::entities::{
    BattleId, CraftingJob, GroupId, PlayerId, PlayerWorldRecord, Structure, Tile, Upgrade, World,
};
use crate::monster_ai::MonsterAi;
use crate::paths;

use battles::ChatDraft;

fn store_err(_e: StoreError) -> GisaimaError {
    GisaimaError::Internal
}

/// Probabilities the monster-spawn pass checks once per world per tick.
#[derive(Debug, Clone, Copy)]
pub struct MonsterTuning {
    pub spawn_chance: f64,
}

impl Default for MonsterTuning {
    fn default() -> Self {
        Self { spawn_chance: 0.01 }
    }
}

/// Counts of what one world's tick actually did, returned for metrics/tests.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub world_id: String,
    pub tiles_loaded: usize,
    pub battles_resolved: usize,
    pub groups_dispatched: usize,
    pub upgrades_completed: usize,
    pub crafts_completed: usize,
    pub recruits_completed: usize,
    pub monsters_decided: usize,
}

/// What a tile looked like at load time, kept around so the final commit
/// can tell a deletion/relocation apart from "never touched".
#[derive(Debug, Default)]
struct TileSnapshot {
    groups: HashSet<GroupId>,
    battles: HashSet<BattleId>,
    players: HashSet<PlayerId>,
    had_structure: bool,
}

pub struct TickEngine<'a> {
    store: &'a dyn Store,
    catalog: &'a dyn Catalog,
    config: &'a GisaimaConfig,
    monster_ai: &'a dyn MonsterAi,
    monster_tuning: MonsterTuning,
}

impl<'a> TickEngine<'a> {
    #[must_use]
    pub fn new(store: &'a dyn Store, catalog: &'a dyn Catalog, config: &'a GisaimaConfig, monster_ai: &'a dyn MonsterAi) -> Self {
        Self { store, catalog, config, monster_ai, monster_tuning: MonsterTuning::default() }
    }

    #[must_use]
    pub fn with_monster_tuning(mut self, tuning: MonsterTuning) -> Self {
        self.monster_tuning = tuning;
        self
    }

    /// Lists every known world id, via the store's child-listing primitive.
    pub async fn discover_worlds(&self) -> Result<Vec<String>, GisaimaError> {
        self.store.list_children(&paths::worlds_root()).await.map_err(store_err)
    }

    async fn load_tiles(&self, world_id: &str) -> Result<(HashMap<(i32, i32), Tile>, HashMap<(i32, i32), TileSnapshot>), GisaimaError> {
        let mut tiles = HashMap::new();
        let mut snapshots = HashMap::new();

        let chunks_root = paths::world_chunks(world_id);
        let chunk_keys = self.store.list_children(&chunks_root).await.map_err(store_err)?;
        for chunk_key in chunk_keys {
            let chunk_path = chunks_root.join(&chunk_key);
            let x_segments = self.store.list_children(&chunk_path).await.map_err(store_err)?;
            for x_segment in x_segments {
                let Ok(x) = x_segment.parse::<i32>() else { continue };
                let x_path = chunk_path.join(&x_segment);
                let y_segments = self.store.list_children(&x_path).await.map_err(store_err)?;
                for y_segment in y_segments {
                    let Ok(y) = y_segment.parse::<i32>() else { continue };
                    let tile_path = paths::tile(world_id, x, y);
                    let Some(value) = self.store.read(&tile_path).await.map_err(store_err)? else { continue };
                    let tile: Tile = serde_json::from_value(value).map_err(|_| GisaimaError::Internal)?;
                    snapshots.insert(
                        (x, y),
                        TileSnapshot {
                            groups: tile.groups.keys().cloned().collect(),
                            battles: tile.battles.keys().cloned().collect(),
                            players: tile.players.keys().cloned().collect(),
                            had_structure: tile.structure.is_some(),
                        },
                    );
                    tiles.insert((x, y), tile);
                }
            }
        }

        Ok((tiles, snapshots))
    }

    async fn load_upgrades_and_crafting(&self, world_id: &str) -> Result<(HashMap<String, Upgrade>, HashMap<String, CraftingJob>), GisaimaError> {
        let mut upgrades = HashMap::new();
        for id in self.store.list_children(&paths::world_upgrades(world_id)).await.map_err(store_err)? {
            if let Some(value) = self.store.read(&paths::upgrade(world_id, &id)).await.map_err(store_err)? {
                upgrades.insert(id, serde_json::from_value(value).map_err(|_| GisaimaError::Internal)?);
            }
        }

        let mut crafting_jobs = HashMap::new();
        for id in self.store.list_children(&paths::world_crafting(world_id)).await.map_err(store_err)? {
            if let Some(value) = self.store.read(&paths::craft(world_id, &id)).await.map_err(store_err)? {
                crafting_jobs.insert(id, serde_json::from_value(value).map_err(|_| GisaimaError::Internal)?);
            }
        }

        Ok((upgrades, crafting_jobs))
    }

    async fn load_players(&self, world_id: &str, uids: impl Iterator<Item = String>) -> Result<HashMap<PlayerId, PlayerWorldRecord>, GisaimaError> {
        let mut players = HashMap::new();
        for uid in uids {
            if players.contains_key(&uid) {
                continue;
            }
            if let Some(value) = self.store.read(&paths::player_world_record(&uid, world_id)).await.map_err(store_err)? {
                players.insert(uid, serde_json::from_value(value).map_err(|_| GisaimaError::Internal)?);
            }
        }
        Ok(players)
    }

    /// Runs the full nine-step tick contract for one world and commits the
    /// result. `now` is the tick's logical timestamp (ms), supplied by the
    /// caller rather than read from the clock here so a retried tick is
    /// idempotent (spec §5, cancellation/timeouts).
    #[tracing::instrument(level = "trace", skip(self), fields(world_id = %world_id))]
    pub async fn tick_world(&self, world_id: &str, now: u64) -> Result<TickReport, GisaimaError> {
        let tick_start = Instant::now();

        let world_value = self
            .store
            .read(&paths::world_info(world_id))
            .await
            .map_err(store_err)?
            .ok_or_else(|| GisaimaError::not_found("world"))?;
        let mut world: World = serde_json::from_value(world_value).map_err(|_| GisaimaError::Internal)?;

        let chat_start = Instant::now();
        crate::chat::prune(self.store, world_id, self.config).await?;
        let chat_elapsed = chat_start.elapsed();

        let load_start = Instant::now();
        let (mut tiles, snapshots) = self.load_tiles(world_id).await?;
        let tiles_loaded = tiles.len();
        let load_elapsed = load_start.elapsed();

        let mut drafts: Vec<ChatDraft> = Vec::new();
        let mut processed: HashSet<GroupId> = HashSet::new();
        let mut player_defeats: Vec<(PlayerId, i32, i32)> = Vec::new();

        // Phase A: battles first, so a group resolved this tick is never
        // also moved/gathered/built by a later phase (spec invariant 4).
        let battle_start = Instant::now();
        let mut battles_resolved = 0;
        for tile in tiles.values_mut() {
            if tile.battles.is_empty() {
                continue;
            }
            let outcome = battles::resolve_tile_battles(tile, now, &mut processed);
            battles_resolved += outcome.resolved;
            player_defeats.extend(outcome.player_defeats);
            drafts.extend(outcome.chat_drafts);
        }
        let battle_elapsed = battle_start.elapsed();

        // Phase B: structure build progress.
        let structure_start = Instant::now();
        for tile in tiles.values_mut() {
            structures::advance_building(tile, self.catalog);
        }
        let structure_elapsed = structure_start.elapsed();

        // Phase C: group dispatch.
        let group_start = Instant::now();
        let (groups_dispatched, group_drafts) = groups::dispatch_groups(&mut tiles, &world, now, self.config, &processed);
        drafts.extend(group_drafts);
        let group_elapsed = group_start.elapsed();

        // Step 6: upgrade, crafting, and recruitment completion.
        let uc_start = Instant::now();
        let (mut upgrades, mut crafting_jobs) = self.load_upgrades_and_crafting(world_id).await?;
        let needed_players = crafting_jobs
            .values()
            .map(|j| j.player_id.clone())
            .chain(player_defeats.iter().map(|(uid, _, _)| uid.clone()));
        let mut players = self.load_players(world_id, needed_players).await?;

        let mut structures_by_pos: HashMap<(i32, i32), Structure> = tiles
            .iter()
            .filter_map(|(&pos, tile)| tile.structure.clone().map(|s| (pos, s)))
            .collect();

        let upgrades_completed = upgrades_crafting::complete_upgrades(&mut upgrades, &mut structures_by_pos, now, &mut drafts);
        let finished_craft_ids = upgrades_crafting::complete_crafting(&mut crafting_jobs, &mut players, now, &mut drafts);
        let recruits_completed = upgrades_crafting::complete_recruitment(&mut structures_by_pos, self.catalog, now, &mut drafts);

        for (pos, structure) in structures_by_pos {
            if let Some(tile) = tiles.get_mut(&pos) {
                tile.structure = Some(structure);
            }
        }
        let uc_elapsed = uc_start.elapsed();

        apply_player_defeats(&mut players, &player_defeats, world_id, now);

        // Step 7: monster AI.
        let monster_start = Instant::now();
        if let Some(draft) = monsters::spawn_monsters(&mut tiles, now, self.monster_tuning.spawn_chance) {
            drafts.push(draft);
        }
        monsters::monster_strategy_tick(&mut tiles);
        monsters::merge_world_monster_groups(&mut tiles);
        let (monsters_decided, monster_drafts) = monsters::apply_monster_ai(&mut tiles, self.monster_ai, now, &processed);
        drafts.extend(monster_drafts);
        let monster_elapsed = monster_start.elapsed();

        // Step 8: conflict sanitisation. Runs `sanitiser::sanitise_group`
        // over every group on every tile as a final per-tile pass: each
        // group's own current status wins against itself, but
        // `scrub_incompatible_fields` still clears anything a status
        // transition earlier in the tick left dangling (e.g. stale
        // movement/battle fields on a group another phase restamped), so no
        // group can reach the commit with an internally inconsistent set of
        // fields regardless of which phase last touched it.
        let sanitise_start = Instant::now();
        for tile in tiles.values_mut() {
            let group_ids: Vec<GroupId> = tile.groups.keys().cloned().collect();
            for gid in group_ids {
                if let Some(group) = tile.groups.remove(&gid) {
                    let status = group.status;
                    tile.groups.insert(gid, sanitiser::sanitise_group(group, status));
                }
            }
        }
        let sanitise_elapsed = sanitise_start.elapsed();

        // Step 9: single commit.
        let commit_start = Instant::now();
        world.last_tick = now;
        let mut updates = Update::new();
        updates.insert(
            paths::world_info(world_id),
            Some(serde_json::to_value(&world).map_err(|_| GisaimaError::Internal)?),
        );

        stage_tile_updates(world_id, &tiles, &snapshots, &mut updates)?;
        stage_upgrade_updates(world_id, &upgrades, &mut updates)?;
        stage_crafting_updates(world_id, &crafting_jobs, &finished_craft_ids, &mut updates)?;
        stage_player_updates(world_id, &players, &mut updates)?;

        self.store.commit(updates).await.map_err(store_err)?;

        for draft in drafts {
            let _ = crate::chat::emit(
                self.store,
                world_id,
                draft.kind,
                now,
                Some(draft.x),
                Some(draft.y),
                draft.message,
                draft.data,
                self.config,
            )
            .await;
        }
        let commit_elapsed = commit_start.elapsed();

        let total_elapsed = tick_start.elapsed();
        if total_elapsed.as_millis() >= 30 {
            tracing::warn!(
                world_id,
                total_ms = total_elapsed.as_millis() as u64,
                chat_ms = chat_elapsed.as_millis() as u64,
                load_ms = load_elapsed.as_millis() as u64,
                battles_ms = battle_elapsed.as_millis() as u64,
                structures_ms = structure_elapsed.as_millis() as u64,
                groups_ms = group_elapsed.as_millis() as u64,
                upgrades_crafting_ms = uc_elapsed.as_millis() as u64,
                monster_ai_ms = monster_elapsed.as_millis() as u64,
                sanitise_ms = sanitise_elapsed.as_millis() as u64,
                commit_ms = commit_elapsed.as_millis() as u64,
                "slow tick"
            );
        }

        Ok(TickReport {
            world_id: world_id.to_string(),
            tiles_loaded,
            battles_resolved,
            groups_dispatched,
            upgrades_completed,
            crafts_completed: finished_craft_ids.len(),
            recruits_completed,
            monsters_decided,
        })
    }
}

fn apply_player_defeats(players: &mut HashMap<PlayerId, PlayerWorldRecord>, defeats: &[(PlayerId, i32, i32)], world_id: &str, _now: u64) {
    for (uid, x, y) in defeats {
        let record = players
            .entry(uid.clone())
            .or_insert_with(|| PlayerWorldRecord::new(uid.clone(), world_id, "human", uid.clone()));
        record.alive = false;
        record.last_location = Some((*x, *y));
        record.in_group = None;
    }
}

fn stage_tile_updates(
    world_id: &str,
    tiles: &HashMap<(i32, i32), Tile>,
    snapshots: &HashMap<(i32, i32), TileSnapshot>,
    updates: &mut Update,
) -> Result<(), GisaimaError> {
    let mut positions: HashSet<(i32, i32)> = snapshots.keys().copied().collect();
    positions.extend(tiles.keys().copied());

    for pos in positions {
        let empty = TileSnapshot::default();
        let before = snapshots.get(&pos).unwrap_or(&empty);
        let (x, y) = pos;

        match tiles.get(&pos) {
            Some(tile) => {
                for (id, group) in &tile.groups {
                    let value = serde_json::to_value(group).map_err(|_| GisaimaError::Internal)?;
                    updates.insert(paths::tile_group(world_id, x, y, id), Some(value));
                }
                for id in before.groups.difference(&tile.groups.keys().cloned().collect()) {
                    updates.insert(paths::tile_group(world_id, x, y, id), None);
                }

                for (id, battle) in &tile.battles {
                    let value = serde_json::to_value(battle).map_err(|_| GisaimaError::Internal)?;
                    updates.insert(paths::tile_battle(world_id, x, y, id), Some(value));
                }
                for id in before.battles.difference(&tile.battles.keys().cloned().collect()) {
                    updates.insert(paths::tile_battle(world_id, x, y, id), None);
                }

                for (uid, presence) in &tile.players {
                    let value = serde_json::to_value(presence).map_err(|_| GisaimaError::Internal)?;
                    updates.insert(paths::tile_player(world_id, x, y, uid), Some(value));
                }
                for uid in before.players.difference(&tile.players.keys().cloned().collect()) {
                    updates.insert(paths::tile_player(world_id, x, y, uid), None);
                }

                match &tile.structure {
                    Some(structure) => {
                        let value = serde_json::to_value(structure).map_err(|_| GisaimaError::Internal)?;
                        updates.insert(paths::tile_structure(world_id, x, y), Some(value));
                    }
                    None if before.had_structure => {
                        updates.insert(paths::tile_structure(world_id, x, y), None);
                    }
                    None => {}
                }

                let items_value = serde_json::to_value(&tile.items).map_err(|_| GisaimaError::Internal)?;
                updates.insert(paths::tile_items(world_id, x, y), Some(items_value));
            }
            None => {
                for id in &before.groups {
                    updates.insert(paths::tile_group(world_id, x, y, id), None);
                }
                for id in &before.battles {
                    updates.insert(paths::tile_battle(world_id, x, y, id), None);
                }
                for uid in &before.players {
                    updates.insert(paths::tile_player(world_id, x, y, uid), None);
                }
                if before.had_structure {
                    updates.insert(paths::tile_structure(world_id, x, y), None);
                }
            }
        }
    }

    Ok(())
}

fn stage_upgrade_updates(world_id: &str, upgrades: &HashMap<String, Upgrade>, updates: &mut Update) -> Result<(), GisaimaError> {
    for (id, upgrade) in upgrades {
        let value = serde_json::to_value(upgrade).map_err(|_| GisaimaError::Internal)?;
        updates.insert(paths::upgrade(world_id, id), Some(value));
    }
    Ok(())
}

fn stage_crafting_updates(
    world_id: &str,
    jobs: &HashMap<String, CraftingJob>,
    finished_ids: &[String],
    updates: &mut Update,
) -> Result<(), GisaimaError> {
    let finished: HashSet<&str> = finished_ids.iter().map(String::as_str).collect();
    for (id, job) in jobs {
        if finished.contains(id.as_str()) {
            updates.insert(paths::craft(world_id, id), None);
        } else {
            let value = serde_json::to_value(job).map_err(|_| GisaimaError::Internal)?;
            updates.insert(paths::craft(world_id, id), Some(value));
        }
    }
    Ok(())
}

fn stage_player_updates(world_id: &str, players: &HashMap<PlayerId, PlayerWorldRecord>, updates: &mut Update) -> Result<(), GisaimaError> {
    for (uid, record) in players {
        let value = serde_json::to_value(record).map_err(|_| GisaimaError::Internal)?;
        updates.insert(paths::player_world_record(uid, world_id), Some(value));
    }
    Ok(())
}
