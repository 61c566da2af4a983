//! End-to-end scenarios spanning command handlers and the tick engine
//! against a real (in-memory) store, one test per scripted scenario.

use std::collections::{BTreeSet, HashMap};

use gisaima_core::catalog::StaticCatalog;
use gisaima_core::command::{self, CommandContext};
use gisaima_core::entities::{
    Battle, BattleEvent, BattleEventKind, BattleParticipant, BattleRole, BattleStatus, Group, GroupStatus, ItemBag,
    Motion, Side, Structure, StructureStatus, TargetType, Unit,
};
use gisaima_core::monster_ai::ReflexMonsterAi;
use gisaima_core::paths;
use gisaima_core::tick::TickEngine;
use gisaima_store::{InMemoryStore, Store, Update};
use gisaima_utils::config::GisaimaConfig;
use gisaima_utils::coord::chunk_key_of;

fn warrior_group(id: &str, owner: &str, x: i32, y: i32, strength: u32) -> Group {
    Group {
        id: id.to_string(),
        owner: owner.to_string(),
        name: None,
        race: None,
        status: GroupStatus::Idle,
        x,
        y,
        units: HashMap::from([(
            "u1".to_string(),
            Unit { unit_type: "human_warrior".to_string(), strength: Some(strength), motion: Default::default(), capacity: None, player_id: None },
        )]),
        items: ItemBag::new(),
        motion: std::iter::once(Motion::Ground).collect(),
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
        created_at: 0,
    }
}

async fn seed_world(store: &InMemoryStore, world_id: &str) {
    let world = serde_json::json!({
        "id": world_id,
        "seed": 0,
        "speed": 1.0,
        "tickIntervalMs": 60_000,
        "lastTick": 0,
        "playerCount": 0,
    });
    store.commit(Update::from([(paths::world_info(world_id), Some(world))])).await.unwrap();
}

#[tokio::test]
async fn mobilise_move_arrive() {
    let store = InMemoryStore::new();
    seed_world(&store, "w").await;

    let mut group = warrior_group("g", "p1", 0, 0, 5);
    group.units.insert(
        "u2".to_string(),
        Unit { unit_type: "human_warrior".to_string(), strength: Some(5), motion: Default::default(), capacity: None, player_id: None },
    );
    group.units.insert(
        "u3".to_string(),
        Unit { unit_type: "human_warrior".to_string(), strength: Some(5), motion: Default::default(), capacity: None, player_id: None },
    );
    let group_value = serde_json::to_value(&group).unwrap();
    store.commit(Update::from([(paths::tile_group("w", 0, 0, "g"), Some(group_value))])).await.unwrap();

    let catalog = StaticCatalog::new();
    let config = GisaimaConfig::default();
    let ctx = CommandContext { store: &store, catalog: &catalog, config: &config, uid: "p1", world_id: "w", now: 0 };

    let req = gisaima_core::command::r#move::MoveRequest {
        group_id: "g".to_string(),
        from_x: 0,
        from_y: 0,
        to_x: 3,
        to_y: 0,
        path: None,
    };
    command::r#move::handle(&ctx, req).await.unwrap();

    let moved = store.read(&paths::tile_group("w", 0, 0, "g")).await.unwrap().unwrap();
    assert_eq!(moved["status"], "moving");
    assert_eq!(moved["pathIndex"], 0);
    assert_eq!(moved["nextMoveTime"], 60_000);
    assert_eq!(
        moved["movementPath"],
        serde_json::json!([[0, 0], [1, 0], [2, 0], [3, 0]])
    );

    let ai = ReflexMonsterAi;
    let engine = TickEngine::new(&store, &catalog, &config, &ai);
    // Advancing one path step per tick reaches (3, 0) on the third tick,
    // and the group drops back to idle in that same tick.
    for now in [60_000u64, 120_000, 180_000] {
        engine.tick_world("w", now).await.unwrap();
    }

    assert!(store.read(&paths::tile_group("w", 0, 0, "g")).await.unwrap().is_none());
    let arrived = store.read(&paths::tile_group("w", 3, 0, "g")).await.unwrap().unwrap();
    assert_eq!(arrived["status"], "idle");
    assert_eq!(chunk_key_of(3, 0).to_string(), "0,0");
}

#[tokio::test]
async fn attack_resolves_and_deletes_the_losing_attacker() {
    let store = InMemoryStore::new();
    seed_world(&store, "w").await;

    let attacker = warrior_group("a", "p1", 5, 5, 10);
    let defender = warrior_group("d", "p2", 5, 5, 4);
    let structure = Structure {
        id: "s1".to_string(),
        x: 5,
        y: 5,
        owner: Some("p2".to_string()),
        structure_type: "fortress".to_string(),
        name: "Fortress".to_string(),
        race: None,
        level: 1,
        status: StructureStatus::Active,
        build_progress: None,
        build_total_time: None,
        builder: None,
        upgrade_in_progress: false,
        upgrade_id: None,
        upgrade_completes_at: None,
        items: ItemBag::new(),
        banks: HashMap::new(),
        buildings: HashMap::new(),
        recruitment_queue: HashMap::new(),
        units: HashMap::new(),
        in_battle: None,
        created_at: 0,
    };

    store
        .commit(Update::from([
            (paths::tile_group("w", 5, 5, "a"), Some(serde_json::to_value(&attacker).unwrap())),
            (paths::tile_group("w", 5, 5, "d"), Some(serde_json::to_value(&defender).unwrap())),
            (paths::tile_structure("w", 5, 5), Some(serde_json::to_value(&structure).unwrap())),
        ]))
        .await
        .unwrap();

    let catalog = StaticCatalog::new();
    let config = GisaimaConfig::default();
    let ctx = CommandContext { store: &store, catalog: &catalog, config: &config, uid: "p1", world_id: "w", now: 0 };

    command::attack::handle(
        &ctx,
        command::attack::AttackRequest {
            x: 5,
            y: 5,
            attacker_group_ids: vec!["a".to_string()],
            defender_group_ids: vec!["d".to_string()],
            structure_id: Some("s1".to_string()),
        },
    )
    .await
    .unwrap();

    let battles_root = paths::tile_battles("w", 5, 5);
    let battle_ids = store.list_children(&battles_root).await.unwrap();
    assert_eq!(battle_ids.len(), 1);
    let battle: serde_json::Value = store.read(&paths::tile_battle("w", 5, 5, &battle_ids[0])).await.unwrap().unwrap();
    let battle: Battle = serde_json::from_value(battle).unwrap();
    assert_eq!(battle.side_power(Side::One), 10);
    assert_eq!(battle.side_power(Side::Two), 34);

    let ai = ReflexMonsterAi;
    let engine = TickEngine::new(&store, &catalog, &config, &ai);
    for now in [60_000u64, 120_000, 180_000, 240_000] {
        engine.tick_world("w", now).await.unwrap();
        if store.list_children(&battles_root).await.unwrap().is_empty() {
            break;
        }
    }

    assert!(store.list_children(&battles_root).await.unwrap().is_empty());
    assert!(store.read(&paths::tile_group("w", 5, 5, "a")).await.unwrap().is_none());
    assert!(store.read(&paths::tile_structure("w", 5, 5)).await.unwrap().is_some());

    let chat_root = paths::chat_root("w");
    let chat = store.read(&chat_root).await.unwrap().unwrap();
    let kinds: Vec<&str> = chat.as_object().unwrap().values().filter_map(|v| v["kind"].as_str()).collect();
    assert!(kinds.contains(&"battle_start"));
    assert!(kinds.contains(&"battle_end"));
}

#[tokio::test]
async fn flee_penalty_removes_a_fifth_of_non_player_units() {
    let store = InMemoryStore::new();
    seed_world(&store, "w").await;

    let mut group = warrior_group("g", "p1", 1, 1, 1);
    group.units.clear();
    for i in 0..10 {
        group.units.insert(format!("u{i}"), Unit { unit_type: "human_warrior".to_string(), strength: Some(1), motion: Default::default(), capacity: None, player_id: None });
    }
    group.status = GroupStatus::Fleeing;
    group.battle_id = Some("b1".to_string());
    group.battle_side = Some(Side::One);
    group.battle_role = Some(BattleRole::Attacker);
    group.flee_tick_requested = Some(0);

    // A second attacker group, with enough units to absorb a round of
    // return damage without being wiped out, stays in the fight so the
    // battle is still active (and its record still exists) once "g" flees.
    let mut holding = warrior_group("h", "p1", 1, 1, 5);
    holding.units.clear();
    for i in 0..10 {
        holding.units.insert(format!("h{i}"), Unit { unit_type: "human_warrior".to_string(), strength: Some(5), motion: Default::default(), capacity: None, player_id: None });
    }
    holding.status = GroupStatus::Fighting;
    holding.battle_id = Some("b1".to_string());
    holding.battle_side = Some(Side::One);
    holding.battle_role = Some(BattleRole::Attacker);

    let battle = Battle {
        id: "b1".to_string(),
        x: 1,
        y: 1,
        side1: HashMap::from([
            ("g".to_string(), BattleParticipant { group_id: "g".to_string(), power: 10 }),
            ("h".to_string(), BattleParticipant { group_id: "h".to_string(), power: 50 }),
        ]),
        side2: HashMap::from([("d".to_string(), BattleParticipant { group_id: "d".to_string(), power: 20 })]),
        structure_power: 0,
        structure_id: None,
        target_types: BTreeSet::from([TargetType::Group]),
        events: vec![BattleEvent { kind: BattleEventKind::Started, tick: 0, detail: serde_json::json!({}) }],
        tick_count: 0,
        status: BattleStatus::Active,
        started_at: 0,
    };
    // A defender with enough low-strength units to survive the incoming
    // round's damage too, for the same reason.
    let mut defender = warrior_group("d", "p2", 1, 1, 1);
    defender.units.clear();
    for i in 0..20 {
        defender.units.insert(format!("d{i}"), Unit { unit_type: "human_warrior".to_string(), strength: Some(1), motion: Default::default(), capacity: None, player_id: None });
    }
    defender.status = GroupStatus::Fighting;
    defender.battle_id = Some("b1".to_string());
    defender.battle_side = Some(Side::Two);

    store
        .commit(Update::from([
            (paths::tile_group("w", 1, 1, "h"), Some(serde_json::to_value(&holding).unwrap())),
            (paths::tile_group("w", 1, 1, "g"), Some(serde_json::to_value(&group).unwrap())),
            (paths::tile_group("w", 1, 1, "d"), Some(serde_json::to_value(&defender).unwrap())),
            (paths::tile_battle("w", 1, 1, "b1"), Some(serde_json::to_value(&battle).unwrap())),
        ]))
        .await
        .unwrap();

    let catalog = StaticCatalog::new();
    let config = GisaimaConfig::default();
    let ai = ReflexMonsterAi;
    let engine = TickEngine::new(&store, &catalog, &config, &ai);
    engine.tick_world("w", 60_000).await.unwrap();

    let fled = store.read(&paths::tile_group("w", 1, 1, "g")).await.unwrap().unwrap();
    assert_eq!(fled["status"], "idle");
    assert_eq!(fled["units"].as_object().unwrap().len(), 8);
    assert!(fled["battleId"].is_null());
    assert!(fled["fleeTickRequested"].is_null());

    let battle_value = store.read(&paths::tile_battle("w", 1, 1, "b1")).await.unwrap().unwrap();
    let kinds: Vec<&str> = battle_value["events"].as_array().unwrap().iter().filter_map(|e| e["kind"].as_str()).collect();
    assert!(kinds.contains(&"fled"));
}

#[tokio::test]
async fn build_completes_after_one_tick() {
    let store = InMemoryStore::new();
    seed_world(&store, "w").await;

    let mut group = warrior_group("b", "p1", 2, 2, 1);
    gisaima_core::entities::item::add(&mut group.items, "wooden_sticks", 5);
    gisaima_core::entities::item::add(&mut group.items, "stone_pieces", 3);
    store
        .commit(Update::from([(paths::tile_group("w", 2, 2, "b"), Some(serde_json::to_value(&group).unwrap()))]))
        .await
        .unwrap();

    let catalog = StaticCatalog::new();
    let config = GisaimaConfig::default();
    let ctx = CommandContext { store: &store, catalog: &catalog, config: &config, uid: "p1", world_id: "w", now: 0 };

    command::build::handle(
        &ctx,
        command::build::BuildRequest { group_id: "b".to_string(), x: 2, y: 2, structure_type: "outpost".to_string(), structure_name: "Watch".to_string() },
    )
    .await
    .unwrap();

    let structure = store.read(&paths::tile_structure("w", 2, 2)).await.unwrap().unwrap();
    assert_eq!(structure["status"], "building");
    assert_eq!(structure["buildProgress"], 0);
    assert_eq!(structure["buildTotalTime"], 1);
    let builder = store.read(&paths::tile_group("w", 2, 2, "b")).await.unwrap().unwrap();
    assert_eq!(builder["status"], "building");

    let ai = ReflexMonsterAi;
    let engine = TickEngine::new(&store, &catalog, &config, &ai);
    engine.tick_world("w", 60_000).await.unwrap();

    let structure = store.read(&paths::tile_structure("w", 2, 2)).await.unwrap().unwrap();
    assert_eq!(structure["status"], "active");
    let builder = store.read(&paths::tile_group("w", 2, 2, "b")).await.unwrap().unwrap();
    assert_eq!(builder["status"], "idle");
}

#[test]
fn conflict_sanitiser_keeps_fighting_over_moving() {
    use gisaima_core::tick::sanitiser::sanitise_group;

    let mut group = warrior_group("g", "p1", 0, 0, 5);
    group.status = GroupStatus::Moving;
    group.movement_path = vec![(0, 0), (1, 0)];
    group.path_index = Some(0);
    group.target_x = Some(1);
    group.target_y = Some(0);
    group.move_started = Some(0);

    let sanitised = sanitise_group(group, GroupStatus::Fighting);
    assert_eq!(sanitised.status, GroupStatus::Fighting);
    assert!(sanitised.movement_path.is_empty());
    assert_eq!(sanitised.path_index, None);
    assert_eq!(sanitised.target_x, None);
    assert_eq!(sanitised.target_y, None);
    assert_eq!(sanitised.move_started, None);
}

#[tokio::test]
async fn chunk_negative_relocates_across_chunk_boundaries() {
    let store = InMemoryStore::new();
    seed_world(&store, "w").await;

    assert_eq!(chunk_key_of(-1, -1).to_string(), "-1,-1");
    assert_eq!(chunk_key_of(-20, -20).to_string(), "-1,-1");
    assert_eq!(chunk_key_of(-21, -21).to_string(), "-2,-2");

    let group = warrior_group("g", "p1", -1, -1, 5);
    store
        .commit(Update::from([(paths::tile_group("w", -1, -1, "g"), Some(serde_json::to_value(&group).unwrap()))]))
        .await
        .unwrap();

    let catalog = StaticCatalog::new();
    let config = GisaimaConfig::default();
    let ctx = CommandContext { store: &store, catalog: &catalog, config: &config, uid: "p1", world_id: "w", now: 0 };

    command::r#move::handle(
        &ctx,
        command::r#move::MoveRequest { group_id: "g".to_string(), from_x: -1, from_y: -1, to_x: -21, to_y: -21, path: None },
    )
    .await
    .unwrap();

    let ai = ReflexMonsterAi;
    let engine = TickEngine::new(&store, &catalog, &config, &ai);
    let mut now = 0u64;
    loop {
        now += 60_000;
        engine.tick_world("w", now).await.unwrap();
        if let Some(group) = store.read(&paths::tile_group("w", -21, -21, "g")).await.unwrap() {
            if group["status"] == "idle" {
                break;
            }
        }
        assert!(now < 3_000_000, "group never arrived at its destination");
    }

    assert!(store.read(&paths::tile_group("w", -1, -1, "g")).await.unwrap().is_none());
    let arrived = store.read(&paths::tile_group("w", -21, -21, "g")).await.unwrap().unwrap();
    assert_eq!(arrived["status"], "idle");
}
