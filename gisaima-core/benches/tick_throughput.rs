#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gisaima_core::catalog::StaticCatalog;
use gisaima_core::monster_ai::ReflexMonsterAi;
use gisaima_core::paths;
use gisaima_core::tick::TickEngine;
use gisaima_store::{InMemoryStore, Store, Update};
use gisaima_utils::config::GisaimaConfig;

fn seed_world_with_moving_groups(group_count: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    rt.block_on(async {
        let world = serde_json::json!({
            "id": "bench",
            "seed": 0,
            "speed": 1.0,
            "tickIntervalMs": 60_000,
            "lastTick": 0,
            "playerCount": 0,
        });
        let mut updates = Update::from([(paths::world_info("bench"), Some(world))]);

        for i in 0..group_count {
            let x = (i as i32) % 50;
            let y = (i as i32) / 50;
            let group_id = format!("g{i}");
            let group = serde_json::json!({
                "id": group_id,
                "owner": "p1",
                "name": null,
                "race": null,
                "status": "moving",
                "x": x,
                "y": y,
                "units": {"u1": {"unitType": "human_warrior", "strength": 5, "motion": [], "capacity": null, "playerId": null}},
                "items": {},
                "motion": [],
                "movementPath": [[x, y], [x + 1, y]],
                "pathIndex": 0,
                "moveStarted": 0,
                "nextMoveTime": 0,
                "targetX": x + 1,
                "targetY": y,
                "gatheringBiome": null,
                "gatheringTicksRemaining": null,
                "buildStructureId": null,
                "demobiliseStructureId": null,
                "storageDestination": null,
                "battleId": null,
                "battleRole": null,
                "battleSide": null,
                "fleeTickRequested": null,
                "cancelRequestTime": null,
                "createdAt": 0,
            });
            updates.insert(paths::tile_group("bench", x, y, &format!("g{i}")), Some(group));
        }

        store.commit(updates).await.expect("seed commit");
    });

    store
}

fn bench_tick_world_by_group_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_world_group_dispatch");
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    for group_count in [10usize, 100, 1_000] {
        let store = seed_world_with_moving_groups(group_count);
        let catalog = StaticCatalog::new();
        let config = GisaimaConfig::default();
        let ai = ReflexMonsterAi;
        let engine = TickEngine::new(&store, &catalog, &config, &ai);

        group.throughput(Throughput::Elements(group_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(group_count), &group_count, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(engine.tick_world("bench", 60_000).await.expect("tick"));
                });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick_world_by_group_count);
criterion_main!(benches);
