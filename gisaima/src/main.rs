//! The standalone simulation process: loads configuration, opens the
//! store, and runs the tick loop until asked to shut down.
//!
//! The production store backend is an external collaborator
//! (`gisaima-store`'s docs); this binary runs against the in-memory
//! reference implementation, seeding a single default world on first boot
//! if the store is empty.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use gisaima_core::catalog::StaticCatalog;
use gisaima_core::monster_ai::ReflexMonsterAi;
use gisaima_core::tick::TickEngine;
use gisaima_store::{InMemoryStore, Store, Update};
use gisaima_utils::config::GisaimaConfig;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Gisaima: a persistent, tick-driven strategy world simulation engine.
#[derive(Debug, Parser)]
#[command(name = "gisaima", version, about)]
struct Cli {
    /// Path to a TOML configuration file. Falls back to built-in defaults
    /// (and `GISAIMA_*` env overrides) if absent.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// World id to seed when the store starts out empty.
    #[arg(long, default_value = "default")]
    default_world: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = GisaimaConfig::load(cli.config.as_deref())?;
    tracing::info!(tick_interval_ms = config.tick_interval_ms, "configuration loaded");

    let store = InMemoryStore::new();
    ensure_default_world(&store, &cli.default_world, config.tick_interval_ms).await?;

    let catalog = StaticCatalog::new();
    let monster_ai = ReflexMonsterAi;
    let engine = TickEngine::new(&store, &catalog, &config, &monster_ai);

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown_token.cancel();
        }
    });

    run_tick_loop(&engine, &config, &cancel_token).await;
    tracing::info!("shut down cleanly");
    Ok(())
}

/// Drives the tick loop: ticks every known world once per `tick_interval_ms`
/// of wall-clock time, sleeping the remainder. A world late past its own
/// `tickIntervalMs`/speed still only ticks once per process-wide interval;
/// per-world cadence differences are a `speed`-scaled duration within a
/// tick, not a different tick frequency (spec §4.4).
async fn run_tick_loop(engine: &TickEngine<'_>, config: &GisaimaConfig, cancel_token: &CancellationToken) {
    let period = Duration::from_millis(config.tick_interval_ms);
    let mut next_tick_time = Instant::now();
    let mut now_ms: u64 = 0;

    loop {
        if cancel_token.is_cancelled() {
            break;
        }

        let now = Instant::now();
        if now < next_tick_time {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                () = sleep(next_tick_time - now) => {}
            }
        }
        next_tick_time += period;
        now_ms += config.tick_interval_ms;

        if cancel_token.is_cancelled() {
            break;
        }

        let tick_start = Instant::now();
        match engine.discover_worlds().await {
            Ok(world_ids) => {
                for world_id in world_ids {
                    if let Err(err) = engine.tick_world(&world_id, now_ms).await {
                        tracing::error!(world_id, %err, "world tick failed");
                    }
                }
            }
            Err(err) => tracing::error!(%err, "failed to discover worlds"),
        }
        tracing::trace!(elapsed_ms = tick_start.elapsed().as_millis() as u64, "tick cycle complete");
    }
}

async fn ensure_default_world(store: &InMemoryStore, world_id: &str, tick_interval_ms: u64) -> anyhow::Result<()> {
    let path = gisaima_core::paths::world_info(world_id);
    if store.read(&path).await?.is_some() {
        return Ok(());
    }

    tracing::info!(world_id, "seeding default world");
    let world = gisaima_core::entities::World {
        id: world_id.to_string(),
        seed: rand::random(),
        speed: 1.0,
        tick_interval_ms,
        last_tick: 0,
        player_count: 0,
    };
    let updates = Update::from([(path, Some(serde_json::to_value(&world)?))]);
    store.commit(updates).await?;
    Ok(())
}
