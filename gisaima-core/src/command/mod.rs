//! Command handlers: the synchronous, validated entry points players call
//! into the simulation between ticks.
//!
//! Every handler follows the same shape (spec §4.3): authenticate the
//! caller, validate the request against current state, compute a store
//! update, commit it, and emit a chat/event record. `dispatch` is the single
//! public entry point a transport layer (or a test) calls.

pub mod attack;
pub mod build;
pub mod cancel_crafting;
pub mod cancel_move;
pub mod cancel_recruitment;
pub mod crafting;
pub mod demobilise;
pub mod flee_battle;
pub mod gather;
pub mod join_battle;
pub mod join_world;
pub mod mobilise;
pub mod r#move;
pub mod recruit;
pub mod upgrade;

use gisaima_store::Store;
use gisaima_utils::config::GisaimaConfig;
use gisaima_utils::error::GisaimaError;
use serde_json::Value;

use crate::catalog::Catalog;

/// Everything a handler needs besides the request payload itself.
pub struct CommandContext<'a> {
    pub store: &'a dyn Store,
    pub catalog: &'a dyn Catalog,
    pub config: &'a GisaimaConfig,
    /// Authenticated caller, already verified by the transport layer; a
    /// handler never trusts a uid carried in the request body itself.
    pub uid: &'a str,
    pub world_id: &'a str,
    /// Wall-clock tick-time timestamp, injected rather than read from the
    /// system clock so handlers stay deterministic under test.
    pub now: u64,
}

/// What a successful command produced, for the transport layer to relay
/// back to the caller. Handlers don't return full entities — callers refetch
/// via the store if they need the new state — just enough to acknowledge.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommandEffect {
    pub chat_event_id: String,
    pub summary: Value,
}

pub type CommandResult = Result<CommandEffect, GisaimaError>;

pub(crate) fn effect(chat_event_id: impl Into<String>, summary: Value) -> CommandEffect {
    CommandEffect { chat_event_id: chat_event_id.into(), summary }
}

/// Ensures a request field is present, surfacing the spec's
/// invalid-argument error kind uniformly across handlers.
pub(crate) fn require<'a, T>(value: Option<&'a T>, field: &str) -> Result<&'a T, GisaimaError> {
    value.ok_or_else(|| GisaimaError::invalid_argument(format!("missing required field: {field}")))
}

/// A request envelope as received from the transport layer: a command name
/// plus its still-untyped JSON payload.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CommandRequest {
    pub command: String,
    pub payload: Value,
}

/// Deserializes `req.payload` into the handler's request type and routes it
/// to the matching handler. The single entry point a transport layer calls.
#[tracing::instrument(level = "debug", skip(ctx, req), fields(world_id = %ctx.world_id, command = %req.command, uid = %ctx.uid))]
pub async fn dispatch(ctx: &CommandContext<'_>, req: CommandRequest) -> CommandResult {
    fn parse<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, GisaimaError> {
        serde_json::from_value(payload).map_err(|e| GisaimaError::invalid_argument(e.to_string()))
    }

    match req.command.as_str() {
        "mobilise" => mobilise::handle(ctx, parse(req.payload)?).await,
        "demobilise" => demobilise::handle(ctx, parse(req.payload)?).await,
        "move" => r#move::handle(ctx, parse(req.payload)?).await,
        "cancelMove" => cancel_move::cancel_move(ctx, parse(req.payload)?).await,
        "cancelGather" => cancel_move::cancel_gather(ctx, parse(req.payload)?).await,
        "gather" => gather::handle(ctx, parse(req.payload)?).await,
        "attack" => attack::handle(ctx, parse(req.payload)?).await,
        "joinBattle" => join_battle::handle(ctx, parse(req.payload)?).await,
        "fleeBattle" => flee_battle::handle(ctx, parse(req.payload)?).await,
        "build" => build::handle(ctx, parse(req.payload)?).await,
        "startStructureUpgrade" => upgrade::start_structure_upgrade(ctx, parse(req.payload)?).await,
        "startBuildingUpgrade" => upgrade::start_building_upgrade(ctx, parse(req.payload)?).await,
        "cancelUpgrade" => upgrade::cancel_upgrade(ctx, parse(req.payload)?).await,
        "recruit" => recruit::handle(ctx, parse(req.payload)?).await,
        "cancelRecruitment" => cancel_recruitment::handle(ctx, parse(req.payload)?).await,
        "startCrafting" => crafting::handle(ctx, parse(req.payload)?).await,
        "cancelCrafting" => cancel_crafting::handle(ctx, parse(req.payload)?).await,
        "joinWorld" => join_world::join_world(ctx, parse(req.payload)?).await,
        "spawnPlayer" => join_world::spawn_player(ctx, parse(req.payload)?).await,
        other => Err(GisaimaError::invalid_argument(format!("unknown command: {other}"))),
    }
}
