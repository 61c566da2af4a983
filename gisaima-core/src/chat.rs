//! Chat/event emission and history pruning.
//!
//! Every command handler and most tick phases end by emitting a
//! [`ChatEvent`] describing what happened; this module owns appending one
//! to a world's log and keeping that log bounded. The whole log lives as a
//! single JSON object at one path (`id` -> event), so append-and-prune is
//! one `transact` call rather than a scan over separate child paths.

use gisaima_store::{Store, TransactionOutcome, Value};
use gisaima_utils::config::GisaimaConfig;
use gisaima_utils::error::GisaimaError;
use gisaima_utils::ids::new_id;

use crate::entities::ChatEvent;
use crate::paths;

/// Appends an event to `world_id`'s chat log and prunes the oldest entries
/// past `max_chat_history`, atomically.
pub async fn emit(
    store: &dyn Store,
    world_id: &str,
    kind: impl Into<String>,
    ts: u64,
    x: Option<i32>,
    y: Option<i32>,
    message: impl Into<String>,
    data: Value,
    config: &GisaimaConfig,
) -> Result<ChatEvent, GisaimaError> {
    let event = ChatEvent {
        id: new_id(),
        kind: kind.into(),
        ts,
        world_id: world_id.to_string(),
        x,
        y,
        message: message.into(),
        data,
    };

    let event_value = serde_json::to_value(&event).map_err(|_| GisaimaError::Internal)?;
    let max_history = config.max_chat_history;
    let root = paths::chat_root(world_id);

    store
        .transact(&root, move |current| {
            let mut map = match current {
                Some(Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            };
            map.insert(event.id.clone(), event_value.clone());

            if map.len() > max_history {
                let mut entries: Vec<(String, u64)> = map
                    .iter()
                    .map(|(id, v)| (id.clone(), v.get("ts").and_then(Value::as_u64).unwrap_or(0)))
                    .collect();
                entries.sort_by_key(|(_, ts)| *ts);
                let drop_count = map.len() - max_history;
                for (id, _) in entries.into_iter().take(drop_count) {
                    map.remove(&id);
                }
            }

            TransactionOutcome::Commit(Value::Object(map))
        })
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))?;

    Ok(event)
}

/// Trims `world_id`'s chat log to `max_chat_history`, keeping the newest
/// entries by timestamp. A no-op once the log is already within bounds; the
/// tick runs this every cycle (spec §4.5 step 2) rather than relying solely
/// on `emit`'s own pruning, since a world can go a full tick without any
/// event being emitted.
pub async fn prune(store: &dyn Store, world_id: &str, config: &GisaimaConfig) -> Result<(), GisaimaError> {
    let max_history = config.max_chat_history;
    let root = paths::chat_root(world_id);

    store
        .transact(&root, move |current| {
            let Some(Value::Object(mut map)) = current else {
                return TransactionOutcome::Abort;
            };
            if map.len() <= max_history {
                return TransactionOutcome::Abort;
            }
            let mut entries: Vec<(String, u64)> = map
                .iter()
                .map(|(id, v)| (id.clone(), v.get("ts").and_then(Value::as_u64).unwrap_or(0)))
                .collect();
            entries.sort_by_key(|(_, ts)| *ts);
            let drop_count = map.len() - max_history;
            for (id, _) in entries.into_iter().take(drop_count) {
                map.remove(&id);
            }
            TransactionOutcome::Commit(Value::Object(map))
        })
        .await
        .map_err(|e| GisaimaError::FailedPrecondition(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gisaima_store::InMemoryStore;
    use gisaima_utils::config::GisaimaConfig;

    #[tokio::test]
    async fn emit_appends_and_prunes_oldest() {
        let store = InMemoryStore::new();
        let mut config = GisaimaConfig::default();
        config.max_chat_history = 2;

        for i in 0..3 {
            emit(
                &store,
                "w1",
                "info",
                u64::from(i),
                None,
                None,
                format!("event {i}"),
                Value::Null,
                &config,
            )
            .await
            .unwrap();
        }

        let root = paths::chat_root("w1");
        let Some(Value::Object(map)) = store.read(&root).await.unwrap() else {
            panic!("expected chat log object");
        };
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn prune_is_a_noop_on_an_empty_log() {
        let store = InMemoryStore::new();
        let config = GisaimaConfig::default();
        prune(&store, "w1", &config).await.unwrap();
        assert!(store.read(&paths::chat_root("w1")).await.unwrap().is_none());
    }
}
