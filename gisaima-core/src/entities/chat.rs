//! World chat and event-log entries (`worlds/{worldId}/chat/{id}`).

use serde::{Deserialize, Serialize};

use super::WorldId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub id: String,
    pub kind: String,
    pub ts: u64,
    pub world_id: WorldId,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
}
