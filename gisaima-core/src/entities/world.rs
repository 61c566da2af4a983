//! The per-world record (`worlds/{worldId}/info`).

use serde::{Deserialize, Serialize};

use super::WorldId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub id: WorldId,
    pub seed: i64,
    /// Simulation speed multiplier applied to tick-time durations.
    pub speed: f64,
    pub tick_interval_ms: u64,
    pub last_tick: u64,
    pub player_count: u64,
}

impl World {
    /// Scales a base duration (in ticks or milliseconds, caller's choice of
    /// unit) by this world's speed. A `speed` above 1.0 makes things happen
    /// faster, so durations shrink.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn scaled_duration(&self, base: u64) -> u64 {
        if self.speed <= 0.0 {
            return base;
        }
        ((base as f64) / self.speed).round() as u64
    }
}
