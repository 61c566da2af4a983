//! Layered configuration: built-in defaults, optionally overridden by a TOML
//! file, then by environment variables. Mirrors the shape of the teacher's
//! `STEEL_CONFIG` static — a single process-wide, load-once settings struct.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GisaimaError;

/// Default tick period, in milliseconds. Overridable per world via
/// `World::tick_interval_ms`, but this is the process-wide default used when
/// a world does not specify one.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 60_000;
/// Default bound on retained chat/event history per world.
pub const DEFAULT_MAX_CHAT_HISTORY: usize = 500;
/// Default bound on an explicit or computed movement path length.
pub const DEFAULT_MAX_PATH_LEN: usize = 1000;
/// Default bound on a structure's recruitment queue depth.
pub const DEFAULT_MAX_RECRUIT_QUEUE: usize = 10;

/// Process-wide tunables for the simulation engine.
///
/// `chunk_size` is intentionally absent here: it is a compile-time
/// invariant (`gisaima_utils::coord::CHUNK_SIZE`), not a runtime setting,
/// because changing it after launch would make existing chunk keys
/// non-canonical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GisaimaConfig {
    /// Default tick period in milliseconds, used for worlds that don't override it.
    pub tick_interval_ms: u64,
    /// Maximum chat/event history entries retained per world.
    pub max_chat_history: usize,
    /// Maximum accepted length for an explicit or computed movement path.
    pub max_path_len: usize,
    /// Default recruitment queue capacity for a structure without an explicit one.
    pub max_recruit_queue: usize,
}

impl Default for GisaimaConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_chat_history: DEFAULT_MAX_CHAT_HISTORY,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            max_recruit_queue: DEFAULT_MAX_RECRUIT_QUEUE,
        }
    }
}

impl GisaimaConfig {
    /// Loads defaults, overlays an optional TOML file, then overlays
    /// recognised `GISAIMA_*` environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self, GisaimaError> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    GisaimaError::invalid_argument(format!("reading config {path:?}: {e}"))
                })?;
                config = toml::from_str(&text).map_err(|e| {
                    GisaimaError::invalid_argument(format!("parsing config {path:?}: {e}"))
                })?;
            } else {
                tracing::warn!(?path, "config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u64("GISAIMA_TICK_INTERVAL_MS") {
            self.tick_interval_ms = v;
        }
        if let Some(v) = env_usize("GISAIMA_MAX_CHAT_HISTORY") {
            self.max_chat_history = v;
        }
        if let Some(v) = env_usize("GISAIMA_MAX_PATH_LEN") {
            self.max_path_len = v;
        }
        if let Some(v) = env_usize("GISAIMA_MAX_RECRUIT_QUEUE") {
            self.max_recruit_queue = v;
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = GisaimaConfig::default();
        assert_eq!(config.tick_interval_ms, 60_000);
        assert_eq!(config.max_chat_history, 500);
        assert_eq!(config.max_path_len, 1000);
        assert_eq!(config.max_recruit_queue, 10);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = GisaimaConfig::load(Some(Path::new("/nonexistent/gisaima.toml"))).unwrap();
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
    }
}
