//! Shared low-level utilities used across the Gisaima workspace: spatial
//! addressing, the error-kind taxonomy, layered configuration, and thin
//! synchronization wrappers.

pub mod coord;
pub mod error;
pub mod config;
pub mod locks;
pub mod ids;

pub use coord::{chunk_key_of, parse_chunk_key, parse_tile_key, tile_key_of, ChunkKey, TileKey};
pub use error::GisaimaError;
