//! Spatial addressing for the infinite tile grid.
//!
//! The world is partitioned into fixed-size chunks. Chunk keys must be
//! canonical under mathematical floor division even for negative
//! coordinates — `chunk_key_of(-1, -1)` is `"-1,-1"`, not `"0,0"`.

use std::fmt;
use std::str::FromStr;

use crate::error::GisaimaError;

/// Tiles per chunk edge. Invariant: must never change post-launch, or
/// existing chunk keys stop being canonical.
pub const CHUNK_SIZE: i32 = 20;

/// A chunk address, `(cx, cy)`, printed as `"cx,cy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub cx: i32,
    pub cy: i32,
}

/// A tile address, `(x, y)`, printed as `"x,y"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.cx, self.cy)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for ChunkKey {
    type Err = GisaimaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cx, cy) = parse_pair(s)?;
        Ok(ChunkKey { cx, cy })
    }
}

impl FromStr for TileKey {
    type Err = GisaimaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = parse_pair(s)?;
        Ok(TileKey { x, y })
    }
}

fn parse_pair(s: &str) -> Result<(i32, i32), GisaimaError> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| GisaimaError::invalid_argument(format!("malformed key: {s}")))?;
    let x = a
        .trim()
        .parse::<i32>()
        .map_err(|_| GisaimaError::invalid_argument(format!("malformed key: {s}")))?;
    let y = b
        .trim()
        .parse::<i32>()
        .map_err(|_| GisaimaError::invalid_argument(format!("malformed key: {s}")))?;
    Ok((x, y))
}

/// Computes the chunk key for a tile coordinate. Floor division via
/// `div_euclid`, which for a positive divisor is exactly mathematical floor.
#[must_use]
pub const fn chunk_key_of(x: i32, y: i32) -> ChunkKey {
    ChunkKey {
        cx: x.div_euclid(CHUNK_SIZE),
        cy: y.div_euclid(CHUNK_SIZE),
    }
}

/// Returns the tile key for a coordinate pair.
#[must_use]
pub const fn tile_key_of(x: i32, y: i32) -> TileKey {
    TileKey { x, y }
}

/// Parses a `"cx,cy"` chunk key string.
pub fn parse_chunk_key(s: &str) -> Result<ChunkKey, GisaimaError> {
    s.parse()
}

/// Parses a `"x,y"` tile key string.
pub fn parse_tile_key(s: &str) -> Result<TileKey, GisaimaError> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values_match_spec() {
        assert_eq!(chunk_key_of(-1, -1).to_string(), "-1,-1");
        assert_eq!(chunk_key_of(0, 0).to_string(), "0,0");
        assert_eq!(chunk_key_of(20, 20).to_string(), "1,1");
        assert_eq!(chunk_key_of(-20, -20).to_string(), "-1,-1");
        assert_eq!(chunk_key_of(-21, -21).to_string(), "-2,-2");
    }

    #[test]
    fn chunk_key_roundtrips_through_tile_key() {
        for &(x, y) in &[(0, 0), (-1, -1), (19, 19), (20, 20), (-21, 7), (400, -401)] {
            let tile = tile_key_of(x, y);
            let parsed = parse_tile_key(&tile.to_string()).unwrap();
            assert_eq!(chunk_key_of(parsed.x, parsed.y), chunk_key_of(x, y));
        }
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(parse_tile_key("nope").is_err());
        assert!(parse_chunk_key("1,2,3").is_err());
    }

    #[test]
    fn path_len_cap_applies_to_max_path_len() {
        // sanity: CHUNK_SIZE is the only magic number allowed in this module.
        assert_eq!(CHUNK_SIZE, 20);
    }
}
