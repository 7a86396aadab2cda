//! Recoverable simulation errors
//!
//! Nothing here is fatal. Callers inside the tick log these and keep simulating.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("out of sprite slots (capacity {capacity})")]
    SpriteCapacity { capacity: usize },

    #[error("a player sprite already exists")]
    DuplicatePlayer,

    #[error("level layer is {got} bytes, expected {expected} ({width}x{height})")]
    LayerSize {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },

    #[error("invalid tileset layout: {reason}")]
    InvalidLayout { reason: &'static str },

    #[error("spawn marker block {block} at ({col}, {row}) is out of range")]
    InvalidSpawnMarker { block: u32, col: i32, row: i32 },

    #[error("stale sprite handle (slot {slot}, generation {generation})")]
    StaleHandle { slot: u16, generation: u32 },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
