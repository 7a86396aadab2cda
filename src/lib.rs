//! Platformer Core - movement, collision and interaction engine for a
//! fixed-point tile platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (actors, collision queries, move modes, interactions)
//! - `level`: Two-layer tile grid and tileset classification
//! - `tuning`: Data-driven physics tables and gameplay constants
//! - `settings`: Debug/simulation toggles
//!
//! All physics state is integer subpixel space. There is no floating point in
//! the simulation path.

pub mod error;
pub mod level;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use level::{Level, TilesetLayout};
pub use settings::SimSettings;
pub use tuning::{PhysParams, Tuning};

use glam::IVec2;

/// Engine configuration constants
pub mod consts {
    /// Fixed-point shift: 1 world pixel = 2^SHIFT subpixel units
    pub const SHIFT: i32 = 4;

    /// Screen dimensions (pixels)
    pub const SCREEN_WIDTH: i32 = 240;
    pub const SCREEN_HEIGHT: i32 = 240;

    /// Tile edge in world pixels
    pub const TILE_SIZE_PX: i32 = 16;
    /// Tile edge in subpixels (256)
    pub const TILE_SIZE_SUB: i32 = TILE_SIZE_PX << SHIFT;

    /// Fixed actor slot capacity
    pub const MAX_SPRITES: usize = 20;

    /// Damage amount that bypasses every immunity
    pub const INSTAKILL: i32 = i32::MAX;

    /// Horizontal sample points are pulled in by this much (4px) so actors
    /// can clip over small ledges and run over small gaps
    pub const SIDE_PROBE_INSET_SUB: i32 = 4 << SHIFT;
}

use consts::*;

/// Subpixel -> world pixel (arithmetic shift, floors negatives)
#[inline]
pub fn sub_to_world(sub: IVec2) -> IVec2 {
    IVec2::new(sub.x >> SHIFT, sub.y >> SHIFT)
}

/// World pixel -> subpixel
#[inline]
pub fn world_to_sub(world: IVec2) -> IVec2 {
    IVec2::new(world.x << SHIFT, world.y << SHIFT)
}

/// World pixel -> screen pixel for a given camera offset
#[inline]
pub fn world_to_screen(world: IVec2, cam: IVec2) -> IVec2 {
    world - cam
}

/// Subpixel -> screen pixel for a given camera offset
#[inline]
pub fn sub_to_screen(sub: IVec2, cam: IVec2) -> IVec2 {
    world_to_screen(sub_to_world(sub), cam)
}

/// Tile (col, row) containing a subpixel point
#[inline]
pub fn sub_to_tile(sub: IVec2) -> IVec2 {
    IVec2::new(sub.x.div_euclid(TILE_SIZE_SUB), sub.y.div_euclid(TILE_SIZE_SUB))
}

/// Subpixel position of a tile's top-left corner
#[inline]
pub fn tile_to_sub(tile: IVec2) -> IVec2 {
    tile * TILE_SIZE_SUB
}
