//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Integer subpixel math only
//! - Seeded RNG only
//! - Stable iteration order (by `World` order)
//! - No rendering or platform dependencies

pub mod anim;
pub mod collision;
pub mod input;
pub mod interact;
pub mod modes;
pub mod movement;
pub mod profile;
pub mod sprite;
pub mod state;
pub mod tick;

pub use anim::{AnimGroupId, AnimMode, AnimState, AnimType, ImageRef};
pub use collision::{Axis, Direction, HitInfo, QueryOptions, SpriteHit, check_grounded, query};
pub use input::{Buttons, Inputs};
pub use interact::{Touch, can_ride, take_damage, try_knockback};
pub use movement::solve_movement;
pub use profile::{
    Capability, InteractionMask, Solidity, SolidityMask, SpriteProfile, SpriteType,
};
pub use sprite::{AnchorH, AnchorV, BBox, MoveMode, Sprite};
pub use state::{GamePhase, PendingSpawn, SpriteHandle, World, spawn_pos};
pub use tick::{TickInput, tick};
