//! Data-driven game balance
//!
//! Physics tables per archetype plus the gameplay constants the interaction
//! layer uses. All values are subpixel units per frame (or frame counts).
//! Defaults are the shipped tuning; a JSON file may override any subset.

use std::path::Path;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::consts::TILE_SIZE_PX;
use crate::sim::MoveMode;

/// Which physics table an archetype uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysKind {
    Player,
    Creature,
    PlatformH,
    PlatformV,
}

/// Immutable per-archetype movement constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysParams {
    pub walk_accel: i32,
    pub run_accel: i32,
    pub air_accel: i32,

    pub walk_damp: i32,
    pub run_damp: i32,
    pub air_damp: i32,

    pub max_walk_speed: i32,
    pub max_run_speed: i32,

    pub gravity: i32,
    pub max_fall_speed: i32,

    /// Upward force per boost frame while jump is held
    pub jump_force: i32,
    pub max_jump_boost_frames: i32,

    /// Horizontal force per boost frame while dash is held
    pub dash_force: i32,
    pub max_dash_speed: i32,
    pub max_dash_frames: i32,
    /// Cooldown after a dash before another may start
    pub dash_delay_frames: i32,

    /// Downward velocity set on entering BUTTDASH
    pub buttdash_speed: i32,
    pub max_buttdash_fall_speed: i32,

    /// Frames KNOCKBACK and STUNNED last before reverting to FALL
    pub max_knockback_frames: i32,

    /// Platforms: speed applied directly from input flags
    pub patrol_speed: i32,
}

impl PhysParams {
    /// Horizontal acceleration for a move mode
    pub fn accel_x(&self, mode: MoveMode, running: bool) -> i32 {
        match mode {
            MoveMode::Walk if running => self.run_accel,
            MoveMode::Walk => self.walk_accel,
            MoveMode::Fall | MoveMode::Jump | MoveMode::ButtBounce => self.air_accel,
            // Dash force is applied by the dash boost itself
            MoveMode::Dash => 0,
            MoveMode::Knockback | MoveMode::Stunned | MoveMode::ButtDash => 0,
        }
    }

    /// Horizontal speed cap for a move mode
    pub fn max_x(&self, mode: MoveMode, was_running: bool) -> i32 {
        match mode {
            MoveMode::Walk if was_running => self.max_run_speed,
            MoveMode::Walk | MoveMode::Stunned | MoveMode::ButtDash => self.max_walk_speed,
            MoveMode::Dash => self.max_dash_speed,
            MoveMode::Fall | MoveMode::Jump | MoveMode::ButtBounce | MoveMode::Knockback => {
                if was_running {
                    self.max_run_speed
                } else {
                    self.max_walk_speed
                }
            }
        }
    }

    /// Horizontal damping for a move mode
    pub fn damp_x(&self, mode: MoveMode, was_running: bool) -> i32 {
        match mode {
            MoveMode::Walk | MoveMode::Stunned if was_running => self.run_damp,
            MoveMode::Walk | MoveMode::Stunned => self.walk_damp,
            MoveMode::Dash => 0,
            MoveMode::Fall
            | MoveMode::Jump
            | MoveMode::ButtBounce
            | MoveMode::ButtDash
            | MoveMode::Knockback => self.air_damp,
        }
    }

    /// Vertical speed cap for a move mode
    pub fn max_y(&self, mode: MoveMode) -> i32 {
        match mode {
            MoveMode::ButtDash => self.max_buttdash_fall_speed,
            _ => self.max_fall_speed,
        }
    }

    fn player() -> Self {
        Self {
            walk_accel: 8,
            run_accel: 9,
            air_accel: 6,
            walk_damp: 6,
            run_damp: 6,
            air_damp: 4,
            max_walk_speed: 100,
            max_run_speed: 160,
            gravity: 9,
            max_fall_speed: 120,
            jump_force: 14,
            max_jump_boost_frames: 16,
            dash_force: 24,
            max_dash_speed: 200,
            max_dash_frames: 12,
            dash_delay_frames: 20,
            buttdash_speed: 160,
            max_buttdash_fall_speed: 200,
            max_knockback_frames: 20,
            patrol_speed: 0,
        }
    }

    fn creature() -> Self {
        Self {
            walk_accel: 4,
            run_accel: 4,
            air_accel: 2,
            walk_damp: 4,
            run_damp: 4,
            air_damp: 2,
            max_walk_speed: 40,
            max_run_speed: 40,
            gravity: 9,
            max_fall_speed: 120,
            jump_force: 0,
            max_jump_boost_frames: 0,
            dash_force: 0,
            max_dash_speed: 0,
            max_dash_frames: 0,
            dash_delay_frames: 0,
            buttdash_speed: 0,
            max_buttdash_fall_speed: 120,
            max_knockback_frames: 20,
            patrol_speed: 0,
        }
    }

    /// Platforms are input-driven; everything but the patrol speed is zero
    fn platform(patrol_speed: i32) -> Self {
        Self {
            walk_accel: 0,
            run_accel: 0,
            air_accel: 0,
            walk_damp: 0,
            run_damp: 0,
            air_damp: 0,
            max_walk_speed: patrol_speed,
            max_run_speed: patrol_speed,
            gravity: 0,
            max_fall_speed: patrol_speed,
            jump_force: 0,
            max_jump_boost_frames: 0,
            dash_force: 0,
            max_dash_speed: 0,
            max_dash_frames: 0,
            dash_delay_frames: 0,
            buttdash_speed: 0,
            max_buttdash_fall_speed: patrol_speed,
            max_knockback_frames: 0,
            patrol_speed,
        }
    }
}

/// Knockback strength, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnockbackStrength {
    Nudge,
    Minimal,
    Soft,
    Hard,
}

/// X/Y impulse per knockback strength (x is away from the source)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockbackTable {
    pub nudge: IVec2,
    pub minimal: IVec2,
    pub soft: IVec2,
    pub hard: IVec2,
}

impl KnockbackTable {
    pub fn impulse(&self, strength: KnockbackStrength) -> IVec2 {
        match strength {
            KnockbackStrength::Nudge => self.nudge,
            KnockbackStrength::Minimal => self.minimal,
            KnockbackStrength::Soft => self.soft,
            KnockbackStrength::Hard => self.hard,
        }
    }
}

impl Default for KnockbackTable {
    fn default() -> Self {
        Self {
            nudge: IVec2::new(16, -16),
            minimal: IVec2::new(32, -32),
            soft: IVec2::new(48, -64),
            hard: IVec2::new(64, -96),
        }
    }
}

/// Complete tuning set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PhysParams,
    pub creature: PhysParams,
    pub platform_h: PhysParams,
    pub platform_v: PhysParams,

    /// Upper bound on the automatic bounce after a buttstomp landing
    pub buttbounce_max_vel: i32,
    /// Bounce velocity = fall distance * num / den
    pub buttbounce_num: i32,
    pub buttbounce_den: i32,

    /// Minimum dash speed that breaks tiles / hurts what it hits
    pub dashbonk_thresh_speed: i32,
    /// Minimum downward speed for a stomp
    pub stomp_thresh_speed: i32,
    /// Minimum upward speed for a head bonk to break a tile
    pub head_bonk_thresh_speed: i32,
    /// Upward velocity given to a successful stomper
    pub stomp_bounce_vel: i32,

    pub knockback: KnockbackTable,
    pub hard_invuln_frames: i32,

    /// Frames after leaving the ground during which jump still works
    pub coyote_frames: u32,
    /// Max gap between a rider's feet and the ridden actor's head
    pub ride_tolerance_sub: i32,

    pub door_hold_frames: u16,
    pub door_max_x_speed: i32,

    pub contact_damage: i32,
    pub lava_damage: i32,

    pub particle_count: usize,
    pub particle_lifetime_frames: i32,
    /// Random jitter (+/-) added to particle launch velocities
    pub particle_spread: i32,

    pub respawn_delay_frames: i32,
    /// Speed caps and gravity are divided by this while in liquid
    pub liquid_divisor: i32,
    /// How far below the map (pixels) an actor may fall before it is lost
    pub fall_off_margin_px: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player: PhysParams::player(),
            creature: PhysParams::creature(),
            platform_h: PhysParams::platform(32),
            platform_v: PhysParams::platform(24),
            buttbounce_max_vel: 160,
            buttbounce_num: 1,
            buttbounce_den: 6,
            dashbonk_thresh_speed: 120,
            stomp_thresh_speed: 40,
            head_bonk_thresh_speed: 60,
            stomp_bounce_vel: 120,
            knockback: KnockbackTable::default(),
            hard_invuln_frames: 60,
            coyote_frames: 5,
            ride_tolerance_sub: 32,
            door_hold_frames: 10,
            door_max_x_speed: 16,
            contact_damage: 1,
            lava_damage: 1,
            particle_count: 4,
            particle_lifetime_frames: 30,
            particle_spread: 8,
            respawn_delay_frames: 90,
            liquid_divisor: 2,
            fall_off_margin_px: TILE_SIZE_PX,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate();
        Ok(tuning)
    }

    /// Load tuning from disk, falling back to the shipped defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path)
            .map_err(SimError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => {
                log::warn!("Using default tuning ({})", e);
                Self::default()
            }
        }
    }

    /// Physics table for an archetype
    pub fn phys(&self, kind: PhysKind) -> &PhysParams {
        match kind {
            PhysKind::Player => &self.player,
            PhysKind::Creature => &self.creature,
            PhysKind::PlatformH => &self.platform_h,
            PhysKind::PlatformV => &self.platform_v,
        }
    }

    /// Bounce velocity (positive magnitude) for a buttstomp that fell `fall_sub`
    pub fn buttbounce_vel(&self, fall_sub: i32) -> i32 {
        let den = self.buttbounce_den.max(1);
        (fall_sub.max(0) * self.buttbounce_num / den).min(self.buttbounce_max_vel)
    }

    /// Warn about caps that would let an actor cross a whole tile in one frame.
    /// Not corrected: the integrator's own check will keep flagging it.
    pub fn validate(&self) {
        let tile = crate::consts::TILE_SIZE_SUB;
        for (name, p) in [
            ("player", &self.player),
            ("creature", &self.creature),
            ("platform_h", &self.platform_h),
            ("platform_v", &self.platform_v),
        ] {
            let caps = [
                p.max_walk_speed,
                p.max_run_speed,
                p.max_dash_speed,
                p.max_fall_speed,
                p.max_buttdash_fall_speed,
            ];
            if caps.iter().any(|&c| c > tile) {
                log::warn!("Tuning '{}' has a speed cap above one tile per frame", name);
            }
        }
        if self.buttbounce_max_vel > tile {
            log::warn!("buttbounce_max_vel {} exceeds a tile per frame", self.buttbounce_max_vel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TILE_SIZE_SUB;

    #[test]
    fn test_default_caps_below_tile() {
        let t = Tuning::default();
        for p in [&t.player, &t.creature, &t.platform_h, &t.platform_v] {
            assert!(p.max_run_speed <= TILE_SIZE_SUB);
            assert!(p.max_dash_speed <= TILE_SIZE_SUB);
            assert!(p.max_buttdash_fall_speed <= TILE_SIZE_SUB);
        }
    }

    #[test]
    fn test_buttbounce_clamps() {
        let t = Tuning::default();
        assert_eq!(t.buttbounce_vel(60), 10);
        assert_eq!(t.buttbounce_vel(100_000), t.buttbounce_max_vel);
        assert_eq!(t.buttbounce_vel(-50), 0);
    }

    #[test]
    fn test_mode_tables() {
        let p = Tuning::default().player;
        assert_eq!(p.accel_x(MoveMode::Walk, false), p.walk_accel);
        assert_eq!(p.accel_x(MoveMode::Walk, true), p.run_accel);
        assert_eq!(p.accel_x(MoveMode::Jump, true), p.air_accel);
        assert_eq!(p.accel_x(MoveMode::Knockback, false), 0);
        assert_eq!(p.max_x(MoveMode::Fall, true), p.max_run_speed);
        assert_eq!(p.max_x(MoveMode::Dash, false), p.max_dash_speed);
        assert_eq!(p.damp_x(MoveMode::Dash, false), 0);
        assert_eq!(p.max_y(MoveMode::ButtDash), p.max_buttdash_fall_speed);
        assert_eq!(p.max_y(MoveMode::Jump), p.max_fall_speed);
    }

    #[test]
    fn test_partial_json_override() {
        let t = Tuning::from_json(r#"{ "coyote_frames": 9 }"#).unwrap();
        assert_eq!(t.coyote_frames, 9);
        assert_eq!(t.player, Tuning::default().player);
    }

    #[test]
    fn test_knockback_table_ordering() {
        let k = KnockbackTable::default();
        let strengths = [
            KnockbackStrength::Nudge,
            KnockbackStrength::Minimal,
            KnockbackStrength::Soft,
            KnockbackStrength::Hard,
        ];
        for pair in strengths.windows(2) {
            assert!(k.impulse(pair[0]).x < k.impulse(pair[1]).x);
        }
    }
}
