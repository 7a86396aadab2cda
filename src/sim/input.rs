//! Per-actor input snapshots and the patrol AI that drives non-player actors
//!
//! Inputs are held-frame counters: 0 = not held, 1 = pressed this frame,
//! N = held for N frames. Counters saturate instead of wrapping.

use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::collision::{Direction, QueryOptions, query};
use super::profile::{Capability, SpriteType};
use super::sprite::{MoveMode, Sprite};
use super::state::{SpriteHandle, World};

bitflags! {
    /// Buttons held this frame
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Buttons: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const RUN = 1 << 4;
        const JUMP = 1 << 5;
    }
}

/// Held-frame counters for one actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inputs {
    pub up: u16,
    pub down: u16,
    pub left: u16,
    pub right: u16,
    pub run: u16,
    pub jump: u16,
}

#[inline]
fn bump(counter: u16, held: bool) -> u16 {
    if held { counter.saturating_add(1) } else { 0 }
}

impl Inputs {
    /// Advance every counter from this frame's held buttons
    pub fn refresh(&mut self, held: Buttons) {
        self.up = bump(self.up, held.contains(Buttons::UP));
        self.down = bump(self.down, held.contains(Buttons::DOWN));
        self.left = bump(self.left, held.contains(Buttons::LEFT));
        self.right = bump(self.right, held.contains(Buttons::RIGHT));
        self.run = bump(self.run, held.contains(Buttons::RUN));
        self.jump = bump(self.jump, held.contains(Buttons::JUMP));
    }

    /// -1, 0 or 1; opposing directions cancel
    pub fn x_axis(&self) -> i32 {
        (self.right > 0) as i32 - (self.left > 0) as i32
    }

    /// -1 (up), 0 or 1 (down)
    pub fn y_axis(&self) -> i32 {
        (self.down > 0) as i32 - (self.up > 0) as i32
    }

    pub fn run_pressed(&self) -> bool {
        self.run == 1
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump == 1
    }
}

/// Buttons the patrol AI holds for a non-player actor this frame.
/// May flip the actor's patrol direction.
pub fn ai_buttons(world: &mut World, handle: SpriteHandle) -> Buttons {
    let Some(spr) = world.get(handle) else {
        return Buttons::empty();
    };
    if spr.has(Capability::SkipInput) {
        return Buttons::empty();
    }

    let turn = match spr.stype {
        SpriteType::Creature | SpriteType::Spiker => walker_should_turn(world, spr),
        SpriteType::PlatformH | SpriteType::PlatformV => platform_should_turn(world, spr),
        SpriteType::Player | SpriteType::Particle | SpriteType::Door => false,
    };

    let frame = world.frame;
    let Some(spr) = world.get_mut(handle) else {
        return Buttons::empty();
    };
    if turn {
        spr.patrol_dir = -spr.patrol_dir;
        log::trace!("Frame {} {:?} turns around", frame, spr.stype);
    }

    let forward = spr.patrol_dir > 0;
    match spr.stype {
        SpriteType::Creature | SpriteType::Spiker | SpriteType::PlatformH => {
            if forward { Buttons::RIGHT } else { Buttons::LEFT }
        }
        SpriteType::PlatformV => {
            if forward { Buttons::DOWN } else { Buttons::UP }
        }
        SpriteType::Player | SpriteType::Particle | SpriteType::Door => Buttons::empty(),
    }
}

/// Ground mobs turn at walls, other actors and ledges
fn walker_should_turn(world: &World, spr: &Sprite) -> bool {
    if !spr.is_grounded || spr.move_mode() != MoveMode::Walk {
        return false;
    }
    let dir = if spr.patrol_dir > 0 { Direction::Right } else { Direction::Left };
    let lookahead = world.tuning.phys(spr.profile().phys).max_walk_speed.max(1);

    let wall = query(
        world,
        spr,
        dir,
        QueryOptions {
            offset: IVec2::new(spr.patrol_dir * lookahead, 0),
            ignore_player: true,
            tiles_only: false,
        },
    );
    if wall.hit_something() {
        return true;
    }

    // Probe the floor one body width ahead
    let ledge = query(
        world,
        spr,
        Direction::Down,
        QueryOptions {
            offset: IVec2::new(spr.patrol_dir * spr.sub_hit_box().width, 1),
            ignore_player: true,
            tiles_only: false,
        },
    );
    !ledge.hit_something()
}

/// Platforms reverse when the next step would enter a tile
fn platform_should_turn(world: &World, spr: &Sprite) -> bool {
    let speed = world.tuning.phys(spr.profile().phys).patrol_speed;
    let (dir, offset) = match (spr.stype, spr.patrol_dir > 0) {
        (SpriteType::PlatformV, true) => (Direction::Down, IVec2::new(0, speed)),
        (SpriteType::PlatformV, false) => (Direction::Up, IVec2::new(0, -speed)),
        (_, true) => (Direction::Right, IVec2::new(speed, 0)),
        (_, false) => (Direction::Left, IVec2::new(-speed, 0)),
    };
    query(
        world,
        spr,
        dir,
        QueryOptions {
            offset,
            ignore_player: true,
            tiles_only: true,
        },
    )
    .hit_something()
}
