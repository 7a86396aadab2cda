//! Per-actor movement: velocity pipeline, axis-split integration and
//! collision resolution
//!
//! X is integrated and queried before Y. When both axes report a blocking
//! hit, the smaller penetration is corrected first and the other axis is
//! queried again, so grazing a corner does not eject the actor along both
//! axes at once.

use std::rc::Rc;

use glam::IVec2;

use super::collision::{Axis, Direction, HitInfo, QueryOptions, check_grounded, query};
use super::interact::{Touch, can_ride};
use super::profile::Capability;
use super::sprite::{MoveMode, Sprite};
use super::state::{SpriteHandle, World};
use crate::consts::TILE_SIZE_SUB;
use crate::settings::SimSettings;
use crate::tuning::{KnockbackStrength, Tuning};

/// Integrate one actor for this tick. The actor is checked out of the world,
/// so queries see every other actor but not this one. Sprite contacts are
/// appended to `touches` for the interaction pass.
pub fn solve_movement(world: &mut World, spr: &mut Sprite, touches: &mut Vec<Touch>) {
    let tuning = Rc::clone(&world.tuning);
    let settings = world.settings.clone();
    let frame = world.frame;

    // Re-validate last tick's ride before dropping it
    let carried = carried_by(world, spr, &tuning);
    spr.thing_im_riding = None;

    if spr.has(Capability::SkipMovement) {
        return;
    }
    if spr.has(Capability::PlatformMovement) {
        move_platform(spr, &tuning);
        return;
    }
    if spr.has(Capability::IgnoreCollisions) {
        move_free(spr, &tuning, &settings);
        return;
    }

    let params = *spr.params(&tuning);
    spr.tick_mode_timers(&tuning, frame);

    let feet = spr.feet_y();
    if spr.is_grounded {
        spr.last_grounded_frame = Some(frame);
        spr.highest_y_sub_pos_in_jump = feet;
        spr.was_running_when_grounded = spr.input.run > 0;
    } else {
        spr.highest_y_sub_pos_in_jump = spr.highest_y_sub_pos_in_jump.min(feet);
    }

    if spr.accepts_input() {
        if spr.move_mode().allows_steering() {
            match spr.input.x_axis() {
                1 => spr.facing_right = true,
                -1 => spr.facing_right = false,
                _ => {}
            }
        }
        spr.try_jump(&tuning, frame);
        spr.try_dash(&tuning, frame);
        spr.try_buttdash(&tuning, frame);
    }
    spr.try_continue_jump(&params);
    spr.try_continue_dash(&tuning, frame);
    spr.check_buttbounce_apex(&tuning, frame);

    // Velocity pipeline
    let mode = spr.move_mode();
    let liquid = if spr.in_liquid {
        tuning.liquid_divisor.max(1)
    } else {
        1
    };
    let steering = spr.accepts_input() && mode.allows_steering();
    let input_x = if steering { spr.input.x_axis() } else { 0 };
    let was_running = spr.was_running_when_grounded;

    let vx = spr.sub_vel.x;
    let mut new_vx = apply_damping(vx, params.damp_x(mode, was_running), input_x);
    new_vx += steer_accel(params.accel_x(mode, spr.input.run > 0), input_x, vx);
    let max_x = params.max_x(mode, was_running) / liquid;
    spr.sub_vel.x = new_vx.clamp(-max_x, max_x);

    if settings.no_gravity {
        let input_y = if spr.accepts_input() { spr.input.y_axis() } else { 0 };
        let vy = apply_damping(spr.sub_vel.y, params.air_damp, input_y)
            + input_y * params.air_accel;
        let cap = params.max_fall_speed / liquid;
        spr.sub_vel.y = vy.clamp(-cap, cap);
    } else {
        if !spr.is_grounded {
            spr.sub_vel.y += params.gravity / liquid;
        }
        spr.sub_vel.y = spr.sub_vel.y.min(params.max_y(mode) / liquid);
    }
    check_velocity(spr, frame);

    let ride_delta = carried.map_or(IVec2::ZERO, |(_, d)| d);
    spr.sub_vel += ride_delta;
    let own_vel = spr.sub_vel - ride_delta;

    // X then Y
    let mut x_hit = None;
    if settings.integrate_x() && spr.sub_vel.x != 0 {
        spr.add_sub_pos(IVec2::new(spr.sub_vel.x, 0));
        x_hit = probe(world, spr, Axis::X);
        x_hit = break_through(world, spr, x_hit, &tuning);
    }
    let mut y_hit = None;
    if settings.integrate_y() && spr.sub_vel.y != 0 {
        spr.add_sub_pos(IVec2::new(0, spr.sub_vel.y));
        y_hit = probe(world, spr, Axis::Y);
        y_hit = break_through(world, spr, y_hit, &tuning);
    }

    let mut x_snapped = false;
    let mut y_snapped = false;
    match (solid(&x_hit), solid(&y_hit)) {
        (false, false) => {}
        (true, false) => x_snapped = snap(spr, x_hit.as_ref(), &settings, frame),
        (false, true) => y_snapped = snap(spr, y_hit.as_ref(), &settings, frame),
        (true, true) => {
            let pos = spr.sub_pos();
            let xd = x_hit.as_ref().map_or(0, |h| h.penetration(pos));
            let yd = y_hit.as_ref().map_or(0, |h| h.penetration(pos));
            if xd < yd {
                x_snapped = snap(spr, x_hit.as_ref(), &settings, frame);
                y_hit = probe(world, spr, Axis::Y);
                if solid(&y_hit) {
                    y_snapped = snap(spr, y_hit.as_ref(), &settings, frame);
                }
            } else {
                y_snapped = snap(spr, y_hit.as_ref(), &settings, frame);
                x_hit = probe(world, spr, Axis::X);
                if solid(&x_hit) {
                    x_snapped = snap(spr, x_hit.as_ref(), &settings, frame);
                }
            }
        }
    }

    // Hand the carried displacement back
    if !x_snapped {
        spr.sub_vel.x -= ride_delta.x;
    }
    if !y_snapped {
        spr.sub_vel.y -= ride_delta.y;
    }

    if x_snapped
        && spr.move_mode() == MoveMode::Dash
        && own_vel.x.abs() >= tuning.dashbonk_thresh_speed
        && x_hit.as_ref().is_some_and(HitInfo::hit_any_tile)
    {
        spr.apply_knockback(
            KnockbackStrength::Soft,
            -own_vel.x.signum(),
            &tuning,
            frame,
            "dashed into a wall",
        );
    }
    if y_snapped && own_vel.y < 0 {
        spr.stop_jump_boost(&params, "head bonk");
    }

    let ground = check_grounded(world, spr);
    spr.is_grounded = ground.hit_something() && spr.sub_vel.y >= 0;
    spr.thing_im_riding = ground
        .hit_sprites()
        .into_iter()
        .find(|hit| {
            world
                .get(hit.handle)
                .is_some_and(|other| can_ride(spr, other, &other.sub_hit_box(), &tuning))
        })
        .map(|hit| hit.handle);
    if spr.is_grounded {
        spr.last_grounded_frame = Some(frame);
    }
    spr.update_ground_mode(&tuning, frame);

    for (hit, axis) in [(&x_hit, Axis::X), (&y_hit, Axis::Y)] {
        let Some(hit) = hit else {
            continue;
        };
        for s in hit.hit_sprites() {
            touches.push(Touch {
                target: s.handle,
                axis,
                toucher_vel: own_vel,
            });
        }
    }
}

/// Query the direction of travel on one axis; None when not moving on it
fn probe(world: &World, spr: &Sprite, axis: Axis) -> Option<HitInfo> {
    let vel = match axis {
        Axis::X => spr.sub_vel.x,
        Axis::Y => spr.sub_vel.y,
    };
    let dir = Direction::of(axis, vel)?;
    Some(query(world, spr, dir, QueryOptions::default()))
}

fn solid(hit: &Option<HitInfo>) -> bool {
    hit.as_ref().is_some_and(HitInfo::hit_something)
}

/// Eject to the hit's snap point and zero velocity on its axis
fn snap(spr: &mut Sprite, hit: Option<&HitInfo>, settings: &SimSettings, frame: u32) -> bool {
    let Some(hit) = hit else {
        return false;
    };
    let Some(point) = hit.snap_point else {
        return false;
    };
    if settings.trace_hits {
        log::debug!(
            "Frame {} {:?} ejected {:?} from {} to {} (mask {:?})",
            frame,
            spr.stype,
            hit.dir,
            spr.sub_pos(),
            point,
            hit.hit_mask
        );
    }
    match hit.dir.axis() {
        Axis::X => {
            spr.set_sub_pos_x(point.x);
            spr.sub_vel.x = 0;
        }
        Axis::Y => {
            spr.set_sub_pos_y(point.y);
            spr.sub_vel.y = 0;
        }
    }
    true
}

/// Dashes, buttstomps and fast head bonks smash breakable tiles in the way.
/// Returns the re-queried hit once the tiles are gone.
fn break_through(
    world: &mut World,
    spr: &Sprite,
    hit: Option<HitInfo>,
    tuning: &Tuning,
) -> Option<HitInfo> {
    let info = hit.as_ref()?;
    let (qualifies, cause) = match info.dir {
        Direction::Left | Direction::Right => (
            spr.move_mode() == MoveMode::Dash
                && spr.sub_vel.x.abs() >= tuning.dashbonk_thresh_speed,
            "dash",
        ),
        Direction::Down => (
            spr.move_mode() == MoveMode::ButtDash
                && spr.sub_vel.y >= tuning.stomp_thresh_speed,
            "buttstomp",
        ),
        Direction::Up => (
            spr.sub_vel.y <= -tuning.head_bonk_thresh_speed,
            "head bonk",
        ),
    };
    if !qualifies {
        return hit;
    }
    let mut broke = false;
    for tile in info.hit_tiles() {
        broke |= world.destroy_block(tile, cause);
    }
    if !broke {
        return hit;
    }
    probe(world, spr, info.dir.axis())
}

/// Directional damping toward zero. Skipped while input pushes along the
/// current motion.
fn apply_damping(vel: i32, damp: i32, input: i32) -> i32 {
    if vel > 0 && input <= 0 {
        (vel - damp).max(0)
    } else if vel < 0 && input >= 0 {
        (vel + damp).min(0)
    } else {
        vel
    }
}

/// Input acceleration; doubled when turning against current motion
fn steer_accel(accel: i32, input: i32, vel: i32) -> i32 {
    if input == 0 {
        return 0;
    }
    let turning = input * vel.signum() < 0;
    let accel = if turning { accel * 2 } else { accel };
    accel * input
}

fn check_velocity(spr: &Sprite, frame: u32) {
    if spr.sub_vel.x.abs() > TILE_SIZE_SUB || spr.sub_vel.y.abs() > TILE_SIZE_SUB {
        log::warn!(
            "Frame {} {:?} velocity {} exceeds a tile per frame",
            frame,
            spr.stype,
            spr.sub_vel
        );
    }
}

/// The actor carrying `spr` this tick and how far it moved, if last tick's
/// ride still holds
fn carried_by(world: &World, spr: &Sprite, tuning: &Tuning) -> Option<(SpriteHandle, IVec2)> {
    let handle = spr.thing_im_riding?;
    let other = world.get(handle)?;
    let delta = other.sub_pos() - other.last_sub_pos;
    let before = other.sub_hit_box().translated(-delta);
    can_ride(spr, other, &before, tuning).then_some((handle, delta))
}

/// Platforms move straight from their input flags, ignoring collisions
fn move_platform(spr: &mut Sprite, tuning: &Tuning) {
    let speed = spr.params(tuning).patrol_speed;
    spr.sub_vel = IVec2::new(spr.input.x_axis(), spr.input.y_axis()) * speed;
    spr.add_sub_pos(spr.sub_vel);
}

/// Particles and the dead: gravity and nothing else
fn move_free(spr: &mut Sprite, tuning: &Tuning, settings: &SimSettings) {
    let params = spr.params(tuning);
    if !settings.no_gravity {
        spr.sub_vel.y = (spr.sub_vel.y + params.gravity).min(params.max_fall_speed);
    }
    spr.add_sub_pos(spr.sub_vel);
}
