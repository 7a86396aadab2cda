//! Fixed timestep simulation tick
//!
//! One call advances the world by exactly one frame. Actors are updated one
//! at a time in `World` order; each is checked out, moved, put back and only
//! then allowed to interact, so interaction code always sees a whole world.

use super::input::{Buttons, ai_buttons};
use super::interact::{apply_tile_triggers, check_fell_off_map, resolve_touches, use_doors};
use super::movement::solve_movement;
use super::profile::Capability;
use super::state::{GamePhase, World};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Buttons the player holds this frame
    pub player: Buttons,
}

/// Advance the world by one frame
pub fn tick(world: &mut World, input: &TickInput) {
    match world.phase {
        GamePhase::GameOver | GamePhase::ReloadRequested { .. } => return,
        GamePhase::Respawning { ticks_left } if ticks_left <= 1 => {
            world.phase = GamePhase::ReloadRequested {
                level_index: world.level_index,
            };
            log::info!("Frame {} requesting reload of level {}", world.frame, world.level_index);
            return;
        }
        GamePhase::Respawning { ticks_left } => {
            world.phase = GamePhase::Respawning {
                ticks_left: ticks_left - 1,
            };
        }
        GamePhase::Playing => {}
    }

    world.frame = world.frame.wrapping_add(1);

    refresh_inputs(world, input.player);
    order_riders(world);

    let mut touches = Vec::new();
    for handle in world.handles() {
        // Destroyed earlier this frame
        let Some(mut spr) = world.take(handle) else {
            continue;
        };
        solve_movement(world, &mut spr, &mut touches);
        spr.update_animation(world.frame);
        world.put_back(handle, spr);

        resolve_touches(world, handle, &touches);
        touches.clear();
        apply_tile_triggers(world, handle);
        use_doors(world, handle);
        check_fell_off_map(world, handle);
        world.flush_spawns();
    }

    end_of_frame(world);
}

/// Player buttons for the player, patrol AI for everyone else
fn refresh_inputs(world: &mut World, player: Buttons) {
    for handle in world.handles() {
        let held = if world.player == Some(handle) {
            player
        } else {
            ai_buttons(world, handle)
        };
        if let Some(spr) = world.get_mut(handle) {
            let held = if spr.has(Capability::SkipInput) {
                Buttons::empty()
            } else {
                held
            };
            spr.input.refresh(held);
        }
    }
}

/// A ridden actor must move before its rider
fn order_riders(world: &mut World) {
    for handle in world.handles() {
        let Some(ridden) = world.get(handle).and_then(|s| s.thing_im_riding) else {
            continue;
        };
        let (Some(rider_at), Some(ridden_at)) = (world.order_index(handle), world.order_index(ridden))
        else {
            continue;
        };
        if ridden_at > rider_at {
            log::debug!("Frame {} moving ridden slot {} ahead of its rider", world.frame, ridden.slot());
            world.swap_order(rider_at, ridden_at);
        }
    }
}

/// Frame bookkeeping and despawns
fn end_of_frame(world: &mut World) {
    let mut expired = Vec::new();
    for handle in world.handles() {
        let Some(spr) = world.get_mut(handle) else {
            continue;
        };
        spr.on_ground_last_frame = spr.is_grounded;
        spr.last_sub_pos = spr.sub_pos();
        spr.last_sub_vel = spr.sub_vel;
        if spr.invuln_frames > 0 {
            spr.invuln_frames -= 1;
        }
        match spr.despawn_timer {
            Some(t) if t <= 0 => expired.push(handle),
            Some(t) => spr.despawn_timer = Some(t - 1),
            None => {}
        }
    }
    for handle in expired {
        log::trace!("Frame {} despawning slot {}", world.frame, handle.slot());
        world.destroy(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use crate::consts::{INSTAKILL, TILE_SIZE_SUB};
    use crate::level::Layer;
    use crate::settings::SimSettings;
    use crate::sim::collision::check_grounded;
    use crate::sim::interact::take_damage;
    use crate::sim::profile::SpriteType;
    use crate::sim::sprite::MoveMode;
    use crate::sim::state::SpriteHandle;
    use crate::tuning::Tuning;
    use glam::IVec2;
    use proptest::prelude::*;

    fn world(rows: &[&str]) -> World {
        World::new(Level::from_ascii(rows), Tuning::default(), SimSettings::default(), 7)
    }

    fn run(world: &mut World, buttons: Buttons, ticks: usize) {
        let input = TickInput { player: buttons };
        for _ in 0..ticks {
            tick(world, &input);
        }
    }

    fn place(world: &mut World, h: SpriteHandle, pos: IVec2, vel: IVec2) {
        let spr = world.get_mut(h).unwrap();
        spr.set_sub_pos(pos);
        spr.sub_vel = vel;
    }

    #[test]
    fn test_landing_on_floor() {
        let mut w = world(&["....", "....", "####"]);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 0)).unwrap();
        // Feet three subpixels above the floor top at 512
        place(&mut w, p, IVec2::new(384, 509), IVec2::new(0, 40));
        assert_eq!(w.get(p).unwrap().feet_y(), 508);

        run(&mut w, Buttons::empty(), 1);
        let spr = w.get(p).unwrap();
        assert!(spr.is_grounded);
        assert_eq!(spr.sub_vel.y, 0);
        assert_eq!(spr.move_mode(), MoveMode::Walk);
        assert_eq!(spr.feet_y(), 511);
    }

    #[test]
    fn test_corner_snaps_only_smaller_axis() {
        // Wall column at x 512..767, open below row 3
        let rows = [
            "..#...", "..#...", "..#...", "..#...", "......", "......",
        ];
        let mut w = world(&rows);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 32)).unwrap();
        place(&mut w, p, IVec2::new(374, 512), IVec2::new(24, 71));

        run(&mut w, Buttons::empty(), 1);
        let spr = w.get(p).unwrap();
        // X is pushed back flush with the wall; Y keeps falling
        assert_eq!(spr.sub_pos(), IVec2::new(384, 592));
        assert_eq!(spr.sub_vel, IVec2::new(0, 80));
        assert_eq!(spr.sub_hit_box().right(), 511);
        assert!(!spr.is_grounded);
    }

    #[test]
    fn test_corner_snaps_both_axes_when_needed() {
        let rows = [
            "..#...", "..#...", "..#...", "..#...", "######", "......",
        ];
        let mut w = world(&rows);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 32)).unwrap();
        place(&mut w, p, IVec2::new(374, 974), IVec2::new(24, 71));

        run(&mut w, Buttons::empty(), 1);
        let spr = w.get(p).unwrap();
        assert_eq!(spr.sub_pos(), IVec2::new(384, 1024));
        assert_eq!(spr.sub_vel, IVec2::ZERO);
        assert!(spr.is_grounded);
        assert_eq!(spr.move_mode(), MoveMode::Walk);
    }

    #[test]
    fn test_walking_across_one_way() {
        let mut w = world(&["........", "........", "========", "........"]);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 32)).unwrap();
        run(&mut w, Buttons::empty(), 1);
        assert!(w.get(p).unwrap().is_grounded);

        let first = check_grounded(&w, w.get(p).unwrap()).hit_mask;
        for _ in 0..5 {
            run(&mut w, Buttons::RIGHT, 1);
            let spr = w.get(p).unwrap();
            assert_eq!(check_grounded(&w, spr).hit_mask, first);
            assert_eq!(spr.feet_y(), 511);
        }
        assert!(w.get(p).unwrap().sub_pos().x > 384);
    }

    #[test]
    fn test_one_way_side_does_not_block_walkers() {
        let rows = ["#........#", "#...=....#", "##########"];
        let mut w = world(&rows);
        let p = w.spawn(SpriteType::Player, IVec2::new(40, 32)).unwrap();
        let one_way_left = 4 * TILE_SIZE_SUB;
        let one_way_right = 5 * TILE_SIZE_SUB;

        // Rightward through the one-way tile at body height
        let mut crossed = false;
        for _ in 0..120 {
            run(&mut w, Buttons::RIGHT, 1);
            let spr = w.get(p).unwrap();
            assert_eq!(spr.feet_y(), 511);
            assert!(spr.sub_vel.x >= 0);
            if spr.sub_hit_box().x > one_way_right {
                crossed = true;
                break;
            }
        }
        assert!(crossed);

        // And back to the left
        let mut crossed = false;
        for _ in 0..120 {
            run(&mut w, Buttons::LEFT, 1);
            let spr = w.get(p).unwrap();
            assert_eq!(spr.feet_y(), 511);
            if spr.sub_hit_box().right() < one_way_left {
                crossed = true;
                break;
            }
        }
        assert!(crossed);
    }

    #[test]
    fn test_jump_up_through_one_way_and_land_on_it() {
        let rows = ["......", "======", "......", "......", "######"];
        let mut w = world(&rows);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 64)).unwrap();
        run(&mut w, Buttons::empty(), 2);
        assert_eq!(w.get(p).unwrap().feet_y(), 1023);

        let mut highest = i32::MAX;
        for _ in 0..120 {
            run(&mut w, Buttons::JUMP, 1);
            highest = highest.min(w.get(p).unwrap().feet_y());
        }
        // Cleared the one-way top at 256 on the way up, then landed on it
        assert!(highest < 256);
        let spr = w.get(p).unwrap();
        assert!(spr.is_grounded);
        assert_eq!(spr.feet_y(), 255);
    }

    #[test]
    fn test_rider_moves_with_platform() {
        let mut w = world(&["..........", "..........", "..........", ".........."]);
        let plat = w.spawn(SpriteType::PlatformH, IVec2::new(16, 32)).unwrap();
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 32)).unwrap();

        run(&mut w, Buttons::empty(), 1);
        assert_eq!(w.get(p).unwrap().thing_im_riding, Some(plat));
        let before = w.get(p).unwrap().sub_pos();

        run(&mut w, Buttons::empty(), 1);
        let spr = w.get(p).unwrap();
        assert_eq!(spr.sub_pos() - before, IVec2::new(w.tuning.platform_h.patrol_speed, 0));
        assert_eq!(spr.sub_vel.x, 0);
        assert_eq!(spr.thing_im_riding, Some(plat));
    }

    #[test]
    fn test_ridden_platform_moves_first() {
        let mut w = world(&["..........", "..........", "..........", ".........."]);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 32)).unwrap();
        let plat = w.spawn(SpriteType::PlatformH, IVec2::new(16, 32)).unwrap();

        run(&mut w, Buttons::empty(), 1);
        assert_eq!(w.get(p).unwrap().thing_im_riding, Some(plat));
        let before = w.get(p).unwrap().sub_pos();

        run(&mut w, Buttons::empty(), 1);
        assert!(w.order_index(plat) < w.order_index(p));
        assert_eq!(w.get(p).unwrap().sub_pos().x - before.x, 32);
    }

    #[test]
    fn test_dash_breaks_tile_and_keeps_speed() {
        let rows = [
            "................",
            "................",
            "....B...........",
            "################",
        ];
        let mut w = world(&rows);
        let p = w.spawn(SpriteType::Player, IVec2::new(56, 48)).unwrap();
        let tuning = w.tuning.clone();
        {
            let spr = w.get_mut(p).unwrap();
            // Right edge flush with the breakable tile
            spr.set_sub_pos(IVec2::new(896, 768));
            spr.is_grounded = true;
            spr.set_move_mode(MoveMode::Dash, &tuning, 0, "test");
            spr.dash_frame_num = 1;
            spr.sub_vel.x = 150;
        }

        run(&mut w, Buttons::RUN | Buttons::RIGHT, 1);
        assert_eq!(w.level.block_at(4, 2, Layer::Collision), None);
        assert_eq!(w.count_of(SpriteType::Particle), tuning.particle_count);
        let spr = w.get(p).unwrap();
        assert_eq!(spr.sub_vel.x, 150 + tuning.player.dash_force);
        assert_eq!(spr.move_mode(), MoveMode::Dash);
    }

    #[test]
    fn test_buttbounce_is_clamped() {
        let mut rows = vec!["...."; 10];
        rows.push("####");
        let mut w = world(&rows);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 16)).unwrap();

        run(&mut w, Buttons::RUN, 1);
        assert_eq!(w.get(p).unwrap().move_mode(), MoveMode::ButtDash);
        for _ in 0..60 {
            run(&mut w, Buttons::empty(), 1);
            if w.get(p).unwrap().move_mode() == MoveMode::ButtBounce {
                break;
            }
        }
        let spr = w.get(p).unwrap();
        assert_eq!(spr.move_mode(), MoveMode::ButtBounce);
        assert_eq!(spr.sub_vel.y, -w.tuning.buttbounce_max_vel);
    }

    #[test]
    fn test_stomp_stuns_creature() {
        let rows = ["#.#", "#.#", "#.#", "#.#", "###"];
        let mut w = world(&rows);
        let m = w.spawn(SpriteType::Creature, IVec2::new(24, 64)).unwrap();
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 16)).unwrap();

        for _ in 0..30 {
            run(&mut w, Buttons::empty(), 1);
            if w.get(m).unwrap().move_mode() == MoveMode::Stunned {
                break;
            }
        }
        assert_eq!(w.get(m).unwrap().move_mode(), MoveMode::Stunned);
        let spr = w.get(p).unwrap();
        assert_eq!(spr.health, 3);
        assert_eq!(spr.move_mode(), MoveMode::Jump);
        assert_eq!(spr.sub_vel.y, -w.tuning.stomp_bounce_vel);
    }

    #[test]
    fn test_hard_knockback_blocks_damage_until_it_ends() {
        let rows = ["#....#", "#....#", "#....#", "#....#", "######"];
        let mut w = world(&rows);
        let p = w.spawn(SpriteType::Player, IVec2::new(40, 64)).unwrap();
        assert!(take_damage(&mut w, p, 1, None, "test"));
        run(&mut w, Buttons::empty(), 1);
        assert!(!take_damage(&mut w, p, 1, None, "test"));

        // Outlast both the knockback and the invulnerability window
        let frames = w.tuning.hard_invuln_frames.max(w.tuning.player.max_knockback_frames);
        run(&mut w, Buttons::empty(), frames as usize + 1);
        assert!(take_damage(&mut w, p, 1, None, "test"));
        run(&mut w, Buttons::empty(), 1);
        assert!(take_damage(&mut w, p, INSTAKILL, None, "test"));
    }

    #[test]
    fn test_door_after_holding_up() {
        let mut w = world(&["..........", "..........", "##########"]);
        let d0 = w.spawn(SpriteType::Door, IVec2::new(16, 0)).unwrap();
        let d1 = w.spawn(SpriteType::Door, IVec2::new(128, 0)).unwrap();
        w.get_mut(d0).unwrap().door_index = Some(1);
        w.get_mut(d1).unwrap().door_index = Some(1);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 32)).unwrap();

        let hold = w.tuning.door_hold_frames as usize;
        run(&mut w, Buttons::UP, hold - 1);
        assert_eq!(w.get(p).unwrap().world_pos(), IVec2::new(24, 32));
        run(&mut w, Buttons::UP, 5);
        assert_eq!(w.get(p).unwrap().world_pos(), IVec2::new(136, 32));
    }

    #[test]
    fn test_door_fires_when_reached_with_up_already_held() {
        let mut w = world(&["..........", "..........", "##########"]);
        let d0 = w.spawn(SpriteType::Door, IVec2::new(16, 0)).unwrap();
        let d1 = w.spawn(SpriteType::Door, IVec2::new(128, 0)).unwrap();
        w.get_mut(d0).unwrap().door_index = Some(1);
        w.get_mut(d1).unwrap().door_index = Some(1);
        let p = w.spawn(SpriteType::Player, IVec2::new(72, 32)).unwrap();

        let hold = w.tuning.door_hold_frames as usize;
        run(&mut w, Buttons::UP, hold + 5);
        assert_eq!(w.get(p).unwrap().world_pos(), IVec2::new(72, 32));

        w.get_mut(p).unwrap().set_world_pos(IVec2::new(24, 32));
        run(&mut w, Buttons::UP, 30);
        // One jump per press, no bouncing back while up stays held
        assert_eq!(w.get(p).unwrap().world_pos(), IVec2::new(136, 32));

        run(&mut w, Buttons::empty(), 1);
        run(&mut w, Buttons::UP, hold);
        assert_eq!(w.get(p).unwrap().world_pos(), IVec2::new(24, 32));
    }

    #[test]
    fn test_particles_despawn() {
        let mut w = world(&["....", "....", "...."]);
        let h = w.spawn(SpriteType::Particle, IVec2::new(8, 8)).unwrap();
        w.get_mut(h).unwrap().despawn_timer = Some(2);
        run(&mut w, Buttons::empty(), 3);
        assert!(!w.contains(h));
        assert_eq!(w.sprite_count(), 0);
    }

    #[test]
    fn test_fall_off_map_requests_reload() {
        let mut w = world(&["....", "...."]);
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 16)).unwrap();
        run(&mut w, Buttons::empty(), 200);
        assert!(!w.get(p).unwrap().is_alive());
        assert_eq!(w.lives, 2);
        assert_eq!(w.phase, GamePhase::ReloadRequested { level_index: 0 });

        // Frozen until the host reloads
        let frame = w.frame;
        run(&mut w, Buttons::empty(), 1);
        assert_eq!(w.frame, frame);

        w.reload(Level::from_ascii(&["P...", "####"]));
        assert_eq!(w.phase, GamePhase::Playing);
        assert!(w.player_sprite().is_some_and(|s| s.is_alive()));
    }

    #[test]
    fn test_game_over_after_last_life() {
        let mut w = world(&["....", "####"]);
        w.lives = 0;
        let p = w.spawn(SpriteType::Player, IVec2::new(24, 16)).unwrap();
        take_damage(&mut w, p, INSTAKILL, None, "test");
        assert_eq!(w.phase, GamePhase::GameOver);
        let frame = w.frame;
        run(&mut w, Buttons::empty(), 3);
        assert_eq!(w.frame, frame);
    }

    #[test]
    fn test_determinism() {
        let rows = [
            "....................",
            "..........M.........",
            ".....====......S....",
            "..P.......B####..H..",
            "####################",
        ];
        let mut a = World::from_level(
            Level::from_ascii(&rows),
            Tuning::default(),
            SimSettings::default(),
            99,
        );
        let mut b = World::from_level(
            Level::from_ascii(&rows),
            Tuning::default(),
            SimSettings::default(),
            99,
        );

        for i in 0..300u32 {
            let buttons = match i % 50 {
                0..20 => Buttons::RIGHT,
                20..25 => Buttons::RIGHT | Buttons::JUMP,
                30..35 => Buttons::RUN | Buttons::RIGHT,
                _ => Buttons::LEFT,
            };
            let input = TickInput { player: buttons };
            tick(&mut a, &input);
            tick(&mut b, &input);
        }

        let snapshot = |w: &World| {
            w.sprites()
                .map(|s| (s.stype, s.sub_pos(), s.sub_vel, s.move_mode(), s.health))
                .collect::<Vec<_>>()
        };
        assert_eq!(a.frame, b.frame);
        assert_eq!(a.phase, b.phase);
        assert_eq!(snapshot(&a), snapshot(&b));
    }

    proptest! {
        #[test]
        fn prop_landing_never_sinks(gap in 0i32..200, vel in 0i32..=111) {
            let mut w = world(&["....", "....", "####"]);
            let p = w.spawn(SpriteType::Player, IVec2::new(24, 0)).unwrap();
            place(&mut w, p, IVec2::new(384, 512 - gap), IVec2::new(0, vel));

            run(&mut w, Buttons::empty(), 1);
            let spr = w.get(p).unwrap();
            let fall = vel + w.tuning.player.gravity;
            prop_assert!(spr.feet_y() <= 511);
            if fall > gap {
                prop_assert_eq!(spr.feet_y(), 511);
                prop_assert_eq!(spr.sub_vel.y, 0);
                prop_assert!(spr.is_grounded);
            } else {
                prop_assert_eq!(spr.feet_y(), 511 - gap + fall);
            }
        }

        #[test]
        fn prop_no_tunnelling_into_wall(gap in 0i32..=96, vel in 8i32..=100) {
            let rows = ["..#...", "..#...", "..#...", "..#...", "..#...", "..#..."];
            let mut w = world(&rows);
            let p = w.spawn(SpriteType::Player, IVec2::new(24, 48)).unwrap();
            place(&mut w, p, IVec2::new(384 - gap, 768), IVec2::new(vel, 0));
            prop_assert_eq!(w.get(p).unwrap().sub_hit_box().right(), 511 - gap);

            run(&mut w, Buttons::empty(), 1);
            let spr = w.get(p).unwrap();
            let step = vel - w.tuning.player.air_damp;
            prop_assert!(spr.sub_hit_box().right() <= 511);
            if step > gap {
                prop_assert_eq!(spr.sub_hit_box().right(), 511);
                prop_assert_eq!(spr.sub_vel.x, 0);
            } else {
                prop_assert_eq!(spr.sub_hit_box().right(), 511 - gap + step);
            }
        }
    }
}
