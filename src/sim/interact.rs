//! Actor interactions: damage, knockback, stomps and dashes, riding, doors,
//! tile triggers and falling off the map

use std::rc::Rc;

use glam::IVec2;

use super::anim::AnimType;
use super::collision::Axis;
use super::profile::{Capability, InteractionMask, Solidity, SpriteType};
use super::sprite::{AnchorH, AnchorV, BBox, MoveMode, Sprite};
use super::state::{SpriteHandle, World};
use crate::consts::{INSTAKILL, SHIFT};
use crate::level::TriggerKind;
use crate::tuning::{KnockbackStrength, Tuning};

/// Contact recorded during movement, resolved after the mover is put back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touch {
    pub target: SpriteHandle,
    pub axis: Axis,
    /// Toucher's own velocity before ejection
    pub toucher_vel: IVec2,
}

/// Whether `rider` may ride `ridden`, given where the ridden actor's box is
/// (its current box, or where it was before this tick's move)
pub fn can_ride(rider: &Sprite, ridden: &Sprite, ridden_box: &BBox, tuning: &Tuning) -> bool {
    rider.has(Capability::CanRideStuff)
        && ridden.has(Capability::CanBeRidden)
        && !rider.has(Capability::SkipInput)
        && !ridden.has(Capability::SkipInput)
        && !rider.in_liquid
        && rider.sub_hit_box().overlaps_x(ridden_box)
        && (ridden_box.y - (rider.feet_y() + 1)).abs() <= tuning.ride_tolerance_sub
}

/// -1/1 pointing from the source toward the sprite; backwards when unknown
fn away_from(spr: &Sprite, source_x: Option<i32>) -> i32 {
    match source_x {
        Some(x) if x != spr.sub_pos().x => (spr.sub_pos().x - x).signum(),
        _ => -spr.facing_sign(),
    }
}

fn source_x(world: &World, source: Option<SpriteHandle>) -> Option<i32> {
    source.and_then(|h| world.get(h)).map(|s| s.sub_pos().x)
}

/// Apply damage. `INSTAKILL` ignores every immunity; anything else is
/// ignored during knockback or invulnerability. Survivors are knocked back
/// hard. Returns true if damage was applied.
pub fn take_damage(
    world: &mut World,
    target: SpriteHandle,
    amount: i32,
    source: Option<SpriteHandle>,
    cause: &str,
) -> bool {
    let tuning = Rc::clone(&world.tuning);
    let frame = world.frame;
    let src_x = source_x(world, source);
    if world.expect_sprite(target, "take_damage").is_none() {
        return false;
    }
    let Some(spr) = world.get_mut(target) else {
        return false;
    };
    if !spr.is_alive() || amount <= 0 {
        return false;
    }
    if amount != INSTAKILL && (spr.move_mode() == MoveMode::Knockback || spr.invuln_frames > 0) {
        log::debug!("Frame {} {:?} immune to {} ({})", frame, spr.stype, amount, cause);
        return false;
    }

    let amount = amount.min(spr.health);
    spr.health -= amount;
    log::info!(
        "Frame {} {:?} took {} damage ({}), health {}",
        frame,
        spr.stype,
        amount,
        cause,
        spr.health
    );
    if spr.is_alive() {
        let away = away_from(spr, src_x);
        spr.apply_knockback(KnockbackStrength::Hard, away, &tuning, frame, cause);
    } else {
        kill(world, target, cause);
    }
    true
}

/// Downgrade a sprite to a non-interactive corpse
fn kill(world: &mut World, target: SpriteHandle, cause: &str) {
    let tuning = Rc::clone(&world.tuning);
    let frame = world.frame;
    let Some(spr) = world.get_mut(target) else {
        return;
    };
    spr.health = 0;
    spr.solidity = Solidity::None;
    spr.mask = InteractionMask::INERT;
    spr.thing_im_riding = None;
    spr.sub_vel = IVec2::new(0, tuning.knockback.hard.y);
    spr.anim.set(spr.stype.profile().anims.group(), AnimType::Die, frame);
    log::info!("Frame {} {:?} died ({})", frame, spr.stype, cause);

    if spr.is_player() {
        world.on_player_died();
    } else {
        spr.despawn_timer = Some(spr.profile().despawn_frames);
    }
}

/// Knock a sprite away from `source`. Refused during knockback; a stunned
/// sprite only takes the impulse.
pub fn try_knockback(
    world: &mut World,
    target: SpriteHandle,
    strength: KnockbackStrength,
    source: Option<SpriteHandle>,
    cause: &str,
) -> bool {
    let tuning = Rc::clone(&world.tuning);
    let frame = world.frame;
    let src_x = source_x(world, source);
    if world.expect_sprite(target, "try_knockback").is_none() {
        return false;
    }
    let Some(spr) = world.get_mut(target) else {
        return false;
    };
    if !spr.is_alive() {
        return false;
    }
    let away = away_from(spr, src_x);
    spr.apply_knockback(strength, away, &tuning, frame, cause)
}

pub fn stun(world: &mut World, target: SpriteHandle, cause: &str) -> bool {
    let tuning = Rc::clone(&world.tuning);
    let frame = world.frame;
    match world.get_mut(target) {
        Some(spr) if spr.is_alive() => spr.stun(&tuning, frame, cause),
        _ => false,
    }
}

/// Resolve every contact the mover made this tick, in both directions
pub fn resolve_touches(world: &mut World, toucher: SpriteHandle, touches: &[Touch]) {
    for t in touches {
        on_touch(world, toucher, t.target, t.axis, t.toucher_vel);
        let Some(target_vel) = world.get(t.target).map(|s| s.sub_vel) else {
            continue;
        };
        on_touch(world, t.target, toucher, t.axis, target_vel);
    }
}

/// `toucher` ran into `target` along `axis`
pub fn on_touch(
    world: &mut World,
    toucher: SpriteHandle,
    target: SpriteHandle,
    axis: Axis,
    toucher_vel: IVec2,
) {
    let tuning = Rc::clone(&world.tuning);
    let (Some(a), Some(b)) = (world.get(toucher), world.get(target)) else {
        return;
    };
    if !a.is_alive() || !b.is_alive() {
        return;
    }

    let target_stunned = b.move_mode() == MoveMode::Stunned;
    let damaging = b.damages_on(axis) && !target_stunned;
    let shielded = a.is_bouncing() && b.has(Capability::DamageOutIgnoredWhenBounced);
    if damaging && !shielded {
        let damage = b.contact_damage(&tuning);
        take_damage(world, toucher, damage, Some(target), "touched a hazard");
        return;
    }

    let special = a.has(Capability::SpecialMoves);
    let dash_attack = special
        && axis == Axis::X
        && a.move_mode() == MoveMode::Dash
        && toucher_vel.x.abs() >= tuning.dashbonk_thresh_speed;
    let stomp = special
        && axis == Axis::Y
        && toucher_vel.y >= tuning.stomp_thresh_speed
        && a.feet_y() < b.sub_hit_box().center().y;
    let attack_damage = a.contact_damage(&tuning).max(1);
    let target_mask = b.mask;

    if dash_attack || stomp {
        let cause = if stomp { "stomped" } else { "dashed into" };
        if target_stunned || target_mask.has(Capability::DamageInKnocksMe) {
            take_damage(world, target, attack_damage, Some(toucher), cause);
        } else if target_mask.has(Capability::DamageInStunsMe) {
            stun(world, target, cause);
        } else {
            try_knockback(world, target, KnockbackStrength::Minimal, Some(toucher), cause);
        }
        if stomp {
            stomp_bounce(world, toucher);
        }
        return;
    }

    if target_stunned {
        try_knockback(
            world,
            target,
            KnockbackStrength::Nudge,
            Some(toucher),
            "nudged while stunned",
        );
    }
}

/// A successful stomper pops back up
fn stomp_bounce(world: &mut World, handle: SpriteHandle) {
    let tuning = Rc::clone(&world.tuning);
    let frame = world.frame;
    let Some(spr) = world.get_mut(handle) else {
        return;
    };
    let params = *spr.params(&tuning);
    if spr.is_bouncing() {
        spr.set_move_mode(MoveMode::ButtBounce, &tuning, frame, "stomp bounce");
    } else {
        spr.set_move_mode(MoveMode::Jump, &tuning, frame, "stomp bounce");
        spr.stop_jump_boost(&params, "stomp bounce");
    }
    spr.sub_vel.y = -tuning.stomp_bounce_vel;
    spr.is_grounded = false;
}

/// Water, lava and instadeath tiles under the actor's center or feet
pub fn apply_tile_triggers(world: &mut World, handle: SpriteHandle) {
    let tuning = Rc::clone(&world.tuning);
    let Some(spr) = world.get(handle) else {
        return;
    };
    if spr.has(Capability::IgnoreCollisions)
        || spr.has(Capability::PlatformMovement)
        || spr.has(Capability::SkipMovement)
    {
        return;
    }

    let points = [
        spr.sub_hit_box().center(),
        spr.point_on(true, AnchorH::Mid, AnchorV::Bottom),
    ];
    let (mut water, mut lava, mut death) = (false, false, false);
    for p in points {
        let Some(id) = world.level.block_at_sub(p) else {
            continue;
        };
        match world.level.layout.trigger_kind(id) {
            Some(TriggerKind::Water) => water = true,
            Some(TriggerKind::Lava) => lava = true,
            Some(TriggerKind::InstaDeath) => death = true,
            None => {}
        }
    }

    if let Some(spr) = world.get_mut(handle)
        && spr.in_liquid != water
    {
        log::debug!("{:?} in liquid: {}", spr.stype, water);
        spr.in_liquid = water;
    }
    if death {
        take_damage(world, handle, INSTAKILL, None, "instadeath tile");
    } else if lava {
        take_damage(world, handle, tuning.lava_damage, None, "lava");
    }
}

/// Doors teleport the player to the sibling door after holding up for at
/// least `door_hold_frames`. One jump per press: up must be released before
/// the next.
pub fn use_doors(world: &mut World, handle: SpriteHandle) {
    let tuning = Rc::clone(&world.tuning);
    let Some(spr) = world.get_mut(handle) else {
        return;
    };
    if spr.input.up == 0 {
        spr.door_latched = false;
    }
    if !spr.is_player() || !spr.is_alive() || spr.door_latched {
        return;
    }
    if spr.input.up < tuning.door_hold_frames || spr.sub_vel.x.abs() > tuning.door_max_x_speed {
        return;
    }
    let origin = spr.origin();
    let Some((door, entry)) = world
        .sprites()
        .find(|d| {
            d.stype == SpriteType::Door
                && d.solidity == Solidity::SpriteTrigger
                && d.sub_hit_box().contains(origin)
        })
        .map(|d| (d.handle, d.sub_hit_box().center()))
    else {
        return;
    };
    let Some(exit) = world
        .door_sibling(door)
        .and_then(|h| world.get(h))
        .map(|d| d.sub_hit_box().center())
    else {
        log::warn!("Door {:?} has no sibling", door);
        return;
    };

    let frame = world.frame;
    if let Some(spr) = world.get_mut(handle) {
        spr.add_sub_pos(exit - entry);
        spr.thing_im_riding = None;
        spr.door_latched = true;
        log::info!("Frame {} player used door, now at {}", frame, spr.world_pos());
    }
}

/// Actors that drop below the map are lost: the player dies, others despawn
pub fn check_fell_off_map(world: &mut World, handle: SpriteHandle) {
    let limit = (world.level.height_px() + world.tuning.fall_off_margin_px) << SHIFT;
    let Some(spr) = world.get_mut(handle) else {
        return;
    };
    if spr.sub_hit_box().y <= limit {
        return;
    }
    if spr.is_player() {
        if spr.is_alive() {
            take_damage(world, handle, INSTAKILL, None, "fell off the map");
        }
    } else if spr.despawn_timer.is_none_or(|t| t > 0) {
        log::debug!("{:?} fell off the map", spr.stype);
        spr.despawn_timer = Some(0);
    }
}
