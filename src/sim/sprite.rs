//! Actor record and bounding boxes
//!
//! Position is private: every mutation goes through a setter that recomputes
//! both the subpixel hitbox and the world-pixel bounding box, so neither can
//! go stale.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::anim::{AnimState, AnimType};
use super::collision::Axis;
use super::input::Inputs;
use super::profile::{Capability, InteractionMask, Solidity, SpriteProfile, SpriteType};
use super::state::SpriteHandle;
use crate::consts::SHIFT;
use crate::tuning::{PhysParams, Tuning};
use crate::{sub_to_world, world_to_sub};

/// Axis-aligned box. `right()`/`bottom()` are inclusive (size minus one).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn center(&self) -> IVec2 {
        IVec2::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn overlaps_x(&self, other: &BBox) -> bool {
        self.x <= other.right() && other.x <= self.right()
    }

    pub fn translated(&self, d: IVec2) -> BBox {
        BBox::new(self.x + d.x, self.y + d.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorH {
    Left,
    Mid,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorV {
    Top,
    Mid,
    Bottom,
}

/// Movement state machine modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveMode {
    #[default]
    Fall,
    Walk,
    Dash,
    Jump,
    Knockback,
    ButtDash,
    ButtBounce,
    Stunned,
}

const MOVE_MODE_NAMES: [&str; 8] = [
    "FALL",
    "WALK",
    "DASH",
    "JUMP",
    "KNOCKBACK",
    "BUTTDASH",
    "BUTTBOUNCE",
    "STUNNED",
];

impl MoveMode {
    pub fn name(self) -> &'static str {
        MOVE_MODE_NAMES[self as usize]
    }

    /// Modes that end when the actor lands
    pub fn is_airborne(self) -> bool {
        matches!(
            self,
            MoveMode::Fall | MoveMode::Jump | MoveMode::ButtDash | MoveMode::ButtBounce
        )
    }

    /// Modes in which directional input steers the actor
    pub fn allows_steering(self) -> bool {
        matches!(
            self,
            MoveMode::Walk | MoveMode::Fall | MoveMode::Jump | MoveMode::ButtBounce
        )
    }
}

impl std::fmt::Display for MoveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One live actor
#[derive(Debug, Clone)]
pub struct Sprite {
    pub handle: SpriteHandle,
    pub stype: SpriteType,
    pub solidity: Solidity,
    pub mask: InteractionMask,
    pub health: i32,
    pub invuln_frames: i32,
    /// Frames until removal; None while the sprite should persist
    pub despawn_timer: Option<i32>,

    anchor_h: AnchorH,
    anchor_v: AnchorV,
    sub_pos: IVec2,
    sub_hit_box: BBox,
    world_bbox: BBox,

    pub last_sub_pos: IVec2,
    pub sub_vel: IVec2,
    pub last_sub_vel: IVec2,

    pub is_grounded: bool,
    pub on_ground_last_frame: bool,
    /// None until the actor first stands on something
    pub last_grounded_frame: Option<u32>,
    /// Smallest feet y since the actor last stood on something
    pub highest_y_sub_pos_in_jump: i32,

    pub jump_frame_num: i32,
    /// >0 boosting, <0 cooling down, 0 ready
    pub dash_frame_num: i32,
    pub knockback_frame_num: i32,
    pub stun_frame_num: i32,
    pub buttdash_frame_num: i32,

    pub facing_right: bool,
    pub was_running_when_grounded: bool,
    pub in_liquid: bool,
    /// Patrol AI heading: 1 right/down, -1 left/up
    pub patrol_dir: i32,

    pub input: Inputs,
    /// Only changed through the move-mode transition in `modes`
    pub(super) move_mode: MoveMode,
    pub anim: AnimState,

    pub thing_im_riding: Option<SpriteHandle>,
    pub door_index: Option<u8>,
    /// Set by a door jump, cleared once up is released
    pub door_latched: bool,
}

impl Sprite {
    /// Fresh sprite reset from its archetype profile, anchored at `world_pos`
    pub fn new(stype: SpriteType, handle: SpriteHandle, world_pos: IVec2, frame: u32) -> Self {
        let profile = stype.profile();
        let sub_pos = world_to_sub(world_pos);
        let patrol_dir = match stype {
            SpriteType::Creature | SpriteType::Spiker => -1,
            _ => 1,
        };
        let mut spr = Self {
            handle,
            stype,
            solidity: profile.solidity,
            mask: profile.mask,
            health: profile.default_health,
            invuln_frames: 0,
            despawn_timer: None,
            anchor_h: profile.anchor_h,
            anchor_v: profile.anchor_v,
            sub_pos,
            sub_hit_box: BBox::default(),
            world_bbox: BBox::default(),
            last_sub_pos: sub_pos,
            sub_vel: IVec2::ZERO,
            last_sub_vel: IVec2::ZERO,
            is_grounded: false,
            on_ground_last_frame: false,
            last_grounded_frame: None,
            highest_y_sub_pos_in_jump: 0,
            jump_frame_num: 0,
            dash_frame_num: 0,
            knockback_frame_num: 0,
            stun_frame_num: 0,
            buttdash_frame_num: 0,
            facing_right: patrol_dir > 0,
            was_running_when_grounded: false,
            in_liquid: false,
            patrol_dir,
            input: Inputs::default(),
            move_mode: MoveMode::Fall,
            anim: AnimState {
                anim: AnimType::Idle,
                last_frame: frame,
                ..Default::default()
            },
            thing_im_riding: None,
            door_index: None,
            door_latched: false,
        };
        spr.on_moved();
        spr.highest_y_sub_pos_in_jump = spr.feet_y();
        spr
    }

    pub fn profile(&self) -> &'static SpriteProfile {
        self.stype.profile()
    }

    pub fn params<'a>(&self, tuning: &'a Tuning) -> &'a PhysParams {
        tuning.phys(self.profile().phys)
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.mask.has(cap)
    }

    pub fn is_player(&self) -> bool {
        self.stype == SpriteType::Player
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn move_mode(&self) -> MoveMode {
        self.move_mode
    }

    /// Buttstomping or bouncing off one
    pub fn is_bouncing(&self) -> bool {
        matches!(self.move_mode, MoveMode::ButtDash | MoveMode::ButtBounce)
    }

    /// Whether the actor responds to its inputs this frame
    pub fn accepts_input(&self) -> bool {
        !self.has(Capability::SkipInput)
            && !matches!(self.move_mode, MoveMode::Knockback | MoveMode::Stunned)
    }

    /// Does touching this sprite along `axis` hurt?
    pub fn damages_on(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.has(Capability::DamageOutX),
            Axis::Y => self.has(Capability::DamageOutY),
        }
    }

    pub fn contact_damage(&self, tuning: &Tuning) -> i32 {
        tuning.contact_damage * self.profile().damage_multiplier
    }

    pub fn facing_sign(&self) -> i32 {
        if self.facing_right { 1 } else { -1 }
    }

    // -- position ---------------------------------------------------------

    pub fn sub_pos(&self) -> IVec2 {
        self.sub_pos
    }

    pub fn world_pos(&self) -> IVec2 {
        sub_to_world(self.sub_pos)
    }

    pub fn sub_hit_box(&self) -> BBox {
        self.sub_hit_box
    }

    pub fn world_bbox(&self) -> BBox {
        self.world_bbox
    }

    pub fn set_sub_pos(&mut self, pos: IVec2) {
        self.sub_pos = pos;
        self.on_moved();
    }

    pub fn set_sub_pos_x(&mut self, x: i32) {
        self.sub_pos.x = x;
        self.on_moved();
    }

    pub fn set_sub_pos_y(&mut self, y: i32) {
        self.sub_pos.y = y;
        self.on_moved();
    }

    pub fn add_sub_pos(&mut self, delta: IVec2) {
        self.sub_pos += delta;
        self.on_moved();
    }

    pub fn set_world_pos(&mut self, pos: IVec2) {
        self.set_sub_pos(world_to_sub(pos));
    }

    /// Offset from the hitbox's top-left corner to the anchor
    pub fn anchor_offset(&self) -> IVec2 {
        self.sub_pos - IVec2::new(self.sub_hit_box.x, self.sub_hit_box.y)
    }

    /// Recompute both boxes from the position, anchors and active frame
    pub fn on_moved(&mut self) {
        let group = self.stype.profile().anims.group();
        let image = self.anim.image(group);
        let (anchor_h, anchor_v) = (self.anchor_h, self.anchor_v);
        let place = |pos: IVec2, w: i32, h: i32| {
            let x = match anchor_h {
                AnchorH::Left => pos.x,
                AnchorH::Mid => pos.x - w / 2,
                AnchorH::Right => pos.x - w,
            };
            let y = match anchor_v {
                AnchorV::Top => pos.y,
                AnchorV::Mid => pos.y - h / 2,
                AnchorV::Bottom => pos.y - h,
            };
            BBox::new(x, y, w, h)
        };
        self.sub_hit_box = place(
            self.sub_pos,
            image.width << SHIFT,
            image.height << SHIFT,
        );
        self.world_bbox = place(sub_to_world(self.sub_pos), image.width, image.height);
    }

    /// A point on the hitbox (subpixels) or the world box (pixels)
    pub fn point_on(&self, use_hitbox: bool, h: AnchorH, v: AnchorV) -> IVec2 {
        let b = if use_hitbox {
            &self.sub_hit_box
        } else {
            &self.world_bbox
        };
        let x = match h {
            AnchorH::Left => b.x,
            AnchorH::Mid => b.x + b.width / 2,
            AnchorH::Right => b.right(),
        };
        let y = match v {
            AnchorV::Top => b.y,
            AnchorV::Mid => b.y + b.height / 2,
            AnchorV::Bottom => b.bottom(),
        };
        IVec2::new(x, y)
    }

    /// The sprite's own anchor point, inside its hitbox
    pub fn origin(&self) -> IVec2 {
        self.point_on(true, self.anchor_h, self.anchor_v)
    }

    /// Lowest subpixel row of the hitbox
    pub fn feet_y(&self) -> i32 {
        self.sub_hit_box.bottom()
    }

    /// Follow the move mode with the animation and advance it. Frame sizes
    /// can differ, so the boxes are recomputed.
    pub fn update_animation(&mut self, frame: u32) {
        if self.has(Capability::SkipAnims) {
            return;
        }
        let group = self.profile().anims.group();
        let wanted = if self.is_alive() {
            AnimType::for_mode(self.move_mode, self.sub_vel.x != 0)
        } else {
            AnimType::Die
        };
        let anim = if group.has(wanted) { wanted } else { AnimType::Idle };
        self.anim.set(group, anim, frame);
        self.anim.step(group, frame);
        self.on_moved();
    }
}
