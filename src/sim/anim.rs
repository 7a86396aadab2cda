//! Animation tables and frame stepping
//!
//! Each archetype has an animation group: one optional frame set per
//! `AnimType`. A group without a requested set falls back to its idle set.

use serde::{Deserialize, Serialize};

use super::sprite::MoveMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimType {
    #[default]
    Idle,
    Fall,
    Walk,
    Jump,
    Dash,
    ButtStomp,
    ButtBounce,
    Knockback,
    Stunned,
    Die,
}

impl AnimType {
    pub const COUNT: usize = 10;

    /// Animation that represents a move mode
    pub fn for_mode(mode: MoveMode, moving: bool) -> Self {
        match mode {
            MoveMode::Walk if moving => AnimType::Walk,
            MoveMode::Walk => AnimType::Idle,
            MoveMode::Fall => AnimType::Fall,
            MoveMode::Jump => AnimType::Jump,
            MoveMode::Dash => AnimType::Dash,
            MoveMode::ButtDash => AnimType::ButtStomp,
            MoveMode::ButtBounce => AnimType::ButtBounce,
            MoveMode::Knockback => AnimType::Knockback,
            MoveMode::Stunned => AnimType::Stunned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimMode {
    Loop,
    PingPong,
    /// Holds the last frame
    OneShot,
}

/// One frame image: atlas id and size in world pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub id: u16,
    pub width: i32,
    pub height: i32,
}

const fn img(id: u16, width: i32, height: i32) -> ImageRef {
    ImageRef { id, width, height }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimFrames {
    pub mode: AnimMode,
    /// Frames between image advances
    pub frame_speed: u32,
    pub images: &'static [ImageRef],
}

const fn frames(mode: AnimMode, frame_speed: u32, images: &'static [ImageRef]) -> Option<AnimFrames> {
    Some(AnimFrames {
        mode,
        frame_speed,
        images,
    })
}

/// Frame sets for one archetype, indexed by `AnimType as usize`.
/// The idle set is always present.
#[derive(Debug)]
pub struct AnimGroup {
    idle: AnimFrames,
    sets: [Option<AnimFrames>; AnimType::COUNT],
}

impl AnimGroup {
    pub fn has(&self, anim: AnimType) -> bool {
        anim == AnimType::Idle || self.sets[anim as usize].is_some()
    }

    /// Frame set for `anim`, or idle when the group lacks it
    pub fn frames(&self, anim: AnimType) -> &AnimFrames {
        self.sets[anim as usize].as_ref().unwrap_or(&self.idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimGroupId {
    Player,
    Creature,
    Spiker,
    Platform,
    Particle,
    Door,
}

impl AnimGroupId {
    pub fn group(self) -> &'static AnimGroup {
        match self {
            AnimGroupId::Player => &PLAYER,
            AnimGroupId::Creature => &CREATURE,
            AnimGroupId::Spiker => &SPIKER,
            AnimGroupId::Platform => &PLATFORM,
            AnimGroupId::Particle => &PARTICLE,
            AnimGroupId::Door => &DOOR,
        }
    }
}

/// Per-sprite animation cursor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimState {
    pub anim: AnimType,
    pub index: usize,
    /// Ping-pong direction
    pub reversing: bool,
    /// Frame the image last advanced on
    pub last_frame: u32,
}

impl AnimState {
    /// Switch animations. Re-requesting the active one keeps its cursor.
    pub fn set(&mut self, group: &AnimGroup, anim: AnimType, frame: u32) {
        if self.anim == anim {
            return;
        }
        if !group.has(anim) {
            log::error!("No {:?} frames in this animation group, using idle", anim);
        }
        self.anim = anim;
        self.index = 0;
        self.reversing = false;
        self.last_frame = frame;
    }

    /// Advance the cursor once `frame_speed` frames have passed
    pub fn step(&mut self, group: &AnimGroup, frame: u32) {
        let set = group.frames(self.anim);
        let count = set.images.len();
        if count <= 1 || frame.wrapping_sub(self.last_frame) < set.frame_speed.max(1) {
            return;
        }
        self.last_frame = frame;

        match set.mode {
            AnimMode::Loop => self.index = (self.index + 1) % count,
            AnimMode::OneShot => self.index = (self.index + 1).min(count - 1),
            AnimMode::PingPong => {
                if self.reversing {
                    if self.index == 0 {
                        self.reversing = false;
                        self.index = 1;
                    } else {
                        self.index -= 1;
                    }
                } else if self.index + 1 >= count {
                    self.reversing = true;
                    self.index = count - 2;
                } else {
                    self.index += 1;
                }
            }
        }
    }

    /// Image for the current cursor. An out-of-range cursor is reset.
    pub fn image(&mut self, group: &AnimGroup) -> ImageRef {
        let set = group.frames(self.anim);
        if self.index >= set.images.len() {
            log::error!(
                "Anim {:?} frame {} out of range ({} frames)",
                self.anim,
                self.index,
                set.images.len()
            );
            self.index = 0;
        }
        set.images
            .get(self.index)
            .or_else(|| group.idle.images.first())
            .copied()
            .unwrap_or(img(0, 1, 1))
    }
}

use AnimMode::{Loop, OneShot, PingPong};

static PLAYER_IDLE: [ImageRef; 2] = [img(0, 16, 16), img(1, 16, 16)];
static PLAYER_WALK: [ImageRef; 4] = [
    img(2, 16, 16),
    img(3, 16, 16),
    img(4, 16, 16),
    img(5, 16, 16),
];
static PLAYER_AIR: [ImageRef; 1] = [img(6, 16, 16)];
static PLAYER_FALL: [ImageRef; 1] = [img(7, 16, 16)];
static PLAYER_DASH: [ImageRef; 2] = [img(8, 16, 16), img(9, 16, 16)];
static PLAYER_STOMP: [ImageRef; 1] = [img(10, 16, 16)];
static PLAYER_BOUNCE: [ImageRef; 3] = [img(11, 16, 16), img(12, 16, 16), img(13, 16, 16)];
static PLAYER_HURT: [ImageRef; 1] = [img(14, 16, 16)];
static PLAYER_DIZZY: [ImageRef; 3] = [img(15, 16, 16), img(16, 16, 16), img(17, 16, 16)];
static PLAYER_DIE: [ImageRef; 3] = [img(18, 16, 16), img(19, 16, 16), img(20, 16, 16)];

static PLAYER: AnimGroup = AnimGroup {
    idle: AnimFrames {
        mode: PingPong,
        frame_speed: 20,
        images: &PLAYER_IDLE,
    },
    sets: [
        None,
        frames(Loop, 1, &PLAYER_FALL),
        frames(Loop, 6, &PLAYER_WALK),
        frames(Loop, 1, &PLAYER_AIR),
        frames(Loop, 3, &PLAYER_DASH),
        frames(Loop, 1, &PLAYER_STOMP),
        frames(OneShot, 4, &PLAYER_BOUNCE),
        frames(Loop, 1, &PLAYER_HURT),
        frames(PingPong, 8, &PLAYER_DIZZY),
        frames(OneShot, 8, &PLAYER_DIE),
    ],
};

static CREATURE_IDLE: [ImageRef; 1] = [img(32, 16, 16)];
static CREATURE_WALK: [ImageRef; 2] = [img(33, 16, 16), img(34, 16, 16)];
static CREATURE_STUNNED: [ImageRef; 2] = [img(35, 16, 16), img(36, 16, 16)];
static CREATURE_DIE: [ImageRef; 1] = [img(37, 16, 16)];

static CREATURE: AnimGroup = AnimGroup {
    idle: AnimFrames {
        mode: Loop,
        frame_speed: 1,
        images: &CREATURE_IDLE,
    },
    sets: [
        None,
        None,
        frames(Loop, 8, &CREATURE_WALK),
        None,
        None,
        None,
        None,
        frames(Loop, 1, &CREATURE_DIE),
        frames(PingPong, 10, &CREATURE_STUNNED),
        frames(Loop, 1, &CREATURE_DIE),
    ],
};

static SPIKER_IDLE: [ImageRef; 1] = [img(40, 16, 16)];
static SPIKER_WALK: [ImageRef; 4] = [
    img(41, 16, 16),
    img(42, 16, 16),
    img(43, 16, 16),
    img(42, 16, 16),
];
static SPIKER_DIE: [ImageRef; 1] = [img(44, 16, 16)];

static SPIKER: AnimGroup = AnimGroup {
    idle: AnimFrames {
        mode: Loop,
        frame_speed: 1,
        images: &SPIKER_IDLE,
    },
    sets: [
        None,
        None,
        frames(Loop, 6, &SPIKER_WALK),
        None,
        None,
        None,
        None,
        None,
        None,
        frames(Loop, 1, &SPIKER_DIE),
    ],
};

static PLATFORM_IDLE: [ImageRef; 1] = [img(48, 32, 8)];
static PLATFORM: AnimGroup = AnimGroup {
    idle: AnimFrames {
        mode: Loop,
        frame_speed: 1,
        images: &PLATFORM_IDLE,
    },
    sets: [None; AnimType::COUNT],
};

static PARTICLE_IDLE: [ImageRef; 2] = [img(56, 4, 4), img(57, 4, 4)];
static PARTICLE: AnimGroup = AnimGroup {
    idle: AnimFrames {
        mode: Loop,
        frame_speed: 4,
        images: &PARTICLE_IDLE,
    },
    sets: [None; AnimType::COUNT],
};

static DOOR_IDLE: [ImageRef; 1] = [img(60, 16, 32)];
static DOOR: AnimGroup = AnimGroup {
    idle: AnimFrames {
        mode: Loop,
        frame_speed: 1,
        images: &DOOR_IDLE,
    },
    sets: [None; AnimType::COUNT],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_set_falls_back_to_idle() {
        let group = AnimGroupId::Platform.group();
        assert!(!group.has(AnimType::Jump));
        assert_eq!(group.frames(AnimType::Jump).images, &PLATFORM_IDLE[..]);

        let mut state = AnimState::default();
        state.set(group, AnimType::Jump, 0);
        assert_eq!(state.anim, AnimType::Jump);
        assert_eq!(state.image(group).id, PLATFORM_IDLE[0].id);
    }

    #[test]
    fn test_loop_wraps() {
        let group = AnimGroupId::Player.group();
        let mut state = AnimState::default();
        state.set(group, AnimType::Walk, 0);
        let mut seen = Vec::new();
        for frame in 1..=30 {
            state.step(group, frame);
            seen.push(state.index);
        }
        // Advances every 6 frames and wraps after 4 images
        assert_eq!(seen[5], 1);
        assert_eq!(seen[23], 0);
    }

    #[test]
    fn test_pingpong_reverses() {
        let group = AnimGroupId::Player.group();
        let mut state = AnimState::default();
        state.set(group, AnimType::Stunned, 0);
        let mut indices = vec![state.index];
        for frame in (8..=48).step_by(8) {
            state.step(group, frame);
            indices.push(state.index);
        }
        assert_eq!(indices, vec![0, 1, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn test_oneshot_holds_last_frame() {
        let group = AnimGroupId::Player.group();
        let mut state = AnimState::default();
        state.set(group, AnimType::Die, 0);
        for frame in 1..100 {
            state.step(group, frame);
        }
        assert_eq!(state.index, PLAYER_DIE.len() - 1);
    }

    #[test]
    fn test_same_anim_keeps_cursor() {
        let group = AnimGroupId::Player.group();
        let mut state = AnimState::default();
        state.set(group, AnimType::Walk, 0);
        state.step(group, 6);
        state.set(group, AnimType::Walk, 7);
        assert_eq!(state.index, 1);
    }

    #[test]
    fn test_out_of_range_cursor_resets() {
        let group = AnimGroupId::Creature.group();
        let mut state = AnimState {
            index: 9,
            ..Default::default()
        };
        let image = state.image(group);
        assert_eq!(state.index, 0);
        assert_eq!(image.id, CREATURE_IDLE[0].id);
    }

    #[test]
    fn test_mode_mapping() {
        assert_eq!(AnimType::for_mode(MoveMode::Walk, false), AnimType::Idle);
        assert_eq!(AnimType::for_mode(MoveMode::Walk, true), AnimType::Walk);
        assert_eq!(AnimType::for_mode(MoveMode::ButtDash, false), AnimType::ButtStomp);
    }
}
