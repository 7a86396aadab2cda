//! Per-archetype sprite profiles
//!
//! A profile is the template a sprite is reset from: health, damage,
//! solidity, capabilities, physics table and animation group. Profiles are a
//! static table indexed by `SpriteType`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::anim::AnimGroupId;
use super::sprite::{AnchorH, AnchorV};
use crate::tuning::PhysKind;

/// Actor archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteType {
    Player,
    /// Patrolling ground mob, hurts from the sides, stunned by stomps
    Creature,
    /// Spiked mob, hurts from every side unless buttstomped
    Spiker,
    /// Horizontally patrolling platform
    PlatformH,
    /// Vertically patrolling platform
    PlatformV,
    Particle,
    Door,
}

impl SpriteType {
    pub const COUNT: usize = 7;

    pub const ALL: [SpriteType; Self::COUNT] = [
        SpriteType::Player,
        SpriteType::Creature,
        SpriteType::Spiker,
        SpriteType::PlatformH,
        SpriteType::PlatformV,
        SpriteType::Particle,
        SpriteType::Door,
    ];

    /// Static profile for this archetype
    pub fn profile(self) -> &'static SpriteProfile {
        &PROFILES[self as usize]
    }
}

/// How solid a sprite or tile is.
///
/// Discriminants are single bits (so touched solidities can be OR-ed into a
/// `SolidityMask`) and increase with blocking strength, so anything
/// `>= TileSolid` blocks movement.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Solidity {
    #[default]
    None = 0,
    TileTrigger = 1 << 0,
    SpriteTrigger = 1 << 1,
    TileSolid = 1 << 2,
    SpriteSolid = 1 << 3,
    /// Solid only from above, like a one-way tile
    OneSided = 1 << 4,
    Platform = 1 << 5,
}

impl Solidity {
    pub fn is_blocking(self) -> bool {
        self >= Solidity::TileSolid
    }

    pub fn bit(self) -> SolidityMask {
        SolidityMask::from_bits_truncate(self as u8)
    }
}

bitflags! {
    /// OR of every solidity a query touched
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SolidityMask: u8 {
        const TILE_TRIGGER = Solidity::TileTrigger as u8;
        const SPRITE_TRIGGER = Solidity::SpriteTrigger as u8;
        const TILE_SOLID = Solidity::TileSolid as u8;
        const SPRITE_SOLID = Solidity::SpriteSolid as u8;
        const ONE_SIDED = Solidity::OneSided as u8;
        const PLATFORM = Solidity::Platform as u8;
    }
}

impl SolidityMask {
    const BLOCKING: Self = Self::TILE_SOLID
        .union(Self::SPRITE_SOLID)
        .union(Self::ONE_SIDED)
        .union(Self::PLATFORM);

    /// True if anything touched blocks movement (not just triggers)
    pub fn is_solid(self) -> bool {
        self.intersects(Self::BLOCKING)
    }
}

bitflags! {
    /// Capability / interaction flags
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InteractionMask: u16 {
        const CAN_BE_RIDDEN = 1 << 0;
        const CAN_RIDE_STUFF = 1 << 1;
        const DRAW_FIRST = 1 << 2;
        const SKIP_INPUT = 1 << 3;
        const SKIP_MOVEMENT = 1 << 4;
        const SKIP_ANIMS = 1 << 5;
        const DAMAGE_IN_STUNS_ME = 1 << 6;
        const DAMAGE_IN_KNOCKS_ME = 1 << 7;
        const DAMAGE_OUT_IGNORED_WHEN_BOUNCED = 1 << 8;
        const IGNORE_COLLISIONS = 1 << 9;
        const SPECIAL_MOVES = 1 << 10;
        const PLATFORM_MOVEMENT = 1 << 11;
        /// Hurts whoever touches it horizontally
        const DAMAGE_OUT_X = 1 << 12;
        /// Hurts whoever touches it vertically
        const DAMAGE_OUT_Y = 1 << 13;
    }
}

/// Named capability for call sites and per-flag tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    CanBeRidden,
    CanRideStuff,
    DrawFirst,
    SkipInput,
    SkipMovement,
    SkipAnims,
    DamageInStunsMe,
    DamageInKnocksMe,
    DamageOutIgnoredWhenBounced,
    IgnoreCollisions,
    SpecialMoves,
    PlatformMovement,
    DamageOutX,
    DamageOutY,
}

impl Capability {
    pub const ALL: [Capability; 14] = [
        Capability::CanBeRidden,
        Capability::CanRideStuff,
        Capability::DrawFirst,
        Capability::SkipInput,
        Capability::SkipMovement,
        Capability::SkipAnims,
        Capability::DamageInStunsMe,
        Capability::DamageInKnocksMe,
        Capability::DamageOutIgnoredWhenBounced,
        Capability::IgnoreCollisions,
        Capability::SpecialMoves,
        Capability::PlatformMovement,
        Capability::DamageOutX,
        Capability::DamageOutY,
    ];

    pub fn flag(self) -> InteractionMask {
        match self {
            Capability::CanBeRidden => InteractionMask::CAN_BE_RIDDEN,
            Capability::CanRideStuff => InteractionMask::CAN_RIDE_STUFF,
            Capability::DrawFirst => InteractionMask::DRAW_FIRST,
            Capability::SkipInput => InteractionMask::SKIP_INPUT,
            Capability::SkipMovement => InteractionMask::SKIP_MOVEMENT,
            Capability::SkipAnims => InteractionMask::SKIP_ANIMS,
            Capability::DamageInStunsMe => InteractionMask::DAMAGE_IN_STUNS_ME,
            Capability::DamageInKnocksMe => InteractionMask::DAMAGE_IN_KNOCKS_ME,
            Capability::DamageOutIgnoredWhenBounced => {
                InteractionMask::DAMAGE_OUT_IGNORED_WHEN_BOUNCED
            }
            Capability::IgnoreCollisions => InteractionMask::IGNORE_COLLISIONS,
            Capability::SpecialMoves => InteractionMask::SPECIAL_MOVES,
            Capability::PlatformMovement => InteractionMask::PLATFORM_MOVEMENT,
            Capability::DamageOutX => InteractionMask::DAMAGE_OUT_X,
            Capability::DamageOutY => InteractionMask::DAMAGE_OUT_Y,
        }
    }
}

impl InteractionMask {
    pub fn has(self, cap: Capability) -> bool {
        self.contains(cap.flag())
    }

    /// What a dead sprite is downgraded to
    pub const INERT: Self = Self::IGNORE_COLLISIONS.union(Self::SKIP_INPUT);
}

/// Archetype template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteProfile {
    pub default_health: i32,
    /// Contact damage = tuning.contact_damage * multiplier
    pub damage_multiplier: i32,
    /// Frames a dead sprite lingers before despawning
    pub despawn_frames: i32,
    pub solidity: Solidity,
    pub mask: InteractionMask,
    pub phys: PhysKind,
    pub anims: AnimGroupId,
    pub anchor_h: AnchorH,
    pub anchor_v: AnchorV,
}

type M = InteractionMask;

/// Indexed by `SpriteType as usize`
static PROFILES: [SpriteProfile; SpriteType::COUNT] = [
    // Player
    SpriteProfile {
        default_health: 3,
        damage_multiplier: 1,
        despawn_frames: 0,
        solidity: Solidity::SpriteSolid,
        mask: M::CAN_RIDE_STUFF.union(M::SPECIAL_MOVES),
        phys: PhysKind::Player,
        anims: AnimGroupId::Player,
        anchor_h: AnchorH::Mid,
        anchor_v: AnchorV::Bottom,
    },
    // Creature
    SpriteProfile {
        default_health: 1,
        damage_multiplier: 1,
        despawn_frames: 45,
        solidity: Solidity::SpriteSolid,
        mask: M::CAN_RIDE_STUFF
            .union(M::DAMAGE_OUT_X)
            .union(M::DAMAGE_IN_STUNS_ME),
        phys: PhysKind::Creature,
        anims: AnimGroupId::Creature,
        anchor_h: AnchorH::Mid,
        anchor_v: AnchorV::Bottom,
    },
    // Spiker
    SpriteProfile {
        default_health: 1,
        damage_multiplier: 2,
        despawn_frames: 45,
        solidity: Solidity::SpriteSolid,
        mask: M::CAN_RIDE_STUFF
            .union(M::DAMAGE_OUT_X)
            .union(M::DAMAGE_OUT_Y)
            .union(M::DAMAGE_OUT_IGNORED_WHEN_BOUNCED)
            .union(M::DAMAGE_IN_KNOCKS_ME),
        phys: PhysKind::Creature,
        anims: AnimGroupId::Spiker,
        anchor_h: AnchorH::Mid,
        anchor_v: AnchorV::Bottom,
    },
    // PlatformH
    SpriteProfile {
        default_health: 1,
        damage_multiplier: 0,
        despawn_frames: 0,
        solidity: Solidity::Platform,
        mask: M::CAN_BE_RIDDEN
            .union(M::PLATFORM_MOVEMENT)
            .union(M::SKIP_ANIMS),
        phys: PhysKind::PlatformH,
        anims: AnimGroupId::Platform,
        anchor_h: AnchorH::Left,
        anchor_v: AnchorV::Top,
    },
    // PlatformV
    SpriteProfile {
        default_health: 1,
        damage_multiplier: 0,
        despawn_frames: 0,
        solidity: Solidity::Platform,
        mask: M::CAN_BE_RIDDEN
            .union(M::PLATFORM_MOVEMENT)
            .union(M::SKIP_ANIMS),
        phys: PhysKind::PlatformV,
        anims: AnimGroupId::Platform,
        anchor_h: AnchorH::Left,
        anchor_v: AnchorV::Top,
    },
    // Particle
    SpriteProfile {
        default_health: 1,
        damage_multiplier: 0,
        despawn_frames: 0,
        solidity: Solidity::None,
        mask: M::IGNORE_COLLISIONS.union(M::SKIP_INPUT),
        phys: PhysKind::Creature,
        anims: AnimGroupId::Particle,
        anchor_h: AnchorH::Mid,
        anchor_v: AnchorV::Mid,
    },
    // Door
    SpriteProfile {
        default_health: 1,
        damage_multiplier: 0,
        despawn_frames: 0,
        solidity: Solidity::SpriteTrigger,
        mask: M::DRAW_FIRST
            .union(M::SKIP_INPUT)
            .union(M::SKIP_MOVEMENT)
            .union(M::SKIP_ANIMS),
        phys: PhysKind::PlatformH,
        anims: AnimGroupId::Door,
        anchor_h: AnchorH::Left,
        anchor_v: AnchorV::Top,
    },
];
