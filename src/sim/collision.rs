//! Directional collision queries
//!
//! A query samples three points along the leading edge of a sprite's hitbox,
//! tests each against the collision layer and every blocking sprite, and
//! reports what was touched plus the snap position that ejects the sprite to
//! the near face of the most restrictive hit.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::profile::{Capability, Solidity, SolidityMask, SpriteType};
use super::sprite::{AnchorH, AnchorV, Sprite};
use super::state::{SpriteHandle, World};
use crate::consts::{SIDE_PROBE_INSET_SUB, TILE_SIZE_SUB};
use crate::level::{BlockClass, BlockId};
use crate::{sub_to_tile, tile_to_sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Direction {
    /// Direction of travel for a velocity component; None when still
    pub fn of(axis: Axis, vel: i32) -> Option<Direction> {
        match (axis, vel.signum()) {
            (Axis::X, 1) => Some(Direction::Right),
            (Axis::X, -1) => Some(Direction::Left),
            (Axis::Y, 1) => Some(Direction::Down),
            (Axis::Y, -1) => Some(Direction::Up),
            _ => None,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::X,
            Direction::Up | Direction::Down => Axis::Y,
        }
    }

    /// The three hitbox points sampled for this direction
    fn sample_anchors(self) -> [(AnchorH, AnchorV); 3] {
        use AnchorH as H;
        use AnchorV as V;
        match self {
            Direction::Up => [(H::Left, V::Top), (H::Mid, V::Top), (H::Right, V::Top)],
            Direction::Down => [
                (H::Left, V::Bottom),
                (H::Mid, V::Bottom),
                (H::Right, V::Bottom),
            ],
            Direction::Left => [(H::Left, V::Top), (H::Left, V::Mid), (H::Left, V::Bottom)],
            Direction::Right => [
                (H::Right, V::Top),
                (H::Right, V::Mid),
                (H::Right, V::Bottom),
            ],
        }
    }

    /// True if `a` blocks travel earlier than `b` along this direction
    fn more_restrictive(self, a: IVec2, b: IVec2) -> bool {
        match self {
            Direction::Right => a.x < b.x,
            Direction::Left => a.x > b.x,
            Direction::Down => a.y < b.y,
            Direction::Up => a.y > b.y,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Added to every sample point (look-ahead and ground probes)
    pub offset: IVec2,
    /// Skip the player sprite (AI look-ahead)
    pub ignore_player: bool,
    /// Skip sprites entirely
    pub tiles_only: bool,
}

impl QueryOptions {
    pub fn offset(offset: IVec2) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }
}

/// A sprite touched by one sample point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteHit {
    pub handle: SpriteHandle,
    pub stype: SpriteType,
    pub solidity: Solidity,
}

/// Result of one directional query. Built fresh for every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitInfo {
    pub dir: Direction,
    pub check_pos: [IVec2; 3],
    /// Tile (col, row) under each sample
    pub tile: [IVec2; 3],
    /// Blocking block id per sample
    pub block_id: [Option<BlockId>; 3],
    /// Blocking sprite per sample
    pub sprite_hit: [Option<SpriteHit>; 3],
    /// Near face of whatever blocked each sample
    pub eject: [Option<IVec2>; 3],
    /// Every solidity touched, triggers included
    pub hit_mask: SolidityMask,
    pub hit_mask_is_solid: bool,
    /// Sample with the most restrictive eject point
    pub hit_index: Option<usize>,
    /// Sprite position that ejects it flush against the hit
    pub snap_point: Option<IVec2>,
}

impl HitInfo {
    fn new(dir: Direction) -> Self {
        Self {
            dir,
            check_pos: [IVec2::ZERO; 3],
            tile: [IVec2::ZERO; 3],
            block_id: [None; 3],
            sprite_hit: [None; 3],
            eject: [None; 3],
            hit_mask: SolidityMask::empty(),
            hit_mask_is_solid: false,
            hit_index: None,
            snap_point: None,
        }
    }

    pub fn hit_something(&self) -> bool {
        self.hit_mask_is_solid
    }

    /// Tiles hit on this query, deduplicated
    pub fn hit_tiles(&self) -> Vec<IVec2> {
        let mut tiles: Vec<IVec2> = Vec::new();
        for i in 0..3 {
            if self.block_id[i].is_some() && !tiles.contains(&self.tile[i]) {
                tiles.push(self.tile[i]);
            }
        }
        tiles
    }

    pub fn hit_any_tile(&self) -> bool {
        self.block_id.iter().any(Option::is_some)
    }

    /// Sprites hit on this query, deduplicated
    pub fn hit_sprites(&self) -> Vec<SpriteHit> {
        let mut hits: Vec<SpriteHit> = Vec::new();
        for hit in self.sprite_hit.iter().flatten() {
            if !hits.iter().any(|h| h.handle == hit.handle) {
                hits.push(*hit);
            }
        }
        hits
    }

    /// Distance the snap would move the sprite along the query axis
    pub fn penetration(&self, pos: IVec2) -> i32 {
        match (self.snap_point, self.dir.axis()) {
            (Some(snap), Axis::X) => (snap.x - pos.x).abs(),
            (Some(snap), Axis::Y) => (snap.y - pos.y).abs(),
            (None, _) => 0,
        }
    }
}

/// One-way surfaces block only downward travel, and only for an actor that
/// was above the surface: standing on it, or falling from higher up.
pub fn one_way_blocks(spr: &Sprite, dir: Direction, top_y: i32) -> bool {
    if dir != Direction::Down {
        return false;
    }
    match spr.sub_vel.y {
        v if v < 0 => false,
        0 => spr.feet_y() < top_y,
        _ => spr.highest_y_sub_pos_in_jump < top_y,
    }
}

/// Near face of a blocking box for a sample point
fn near_face(dir: Direction, p: IVec2, x: i32, y: i32, right: i32, bottom: i32) -> IVec2 {
    match dir {
        Direction::Right => IVec2::new(x, p.y),
        Direction::Left => IVec2::new(right + 1, p.y),
        Direction::Down => IVec2::new(p.x, y),
        Direction::Up => IVec2::new(p.x, bottom + 1),
    }
}

/// Sample points for a direction: leading edge, horizontal probes pulled in
/// from the top and bottom
fn sample_points(spr: &Sprite, dir: Direction, offset: IVec2) -> [IVec2; 3] {
    dir.sample_anchors().map(|(h, v)| {
        let mut p = spr.point_on(true, h, v);
        if dir.axis() == Axis::X {
            match v {
                AnchorV::Top => p.y += SIDE_PROBE_INSET_SUB,
                AnchorV::Bottom => p.y -= SIDE_PROBE_INSET_SUB,
                AnchorV::Mid => {}
            }
        }
        p + offset
    })
}

/// Run a directional query for `spr` (which need not be stored in `world`)
pub fn query(world: &World, spr: &Sprite, dir: Direction, opts: QueryOptions) -> HitInfo {
    let mut info = HitInfo::new(dir);
    info.check_pos = sample_points(spr, dir, opts.offset);
    let layout = &world.level.layout;

    for i in 0..3 {
        let p = info.check_pos[i];
        let tile = sub_to_tile(p);
        info.tile[i] = tile;

        if let Some(id) = world.level.block_at_sub(p) {
            let corner = tile_to_sub(tile);
            let solidity = match layout.classify(id) {
                BlockClass::Trigger(_) => {
                    info.hit_mask |= Solidity::TileTrigger.bit();
                    None
                }
                BlockClass::OneWay => {
                    one_way_blocks(spr, dir, corner.y).then_some(Solidity::OneSided)
                }
                BlockClass::Solid | BlockClass::Breakable | BlockClass::SpawnMarker(_) => {
                    Some(Solidity::TileSolid)
                }
            };
            if let Some(solidity) = solidity {
                info.hit_mask |= solidity.bit();
                info.block_id[i] = Some(id);
                info.eject[i] = Some(near_face(
                    dir,
                    p,
                    corner.x,
                    corner.y,
                    corner.x + TILE_SIZE_SUB - 1,
                    corner.y + TILE_SIZE_SUB - 1,
                ));
            }
        }

        if opts.tiles_only || spr.has(Capability::IgnoreCollisions) {
            continue;
        }
        if let Some((hit, eject)) = sprite_at(world, spr, dir, p, opts) {
            info.hit_mask |= hit.solidity.bit();
            info.sprite_hit[i] = Some(hit);
            // The nearer of tile and sprite wins for this sample
            let closer = match info.eject[i] {
                Some(tile_eject) => dir.more_restrictive(eject, tile_eject),
                None => true,
            };
            if closer {
                info.eject[i] = Some(eject);
            }
        }
    }

    info.hit_mask_is_solid = info.hit_mask.is_solid();
    for i in 0..3 {
        let Some(eject) = info.eject[i] else {
            continue;
        };
        let best = info.hit_index.and_then(|j| info.eject[j]);
        if best.is_none_or(|b| dir.more_restrictive(eject, b)) {
            info.hit_index = Some(i);
        }
    }
    if let Some(eject) = info.hit_index.and_then(|i| info.eject[i]) {
        info.snap_point = Some(snap_for(spr, dir, eject));
    }
    info
}

/// First blocking sprite containing `p`, with its near face
fn sprite_at(
    world: &World,
    spr: &Sprite,
    dir: Direction,
    p: IVec2,
    opts: QueryOptions,
) -> Option<(SpriteHit, IVec2)> {
    world.sprites().find_map(|other| {
        if other.handle == spr.handle
            || !other.solidity.is_blocking()
            || other.has(Capability::IgnoreCollisions)
            || (opts.ignore_player && other.is_player())
            || other.thing_im_riding == Some(spr.handle)
        {
            return None;
        }
        let b = other.sub_hit_box();
        if !b.contains(p) {
            return None;
        }
        if other.solidity == Solidity::OneSided && !one_way_blocks(spr, dir, b.y) {
            return None;
        }
        let hit = SpriteHit {
            handle: other.handle,
            stype: other.stype,
            solidity: other.solidity,
        };
        Some((hit, near_face(dir, p, b.x, b.y, b.right(), b.bottom())))
    })
}

/// Sprite position that puts the hitbox flush against `eject`
fn snap_for(spr: &Sprite, dir: Direction, eject: IVec2) -> IVec2 {
    let pos = spr.sub_pos();
    let off = spr.anchor_offset();
    let hb = spr.sub_hit_box();
    match dir {
        Direction::Right => IVec2::new(eject.x - hb.width + off.x, pos.y),
        Direction::Left => IVec2::new(eject.x + off.x, pos.y),
        Direction::Down => IVec2::new(pos.x, eject.y - hb.height + off.y),
        Direction::Up => IVec2::new(pos.x, eject.y + off.y),
    }
}

/// Ground probe: a downward query one subpixel below the feet
pub fn check_grounded(world: &World, spr: &Sprite) -> HitInfo {
    query(
        world,
        spr,
        Direction::Down,
        QueryOptions::offset(IVec2::new(0, 1)),
    )
}
