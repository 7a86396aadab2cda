//! World state: level, actor slots and game flow
//!
//! Actors live in a fixed-capacity slot arena addressed by generation-checked
//! handles. A separate `order` list fixes the processing (and draw) order;
//! removal keeps the relative order of everything else.

use std::rc::Rc;

use glam::IVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::profile::{Capability, SpriteType};
use super::sprite::{AnchorH, AnchorV, Sprite};
use crate::SimError;
use crate::consts::*;
use crate::level::{Layer, Level, SpawnKind};
use crate::settings::SimSettings;
use crate::tuning::Tuning;

/// Generation-checked reference to an actor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteHandle {
    slot: u16,
    generation: u32,
}

impl SpriteHandle {
    pub(crate) fn new(slot: u16, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u16 {
        self.slot
    }

    fn stale_error(&self) -> SimError {
        SimError::StaleHandle {
            slot: self.slot,
            generation: self.generation,
        }
    }
}

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Player died with lives left; counts down to a reload request
    Respawning { ticks_left: i32 },
    /// The host should reload `level_index` and call `World::reload`
    ReloadRequested { level_index: u32 },
    GameOver,
}

/// Deferred actor creation, flushed between actor updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSpawn {
    pub stype: SpriteType,
    pub world_pos: IVec2,
    pub sub_vel: IVec2,
    pub lifetime: Option<i32>,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    live: bool,
    /// None while live means the sprite is checked out for its update
    sprite: Option<Sprite>,
}

/// Launch velocities for the four tile fragments, by quadrant
const PARTICLE_LAUNCH: [IVec2; 4] = [
    IVec2::new(-24, -64),
    IVec2::new(24, -64),
    IVec2::new(-16, -32),
    IVec2::new(16, -32),
];

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    pub level: Level,
    pub tuning: Rc<Tuning>,
    pub settings: SimSettings,
    /// Simulation tick counter
    pub frame: u32,
    pub phase: GamePhase,
    /// Lives left after the current one
    pub lives: u8,
    pub level_index: u32,
    pub player: Option<SpriteHandle>,
    slots: Vec<Slot>,
    order: Vec<u16>,
    pending: Vec<PendingSpawn>,
    rng: Pcg32,
}

impl World {
    /// Empty world over a level; spawn markers are left untouched
    pub fn new(level: Level, tuning: Tuning, settings: SimSettings, seed: u64) -> Self {
        Self {
            level,
            tuning: Rc::new(tuning),
            settings,
            frame: 0,
            phase: GamePhase::Playing,
            lives: 3,
            level_index: 0,
            player: None,
            slots: Vec::with_capacity(MAX_SPRITES),
            order: Vec::with_capacity(MAX_SPRITES),
            pending: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// World with every spawn marker in the level turned into an actor
    pub fn from_level(level: Level, tuning: Tuning, settings: SimSettings, seed: u64) -> Self {
        let mut world = Self::new(level, tuning, settings, seed);
        world.spawn_from_markers();
        world
    }

    /// Replace the level after a reload request, keeping lives and config
    pub fn reload(&mut self, level: Level) {
        let handles = self.handles();
        for h in handles {
            self.destroy(h);
        }
        self.pending.clear();
        self.level = level;
        self.phase = GamePhase::Playing;
        self.spawn_from_markers();
        log::info!(
            "Reloaded level {} with {} lives left",
            self.level_index,
            self.lives
        );
    }

    fn spawn_from_markers(&mut self) {
        for spawn in self.level.take_spawns() {
            let (stype, door) = match spawn.kind {
                SpawnKind::Actor(stype) => (stype, None),
                SpawnKind::Door(index) => (SpriteType::Door, Some(index)),
            };
            match self.spawn(stype, spawn_pos(stype, spawn.tile)) {
                Ok(h) => {
                    if let Some(spr) = self.get_mut(h) {
                        spr.door_index = door;
                    }
                }
                Err(e) => log::error!("Spawn of {:?} at {} failed: {}", stype, spawn.tile, e),
            }
        }
        log::info!("Spawned {} actors from level markers", self.order.len());
    }

    /// Create an actor anchored at `world_pos` (pixels)
    pub fn spawn(&mut self, stype: SpriteType, world_pos: IVec2) -> Result<SpriteHandle, SimError> {
        if stype == SpriteType::Player && self.player.is_some_and(|h| self.contains(h)) {
            return Err(SimError::DuplicatePlayer);
        }
        let slot = match self.slots.iter().position(|s| !s.live) {
            Some(i) => i,
            None if self.slots.len() < MAX_SPRITES => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
            None => {
                return Err(SimError::SpriteCapacity {
                    capacity: MAX_SPRITES,
                });
            }
        };

        let handle = SpriteHandle::new(slot as u16, self.slots[slot].generation);
        let spr = Sprite::new(stype, handle, world_pos, self.frame);
        let draw_first = spr.has(Capability::DrawFirst);
        self.slots[slot].live = true;
        self.slots[slot].sprite = Some(spr);

        if draw_first {
            let front = self
                .order
                .iter()
                .take_while(|&&i| {
                    self.slots[i as usize]
                        .sprite
                        .as_ref()
                        .is_some_and(|s| s.has(Capability::DrawFirst))
                })
                .count();
            self.order.insert(front, slot as u16);
        } else {
            self.order.push(slot as u16);
        }
        if stype == SpriteType::Player {
            self.player = Some(handle);
        }
        log::debug!("Spawned {:?} at {} in slot {}", stype, world_pos, slot);
        Ok(handle)
    }

    /// Remove an actor. Every outstanding handle to it goes stale.
    pub fn destroy(&mut self, handle: SpriteHandle) -> bool {
        if !self.contains(handle) {
            log::error!("destroy: {}", handle.stale_error());
            return false;
        }
        let slot = &mut self.slots[handle.slot as usize];
        slot.live = false;
        slot.sprite = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.order.retain(|&i| i != handle.slot);
        if self.player == Some(handle) {
            self.player = None;
        }
        true
    }

    /// Handle refers to a live actor (checked out or not)
    pub fn contains(&self, handle: SpriteHandle) -> bool {
        self.slots
            .get(handle.slot as usize)
            .is_some_and(|s| s.live && s.generation == handle.generation)
    }

    pub fn get(&self, handle: SpriteHandle) -> Option<&Sprite> {
        let slot = self.slots.get(handle.slot as usize)?;
        if !slot.live || slot.generation != handle.generation {
            return None;
        }
        slot.sprite.as_ref()
    }

    pub fn get_mut(&mut self, handle: SpriteHandle) -> Option<&mut Sprite> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if !slot.live || slot.generation != handle.generation {
            return None;
        }
        slot.sprite.as_mut()
    }

    /// Like `get`, but a missing actor is logged as a stale-handle error
    pub fn expect_sprite(&self, handle: SpriteHandle, ctx: &str) -> Option<&Sprite> {
        let spr = self.get(handle);
        if spr.is_none() {
            log::error!("{}: {}", ctx, handle.stale_error());
        }
        spr
    }

    /// Check an actor out for its update; queries still see everything else
    pub(crate) fn take(&mut self, handle: SpriteHandle) -> Option<Sprite> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if !slot.live || slot.generation != handle.generation {
            return None;
        }
        slot.sprite.take()
    }

    pub(crate) fn put_back(&mut self, handle: SpriteHandle, spr: Sprite) {
        match self.slots.get_mut(handle.slot as usize) {
            Some(slot) if slot.live && slot.generation == handle.generation => {
                slot.sprite = Some(spr);
            }
            _ => log::error!("put_back: {}", handle.stale_error()),
        }
    }

    /// Live actors in processing order
    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.order
            .iter()
            .filter_map(|&i| self.slots[i as usize].sprite.as_ref())
    }

    /// Snapshot of live handles in processing order
    pub fn handles(&self) -> Vec<SpriteHandle> {
        self.order
            .iter()
            .map(|&i| SpriteHandle::new(i, self.slots[i as usize].generation))
            .collect()
    }

    pub fn sprite_count(&self) -> usize {
        self.order.len()
    }

    pub fn count_of(&self, stype: SpriteType) -> usize {
        self.sprites().filter(|s| s.stype == stype).count()
    }

    pub fn order_index(&self, handle: SpriteHandle) -> Option<usize> {
        if !self.contains(handle) {
            return None;
        }
        self.order.iter().position(|&i| i == handle.slot)
    }

    pub(crate) fn swap_order(&mut self, a: usize, b: usize) {
        self.order.swap(a, b);
    }

    pub fn player_sprite(&self) -> Option<&Sprite> {
        self.player.and_then(|h| self.get(h))
    }

    pub fn queue_spawn(&mut self, spawn: PendingSpawn) {
        self.pending.push(spawn);
    }

    /// Create everything queued during the last actor update
    pub fn flush_spawns(&mut self) {
        for p in std::mem::take(&mut self.pending) {
            match self.spawn(p.stype, p.world_pos) {
                Ok(h) => {
                    if let Some(spr) = self.get_mut(h) {
                        spr.sub_vel = p.sub_vel;
                        spr.despawn_timer = p.lifetime;
                    }
                }
                Err(e) => log::warn!("Dropped deferred {:?} spawn: {}", p.stype, e),
            }
        }
    }

    /// Break a breakable tile: clear it and queue its fragments.
    /// Returns false if the tile is not breakable.
    pub fn destroy_block(&mut self, tile: IVec2, cause: &str) -> bool {
        let Some(id) = self.level.block_at(tile.x, tile.y, Layer::Collision) else {
            return false;
        };
        if !self.level.layout.is_breakable(id) {
            return false;
        }
        self.level.set_block(tile.x, tile.y, Layer::Collision, None);
        log::info!("Frame {} tile {} destroyed ({})", self.frame, tile, cause);

        let spread = self.tuning.particle_spread.max(0);
        let lifetime = self.tuning.particle_lifetime_frames;
        let corner = tile * TILE_SIZE_PX;
        for i in 0..self.tuning.particle_count {
            let q = i % PARTICLE_LAUNCH.len();
            let quarter = TILE_SIZE_PX / 2;
            let offset = IVec2::new(
                quarter / 2 + (q as i32 % 2) * quarter,
                quarter / 2 + (q as i32 / 2) * quarter,
            );
            let jitter = IVec2::new(
                self.rng.random_range(-spread..=spread),
                self.rng.random_range(-spread..=spread),
            );
            self.pending.push(PendingSpawn {
                stype: SpriteType::Particle,
                world_pos: corner + offset,
                sub_vel: PARTICLE_LAUNCH[q] + jitter,
                lifetime: Some(lifetime),
            });
        }
        true
    }

    /// The other door sharing this door's index
    pub fn door_sibling(&self, door: SpriteHandle) -> Option<SpriteHandle> {
        let index = self.get(door)?.door_index?;
        self.sprites()
            .find(|s| s.handle != door && s.stype == SpriteType::Door && s.door_index == Some(index))
            .map(|s| s.handle)
    }

    /// The player died: spend a life or end the run
    pub fn on_player_died(&mut self) {
        if self.lives > 0 {
            self.lives -= 1;
            self.phase = GamePhase::Respawning {
                ticks_left: self.tuning.respawn_delay_frames,
            };
            log::info!("Player died, {} lives left", self.lives);
        } else {
            self.phase = GamePhase::GameOver;
            log::info!("Player died, game over");
        }
    }
}

/// World position for an actor spawned from a marker tile: feet-anchored
/// actors stand on the tile's bottom edge, others fill it from the top-left
pub fn spawn_pos(stype: SpriteType, tile: IVec2) -> IVec2 {
    let corner = tile * TILE_SIZE_PX;
    let profile = stype.profile();
    let x = match profile.anchor_h {
        AnchorH::Left => corner.x,
        AnchorH::Mid => corner.x + TILE_SIZE_PX / 2,
        AnchorH::Right => corner.x + TILE_SIZE_PX,
    };
    let y = match profile.anchor_v {
        AnchorV::Top => corner.y,
        AnchorV::Mid => corner.y + TILE_SIZE_PX / 2,
        AnchorV::Bottom => corner.y + TILE_SIZE_PX,
    };
    IVec2::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_world() -> World {
        World::new(
            Level::from_ascii(&["........", "........", "########"]),
            Tuning::default(),
            SimSettings::default(),
            42,
        )
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut w = open_world();
        for i in 0..MAX_SPRITES {
            w.spawn(SpriteType::Particle, IVec2::new(i as i32, 0)).unwrap();
        }
        assert!(matches!(
            w.spawn(SpriteType::Particle, IVec2::ZERO),
            Err(SimError::SpriteCapacity { capacity: MAX_SPRITES })
        ));
    }

    #[test]
    fn test_single_player() {
        let mut w = open_world();
        let p = w.spawn(SpriteType::Player, IVec2::new(8, 16)).unwrap();
        assert_eq!(w.player, Some(p));
        assert!(matches!(
            w.spawn(SpriteType::Player, IVec2::new(40, 16)),
            Err(SimError::DuplicatePlayer)
        ));
        w.destroy(p);
        assert!(w.spawn(SpriteType::Player, IVec2::new(40, 16)).is_ok());
    }

    #[test]
    fn test_destroy_keeps_order_and_stales_handle() {
        let mut w = open_world();
        let a = w.spawn(SpriteType::Creature, IVec2::new(8, 16)).unwrap();
        let b = w.spawn(SpriteType::Creature, IVec2::new(40, 16)).unwrap();
        let c = w.spawn(SpriteType::Creature, IVec2::new(72, 16)).unwrap();
        assert!(w.destroy(b));
        assert_eq!(w.handles(), vec![a, c]);
        assert!(w.get(b).is_none());
        assert!(!w.destroy(b));

        // The slot is reused with a new generation
        let d = w.spawn(SpriteType::Spiker, IVec2::new(40, 16)).unwrap();
        assert_eq!(d.slot(), b.slot());
        assert_ne!(d, b);
        assert!(w.get(b).is_none());
        assert_eq!(w.handles(), vec![a, c, d]);
    }

    #[test]
    fn test_draw_first_goes_to_front() {
        let mut w = open_world();
        let mob = w.spawn(SpriteType::Creature, IVec2::new(8, 16)).unwrap();
        let door_a = w.spawn(SpriteType::Door, IVec2::new(40, 0)).unwrap();
        let door_b = w.spawn(SpriteType::Door, IVec2::new(72, 0)).unwrap();
        assert_eq!(w.handles(), vec![door_a, door_b, mob]);
    }

    #[test]
    fn test_take_and_put_back() {
        let mut w = open_world();
        let h = w.spawn(SpriteType::Creature, IVec2::new(8, 16)).unwrap();
        let spr = w.take(h).unwrap();
        assert!(w.contains(h));
        assert!(w.get(h).is_none());
        assert_eq!(w.sprites().count(), 0);
        w.put_back(h, spr);
        assert!(w.get(h).is_some());
    }

    #[test]
    fn test_spawn_from_markers() {
        let level = Level::from_ascii(&["P..M", "0..0", "....", "####"]);
        let w = World::from_level(level, Tuning::default(), SimSettings::default(), 1);
        assert_eq!(w.sprite_count(), 4);
        let player = w.player_sprite().unwrap();
        assert_eq!(player.world_pos(), IVec2::new(8, 16));
        let doors: Vec<_> = w.sprites().filter(|s| s.stype == SpriteType::Door).collect();
        assert_eq!(doors.len(), 2);
        assert!(doors.iter().all(|d| d.door_index == Some(0)));
        assert_eq!(w.door_sibling(doors[0].handle), Some(doors[1].handle));
    }

    #[test]
    fn test_destroy_block_queues_particles() {
        let mut w = World::new(
            Level::from_ascii(&["....", ".B..", "####"]),
            Tuning::default(),
            SimSettings::default(),
            3,
        );
        assert!(!w.destroy_block(IVec2::new(0, 2), "solid"));
        assert!(w.destroy_block(IVec2::new(1, 1), "test"));
        assert_eq!(w.level.block_at(1, 1, Layer::Collision), None);
        w.flush_spawns();
        assert_eq!(w.count_of(SpriteType::Particle), 4);
        for p in w.sprites() {
            let pos = p.world_pos();
            assert!((16..32).contains(&pos.x) && (16..32).contains(&pos.y));
            assert_eq!(p.despawn_timer, Some(w.tuning.particle_lifetime_frames));
        }
    }

    #[test]
    fn test_lives_then_game_over() {
        let mut w = open_world();
        w.lives = 1;
        w.on_player_died();
        assert!(matches!(w.phase, GamePhase::Respawning { .. }));
        assert_eq!(w.lives, 0);
        w.on_player_died();
        assert_eq!(w.phase, GamePhase::GameOver);
    }
}
