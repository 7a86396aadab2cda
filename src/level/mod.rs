//! Two-layer tile grid and tileset classification
//!
//! Layers arrive already decompressed and verified; this module only does
//! grid math, block classification and the single-byte mutations needed for
//! tile destruction and spawn-marker removal.
//!
//! Raw layer bytes use 0 for "no block", so block id = byte - 1.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::consts::*;
use crate::sim::SpriteType;

/// Index into the tileset atlas
pub type BlockId = u32;

/// Which layer to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    Background,
    Collision,
}

/// Non-blocking tile triggers, handled outside the collision pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    Water,
    Lava,
    InstaDeath,
}

/// Gameplay meaning of a block id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockClass {
    Solid,
    OneWay,
    Breakable,
    Trigger(TriggerKind),
    /// Index into the spawn-marker range
    SpawnMarker(u32),
}

/// What a spawn marker asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    Actor(SpriteType),
    Door(u8),
}

/// A decoded spawn marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawn {
    pub kind: SpawnKind,
    /// Tile (col, row) the marker sat on
    pub tile: IVec2,
}

/// Actor types encoded in the first spawn-marker row, in column order
const SPAWN_ACTORS: [SpriteType; 5] = [
    SpriteType::Player,
    SpriteType::Creature,
    SpriteType::PlatformH,
    SpriteType::PlatformV,
    SpriteType::Spiker,
];

/// Tileset row/column conventions that carry gameplay meaning.
///
/// Ids are classified by (id / width_tiles, id % width_tiles). Rows from
/// `spawn_first_row` down hold spawn markers and are never breakable or
/// triggers. Row `spawn_first_row` encodes actor types by column; the rows
/// after it encode door indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilesetLayout {
    pub width_tiles: u32,
    pub height_tiles: u32,
    pub one_way_rows: [u32; 2],
    pub transparent_rows: [u32; 2],
    pub breakable_col: u32,
    pub trigger_col: u32,
    /// Trigger column rows below this are water
    pub lava_first_row: u32,
    /// Trigger column rows from here to the spawn rows are instadeath
    pub instadeath_first_row: u32,
    pub spawn_first_row: u32,
}

impl Default for TilesetLayout {
    fn default() -> Self {
        Self {
            width_tiles: 8,
            height_tiles: 22,
            one_way_rows: [0, 4],
            transparent_rows: [2, 3],
            breakable_col: 6,
            trigger_col: 7,
            lava_first_row: 4,
            instadeath_first_row: 8,
            spawn_first_row: 16,
        }
    }
}

impl TilesetLayout {
    /// Reject layouts that would misclassify or divide by zero
    pub fn validate(&self) -> Result<(), SimError> {
        let fail = |reason| Err(SimError::InvalidLayout { reason });
        if self.width_tiles == 0 || self.height_tiles == 0 {
            return fail("tileset has no tiles");
        }
        let rows = self
            .one_way_rows
            .iter()
            .chain(&self.transparent_rows)
            .chain([&self.lava_first_row, &self.instadeath_first_row, &self.spawn_first_row]);
        if rows.into_iter().any(|&r| r >= self.height_tiles) {
            return fail("row outside the tileset");
        }
        if self.breakable_col >= self.width_tiles || self.trigger_col >= self.width_tiles {
            return fail("column outside the tileset");
        }
        if self.breakable_col == self.trigger_col {
            return fail("breakable and trigger columns overlap");
        }
        if self.lava_first_row > self.instadeath_first_row
            || self.instadeath_first_row > self.spawn_first_row
        {
            return fail("trigger bands out of order");
        }
        Ok(())
    }

    /// (row, col) of a block in the atlas
    pub fn row_col(&self, id: BlockId) -> (u32, u32) {
        (id / self.width_tiles, id % self.width_tiles)
    }

    pub fn block_id(&self, row: u32, col: u32) -> BlockId {
        row * self.width_tiles + col
    }

    pub fn classify(&self, id: BlockId) -> BlockClass {
        let (row, col) = self.row_col(id);
        if row >= self.spawn_first_row {
            return BlockClass::SpawnMarker(id - self.block_id(self.spawn_first_row, 0));
        }
        if col == self.trigger_col {
            let kind = if row < self.lava_first_row {
                TriggerKind::Water
            } else if row < self.instadeath_first_row {
                TriggerKind::Lava
            } else {
                TriggerKind::InstaDeath
            };
            return BlockClass::Trigger(kind);
        }
        if col == self.breakable_col {
            return BlockClass::Breakable;
        }
        if self.one_way_rows.contains(&row) {
            return BlockClass::OneWay;
        }
        BlockClass::Solid
    }

    pub fn is_one_way(&self, id: BlockId) -> bool {
        self.classify(id) == BlockClass::OneWay
    }

    pub fn is_breakable(&self, id: BlockId) -> bool {
        self.classify(id) == BlockClass::Breakable
    }

    pub fn trigger_kind(&self, id: BlockId) -> Option<TriggerKind> {
        match self.classify(id) {
            BlockClass::Trigger(kind) => Some(kind),
            _ => None,
        }
    }

    /// Rendered with transparency (no gameplay effect)
    pub fn is_transparent(&self, id: BlockId) -> bool {
        let (row, _) = self.row_col(id);
        row < self.spawn_first_row && self.transparent_rows.contains(&row)
    }

    /// Decode a spawn-marker index; None for unused marker slots
    pub fn decode_spawn(&self, marker: u32) -> Option<SpawnKind> {
        let w = self.width_tiles;
        if marker < w {
            return SPAWN_ACTORS.get(marker as usize).copied().map(SpawnKind::Actor);
        }
        let door = marker - w;
        let door_rows = self.height_tiles.saturating_sub(self.spawn_first_row + 1);
        if door < door_rows * w {
            u8::try_from(door).ok().map(SpawnKind::Door)
        } else {
            None
        }
    }

    /// Marker id for a spawn kind (level authoring and tests)
    pub fn spawn_block(&self, kind: SpawnKind) -> BlockId {
        let base = self.block_id(self.spawn_first_row, 0);
        match kind {
            SpawnKind::Actor(stype) => {
                let idx = SPAWN_ACTORS.iter().position(|&s| s == stype).unwrap_or(0);
                base + idx as u32
            }
            SpawnKind::Door(index) => base + self.width_tiles + index as u32,
        }
    }
}

/// One decompressed layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayer {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl TileLayer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SimError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SimError::LayerSize {
                width,
                height,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    fn offset(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col as u32 >= self.width || row as u32 >= self.height {
            return None;
        }
        Some(row as usize * self.width as usize + col as usize)
    }

    pub fn get(&self, col: i32, row: i32) -> Option<BlockId> {
        let raw = self.data[self.offset(col, row)?];
        raw.checked_sub(1).map(BlockId::from)
    }

    /// Returns false when out of bounds or the id does not fit a byte
    pub fn set(&mut self, col: i32, row: i32, block: Option<BlockId>) -> bool {
        let Some(offset) = self.offset(col, row) else {
            return false;
        };
        let raw = match block {
            None => 0,
            Some(id) => match u8::try_from(id + 1) {
                Ok(raw) => raw,
                Err(_) => {
                    log::error!("Block id {} does not fit a layer byte", id);
                    return false;
                }
            },
        };
        self.data[offset] = raw;
        true
    }
}

/// Serialized level: both layers as raw bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelData {
    pub width: u32,
    pub height: u32,
    pub background: Vec<u8>,
    pub collision: Vec<u8>,
    #[serde(default)]
    pub layout: TilesetLayout,
}

/// Live level: background + collision layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub background: TileLayer,
    pub collision: TileLayer,
    pub layout: TilesetLayout,
}

impl Level {
    pub fn from_layers(
        width: u32,
        height: u32,
        background: Vec<u8>,
        collision: Vec<u8>,
        layout: TilesetLayout,
    ) -> Result<Self, SimError> {
        layout.validate()?;
        Ok(Self {
            background: TileLayer::new(width, height, background)?,
            collision: TileLayer::new(width, height, collision)?,
            layout,
        })
    }

    pub fn from_data(data: LevelData) -> Result<Self, SimError> {
        Self::from_layers(
            data.width,
            data.height,
            data.background,
            data.collision,
            data.layout,
        )
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Self::from_data(serde_json::from_str(json)?)
    }

    pub fn width_tiles(&self) -> u32 {
        self.collision.width
    }

    pub fn height_tiles(&self) -> u32 {
        self.collision.height
    }

    pub fn height_px(&self) -> i32 {
        self.height_tiles() as i32 * TILE_SIZE_PX
    }

    fn layer(&self, layer: Layer) -> &TileLayer {
        match layer {
            Layer::Background => &self.background,
            Layer::Collision => &self.collision,
        }
    }

    /// Block at a grid cell; None for empty or out-of-range cells
    pub fn block_at(&self, col: i32, row: i32, layer: Layer) -> Option<BlockId> {
        self.layer(layer).get(col, row)
    }

    /// Block under a subpixel point on the collision layer
    pub fn block_at_sub(&self, sub: IVec2) -> Option<BlockId> {
        let tile = crate::sub_to_tile(sub);
        self.block_at(tile.x, tile.y, Layer::Collision)
    }

    pub fn set_block(&mut self, col: i32, row: i32, layer: Layer, block: Option<BlockId>) -> bool {
        match layer {
            Layer::Background => self.background.set(col, row, block),
            Layer::Collision => self.collision.set(col, row, block),
        }
    }

    /// Remove every spawn marker from the collision layer and decode it.
    /// Unknown markers are logged, cleared and skipped.
    pub fn take_spawns(&mut self) -> Vec<Spawn> {
        let mut spawns = Vec::new();
        for row in 0..self.height_tiles() as i32 {
            for col in 0..self.width_tiles() as i32 {
                let Some(id) = self.block_at(col, row, Layer::Collision) else {
                    continue;
                };
                let BlockClass::SpawnMarker(marker) = self.layout.classify(id) else {
                    continue;
                };
                self.set_block(col, row, Layer::Collision, None);
                match self.layout.decode_spawn(marker) {
                    Some(kind) => spawns.push(Spawn {
                        kind,
                        tile: IVec2::new(col, row),
                    }),
                    None => log::error!(
                        "{}",
                        SimError::InvalidSpawnMarker {
                            block: id,
                            col,
                            row
                        }
                    ),
                }
            }
        }
        spawns
    }

    /// Build a level from ASCII rows (collision layer only).
    ///
    /// `#` solid, `=` one-way, `B` breakable, `~` water, `^` lava,
    /// `X` instadeath, `P` player, `M` creature, `S` spiker, `H`/`V`
    /// platforms, `0`-`9` doors, anything else empty.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let layout = TilesetLayout::default();
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut collision = TileLayer::empty(width, height);

        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let block = match ch {
                    '#' => Some(layout.block_id(1, 0)),
                    '=' => Some(layout.block_id(layout.one_way_rows[0], 0)),
                    'B' => Some(layout.block_id(1, layout.breakable_col)),
                    '~' => Some(layout.block_id(0, layout.trigger_col)),
                    '^' => Some(layout.block_id(layout.lava_first_row, layout.trigger_col)),
                    'X' => Some(layout.block_id(layout.instadeath_first_row, layout.trigger_col)),
                    'P' => Some(layout.spawn_block(SpawnKind::Actor(SpriteType::Player))),
                    'M' => Some(layout.spawn_block(SpawnKind::Actor(SpriteType::Creature))),
                    'S' => Some(layout.spawn_block(SpawnKind::Actor(SpriteType::Spiker))),
                    'H' => Some(layout.spawn_block(SpawnKind::Actor(SpriteType::PlatformH))),
                    'V' => Some(layout.spawn_block(SpawnKind::Actor(SpriteType::PlatformV))),
                    d if d.is_ascii_digit() => {
                        let index = d as u8 - b'0';
                        Some(layout.spawn_block(SpawnKind::Door(index)))
                    }
                    _ => None,
                };
                collision.set(col as i32, row as i32, block);
            }
        }

        Self {
            background: TileLayer::empty(width, height),
            collision,
            layout,
        }
    }
}
