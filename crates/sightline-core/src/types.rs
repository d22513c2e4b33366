//! Fundamental geometric and simulation types.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::constants::{TILE_SHIFT, TILE_UNITS};

/// Tile coordinate on the map grid.
pub type TileCoord = IVec2;

/// 3D position in world units.
/// x = East, y = North, z = Up (terrain height plus elevation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Horizontal position as a vector.
    pub fn xy(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// Tile containing this position.
    pub fn tile(&self) -> TileCoord {
        world_to_tile(self.xy())
    }

    /// Squared horizontal distance (ignoring height).
    pub fn dist_sq_2d(&self, other: &Position) -> i64 {
        let dx = other.x as i64 - self.x as i64;
        let dy = other.y as i64 - self.y as i64;
        dx * dx + dy * dy
    }
}

impl SimTime {
    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

/// Tile containing a world-space point (floor division).
pub fn world_to_tile(world: IVec2) -> TileCoord {
    IVec2::new(world.x >> TILE_SHIFT, world.y >> TILE_SHIFT)
}

/// World-space centre of a tile.
pub fn tile_center(tile: TileCoord) -> IVec2 {
    tile * TILE_UNITS + IVec2::splat(TILE_UNITS / 2)
}
