//! TerrainGrid: tile heightmap with integer elevation queries.

use glam::IVec2;
use thiserror::Error;

use sightline_core::constants::{TILE_SHIFT, TILE_UNITS};
use sightline_core::types::TileCoord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerrainError {
    #[error("{layer} layer has {actual} cells, expected {expected} for a {width}x{height} map")]
    SizeMismatch {
        layer: &'static str,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("map dimensions must be non-zero, got {width}x{height}")]
    Empty { width: u32, height: u32 },
}

/// Tile heightmap. One ground height per tile, optional water surface per tile.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    /// Number of tile columns (west to east).
    pub width: u32,
    /// Number of tile rows (south to north).
    pub height: u32,
    /// Ground height per tile in world units, row-major.
    ground: Vec<i32>,
    /// Water surface per tile, row-major. Tiles without water hold `i32::MIN`.
    water: Option<Vec<i32>>,
}

impl TerrainGrid {
    /// Create a grid from row-major ground heights.
    pub fn new(width: u32, height: u32, ground: Vec<i32>) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 {
            return Err(TerrainError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if ground.len() != expected {
            return Err(TerrainError::SizeMismatch {
                layer: "ground",
                width,
                height,
                expected,
                actual: ground.len(),
            });
        }
        Ok(Self {
            width,
            height,
            ground,
            water: None,
        })
    }

    /// A grid with every tile at `elevation`.
    pub fn flat(width: u32, height: u32, elevation: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            ground: vec![elevation; width.max(1) as usize * height.max(1) as usize],
            water: None,
        }
    }

    /// Attach a row-major water surface layer.
    pub fn with_water(mut self, water: Vec<i32>) -> Result<Self, TerrainError> {
        let expected = self.ground.len();
        if water.len() != expected {
            return Err(TerrainError::SizeMismatch {
                layer: "water",
                width: self.width,
                height: self.height,
                expected,
                actual: water.len(),
            });
        }
        self.water = Some(water);
        Ok(self)
    }

    #[inline]
    fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
        {
            Some(tile.y as usize * self.width as usize + tile.x as usize)
        } else {
            None
        }
    }

    /// Whether `tile` lies on the map.
    #[inline]
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.index(tile).is_some()
    }

    /// Row-major index of `tile`, if on the map.
    #[inline]
    pub fn tile_index(&self, tile: TileCoord) -> Option<u32> {
        self.index(tile).map(|idx| idx as u32)
    }

    /// Ground height of a tile.
    pub fn ground_height(&self, tile: TileCoord) -> Option<i32> {
        self.index(tile).map(|idx| self.ground[idx])
    }

    /// Highest surface of a tile: ground or water, whichever is higher.
    pub fn tile_height(&self, tile: TileCoord) -> Option<i32> {
        let idx = self.index(tile)?;
        let ground = self.ground[idx];
        Some(match &self.water {
            Some(water) => ground.max(water[idx]),
            None => ground,
        })
    }

    /// Set the ground height of a tile. Returns false off the map.
    pub fn set_ground_height(&mut self, tile: TileCoord, elevation: i32) -> bool {
        match self.index(tile) {
            Some(idx) => {
                self.ground[idx] = elevation;
                true
            }
            None => false,
        }
    }

    /// Surface height of the tile clamped onto the map.
    fn clamped_height(&self, tile: TileCoord) -> i32 {
        let x = tile.x.clamp(0, self.width as i32 - 1);
        let y = tile.y.clamp(0, self.height as i32 - 1);
        self.tile_height(IVec2::new(x, y)).unwrap_or(0)
    }

    /// Surface height at a world-space point, bilinearly interpolated between
    /// tile centres. Points off the map use the nearest edge tile.
    pub fn height_at(&self, world: IVec2) -> i32 {
        let half = TILE_UNITS / 2;
        let fx = world.x - half;
        let fy = world.y - half;
        let tx = fx >> TILE_SHIFT;
        let ty = fy >> TILE_SHIFT;
        let rx = (fx & (TILE_UNITS - 1)) as i64;
        let ry = (fy & (TILE_UNITS - 1)) as i64;
        let unit = TILE_UNITS as i64;

        let h00 = self.clamped_height(IVec2::new(tx, ty)) as i64;
        let h10 = self.clamped_height(IVec2::new(tx + 1, ty)) as i64;
        let h01 = self.clamped_height(IVec2::new(tx, ty + 1)) as i64;
        let h11 = self.clamped_height(IVec2::new(tx + 1, ty + 1)) as i64;

        let bottom = h00 * (unit - rx) + h10 * rx;
        let top = h01 * (unit - rx) + h11 * rx;
        let value = bottom * (unit - ry) + top * ry;
        value.div_euclid(unit * unit) as i32
    }

    /// Number of tiles on the map.
    pub fn tile_count(&self) -> usize {
        self.ground.len()
    }
}
