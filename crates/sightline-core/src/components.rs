//! ECS components for hecs entities.
//!
//! Components are plain data structs with no methods.
//! Game logic lives in systems, not components.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::player::PlayerId;
use crate::types::TileCoord;

/// Player that owns the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner(pub PlayerId);

/// Category of the object (decides whether its visibility fades).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Kind(pub ObjectKind);

/// Silhouette height above the object's base (world units).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Silhouette(pub i32);

/// Tiles covered by the object, centred on its position tile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Footprint {
    pub width: i32,
    pub breadth: i32,
}

impl Footprint {
    /// Footprint of an object that declares none.
    pub const SINGLE: Footprint = Footprint {
        width: 1,
        breadth: 1,
    };
}

/// Elevation above terrain (world units). Zero for ground objects.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Elevation(pub i32);

/// Sensor fitted to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    /// Range in world units.
    pub radius: i32,
    pub class: SensorClass,
}

/// Jamming field projected by the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jammer {
    /// Range in world units.
    pub radius: i32,
}

/// Detects enemy radar emitters in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadarDetector {
    /// Range in world units.
    pub radius: i32,
}

/// Marks a structure that blocks line of fire across its footprint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlocksFire;

/// One ledger increment made by a reveal, kept so it can be reversed exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedTile {
    pub tile: TileCoord,
    pub player: PlayerId,
    pub kind: Contribution,
}

/// Every ledger increment currently held by one visibility source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchedTiles {
    pub tiles: Vec<WatchedTile>,
}

/// Set when the object's reveal is stale (spawned, moved, or re-sensored).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RevealDirty;

/// Tiles covered by `footprint` when centred on `center`.
pub fn footprint_tiles(center: TileCoord, footprint: Footprint) -> impl Iterator<Item = TileCoord> {
    let origin = center - IVec2::new((footprint.width - 1) / 2, (footprint.breadth - 1) / 2);
    (0..footprint.breadth.max(1))
        .flat_map(move |dy| (0..footprint.width.max(1)).map(move |dx| origin + IVec2::new(dx, dy)))
}
