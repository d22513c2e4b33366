//! Tiles covered by fire-blocking structures, consumed by the ray caster.

use std::collections::HashMap;

use hecs::{Entity, World};

use sightline_core::components::{footprint_tiles, Footprint};
use sightline_core::types::TileCoord;
use sightline_terrain::{Blocker, TileBlockers};

#[derive(Debug, Clone, Default)]
pub struct StructureOccupancy {
    tiles: HashMap<TileCoord, Blocker>,
}

impl StructureOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cover the footprint around `center` with `blocker`.
    pub fn occupy(&mut self, center: TileCoord, footprint: Footprint, blocker: Blocker) {
        for tile in footprint_tiles(center, footprint) {
            self.tiles.insert(tile, blocker);
        }
    }

    /// Clear the footprint around `center`, leaving tiles held by other structures.
    pub fn vacate(&mut self, center: TileCoord, footprint: Footprint, id: u64) {
        for tile in footprint_tiles(center, footprint) {
            if self.tiles.get(&tile).is_some_and(|b| b.id == id) {
                self.tiles.remove(&tile);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Tiles an object covers; a single tile when it declares no footprint.
pub fn footprint_of(world: &World, entity: Entity) -> Footprint {
    world
        .get::<&Footprint>(entity)
        .map_or(Footprint::SINGLE, |f| *f)
}

impl TileBlockers for StructureOccupancy {
    fn blocker_at(&self, tile: TileCoord) -> Option<Blocker> {
        self.tiles.get(&tile).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use sightline_core::components::BlocksFire;

    #[test]
    fn test_occupy_and_vacate() {
        let mut occupancy = StructureOccupancy::new();
        let wall = Footprint {
            width: 3,
            breadth: 1,
        };
        occupancy.occupy(IVec2::new(5, 5), wall, Blocker { id: 1, top: 200 });
        assert_eq!(occupancy.len(), 3);
        assert_eq!(
            occupancy.blocker_at(IVec2::new(4, 5)),
            Some(Blocker { id: 1, top: 200 })
        );

        // A second structure overlapping one tile keeps it after the first leaves.
        occupancy.occupy(
            IVec2::new(6, 5),
            Footprint {
                width: 1,
                breadth: 1,
            },
            Blocker { id: 2, top: 90 },
        );
        occupancy.vacate(IVec2::new(5, 5), wall, 1);
        assert_eq!(occupancy.len(), 1);
        assert_eq!(occupancy.blocker_at(IVec2::new(6, 5)).map(|b| b.id), Some(2));
        assert!(occupancy.blocker_at(IVec2::new(5, 5)).is_none());
    }

    #[test]
    fn test_missing_footprint_is_single_tile() {
        let mut world = World::new();
        let bare = world.spawn((BlocksFire,));
        let wide = world.spawn((
            BlocksFire,
            Footprint {
                width: 2,
                breadth: 3,
            },
        ));
        let single = footprint_of(&world, bare);
        assert_eq!((single.width, single.breadth), (1, 1));
        let wide = footprint_of(&world, wide);
        assert_eq!((wide.width, wide.breadth), (2, 3));
    }
}
