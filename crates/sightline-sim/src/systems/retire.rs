//! Retire system: reverses and removes objects marked for despawn.

use hecs::{Entity, World};

use sightline_core::components::{BlocksFire, WatchedTiles};
use sightline_core::types::Position;

use crate::ledger::TileLedger;
use crate::occupancy::{footprint_of, StructureOccupancy};

/// Marks an object whose removal is pending until the next tick.
#[derive(Debug, Clone, Copy)]
pub struct Retired;

/// Unreveal every retired object, release its structure tiles, then despawn it.
/// Uses a pre-allocated buffer to avoid per-tick allocation.
pub fn run(
    world: &mut World,
    ledger: &mut TileLedger,
    occupancy: &mut StructureOccupancy,
    despawn_buffer: &mut Vec<Entity>,
) {
    despawn_buffer.clear();
    despawn_buffer.extend(world.query_mut::<&Retired>().into_iter().map(|(e, _)| e));
    despawn_buffer.sort_by_key(|e| e.to_bits());

    for &entity in despawn_buffer.iter() {
        if let Ok(mut watched) = world.get::<&mut WatchedTiles>(entity) {
            ledger.unreveal_from(&mut watched);
        }
        if world.get::<&BlocksFire>(entity).is_ok() {
            let footprint = footprint_of(world, entity);
            if let Ok(pos) = world.get::<&Position>(entity) {
                occupancy.vacate(pos.tile(), footprint, entity.to_bits().get());
            }
        }
    }

    if !despawn_buffer.is_empty() {
        tracing::debug!(
            target: "sightline::retire",
            count = despawn_buffer.len(),
            "objects.retired"
        );
    }
    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
}
