//! Vision pass: turns sensors into this tick's visibility targets.
//!
//! Three sources raise targets, in order:
//! 1. direct sight: a ray cast from every vision sensor to each object in range
//!    grants full visibility;
//! 2. sensor-tile blips: an object on a tile a player currently sees through
//!    the ledger gets at least the blip level;
//! 3. radar detectors: enemy radar emitters within a detector's radius get the
//!    blip level.

use hecs::{Entity, World};

use sightline_core::components::{Owner, RadarDetector, Sensor, Silhouette};
use sightline_core::config::VisibilityConfig;
use sightline_core::constants::VIS_FULL;
use sightline_core::enums::SensorClass;
use sightline_core::player::{Alliances, PlayerId};
use sightline_core::types::Position;
use sightline_terrain::{has_line_of_sight, RayEnd, TerrainGrid};

use crate::ledger::TileLedger;
use crate::levels::VisibilityLevels;
use crate::occupancy::StructureOccupancy;
use crate::spatial::{Filter, PointTree};

/// Read-only inputs shared by the vision pass.
pub struct VisionInputs<'a, A: Alliances> {
    pub grid: &'a TerrainGrid,
    pub occupancy: &'a StructureOccupancy,
    pub ledger: &'a TileLedger,
    pub alliances: &'a A,
    pub config: &'a VisibilityConfig,
}

struct Eye {
    entity: Entity,
    pos: Position,
    owner: PlayerId,
    silhouette: i32,
    radius: i32,
}

fn ray_end(world: &World, entity: Entity) -> Option<RayEnd> {
    let pos = *world.get::<&Position>(entity).ok()?;
    let silhouette = world.get::<&Silhouette>(entity).map_or(0, |s| s.0);
    Some(RayEnd::new(pos, silhouette).with_id(entity.to_bits().get()))
}

pub fn run<A: Alliances>(
    world: &mut World,
    index: &mut PointTree<Entity>,
    unseen: &mut [Filter],
    inputs: &VisionInputs<'_, A>,
) {
    direct_sight(world, index, unseen, inputs);
    sensor_blips(world, inputs);
    radar_blips(world, index, inputs);
}

fn direct_sight<A: Alliances>(
    world: &mut World,
    index: &mut PointTree<Entity>,
    unseen: &mut [Filter],
    inputs: &VisionInputs<'_, A>,
) {
    let mut eyes: Vec<Eye> = world
        .query::<(&Position, &Owner, &Silhouette, &Sensor)>()
        .iter()
        .filter(|(_, (_, _, _, sensor))| sensor.class == SensorClass::Vision)
        .map(|(entity, (pos, owner, silhouette, sensor))| Eye {
            entity,
            pos: *pos,
            owner: owner.0,
            silhouette: silhouette.0,
            radius: sensor.radius,
        })
        .collect();
    eyes.sort_by_key(|eye| eye.entity.to_bits());

    let mut candidates: Vec<Entity> = Vec::new();
    let mut rays = 0usize;
    for eye in &eyes {
        let Some(filter) = eye.owner.index().and_then(|idx| unseen.get_mut(idx)) else {
            continue;
        };
        let viewer = eye.owner;
        candidates.clear();
        {
            let world_ref: &World = world;
            let keep = |entity: Entity| {
                let foreign = world_ref
                    .get::<&Owner>(entity)
                    .is_ok_and(|o| !inputs.alliances.shares_vision(viewer, o.0));
                let pending = world_ref
                    .get::<&VisibilityLevels>(entity)
                    .is_ok_and(|l| l.target(viewer) < VIS_FULL);
                foreign && pending
            };
            candidates.extend_from_slice(index.query_filtered(
                filter,
                eye.pos.x,
                eye.pos.y,
                eye.radius,
                keep,
            ));
        }

        let from = RayEnd::new(eye.pos, eye.silhouette).with_id(eye.entity.to_bits().get());
        for &target in &candidates {
            let Some(to) = ray_end(world, target) else {
                continue;
            };
            rays += 1;
            let clear = has_line_of_sight(
                inputs.grid,
                inputs.occupancy,
                &from,
                &to,
                inputs.config.walls_block_sight,
            );
            if clear {
                if let Ok(mut levels) = world.get::<&mut VisibilityLevels>(target) {
                    levels.grant(viewer, VIS_FULL, inputs.alliances);
                }
            }
        }
    }
    tracing::trace!(target: "sightline::vision", eyes = eyes.len(), rays, "vision.direct");
}

fn sensor_blips<A: Alliances>(world: &mut World, inputs: &VisionInputs<'_, A>) {
    let blip = inputs.config.blip_level;
    for (_entity, (levels, pos, owner)) in
        world.query_mut::<(&mut VisibilityLevels, &Position, &Owner)>()
    {
        let own_side = inputs.alliances.vision_mask(owner.0);
        let tile = pos.tile();
        for player in PlayerId::all() {
            if own_side & player.mask() != 0 || levels.target(player) >= blip {
                continue;
            }
            if inputs.ledger.is_visible(player, tile, inputs.alliances) {
                levels.grant(player, blip, inputs.alliances);
            }
        }
    }
}

fn radar_blips<A: Alliances>(
    world: &mut World,
    index: &mut PointTree<Entity>,
    inputs: &VisionInputs<'_, A>,
) {
    let mut detectors: Vec<(Entity, Position, PlayerId, i32)> = world
        .query::<(&Position, &Owner, &RadarDetector)>()
        .iter()
        .map(|(entity, (pos, owner, detector))| (entity, *pos, owner.0, detector.radius))
        .collect();
    detectors.sort_by_key(|(entity, ..)| entity.to_bits());

    let blip = inputs.config.blip_level;
    let mut found: Vec<Entity> = Vec::new();
    for (_, pos, player, radius) in detectors {
        found.clear();
        found.extend_from_slice(index.query(pos.x, pos.y, radius));
        for &emitter in &found {
            let is_enemy_radar = world
                .get::<&Sensor>(emitter)
                .is_ok_and(|s| s.class == SensorClass::Radar)
                && world
                    .get::<&Owner>(emitter)
                    .is_ok_and(|o| !inputs.alliances.is_allied(player, o.0));
            if !is_enemy_radar {
                continue;
            }
            if let Ok(mut levels) = world.get::<&mut VisibilityLevels>(emitter) {
                levels.grant(player, blip, inputs.alliances);
            }
        }
    }
}
