//! Visibility engine: the per-tick fog-of-war pipeline.
//!
//! `VisibilityEngine` owns the hecs ECS world of observable objects, the tile
//! ledger, the spotter registry, the point index and the wavecast cache. It
//! applies lifecycle calls between ticks and runs every system in a fixed
//! order inside `tick()`, producing a `VisibilitySnapshot`. Completely
//! headless and deterministic.

use std::sync::Arc;

use glam::IVec2;
use hecs::{Entity, EntityBuilder, World};

use sightline_core::commands::{ObjectSpec, SpotterSpec};
use sightline_core::components::*;
use sightline_core::config::VisibilityConfig;
use sightline_core::constants::MAX_PLAYERS;
use sightline_core::events::VisibilityEvent;
use sightline_core::player::{AllianceTable, PlayerId};
use sightline_core::state::VisibilitySnapshot;
use sightline_core::types::{Position, SimTime, TileCoord};
use sightline_terrain::{
    indirect_launch_angle, line_of_fire, Blocker, RayEnd, TerrainGrid, WavecastCache,
};

use crate::ledger::{RevealContext, TileLedger};
use crate::levels::VisibilityLevels;
use crate::occupancy::{footprint_of, StructureOccupancy};
use crate::spatial::{Filter, PointTree};
use crate::spotters::{SpotterId, SpotterRegistry};
use crate::systems;
use crate::systems::retire::Retired;
use crate::systems::vision::VisionInputs;

/// Configuration for starting a new visibility engine.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub visibility: Arc<VisibilityConfig>,
    /// Initial alliance state. Mutable later through `alliances_mut`.
    pub alliances: AllianceTable,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            visibility: VisibilityConfig::builtin(),
            alliances: AllianceTable::default(),
        }
    }
}

/// The visibility engine. Owns the ECS world and all visibility state.
pub struct VisibilityEngine {
    world: World,
    time: SimTime,
    grid: TerrainGrid,
    config: Arc<VisibilityConfig>,
    alliances: AllianceTable,
    cache: WavecastCache,
    ledger: TileLedger,
    spotters: SpotterRegistry,
    index: PointTree<Entity>,
    /// Per player: objects not yet fully seen this tick.
    unseen: Vec<Filter>,
    occupancy: StructureOccupancy,
    despawn_buffer: Vec<Entity>,
    events: Vec<VisibilityEvent>,
}

impl VisibilityEngine {
    /// Create a new engine over `grid` with the given config.
    pub fn new(grid: TerrainGrid, config: SimConfig) -> Self {
        tracing::info!(
            target: "sightline::engine",
            width = grid.width,
            height = grid.height,
            "engine.created"
        );
        Self {
            world: World::new(),
            time: SimTime::default(),
            grid,
            config: config.visibility,
            alliances: config.alliances,
            cache: WavecastCache::new(),
            ledger: TileLedger::new(),
            spotters: SpotterRegistry::new(),
            index: PointTree::new(),
            unseen: vec![Filter::new(); MAX_PLAYERS],
            occupancy: StructureOccupancy::new(),
            despawn_buffer: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Register an object. Its sensors take effect at the next tick.
    pub fn spawn(&mut self, spec: ObjectSpec) -> Entity {
        if spec.owner.index().is_none() {
            tracing::warn!(
                target: "sightline::engine",
                owner = spec.owner.0,
                "spawn.invalid_owner"
            );
        }
        let pos = self.ground_position(spec.position, spec.elevation);

        let mut builder = EntityBuilder::new();
        builder
            .add(pos)
            .add(Owner(spec.owner))
            .add(Kind(spec.kind))
            .add(Silhouette(spec.silhouette))
            .add(Elevation(spec.elevation))
            .add(WatchedTiles::default())
            .add(VisibilityLevels::default())
            .add(RevealDirty);
        if let Some(footprint) = spec.footprint {
            builder.add(footprint);
        }
        if let Some(sensor) = spec.sensor {
            builder.add(sensor);
        }
        if let Some(jammer) = spec.jammer {
            builder.add(jammer);
        }
        if let Some(detector) = spec.radar_detector {
            builder.add(detector);
        }
        if spec.blocks_fire {
            builder.add(BlocksFire);
        }
        let entity = self.world.spawn(builder.build());

        if spec.blocks_fire {
            let footprint = footprint_of(&self.world, entity);
            self.occupancy.occupy(
                pos.tile(),
                footprint,
                Blocker {
                    id: entity.to_bits().get(),
                    top: pos.z + spec.silhouette,
                },
            );
        }
        tracing::debug!(
            target: "sightline::engine",
            id = entity.to_bits().get(),
            owner = spec.owner.0,
            kind = ?spec.kind,
            "object.spawned"
        );
        entity
    }

    /// Move an object. Its reveal is refreshed at the next tick.
    pub fn move_object(&mut self, entity: Entity, position: IVec2) -> bool {
        if !self.is_live(entity) {
            return self.unknown(entity, "move");
        }
        let elevation = self.world.get::<&Elevation>(entity).map_or(0, |e| e.0);
        let new_pos = self.ground_position(position, elevation);
        let old_pos = match self.world.get::<&mut Position>(entity) {
            Ok(mut pos) => std::mem::replace(&mut *pos, new_pos),
            Err(_) => return self.unknown(entity, "move"),
        };

        if self.world.get::<&BlocksFire>(entity).is_ok() {
            let footprint = footprint_of(&self.world, entity);
            let silhouette = self.world.get::<&Silhouette>(entity).map_or(0, |s| s.0);
            let id = entity.to_bits().get();
            self.occupancy.vacate(old_pos.tile(), footprint, id);
            self.occupancy.occupy(
                new_pos.tile(),
                footprint,
                Blocker {
                    id,
                    top: new_pos.z + silhouette,
                },
            );
        }
        self.mark_dirty(entity)
    }

    /// Replace or remove an object's sensor. Takes effect at the next tick.
    pub fn set_sensor(&mut self, entity: Entity, sensor: Option<Sensor>) -> bool {
        if !self.is_live(entity) {
            return self.unknown(entity, "set_sensor");
        }
        let updated = match sensor {
            Some(sensor) => self.world.insert_one(entity, sensor).is_ok(),
            None => {
                let _ = self.world.remove_one::<Sensor>(entity);
                true
            }
        };
        updated && self.mark_dirty(entity)
    }

    /// Schedule an object for removal. Its reveal is reversed at the next
    /// tick, before the handle becomes invalid.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_live(entity) {
            return self.unknown(entity, "despawn");
        }
        self.world.insert_one(entity, Retired).is_ok()
    }

    /// Register a spotter. Its area is revealed immediately.
    pub fn add_spotter(&mut self, spec: SpotterSpec) -> SpotterId {
        let mut ctx = RevealContext {
            grid: &self.grid,
            cache: &mut self.cache,
            alliances: &self.alliances,
            config: self.config.as_ref(),
        };
        self.spotters.add(spec, &mut self.ledger, &mut ctx)
    }

    /// Remove a spotter and reverse its reveal. False for an unknown id.
    pub fn remove_spotter(&mut self, id: SpotterId) -> bool {
        self.spotters.remove(id, &mut self.ledger)
    }

    /// Show an object to `player` (and its vision sharers) at `level` at
    /// once, without the fade-in ramp.
    pub fn reveal_instantly(&mut self, entity: Entity, player: PlayerId, level: u8) -> bool {
        match self.world.get::<&mut VisibilityLevels>(entity) {
            Ok(mut levels) => {
                levels.set_instant(player, level, &self.alliances);
                true
            }
            Err(_) => self.unknown(entity, "reveal_instantly"),
        }
    }

    /// Advance the pipeline by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> VisibilitySnapshot {
        let span = tracing::debug_span!(target: "sightline::engine", "tick", tick = self.time.tick);
        let _guard = span.enter();

        systems::retire::run(
            &mut self.world,
            &mut self.ledger,
            &mut self.occupancy,
            &mut self.despawn_buffer,
        );
        systems::index::rebuild(&self.world, &mut self.index, &mut self.unseen);

        systems::fade::begin_tick(&mut self.world);
        systems::spotter_sweep::run(
            &mut self.world,
            &mut self.spotters,
            &mut self.ledger,
            &mut self.index,
            &self.alliances,
            self.time.tick,
            &mut self.events,
        );

        let revealed = {
            let mut ctx = RevealContext {
                grid: &self.grid,
                cache: &mut self.cache,
                alliances: &self.alliances,
                config: self.config.as_ref(),
            };
            systems::reveal::run(&mut self.world, &mut self.ledger, &mut ctx)
        };

        let inputs = VisionInputs {
            grid: &self.grid,
            occupancy: &self.occupancy,
            ledger: &self.ledger,
            alliances: &self.alliances,
            config: self.config.as_ref(),
        };
        systems::vision::run(&mut self.world, &mut self.index, &mut self.unseen, &inputs);

        systems::fade::run(
            &mut self.world,
            &mut self.ledger,
            &self.alliances,
            self.config.fade,
            &mut self.events,
        );

        self.time.advance();

        let events = std::mem::take(&mut self.events);
        tracing::info!(
            target: "sightline::engine",
            tick = self.time.tick,
            objects = self.index.len(),
            revealed,
            spotters = self.spotters.len(),
            events = events.len(),
            "tick.complete"
        );
        systems::snapshot::build_snapshot(
            &self.world,
            &self.time,
            &self.ledger,
            &self.alliances,
            self.spotters.len(),
            events,
        )
    }

    /// Displayed visibility of `entity` for `player`; 0 when unknown.
    pub fn visibility_level(&self, entity: Entity, player: PlayerId) -> u8 {
        if player.index().is_none() {
            tracing::warn!(
                target: "sightline::engine",
                player = player.0,
                "visibility_level.invalid_player"
            );
            return 0;
        }
        self.world
            .get::<&VisibilityLevels>(entity)
            .map_or(0, |levels| levels.shown(player))
    }

    pub fn is_tile_visible(&self, player: PlayerId, tile: TileCoord) -> bool {
        self.ledger.is_visible(player, tile, &self.alliances)
    }

    pub fn is_tile_explored(&self, player: PlayerId, tile: TileCoord) -> bool {
        self.ledger.is_explored(player, tile)
    }

    /// Direct-fire clearance from `shooter` to `target`. `None` for unknown handles.
    pub fn line_of_fire(&self, shooter: Entity, target: Entity, walls_block: bool) -> Option<i32> {
        let (from, to) = (self.ray_end(shooter)?, self.ray_end(target)?);
        Some(line_of_fire(
            &self.grid,
            &self.occupancy,
            &from,
            &to,
            walls_block,
        ))
    }

    /// Indirect-fire launch angle from `shooter` to `target`. `None` for unknown handles.
    pub fn indirect_launch_angle(
        &self,
        shooter: Entity,
        target: Entity,
        walls_block: bool,
    ) -> Option<i32> {
        let (from, to) = (self.ray_end(shooter)?, self.ray_end(target)?);
        Some(indirect_launch_angle(
            &self.grid,
            &self.occupancy,
            &from,
            &to,
            walls_block,
        ))
    }

    /// Mutable alliance state. Changes apply from the next grant or reveal.
    pub fn alliances_mut(&mut self) -> &mut AllianceTable {
        &mut self.alliances
    }

    pub fn alliances(&self) -> &AllianceTable {
        &self.alliances
    }

    /// Get the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn ledger(&self) -> &TileLedger {
        &self.ledger
    }

    pub fn spotters(&self) -> &SpotterRegistry {
        &self.spotters
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    fn ground_position(&self, position: IVec2, elevation: i32) -> Position {
        Position::new(
            position.x,
            position.y,
            self.grid.height_at(position) + elevation,
        )
    }

    fn ray_end(&self, entity: Entity) -> Option<RayEnd> {
        let pos = *self.world.get::<&Position>(entity).ok()?;
        let silhouette = self.world.get::<&Silhouette>(entity).map_or(0, |s| s.0);
        Some(RayEnd::new(pos, silhouette).with_id(entity.to_bits().get()))
    }

    fn is_live(&self, entity: Entity) -> bool {
        self.world.contains(entity) && self.world.get::<&Retired>(entity).is_err()
    }

    fn mark_dirty(&mut self, entity: Entity) -> bool {
        self.world.insert_one(entity, RevealDirty).is_ok()
    }

    fn unknown(&self, entity: Entity, operation: &'static str) -> bool {
        tracing::warn!(
            target: "sightline::engine",
            id = entity.to_bits().get(),
            operation,
            "object.unknown"
        );
        false
    }
}
