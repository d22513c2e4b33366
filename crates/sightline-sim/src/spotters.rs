//! Spotters: visibility sources that are not simulation objects.
//!
//! A spotter reveals an area for one player, like a sensor standing on the
//! ground, until it is removed or its expiry tick arrives. Removal reverses
//! exactly what the spotter added to the ledger.

use std::collections::BTreeMap;

use sightline_core::commands::SpotterSpec;
use sightline_core::components::{Sensor, WatchedTiles};
use sightline_core::player::{Alliances, PlayerId};
use sightline_core::types::Position;

use crate::ledger::{RevealContext, TileLedger, Viewer};

pub type SpotterId = u32;

/// A registered spotter and the ledger increments it holds.
#[derive(Debug, Clone)]
pub struct Spotter {
    pub id: SpotterId,
    pub spec: SpotterSpec,
    /// Where the spotter stands; `z` is the terrain height.
    pub pos: Position,
    watched: WatchedTiles,
}

impl Spotter {
    pub fn player(&self) -> PlayerId {
        self.spec.player
    }

    pub fn radius(&self) -> i32 {
        self.spec.radius
    }

    /// Number of ledger increments this spotter holds.
    pub fn watched_len(&self) -> usize {
        self.watched.tiles.len()
    }

    fn expired(&self, now: u64) -> bool {
        self.spec.expiry != 0 && now >= self.spec.expiry
    }
}

/// All live spotters, iterated in id order.
#[derive(Debug, Default)]
pub struct SpotterRegistry {
    spotters: BTreeMap<SpotterId, Spotter>,
    next_id: SpotterId,
}

impl SpotterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spotter and reveal its area immediately.
    pub fn add<A: Alliances>(
        &mut self,
        spec: SpotterSpec,
        ledger: &mut TileLedger,
        ctx: &mut RevealContext<'_, A>,
    ) -> SpotterId {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        while self.spotters.contains_key(&self.next_id) {
            self.next_id = self.next_id.wrapping_add(1).max(1);
        }
        let id = self.next_id;

        let pos = Position::new(
            spec.position.x,
            spec.position.y,
            ctx.grid.height_at(spec.position),
        );
        let viewer = Viewer {
            pos,
            player: spec.player,
            silhouette: 0,
            sensor: Some(Sensor {
                radius: spec.radius,
                class: spec.class,
            }),
            jammer: None,
        };
        let mut watched = WatchedTiles::default();
        ledger.reveal_from(&viewer, ctx, &mut watched);

        tracing::debug!(
            target: "sightline::spotters",
            id,
            player = spec.player.0,
            radius = spec.radius,
            expiry = spec.expiry,
            tiles = watched.tiles.len(),
            "spotter.added"
        );
        self.spotters.insert(
            id,
            Spotter {
                id,
                spec,
                pos,
                watched,
            },
        );
        id
    }

    /// Remove a spotter and reverse its reveal. False for an unknown id.
    pub fn remove(&mut self, id: SpotterId, ledger: &mut TileLedger) -> bool {
        match self.spotters.remove(&id) {
            Some(mut spotter) => {
                ledger.unreveal_from(&mut spotter.watched);
                tracing::debug!(target: "sightline::spotters", id, "spotter.removed");
                true
            }
            None => {
                tracing::warn!(target: "sightline::spotters", id, "spotter.remove.unknown");
                false
            }
        }
    }

    /// Remove every spotter whose expiry tick has arrived.
    /// Returns the removed ids with their players, in id order.
    pub fn sweep(&mut self, now: u64, ledger: &mut TileLedger) -> Vec<(SpotterId, PlayerId)> {
        let expired: Vec<SpotterId> = self
            .spotters
            .values()
            .filter(|s| s.expired(now))
            .map(|s| s.id)
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(mut spotter) = self.spotters.remove(&id) {
                ledger.unreveal_from(&mut spotter.watched);
                removed.push((id, spotter.spec.player));
            }
        }
        if !removed.is_empty() {
            tracing::debug!(
                target: "sightline::spotters",
                tick = now,
                count = removed.len(),
                "spotter.expired"
            );
        }
        removed
    }

    pub fn get(&self, id: SpotterId) -> Option<&Spotter> {
        self.spotters.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spotter> {
        self.spotters.values()
    }

    pub fn len(&self) -> usize {
        self.spotters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spotters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use sightline_core::config::VisibilityConfig;
    use sightline_core::constants::TILE_UNITS;
    use sightline_core::enums::SensorClass;
    use sightline_core::player::AllianceTable;
    use sightline_terrain::{TerrainGrid, WavecastCache};

    fn spec(expiry: u64) -> SpotterSpec {
        SpotterSpec {
            position: IVec2::new(8 * TILE_UNITS + 64, 8 * TILE_UNITS + 64),
            player: PlayerId(1),
            radius: 3 * TILE_UNITS,
            class: SensorClass::Vision,
            expiry,
        }
    }

    struct Fixture {
        grid: TerrainGrid,
        cache: WavecastCache,
        alliances: AllianceTable,
        config: VisibilityConfig,
        ledger: TileLedger,
        registry: SpotterRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grid: TerrainGrid::flat(16, 16, 0),
                cache: WavecastCache::new(),
                alliances: AllianceTable::default(),
                config: VisibilityConfig::default(),
                ledger: TileLedger::new(),
                registry: SpotterRegistry::new(),
            }
        }

        fn add(&mut self, spec: SpotterSpec) -> SpotterId {
            let mut ctx = RevealContext {
                grid: &self.grid,
                cache: &mut self.cache,
                alliances: &self.alliances,
                config: &self.config,
            };
            self.registry.add(spec, &mut self.ledger, &mut ctx)
        }

        fn visible(&self, x: i32, y: i32) -> bool {
            self.ledger
                .is_visible(PlayerId(1), IVec2::new(x, y), &self.alliances)
        }
    }

    #[test]
    fn test_add_reveals_and_remove_reverses() {
        let mut fx = Fixture::new();
        let id = fx.add(spec(0));
        assert!(fx.visible(8, 8));
        assert!(fx.visible(11, 8));
        assert!(!fx.visible(12, 8));
        assert_eq!(fx.registry.get(id).unwrap().watched_len(), 29);

        assert!(fx.registry.remove(id, &mut fx.ledger));
        assert!(!fx.visible(8, 8));
        // Exploration outlives the spotter.
        assert!(fx.ledger.is_explored(PlayerId(1), IVec2::new(8, 8)));
        assert!(!fx.registry.remove(id, &mut fx.ledger));
    }

    #[test]
    fn test_sweep_honours_expiry() {
        let mut fx = Fixture::new();
        let forever = fx.add(spec(0));
        let timed = fx.add(spec(100));
        assert_ne!(forever, timed);

        assert!(fx.registry.sweep(99, &mut fx.ledger).is_empty());
        assert_eq!(fx.registry.len(), 2);

        let removed = fx.registry.sweep(100, &mut fx.ledger);
        assert_eq!(removed, vec![(timed, PlayerId(1))]);
        assert_eq!(fx.registry.len(), 1);
        // The permanent spotter still holds its tiles.
        assert!(fx.visible(8, 8));
        assert_eq!(fx.ledger.record(IVec2::new(8, 8)).unwrap().watchers[1], 1);
    }

    #[test]
    fn test_iteration_in_id_order() {
        let mut fx = Fixture::new();
        let ids: Vec<_> = (0..4).map(|_| fx.add(spec(0))).collect();
        let seen: Vec<_> = fx.registry.iter().map(|s| s.id).collect();
        assert_eq!(seen, ids);
    }
}
