//! Tile visibility ledger: per-tile, per-player counters of who sees what.
//!
//! Every viewer reveals a set of tiles by shadow casting over its wavecast
//! table and remembers exactly which counters it incremented in its
//! [`WatchedTiles`]. Unrevealing walks that list and decrements the same
//! counters, so counts never drift no matter how often objects move.

use std::collections::HashMap;

use sightline_core::components::{Jammer, Sensor, WatchedTile, WatchedTiles};
use sightline_core::config::VisibilityConfig;
use sightline_core::constants::{MAX_PLAYERS, TILE_UNITS};
use sightline_core::enums::{Contribution, SensorClass};
use sightline_core::player::{Alliances, PlayerId, PlayerMask};
use sightline_core::types::{Position, TileCoord};
use sightline_terrain::{Horizon, RationalAngle, TerrainGrid, WavecastCache};

/// Counters for one tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileRecord {
    pub watchers: [u16; MAX_PLAYERS],
    pub sensors: [u16; MAX_PLAYERS],
    pub jammers: [u16; MAX_PLAYERS],
    /// Players with at least one jammer on this tile.
    pub jammer_bits: PlayerMask,
    /// Players that have ever explored this tile. Never cleared.
    pub explored: PlayerMask,
}

impl TileRecord {
    fn is_idle(&self) -> bool {
        self.explored == 0
            && self.jammer_bits == 0
            && self.watchers.iter().all(|&c| c == 0)
            && self.sensors.iter().all(|&c| c == 0)
    }
}

/// A source of vision, as the ledger sees it.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    /// Base position; `z` is the absolute height of the viewer's base.
    pub pos: Position,
    pub player: PlayerId,
    /// Height of the viewer above its base.
    pub silhouette: i32,
    pub sensor: Option<Sensor>,
    pub jammer: Option<Jammer>,
}

/// Shared inputs for a reveal.
pub struct RevealContext<'a, A: Alliances> {
    pub grid: &'a TerrainGrid,
    pub cache: &'a mut WavecastCache,
    pub alliances: &'a A,
    pub config: &'a VisibilityConfig,
}

/// Per-tile visibility counters for every player.
#[derive(Debug, Clone, Default)]
pub struct TileLedger {
    records: HashMap<TileCoord, TileRecord>,
}

fn increment(counter: &mut u16, tile: TileCoord) {
    debug_assert!(*counter < u16::MAX, "ledger counter overflow at tile {tile}");
    *counter = counter.saturating_add(1);
}

fn decrement(counter: &mut u16, tile: TileCoord) {
    debug_assert!(*counter > 0, "ledger counter underflow at tile {tile}");
    *counter = counter.saturating_sub(1);
}

impl TileLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of `tile`, if anything ever touched it.
    pub fn record(&self, tile: TileCoord) -> Option<&TileRecord> {
        self.records.get(&tile)
    }

    /// Number of tiles with a live record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Shadow-cast from `viewer` and increment every tile it can see.
    /// Each increment is appended to `watched` so it can be reversed.
    pub fn reveal_from<A: Alliances>(
        &mut self,
        viewer: &Viewer,
        ctx: &mut RevealContext<'_, A>,
        watched: &mut WatchedTiles,
    ) {
        let Some(player_idx) = viewer.player.index() else {
            tracing::warn!(
                target: "sightline::ledger",
                player = viewer.player.0,
                "ledger.reveal.invalid_player"
            );
            return;
        };
        let before = watched.tiles.len();

        if let Some(sensor) = viewer.sensor {
            self.cast(viewer, sensor, player_idx, ctx, watched);
        }
        if let Some(jammer) = viewer.jammer {
            self.jam(viewer, jammer, player_idx, ctx, watched);
        }

        tracing::trace!(
            target: "sightline::ledger",
            player = viewer.player.0,
            tiles = watched.tiles.len() - before,
            "ledger.reveal"
        );
    }

    fn cast<A: Alliances>(
        &mut self,
        viewer: &Viewer,
        sensor: Sensor,
        player_idx: usize,
        ctx: &mut RevealContext<'_, A>,
        watched: &mut WatchedTiles,
    ) {
        let table = ctx.cache.table(sensor.radius);
        let origin = viewer.pos.tile();
        let min_vis = ctx.config.min_vis_height as i64;
        let eye = viewer.pos.z as i64 + min_vis.max(viewer.silhouette as i64);
        let explore = ctx.alliances.exploration_mask(viewer.player);
        let watcher_range_sq = ctx.config.watcher_range_sq();
        let unit_sq = TILE_UNITS as i64 * TILE_UNITS as i64;
        let occluded = sensor.class == SensorClass::Vision;

        let mut horizon = Horizon::new();
        let mut pending: Vec<(RationalAngle, RationalAngle, i64)> = Vec::new();

        for ring in table.rings() {
            for cell in ring {
                let tile = origin + TileCoord::new(cell.dx, cell.dy);
                let Some(height) = ctx.grid.tile_height(tile) else {
                    continue;
                };

                let seen = if cell.is_origin() || !occluded {
                    true
                } else {
                    let rise = height as i64 - eye;
                    let leeway = (rise + min_vis) * cell.inv_radius;
                    pending.push((cell.begin, cell.end, rise * cell.inv_radius));
                    leeway >= horizon.lowest(cell.begin, cell.end)
                };
                if !seen {
                    continue;
                }

                let kind = if occluded && cell.dist_sq as i64 * unit_sq <= watcher_range_sq {
                    Contribution::Watcher
                } else {
                    Contribution::Sensor
                };
                let record = self.records.entry(tile).or_default();
                record.explored |= explore;
                match kind {
                    Contribution::Watcher => increment(&mut record.watchers[player_idx], tile),
                    _ => increment(&mut record.sensors[player_idx], tile),
                }
                watched.tiles.push(WatchedTile {
                    tile,
                    player: viewer.player,
                    kind,
                });
            }
            // A ring only shadows rings farther out.
            for (begin, end, height) in pending.drain(..) {
                horizon.raise(begin, end, height);
            }
        }
    }

    fn jam<A: Alliances>(
        &mut self,
        viewer: &Viewer,
        jammer: Jammer,
        player_idx: usize,
        ctx: &mut RevealContext<'_, A>,
        watched: &mut WatchedTiles,
    ) {
        let table = ctx.cache.table(jammer.radius);
        let origin = viewer.pos.tile();
        for cell in table.tiles() {
            let tile = origin + TileCoord::new(cell.dx, cell.dy);
            if !ctx.grid.contains(tile) {
                continue;
            }
            let record = self.records.entry(tile).or_default();
            increment(&mut record.jammers[player_idx], tile);
            record.jammer_bits |= viewer.player.mask();
            watched.tiles.push(WatchedTile {
                tile,
                player: viewer.player,
                kind: Contribution::Jammer,
            });
        }
    }

    /// Reverse every increment listed in `watched` and empty it.
    pub fn unreveal_from(&mut self, watched: &mut WatchedTiles) {
        for entry in watched.tiles.drain(..) {
            let Some(idx) = entry.player.index() else {
                continue;
            };
            let Some(record) = self.records.get_mut(&entry.tile) else {
                debug_assert!(false, "unreveal of untouched tile {}", entry.tile);
                continue;
            };
            match entry.kind {
                Contribution::Watcher => decrement(&mut record.watchers[idx], entry.tile),
                Contribution::Sensor => decrement(&mut record.sensors[idx], entry.tile),
                Contribution::Jammer => {
                    decrement(&mut record.jammers[idx], entry.tile);
                    if record.jammers[idx] == 0 {
                        record.jammer_bits &= !entry.player.mask();
                    }
                }
            }
            if record.is_idle() {
                self.records.remove(&entry.tile);
            }
        }
    }

    /// Whether `player` currently sees `tile`: watched, or sensed and not
    /// jammed by anyone outside the player's alliance.
    pub fn is_visible(&self, player: PlayerId, tile: TileCoord, alliances: &impl Alliances) -> bool {
        let Some(idx) = player.index() else {
            return false;
        };
        let Some(record) = self.records.get(&tile) else {
            return false;
        };
        if record.watchers[idx] > 0 {
            return true;
        }
        record.sensors[idx] > 0 && !Self::jammed_for(record, player, alliances)
    }

    fn jammed_for(record: &TileRecord, player: PlayerId, alliances: &impl Alliances) -> bool {
        PlayerId::all()
            .filter(|q| record.jammer_bits & q.mask() != 0)
            .any(|q| !alliances.is_allied(player, q))
    }

    /// Whether `player` has ever explored `tile`.
    pub fn is_explored(&self, player: PlayerId, tile: TileCoord) -> bool {
        self.records
            .get(&tile)
            .is_some_and(|record| record.explored & player.mask() != 0)
    }

    /// Mark `tile` explored for every player in `mask`.
    pub fn mark_explored(&mut self, mask: PlayerMask, tile: TileCoord) {
        if mask != 0 {
            self.records.entry(tile).or_default().explored |= mask;
        }
    }

    /// Number of tiles `player` has explored.
    pub fn explored_count(&self, player: PlayerId) -> usize {
        let mask = player.mask();
        if mask == 0 {
            return 0;
        }
        self.records.values().filter(|r| r.explored & mask != 0).count()
    }

    /// Number of tiles `player` currently sees.
    pub fn visible_count(&self, player: PlayerId, alliances: &impl Alliances) -> usize {
        self.records
            .keys()
            .filter(|tile| self.is_visible(player, **tile, alliances))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use sightline_core::player::AllianceTable;
    use sightline_core::types::tile_center;

    fn viewer_at(tile: (i32, i32), player: u8, sensor: Option<Sensor>) -> Viewer {
        let c = tile_center(IVec2::new(tile.0, tile.1));
        Viewer {
            pos: Position::new(c.x, c.y, 0),
            player: PlayerId(player),
            silhouette: 64,
            sensor,
            jammer: None,
        }
    }

    fn vision(tiles: i32) -> Option<Sensor> {
        Some(Sensor {
            radius: tiles * TILE_UNITS,
            class: SensorClass::Vision,
        })
    }

    struct Fixture {
        grid: TerrainGrid,
        cache: WavecastCache,
        alliances: AllianceTable,
        config: VisibilityConfig,
    }

    impl Fixture {
        fn new(grid: TerrainGrid) -> Self {
            Self {
                grid,
                cache: WavecastCache::new(),
                alliances: AllianceTable::default(),
                config: VisibilityConfig::default(),
            }
        }

        fn reveal(&mut self, ledger: &mut TileLedger, viewer: &Viewer) -> WatchedTiles {
            let mut watched = WatchedTiles::default();
            let mut ctx = RevealContext {
                grid: &self.grid,
                cache: &mut self.cache,
                alliances: &self.alliances,
                config: &self.config,
            };
            ledger.reveal_from(viewer, &mut ctx, &mut watched);
            watched
        }
    }

    #[test]
    fn test_radius_five_disc_on_flat_ground() {
        let mut fx = Fixture::new(TerrainGrid::flat(32, 32, 0));
        let mut ledger = TileLedger::new();
        let watched = fx.reveal(&mut ledger, &viewer_at((10, 10), 0, vision(5)));

        assert_eq!(watched.tiles.len(), 81);
        for dy in -5i32..=5 {
            for dx in -5i32..=5 {
                let tile = IVec2::new(10 + dx, 10 + dy);
                let inside = dx * dx + dy * dy <= 25;
                assert_eq!(ledger.is_visible(PlayerId(0), tile, &fx.alliances), inside);
                assert_eq!(ledger.is_explored(PlayerId(0), tile), inside);
            }
        }
        assert_eq!(ledger.explored_count(PlayerId(0)), 81);
        assert!(!ledger.is_visible(PlayerId(1), IVec2::new(10, 10), &fx.alliances));
    }

    #[test]
    fn test_round_trip_restores_counters() {
        let mut grid = TerrainGrid::flat(32, 32, 0);
        grid.set_ground_height(IVec2::new(12, 10), 400);
        let mut fx = Fixture::new(grid);
        let mut ledger = TileLedger::new();

        let mut base = fx.reveal(&mut ledger, &viewer_at((9, 9), 1, vision(6)));
        let snapshot = ledger.records.clone();

        let mut jammer = viewer_at((11, 10), 2, vision(4));
        jammer.jammer = Some(Jammer { radius: 3 * TILE_UNITS });
        let mut watched = fx.reveal(&mut ledger, &jammer);
        assert_ne!(ledger.records, snapshot);

        ledger.unreveal_from(&mut watched);
        assert!(watched.tiles.is_empty());
        // Explored bits persist; every counter is back to where it was.
        for (tile, record) in &ledger.records {
            match snapshot.get(tile) {
                Some(before) => {
                    assert_eq!(record.watchers, before.watchers);
                    assert_eq!(record.sensors, before.sensors);
                    assert_eq!(record.jammers, before.jammers);
                    assert_eq!(record.jammer_bits, before.jammer_bits);
                }
                None => {
                    assert_eq!(record.explored, PlayerId(2).mask());
                    assert!(record.watchers.iter().all(|&c| c == 0));
                }
            }
        }

        ledger.unreveal_from(&mut base);
        assert!(ledger
            .records
            .values()
            .all(|r| r.watchers.iter().chain(&r.sensors).chain(&r.jammers).all(|&c| c == 0)));
    }

    #[test]
    fn test_empty_unreveal_is_noop() {
        let mut ledger = TileLedger::new();
        ledger.unreveal_from(&mut WatchedTiles::default());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ridge_shadows_far_tiles() {
        let mut grid = TerrainGrid::flat(32, 32, 0);
        for y in 0..32 {
            grid.set_ground_height(IVec2::new(12, y), 1000);
        }
        let mut fx = Fixture::new(grid);
        let mut ledger = TileLedger::new();
        fx.reveal(&mut ledger, &viewer_at((10, 10), 0, vision(6)));

        assert!(ledger.is_visible(PlayerId(0), IVec2::new(11, 10), &fx.alliances));
        assert!(ledger.is_visible(PlayerId(0), IVec2::new(12, 10), &fx.alliances));
        assert!(!ledger.is_visible(PlayerId(0), IVec2::new(14, 10), &fx.alliances));
        assert!(!ledger.is_explored(PlayerId(0), IVec2::new(15, 10)));
        assert!(ledger.is_visible(PlayerId(0), IVec2::new(6, 10), &fx.alliances));
    }

    #[test]
    fn test_radar_ignores_terrain_and_senses() {
        let mut grid = TerrainGrid::flat(32, 32, 0);
        for y in 0..32 {
            grid.set_ground_height(IVec2::new(12, y), 1000);
        }
        let mut fx = Fixture::new(grid);
        let mut ledger = TileLedger::new();
        let radar = Some(Sensor {
            radius: 6 * TILE_UNITS,
            class: SensorClass::Radar,
        });
        let watched = fx.reveal(&mut ledger, &viewer_at((10, 10), 0, radar));

        assert!(watched.tiles.iter().all(|w| w.kind == Contribution::Sensor));
        let behind = ledger.record(IVec2::new(15, 10)).unwrap();
        assert_eq!(behind.sensors[0], 1);
        assert_eq!(behind.watchers[0], 0);
        assert!(ledger.is_visible(PlayerId(0), IVec2::new(15, 10), &fx.alliances));
    }

    #[test]
    fn test_watcher_range_splits_contributions() {
        let mut fx = Fixture::new(TerrainGrid::flat(64, 64, 0));
        fx.config.watcher_range = 2 * TILE_UNITS;
        let mut ledger = TileLedger::new();
        fx.reveal(&mut ledger, &viewer_at((20, 20), 0, vision(5)));

        let near = ledger.record(IVec2::new(22, 20)).unwrap();
        assert_eq!((near.watchers[0], near.sensors[0]), (1, 0));
        let far = ledger.record(IVec2::new(24, 20)).unwrap();
        assert_eq!((far.watchers[0], far.sensors[0]), (0, 1));
    }

    #[test]
    fn test_enemy_jammer_suppresses_sensed_tiles() {
        let mut fx = Fixture::new(TerrainGrid::flat(64, 64, 0));
        fx.config.watcher_range = TILE_UNITS;
        fx.alliances.ally(PlayerId(0), PlayerId(2));
        let mut ledger = TileLedger::new();
        fx.reveal(&mut ledger, &viewer_at((20, 20), 0, vision(6)));

        let sensed = IVec2::new(24, 20);
        let watched = IVec2::new(21, 20);
        assert!(ledger.is_visible(PlayerId(0), sensed, &fx.alliances));

        let mut friendly = viewer_at((24, 20), 2, None);
        friendly.jammer = Some(Jammer { radius: 2 * TILE_UNITS });
        let mut friendly_watch = fx.reveal(&mut ledger, &friendly);
        assert!(ledger.is_visible(PlayerId(0), sensed, &fx.alliances));

        let mut enemy = viewer_at((22, 20), 1, None);
        enemy.jammer = Some(Jammer { radius: 2 * TILE_UNITS });
        let mut enemy_watch = fx.reveal(&mut ledger, &enemy);
        assert!(!ledger.is_visible(PlayerId(0), sensed, &fx.alliances));
        // Watched tiles are immune to jamming.
        assert!(ledger.is_visible(PlayerId(0), watched, &fx.alliances));

        ledger.unreveal_from(&mut enemy_watch);
        assert!(ledger.is_visible(PlayerId(0), sensed, &fx.alliances));
        ledger.unreveal_from(&mut friendly_watch);
        assert_eq!(ledger.record(sensed).unwrap().jammer_bits, 0);
    }

    #[test]
    fn test_jammer_only_records_are_dropped() {
        let mut fx = Fixture::new(TerrainGrid::flat(16, 16, 0));
        let mut ledger = TileLedger::new();
        let mut jammer = viewer_at((4, 4), 3, None);
        jammer.jammer = Some(Jammer { radius: 2 * TILE_UNITS });
        let mut watched = fx.reveal(&mut ledger, &jammer);
        assert_eq!(watched.tiles.len(), 13);
        assert_eq!(ledger.explored_count(PlayerId(3)), 0);
        ledger.unreveal_from(&mut watched);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_map_edge_tiles_skipped() {
        let mut fx = Fixture::new(TerrainGrid::flat(8, 8, 0));
        let mut ledger = TileLedger::new();
        let watched = fx.reveal(&mut ledger, &viewer_at((0, 0), 0, vision(3)));
        assert!(watched
            .tiles
            .iter()
            .all(|w| w.tile.x >= 0 && w.tile.y >= 0));
        // Quarter disc of radius 3 on the map: dx, dy >= 0 and dx² + dy² <= 9.
        assert_eq!(watched.tiles.len(), 11);
    }

    #[test]
    fn test_shared_exploration() {
        let mut fx = Fixture::new(TerrainGrid::flat(16, 16, 0));
        fx.alliances.ally(PlayerId(0), PlayerId(5));
        let mut ledger = TileLedger::new();
        fx.reveal(&mut ledger, &viewer_at((8, 8), 0, vision(2)));
        assert!(ledger.is_explored(PlayerId(5), IVec2::new(8, 9)));
        assert!(!ledger.is_explored(PlayerId(4), IVec2::new(8, 9)));
        // Counters stay with the viewer; allied sight comes from level multicast.
        assert!(!ledger.is_visible(PlayerId(5), IVec2::new(8, 9), &fx.alliances));
    }

    #[test]
    fn test_invalid_player_is_noop() {
        let mut fx = Fixture::new(TerrainGrid::flat(8, 8, 0));
        let mut ledger = TileLedger::new();
        let watched = fx.reveal(&mut ledger, &viewer_at((4, 4), 40, vision(2)));
        assert!(watched.tiles.is_empty());
        assert!(ledger.is_empty());
        assert!(!ledger.is_visible(PlayerId(40), IVec2::new(4, 4), &fx.alliances));
    }

    fn stale_watch(tile: TileCoord) -> WatchedTiles {
        WatchedTiles {
            tiles: vec![WatchedTile {
                tile,
                player: PlayerId(0),
                kind: Contribution::Watcher,
            }],
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ledger counter underflow")]
    fn test_underflow_asserts_in_debug() {
        let mut ledger = TileLedger::new();
        ledger.mark_explored(PlayerId(0).mask(), IVec2::new(2, 2));
        ledger.unreveal_from(&mut stale_watch(IVec2::new(2, 2)));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_underflow_clamps_in_release() {
        let mut ledger = TileLedger::new();
        ledger.mark_explored(PlayerId(0).mask(), IVec2::new(2, 2));
        ledger.unreveal_from(&mut stale_watch(IVec2::new(2, 2)));
        let record = ledger.record(IVec2::new(2, 2)).unwrap();
        assert_eq!(record.watchers[0], 0);
        assert!(ledger.is_explored(PlayerId(0), IVec2::new(2, 2)));
    }

    #[test]
    fn test_increment_counts_up() {
        let mut counter = 41;
        increment(&mut counter, IVec2::new(1, 1));
        assert_eq!(counter, 42);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ledger counter overflow")]
    fn test_overflow_asserts_in_debug() {
        let mut counter = u16::MAX;
        increment(&mut counter, IVec2::new(1, 1));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_overflow_saturates_in_release() {
        let mut counter = u16::MAX;
        increment(&mut counter, IVec2::new(1, 1));
        assert_eq!(counter, u16::MAX);
    }
}
