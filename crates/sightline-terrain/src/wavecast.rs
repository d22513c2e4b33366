//! Wavecast tables: precomputed, radius-keyed tile lists for radial shadow casting.
//!
//! A table lists every tile within a sensor radius in concentric ring order
//! (increasing squared distance, then angle). Each tile carries the angular
//! interval it covers as seen from the origin tile, expressed as exact integer
//! direction vectors, and an inverse-radius factor that turns a height delta
//! into a comparable elevation angle. No trigonometry is involved, so tables
//! are bit-identical on every platform.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use sightline_core::constants::{INV_RADIUS_SCALE, MAX_WAVECAST_TILES, TILE_UNITS};
use sightline_core::math::isqrt;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WavecastError {
    #[error("wavecast table for radius {radius} needs {tiles} tiles, limit is {max}")]
    TableOverflow {
        radius: i32,
        tiles: usize,
        max: usize,
    },
}

/// A direction from the origin, ordered counter-clockwise starting at +x.
///
/// Ordering is by quadrant, then by the sign of the cross product, which is a
/// total order over non-zero integer vectors. Parallel vectors compare equal.
/// `FULL` sorts after every direction and closes the turn.
#[derive(Debug, Clone, Copy)]
pub struct RationalAngle {
    x: i32,
    y: i32,
    full_turn: bool,
}

impl RationalAngle {
    /// Direction +x, the start of the turn.
    pub const ZERO: RationalAngle = RationalAngle {
        x: 1,
        y: 0,
        full_turn: false,
    };

    /// End of the turn; greater than every direction.
    pub const FULL: RationalAngle = RationalAngle {
        x: 1,
        y: 0,
        full_turn: true,
    };

    /// Direction of the vector `(x, y)`. The zero vector maps to [`ZERO`](Self::ZERO).
    pub fn new(x: i32, y: i32) -> Self {
        if x == 0 && y == 0 {
            return Self::ZERO;
        }
        Self {
            x,
            y,
            full_turn: false,
        }
    }

    fn quadrant(&self) -> u8 {
        match (self.x, self.y) {
            (x, y) if x > 0 && y >= 0 => 0,
            (x, y) if x <= 0 && y > 0 => 1,
            (x, y) if x < 0 && y <= 0 => 2,
            _ => 3,
        }
    }
}

impl Ord for RationalAngle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full_turn
            .cmp(&other.full_turn)
            .then_with(|| self.quadrant().cmp(&other.quadrant()))
            .then_with(|| {
                let cross = self.x as i64 * other.y as i64 - self.y as i64 * other.x as i64;
                0.cmp(&cross)
            })
    }
}

impl PartialOrd for RationalAngle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RationalAngle {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RationalAngle {}

/// One tile of a wavecast table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavecastTile {
    pub dx: i32,
    pub dy: i32,
    /// `dx² + dy²` in tiles.
    pub dist_sq: i32,
    /// `INV_RADIUS_SCALE / distance` with distance in world units. 0 for the origin.
    pub inv_radius: i64,
    /// Clockwise-most edge of the tile as seen from the origin.
    pub begin: RationalAngle,
    /// Counter-clockwise-most edge of the tile as seen from the origin.
    pub end: RationalAngle,
}

impl WavecastTile {
    /// Whether the interval crosses the +x axis (`begin > end`).
    pub fn wraps(&self) -> bool {
        self.begin > self.end
    }

    /// Whether this is the viewer's own tile.
    pub fn is_origin(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Immutable wavecast table for one radius.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavecastTable {
    radius: i32,
    tiles: Vec<WavecastTile>,
}

impl WavecastTable {
    /// Build the table for `radius` world units.
    pub fn build(radius: i32) -> Result<Self, WavecastError> {
        let radius = radius.max(0);
        let radius_sq = radius as i64 * radius as i64;
        let unit_sq = TILE_UNITS as i64 * TILE_UNITS as i64;
        let reach = radius / TILE_UNITS;

        let mut tiles = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let dist_sq = dx * dx + dy * dy;
                if dist_sq as i64 * unit_sq <= radius_sq {
                    tiles.push(make_tile(dx, dy));
                }
            }
        }

        if tiles.len() > MAX_WAVECAST_TILES {
            return Err(WavecastError::TableOverflow {
                radius,
                tiles: tiles.len(),
                max: MAX_WAVECAST_TILES,
            });
        }

        tiles.sort_by(|a, b| a.dist_sq.cmp(&b.dist_sq).then(a.begin.cmp(&b.begin)));
        Ok(Self { radius, tiles })
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn tiles(&self) -> &[WavecastTile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles grouped into rings of equal squared distance, nearest first.
    pub fn rings(&self) -> impl Iterator<Item = &[WavecastTile]> {
        self.tiles.chunk_by(|a, b| a.dist_sq == b.dist_sq)
    }
}

fn make_tile(dx: i32, dy: i32) -> WavecastTile {
    let dist_sq = dx * dx + dy * dy;
    if dist_sq == 0 {
        return WavecastTile {
            dx,
            dy,
            dist_sq,
            inv_radius: 0,
            begin: RationalAngle::ZERO,
            end: RationalAngle::FULL,
        };
    }

    let distance = isqrt(dist_sq as u64 * (TILE_UNITS as u64 * TILE_UNITS as u64)) as i64;

    // Corners in doubled coordinates so tile edges fall on integers.
    let corners = [
        (2 * dx - 1, 2 * dy - 1),
        (2 * dx + 1, 2 * dy - 1),
        (2 * dx - 1, 2 * dy + 1),
        (2 * dx + 1, 2 * dy + 1),
    ];
    let cross = |a: (i32, i32), b: (i32, i32)| a.0 as i64 * b.1 as i64 - a.1 as i64 * b.0 as i64;
    let begin = corners
        .iter()
        .copied()
        .find(|&c| corners.iter().all(|&o| cross(c, o) >= 0))
        .unwrap_or(corners[0]);
    let end = corners
        .iter()
        .copied()
        .find(|&c| corners.iter().all(|&o| cross(o, c) >= 0))
        .unwrap_or(corners[3]);

    WavecastTile {
        dx,
        dy,
        dist_sq,
        inv_radius: INV_RADIUS_SCALE / distance.max(1),
        begin: RationalAngle::new(begin.0, begin.1),
        end: RationalAngle::new(end.0, end.1),
    }
}

/// Per-context cache of wavecast tables keyed by radius.
#[derive(Debug, Default)]
pub struct WavecastCache {
    tables: HashMap<i32, Arc<WavecastTable>>,
}

impl WavecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table for `radius`, built on first use.
    ///
    /// # Panics
    ///
    /// Panics if the radius needs more than `MAX_WAVECAST_TILES` tiles.
    /// Truncating the table would leave holes in the fog of war.
    pub fn table(&mut self, radius: i32) -> Arc<WavecastTable> {
        let radius = radius.max(0);
        if let Some(table) = self.tables.get(&radius) {
            return Arc::clone(table);
        }
        let table = match WavecastTable::build(radius) {
            Ok(table) => Arc::new(table),
            Err(err) => panic!("{err}"),
        };
        tracing::debug!(
            target: "sightline::wavecast",
            radius,
            tiles = table.len(),
            "wavecast.table_built"
        );
        self.tables.insert(radius, Arc::clone(&table));
        table
    }

    /// Number of cached radii.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Highest obstruction seen so far around the full turn, as a step function
/// of angle. Heights are perspective values (`height_delta * inv_radius`).
#[derive(Debug, Clone)]
pub struct Horizon {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    begin: RationalAngle,
    end: RationalAngle,
    height: i64,
}

impl Default for Horizon {
    fn default() -> Self {
        Self::new()
    }
}

impl Horizon {
    /// Unobstructed horizon.
    pub fn new() -> Self {
        Self {
            segments: vec![Segment {
                begin: RationalAngle::ZERO,
                end: RationalAngle::FULL,
                height: i64::MIN,
            }],
        }
    }

    /// Lowest horizon height anywhere inside `[begin, end]`.
    /// Wrapping intervals (`begin > end`) cover the +x axis.
    pub fn lowest(&self, begin: RationalAngle, end: RationalAngle) -> i64 {
        if begin > end {
            return self
                .lowest(begin, RationalAngle::FULL)
                .min(self.lowest(RationalAngle::ZERO, end));
        }
        self.segments
            .iter()
            .filter(|s| s.begin < end && s.end > begin)
            .map(|s| s.height)
            .min()
            .unwrap_or(i64::MIN)
    }

    /// Raise the horizon to at least `height` over `[begin, end)`.
    pub fn raise(&mut self, begin: RationalAngle, end: RationalAngle, height: i64) {
        if begin > end {
            self.raise(begin, RationalAngle::FULL, height);
            self.raise(RationalAngle::ZERO, end, height);
            return;
        }
        if begin == end {
            return;
        }

        let mut next: Vec<Segment> = Vec::with_capacity(self.segments.len() + 2);
        for seg in &self.segments {
            if seg.end <= begin || seg.begin >= end || seg.height >= height {
                push_merged(&mut next, *seg);
                continue;
            }
            let lo = seg.begin.max(begin);
            let hi = seg.end.min(end);
            if seg.begin < lo {
                push_merged(&mut next, Segment { end: lo, ..*seg });
            }
            push_merged(
                &mut next,
                Segment {
                    begin: lo,
                    end: hi,
                    height,
                },
            );
            if hi < seg.end {
                push_merged(&mut next, Segment { begin: hi, ..*seg });
            }
        }
        self.segments = next;
    }

    /// Number of constant-height pieces.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

fn push_merged(segments: &mut Vec<Segment>, seg: Segment) {
    if let Some(last) = segments.last_mut() {
        if last.height == seg.height && last.end == seg.begin {
            last.end = seg.end;
            return;
        }
    }
    segments.push(seg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_order_counter_clockwise() {
        let east = RationalAngle::new(5, 0);
        let north_east = RationalAngle::new(3, 3);
        let north = RationalAngle::new(0, 7);
        let west = RationalAngle::new(-2, 0);
        let south = RationalAngle::new(0, -1);
        let south_east = RationalAngle::new(4, -1);
        let ordered = [
            RationalAngle::ZERO,
            north_east,
            north,
            west,
            south,
            south_east,
            RationalAngle::FULL,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{:?} should precede {:?}", pair[0], pair[1]);
        }
        assert_eq!(east, RationalAngle::ZERO);
        assert_eq!(RationalAngle::new(1, 1), RationalAngle::new(9, 9));
        assert_ne!(RationalAngle::new(1, 1), RationalAngle::new(-1, -1));
    }

    #[test]
    fn test_origin_tile_covers_full_turn() {
        let table = WavecastTable::build(0).unwrap();
        assert_eq!(table.len(), 1);
        let origin = table.tiles()[0];
        assert!(origin.is_origin());
        assert_eq!(origin.begin, RationalAngle::ZERO);
        assert_eq!(origin.end, RationalAngle::FULL);
    }

    #[test]
    fn test_table_is_disc_in_ring_order() {
        let radius = 5 * TILE_UNITS;
        let table = WavecastTable::build(radius).unwrap();
        let expected = (-5i32..=5)
            .flat_map(|dy| (-5i32..=5).map(move |dx| (dx, dy)))
            .filter(|(dx, dy)| dx * dx + dy * dy <= 25)
            .count();
        assert_eq!(table.len(), expected);
        assert_eq!(table.len(), 81);
        for pair in table.tiles().windows(2) {
            assert!(pair[0].dist_sq <= pair[1].dist_sq);
        }
        let ring_sizes: Vec<usize> = table.rings().map(|r| r.len()).collect();
        assert_eq!(ring_sizes[0], 1);
        assert_eq!(ring_sizes[1], 4);
        assert_eq!(ring_sizes.iter().sum::<usize>(), 81);
    }

    #[test]
    fn test_tile_intervals() {
        let table = WavecastTable::build(3 * TILE_UNITS).unwrap();
        let east = table.tiles().iter().find(|t| t.dx == 1 && t.dy == 0).unwrap();
        assert!(east.wraps());
        assert_eq!(east.begin, RationalAngle::new(1, -1));
        assert_eq!(east.end, RationalAngle::new(1, 1));

        let north = table.tiles().iter().find(|t| t.dx == 0 && t.dy == 2).unwrap();
        assert!(!north.wraps());
        assert_eq!(north.begin, RationalAngle::new(1, 3));
        assert_eq!(north.end, RationalAngle::new(-1, 3));
        assert_eq!(north.inv_radius, INV_RADIUS_SCALE / (2 * TILE_UNITS as i64));
    }

    #[test]
    fn test_deterministic_construction() {
        for radius in [0, 100, 128, 700, 1280, 2000, 2600] {
            let a = WavecastTable::build(radius).unwrap();
            let b = WavecastTable::build(radius).unwrap();
            assert_eq!(a, b, "radius {radius} differed between builds");
        }
    }

    #[test]
    fn test_overflow_is_error() {
        let err = WavecastTable::build(40 * TILE_UNITS).unwrap_err();
        assert!(matches!(
            err,
            WavecastError::TableOverflow { max: MAX_WAVECAST_TILES, .. }
        ));
    }

    #[test]
    #[should_panic(expected = "wavecast table for radius")]
    fn test_cache_overflow_panics() {
        let mut cache = WavecastCache::new();
        cache.table(40 * TILE_UNITS);
    }

    #[test]
    fn test_cache_shares_tables() {
        let mut cache = WavecastCache::new();
        let a = cache.table(640);
        let b = cache.table(640);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        cache.table(-5);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_horizon_raise_and_lowest() {
        let mut horizon = Horizon::new();
        let a = RationalAngle::new(10, 1);
        let b = RationalAngle::new(1, 10);
        assert_eq!(horizon.lowest(a, b), i64::MIN);

        horizon.raise(a, b, 500);
        assert_eq!(horizon.lowest(a, b), 500);
        assert_eq!(horizon.segment_count(), 3);
        // Straddling the raised piece still finds the open sky next to it.
        assert_eq!(horizon.lowest(RationalAngle::new(1, 0), b), i64::MIN);

        // A lower raise changes nothing.
        horizon.raise(a, b, 100);
        assert_eq!(horizon.lowest(a, b), 500);
        assert_eq!(horizon.segment_count(), 3);
    }

    #[test]
    fn test_horizon_wrapping_interval() {
        let mut horizon = Horizon::new();
        let below = RationalAngle::new(4, -1);
        let above = RationalAngle::new(4, 1);
        horizon.raise(below, above, 42);
        assert_eq!(horizon.lowest(below, above), 42);
        assert_eq!(horizon.lowest(RationalAngle::new(4, 2), RationalAngle::new(1, 4)), i64::MIN);
        assert_eq!(horizon.lowest(RationalAngle::new(8, 1), RationalAngle::new(8, 1)), i64::MIN);
    }
}
