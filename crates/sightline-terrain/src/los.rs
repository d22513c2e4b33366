//! Line-of-sight and line-of-fire ray casting with terrain and wall occlusion.
//!
//! A ray from shooter to target is split at every tile-grid boundary it
//! crosses. Terrain is sampled at each crossing, and blocking structures on
//! the tiles the ray enters contribute their top height at the entry point.
//! Both the direct-fire clearance and the indirect launch angle are derived
//! from that single walk, using only integer arithmetic.

use std::cmp::Ordering;
use std::collections::HashMap;

use glam::IVec2;

use sightline_core::constants::{DEG_1, TANGENT_ONE, TILE_UNITS};
use sightline_core::math::{angle_delta, iatan2, isqrt};
use sightline_core::types::{world_to_tile, Position, TileCoord};

use crate::grid::TerrainGrid;

/// A structure occupying a tile for line-of-fire purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocker {
    /// Handle of the structure, compared against the ray's endpoints.
    pub id: u64,
    /// Absolute height of the structure's top (world units).
    pub top: i32,
}

/// Lookup of blocking structures by tile.
pub trait TileBlockers {
    fn blocker_at(&self, tile: TileCoord) -> Option<Blocker>;
}

/// No structures anywhere.
impl TileBlockers for () {
    fn blocker_at(&self, _tile: TileCoord) -> Option<Blocker> {
        None
    }
}

impl TileBlockers for HashMap<TileCoord, Blocker> {
    fn blocker_at(&self, tile: TileCoord) -> Option<Blocker> {
        self.get(&tile).copied()
    }
}

/// One end of a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayEnd {
    /// Base of the object (`z` is the ground or hover height).
    pub pos: Position,
    /// Height above the base: the muzzle for a shooter, the top for a target.
    pub height: i32,
    /// Handle of the object, so its own structure never blocks the ray.
    pub id: Option<u64>,
}

impl RayEnd {
    pub fn new(pos: Position, height: i32) -> Self {
        Self {
            pos,
            height,
            id: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

/// An obstruction along the ray, relative to the muzzle.
#[derive(Debug, Clone, Copy)]
struct Obstacle {
    /// Horizontal distance from the shooter.
    dist: i64,
    /// Height above the muzzle (negative when below).
    rise: i64,
}

/// A tile-boundary crossing at parameter `num / den` along the segment.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    num: i64,
    den: i64,
    step: IVec2,
}

impl Crossing {
    fn cmp_t(&self, other: &Crossing) -> Ordering {
        (self.num as i128 * other.den as i128).cmp(&(other.num as i128 * self.den as i128))
    }
}

/// Boundary crossings along one axis, in increasing parameter order.
fn axis_crossings(from: i32, to: i32, unit: IVec2) -> Vec<Crossing> {
    let span = to as i64 - from as i64;
    if span == 0 {
        return Vec::new();
    }
    let den = span.abs();
    let tile = TILE_UNITS as i64;
    let mut out = Vec::new();
    if span > 0 {
        let mut boundary = (from as i64).div_euclid(tile) * tile + tile;
        while boundary < to as i64 {
            out.push(Crossing {
                num: boundary - from as i64,
                den,
                step: unit,
            });
            boundary += tile;
        }
    } else {
        let mut boundary = (from as i64).div_euclid(tile) * tile;
        while boundary > to as i64 {
            out.push(Crossing {
                num: from as i64 - boundary,
                den,
                step: -unit,
            });
            boundary -= tile;
        }
    }
    out
}

/// Walk the ray, calling `visit` with every obstruction in order of distance.
/// Returns the horizontal length of the ray.
fn walk(
    grid: &TerrainGrid,
    blockers: &impl TileBlockers,
    from: &RayEnd,
    to: &RayEnd,
    walls_block: bool,
    mut visit: impl FnMut(Obstacle),
) -> i64 {
    let start = from.pos.xy();
    let end = to.pos.xy();
    let delta = (end - start).as_i64vec2();
    let length = isqrt(delta.length_squared() as u64) as i64;
    if length == 0 {
        return 0;
    }
    let muzzle = from.pos.z as i64 + from.height as i64;

    let xs = axis_crossings(start.x, end.x, IVec2::X);
    let ys = axis_crossings(start.y, end.y, IVec2::Y);

    let mut crossings = Vec::with_capacity(xs.len() + ys.len());
    let (mut i, mut j) = (0, 0);
    while i < xs.len() || j < ys.len() {
        let next = match (xs.get(i), ys.get(j)) {
            (Some(a), Some(b)) => match a.cmp_t(b) {
                Ordering::Less => {
                    i += 1;
                    *a
                }
                Ordering::Greater => {
                    j += 1;
                    *b
                }
                Ordering::Equal => {
                    // Corner: both axes step at once.
                    i += 1;
                    j += 1;
                    Crossing {
                        step: a.step + b.step,
                        ..*a
                    }
                }
            },
            (Some(a), None) => {
                i += 1;
                *a
            }
            (None, Some(b)) => {
                j += 1;
                *b
            }
            (None, None) => break,
        };
        crossings.push(next);
    }

    let mut tile = world_to_tile(start);
    for crossing in crossings {
        tile += crossing.step;
        let dist = length * crossing.num / crossing.den;
        if dist <= 0 || dist >= length {
            continue;
        }

        let point = IVec2::new(
            start.x + (delta.x * crossing.num / crossing.den) as i32,
            start.y + (delta.y * crossing.num / crossing.den) as i32,
        );
        visit(Obstacle {
            dist,
            rise: grid.height_at(point) as i64 - muzzle,
        });

        if walls_block {
            if let Some(blocker) = blockers.blocker_at(tile) {
                let own = Some(blocker.id) == from.id || Some(blocker.id) == to.id;
                if !own {
                    visit(Obstacle {
                        dist,
                        rise: blocker.top as i64 - muzzle,
                    });
                }
            }
        }
    }
    length
}

/// Vertical clearance of a direct shot from `from` to `to`.
///
/// The steepest obstruction slope seen from the muzzle is projected to the
/// target's distance; the result is how far the target's top rises above
/// that line. Negative means the target is fully hidden.
pub fn line_of_fire(
    grid: &TerrainGrid,
    blockers: &impl TileBlockers,
    from: &RayEnd,
    to: &RayEnd,
    walls_block: bool,
) -> i32 {
    let muzzle = from.pos.z as i64 + from.height as i64;
    let target_rise = to.pos.z as i64 - muzzle;

    let mut steepest: Option<i64> = None;
    let length = walk(grid, blockers, from, to, walls_block, |obstacle| {
        let slope = (obstacle.rise * TANGENT_ONE).div_euclid(obstacle.dist);
        steepest = Some(steepest.map_or(slope, |s| s.max(slope)));
    });
    if length == 0 {
        return to.height;
    }

    let base_slope = (target_rise * TANGENT_ONE).div_euclid(length);
    let slope = steepest.map_or(base_slope, |s| s.max(base_slope));
    let line_at_target = muzzle + (slope * length).div_euclid(TANGENT_ONE);
    (to.height as i64 - (line_at_target - to.pos.z as i64)) as i32
}

/// Whether the target's top is visible from the shooter.
pub fn has_line_of_sight(
    grid: &TerrainGrid,
    blockers: &impl TileBlockers,
    from: &RayEnd,
    to: &RayEnd,
    walls_block: bool,
) -> bool {
    line_of_fire(grid, blockers, from, to, walls_block) >= 0
}

/// Launch angle for an indirect (ballistic) shot, in 16-bit angle units.
///
/// The shell follows the lowest parabola through the muzzle and the target
/// base that clears every obstruction, plus one degree of margin. The result
/// is normalised to `(-ANGLE_HALF, ANGLE_HALF]`.
pub fn indirect_launch_angle(
    grid: &TerrainGrid,
    blockers: &impl TileBlockers,
    from: &RayEnd,
    to: &RayEnd,
    walls_block: bool,
) -> i32 {
    let muzzle = from.pos.z as i64 + from.height as i64;
    let target_rise = (to.pos.z as i64 - muzzle) as i128;

    let length = isqrt(from.pos.dist_sq_2d(&to.pos) as u64) as i128;
    let mut steepest: Option<i128> = None;
    walk(grid, blockers, from, to, walls_block, |obstacle| {
        let d = obstacle.dist as i128;
        if d >= length {
            return;
        }
        let numer = (length * length * obstacle.rise as i128 - d * d * target_rise)
            * TANGENT_ONE as i128;
        let denom = d * length * (length - d);
        let slope = numer.div_euclid(denom);
        steepest = Some(steepest.map_or(slope, |s| s.max(slope)));
    });

    let base_slope = if length == 0 {
        0
    } else {
        (target_rise * TANGENT_ONE as i128).div_euclid(length)
    };
    let slope = steepest.map_or(base_slope, |s| s.max(base_slope));
    let slope = slope.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    angle_delta(DEG_1 + iatan2(slope, TANGENT_ONE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_core::types::tile_center;

    fn end_at(tile: (i32, i32), z: i32, height: i32) -> RayEnd {
        let c = tile_center(IVec2::new(tile.0, tile.1));
        RayEnd::new(Position::new(c.x, c.y, z), height)
    }

    fn walled(tile: (i32, i32), id: u64, top: i32) -> HashMap<TileCoord, Blocker> {
        let mut map = HashMap::new();
        map.insert(IVec2::new(tile.0, tile.1), Blocker { id, top });
        map
    }

    #[test]
    fn test_flat_terrain_is_clear() {
        let grid = TerrainGrid::flat(32, 32, 0);
        let from = end_at((2, 5), 0, 64);
        let to = end_at((20, 9), 0, 64);
        let clearance = line_of_fire(&grid, &(), &from, &to, true);
        assert!(clearance >= 0, "clearance {clearance} on flat ground");
        assert!(has_line_of_sight(&grid, &(), &from, &to, true));
    }

    #[test]
    fn test_wall_blocks_direct_fire() {
        let grid = TerrainGrid::flat(16, 16, 0);
        let from = end_at((2, 5), 0, 64);
        let to = end_at((10, 5), 0, 64);
        let wall = walled((6, 5), 7, 500);

        assert!(line_of_fire(&grid, &wall, &from, &to, true) < 0);
        assert!(line_of_fire(&grid, &wall, &from, &to, false) >= 0);
        // A target that is the wall itself is not hidden behind it.
        assert!(line_of_fire(&grid, &wall, &from, &to.with_id(7), true) >= 0);
    }

    #[test]
    fn test_hill_blocks_sight() {
        let mut grid = TerrainGrid::flat(16, 16, 0);
        for y in 0..16 {
            grid.set_ground_height(IVec2::new(6, y), 600);
        }
        let from = end_at((2, 5), 0, 64);
        let to = end_at((12, 5), 0, 64);
        assert!(!has_line_of_sight(&grid, &(), &from, &to, true));

        let raised = end_at((2, 5), 0, 2000);
        assert!(has_line_of_sight(&grid, &(), &raised, &to, true));
    }

    #[test]
    fn test_diagonal_walk_enters_wall_tile() {
        let grid = TerrainGrid::flat(16, 16, 0);
        let from = end_at((1, 1), 0, 32);
        let to = end_at((9, 9), 0, 32);
        let wall = walled((5, 5), 3, 400);
        assert!(line_of_fire(&grid, &wall, &from, &to, true) < 0);
        // Walking the same line backwards hits the same wall.
        assert!(line_of_fire(&grid, &wall, &to, &from, true) < 0);
    }

    #[test]
    fn test_same_spot_is_clear() {
        let grid = TerrainGrid::flat(4, 4, 0);
        let here = end_at((1, 1), 0, 50);
        assert_eq!(line_of_fire(&grid, &(), &here, &here, true), 50);
    }

    #[test]
    fn test_indirect_angle_rises_with_hill() {
        let flat = TerrainGrid::flat(32, 32, 0);
        let mut hilly = flat.clone();
        hilly.set_ground_height(IVec2::new(10, 5), 800);

        let from = end_at((2, 5), 0, 32);
        let to = end_at((18, 5), 0, 32);
        let low = indirect_launch_angle(&flat, &(), &from, &to, true);
        let high = indirect_launch_angle(&hilly, &(), &from, &to, true);
        assert!(low.abs() < 2 * DEG_1, "flat launch angle {low}");
        assert!(high > low, "hill {high} should exceed flat {low}");
        assert!(high < sightline_core::constants::ANGLE_QUARTER);
    }

    #[test]
    fn test_indirect_angle_counts_walls() {
        let grid = TerrainGrid::flat(32, 32, 0);
        let from = end_at((2, 5), 0, 32);
        let to = end_at((18, 5), 0, 32);
        let wall = walled((9, 5), 1, 300);
        let open = indirect_launch_angle(&grid, &wall, &from, &to, false);
        let lobbed = indirect_launch_angle(&grid, &wall, &from, &to, true);
        assert!(lobbed > open);
    }
}
