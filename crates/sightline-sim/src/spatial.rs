//! Z-order point index for radius queries over simulation objects.
//!
//! Points are stored sorted by their Morton key. A square query covers the
//! search area with at most four aligned Z-order cells, each of which is one
//! contiguous run of the sorted array, so only a binary search and a short
//! scan are needed per cell.
//!
//! Query results live in a scratch buffer owned by the tree. The returned
//! slice borrows the tree, so it cannot outlive the next query.

/// Bias that maps signed coordinates onto unsigned ones, preserving order.
const SIGN_BIAS: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy)]
struct Point<T> {
    key: u64,
    x: i32,
    y: i32,
    handle: T,
}

/// Spread the bits of `v` so they occupy the even bit positions.
fn spread(v: u32) -> u64 {
    let mut x = v as u64;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

fn biased(v: i32) -> u32 {
    (v as u32) ^ SIGN_BIAS
}

fn morton(ux: u32, uy: u32) -> u64 {
    spread(ux) | (spread(uy) << 1)
}

/// Spatial index over `(handle, x, y)` points.
#[derive(Debug, Clone)]
pub struct PointTree<T> {
    points: Vec<Point<T>>,
    sorted: bool,
    generation: u64,
    scratch: Vec<T>,
}

impl<T> Default for PointTree<T> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            sorted: true,
            generation: 0,
            scratch: Vec::new(),
        }
    }
}

impl<T: Copy> PointTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every point. Capacity is kept for the next rebuild.
    pub fn clear(&mut self) {
        self.points.clear();
        self.scratch.clear();
        self.sorted = true;
        self.generation += 1;
    }

    /// Add a point. Queries are unavailable until [`sort`](Self::sort) runs.
    pub fn insert(&mut self, handle: T, x: i32, y: i32) {
        self.points.push(Point {
            key: morton(biased(x), biased(y)),
            x,
            y,
            handle,
        });
        self.sorted = false;
    }

    /// Order the points by Morton key. Ties keep insertion order.
    pub fn sort(&mut self) {
        self.points.sort_by_key(|p| p.key);
        self.sorted = true;
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn ready(&mut self) -> bool {
        debug_assert!(self.sorted, "PointTree queried before sort()");
        self.scratch.clear();
        self.sorted
    }

    /// Index ranges of the sorted array that may hold points inside the
    /// inclusive biased rectangle.
    fn cell_ranges(&self, min: (u32, u32), max: (u32, u32)) -> Vec<(usize, usize)> {
        let span = (max.0 - min.0).max(max.1 - min.1);
        // Smallest level whose cell edge exceeds the span, so the rectangle
        // touches at most two cells per axis.
        let level = 32 - span.leading_zeros();
        if level >= 32 {
            return vec![(0, self.points.len())];
        }

        let mut xs = vec![min.0 >> level];
        if max.0 >> level != xs[0] {
            xs.push(max.0 >> level);
        }
        let mut ys = vec![min.1 >> level];
        if max.1 >> level != ys[0] {
            ys.push(max.1 >> level);
        }

        let cell_keys = 1u128 << (2 * level);
        let mut ranges = Vec::with_capacity(4);
        for &cy in &ys {
            for &cx in &xs {
                let base = morton(cx << level, cy << level);
                let end = base as u128 + cell_keys;
                let lo = self.points.partition_point(|p| p.key < base);
                let hi = self.points.partition_point(|p| (p.key as u128) < end);
                if lo < hi {
                    ranges.push((lo, hi));
                }
            }
        }
        ranges
    }

    fn bounds(x: i32, y: i32, x2: i32, y2: i32) -> ((u32, u32), (u32, u32)) {
        (
            (biased(x.min(x2)), biased(y.min(y2))),
            (biased(x.max(x2)), biased(y.max(y2))),
        )
    }

    fn square_bounds(x: i32, y: i32, radius: i32) -> (i32, i32, i32, i32) {
        let r = radius.max(0) as i64;
        let clamp = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        (
            clamp(x as i64 - r),
            clamp(y as i64 - r),
            clamp(x as i64 + r),
            clamp(y as i64 + r),
        )
    }

    /// Points inside the inclusive rectangle spanned by two corners.
    pub fn query_rect(&mut self, x: i32, y: i32, x2: i32, y2: i32) -> &[T] {
        if !self.ready() {
            return &[];
        }
        let (min, max) = Self::bounds(x, y, x2, y2);
        for (lo, hi) in self.cell_ranges(min, max) {
            for p in &self.points[lo..hi] {
                let (px, py) = (biased(p.x), biased(p.y));
                if px >= min.0 && px <= max.0 && py >= min.1 && py <= max.1 {
                    self.scratch.push(p.handle);
                }
            }
        }
        &self.scratch
    }

    /// Points inside the axis-aligned square of half-width `radius`.
    pub fn query_square(&mut self, x: i32, y: i32, radius: i32) -> &[T] {
        let (x1, y1, x2, y2) = Self::square_bounds(x, y, radius);
        self.query_rect(x1, y1, x2, y2)
    }

    /// Points within `radius` of `(x, y)`: `dx² + dy² <= radius²`.
    pub fn query(&mut self, x: i32, y: i32, radius: i32) -> &[T] {
        if !self.ready() {
            return &[];
        }
        let (x1, y1, x2, y2) = Self::square_bounds(x, y, radius);
        let (min, max) = Self::bounds(x1, y1, x2, y2);
        let r_sq = radius.max(0) as i64 * radius.max(0) as i64;
        for (lo, hi) in self.cell_ranges(min, max) {
            for p in &self.points[lo..hi] {
                if within(p, x, y, r_sq) {
                    self.scratch.push(p.handle);
                }
            }
        }
        &self.scratch
    }

    /// Like [`query`](Self::query), restricted to points still alive in
    /// `filter`. Candidates for which `keep` returns false are erased from
    /// the filter and skipped by every later filtered query until it is reset.
    pub fn query_filtered(
        &mut self,
        filter: &mut Filter,
        x: i32,
        y: i32,
        radius: i32,
        mut keep: impl FnMut(T) -> bool,
    ) -> &[T] {
        if !self.ready() {
            return &[];
        }
        if filter.generation != self.generation {
            debug_assert!(false, "Filter used without reset after rebuild");
            return &[];
        }
        let (x1, y1, x2, y2) = Self::square_bounds(x, y, radius);
        let (min, max) = Self::bounds(x1, y1, x2, y2);
        let r_sq = radius.max(0) as i64 * radius.max(0) as i64;
        for (lo, hi) in self.cell_ranges(min, max) {
            let mut i = filter.find(lo);
            while i < hi {
                let p = &self.points[i];
                if within(p, x, y, r_sq) {
                    if keep(p.handle) {
                        self.scratch.push(p.handle);
                    } else {
                        filter.erase(i);
                    }
                }
                i = filter.find(i + 1);
            }
        }
        &self.scratch
    }
}

fn within<T>(p: &Point<T>, x: i32, y: i32, r_sq: i64) -> bool {
    let dx = p.x as i64 - x as i64;
    let dy = p.y as i64 - y as i64;
    dx * dx + dy * dy <= r_sq
}

/// Prunable view over a [`PointTree`]'s current points.
///
/// Erased entries are skipped in near-constant time: `next` links each erased
/// slot towards the next live one, and lookups compress the path they walk.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    next: Vec<u32>,
    generation: u64,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every point of `tree` live again.
    pub fn reset<T: Copy>(&mut self, tree: &PointTree<T>) {
        let len = tree.len() as u32;
        self.next.clear();
        self.next.extend(0..=len);
        self.generation = tree.generation;
    }

    /// Remove sorted index `index` until the next reset.
    pub fn erase(&mut self, index: usize) {
        if index + 1 < self.next.len() {
            self.next[index] = index as u32 + 1;
        }
    }

    /// Whether sorted index `index` is still live.
    pub fn is_live(&mut self, index: usize) -> bool {
        index + 1 < self.next.len() && self.find(index) == index
    }

    /// First live index at or after `index`. Returns the point count when
    /// nothing is left.
    fn find(&mut self, index: usize) -> usize {
        if self.next.is_empty() {
            return 0;
        }
        let last = self.next.len() - 1;
        let start = index.min(last);
        let mut root = start;
        while self.next[root] as usize != root {
            root = self.next[root] as usize;
        }
        let mut cur = start;
        while cur != root {
            let step = self.next[cur] as usize;
            self.next[cur] = root as u32;
            cur = step;
        }
        root
    }
}
