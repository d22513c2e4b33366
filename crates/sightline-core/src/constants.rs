//! Fixed-point units and hard limits shared by every crate.

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 10;

// --- World units ---

/// World units per tile edge.
pub const TILE_UNITS: i32 = 128;

/// `log2(TILE_UNITS)`; world → tile conversion is an arithmetic shift.
pub const TILE_SHIFT: u32 = 7;

// --- Players ---

/// Maximum number of player slots. Player masks are `u16`.
pub const MAX_PLAYERS: usize = 16;

// --- Visibility levels ---

/// Fully known: the object is drawn and targetable.
pub const VIS_FULL: u8 = u8::MAX;

/// Not visible at all.
pub const VIS_NONE: u8 = 0;

// --- Wavecast ---

/// Hard cap on tiles in one wavecast table (a radius of roughly 20 tiles).
pub const MAX_WAVECAST_TILES: usize = 1360;

/// Numerator of the inverse-radius factor stored per wavecast tile.
/// `perspective = height_delta * INV_RADIUS_SCALE / distance`.
pub const INV_RADIUS_SCALE: i64 = 1 << 20;

// --- Angles ---

/// One full turn in 16-bit angle units.
pub const ANGLE_FULL: i32 = 65_536;

/// Half a turn in angle units.
pub const ANGLE_HALF: i32 = ANGLE_FULL / 2;

/// Quarter turn in angle units.
pub const ANGLE_QUARTER: i32 = ANGLE_FULL / 4;

/// One degree in angle units (rounded).
pub const DEG_1: i32 = 182;

/// Fixed-point scale of slopes (tangents) produced by the ray caster.
pub const TANGENT_ONE: i64 = 65_536;
