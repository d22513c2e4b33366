//! Terrain layer for SIGHTLINE.
//!
//! Tile heightmap, wavecast tables for radial shadow casting,
//! and the line-of-sight / line-of-fire ray caster.

pub use sightline_core as core;

pub mod grid;
pub mod los;
pub mod wavecast;

// Re-export key types for convenience.
pub use grid::{TerrainError, TerrainGrid};
pub use los::{
    has_line_of_sight, indirect_launch_angle, line_of_fire, Blocker, RayEnd, TileBlockers,
};
pub use wavecast::{Horizon, RationalAngle, WavecastCache, WavecastError, WavecastTable, WavecastTile};
