//! Visibility simulation for SIGHTLINE.
//!
//! Owns the hecs ECS world of observable objects, maintains the tile
//! visibility ledger and spotters each tick, and produces
//! `VisibilitySnapshot`s for renderers and game rules.

pub mod engine;
pub mod ledger;
pub mod levels;
pub mod occupancy;
pub mod spatial;
pub mod spotters;
pub mod systems;

pub use engine::{SimConfig, VisibilityEngine};
pub use sightline_core as core;
