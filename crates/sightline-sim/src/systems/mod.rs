//! ECS systems that operate on the visibility world each tick.
//!
//! Systems are plain functions over `&mut World` (or `&World` for read-only)
//! plus the engine-owned tables they need. They keep no state of their own.

pub mod fade;
pub mod index;
pub mod retire;
pub mod reveal;
pub mod snapshot;
pub mod spotter_sweep;
pub mod vision;
