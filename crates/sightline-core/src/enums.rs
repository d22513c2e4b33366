//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// How a sensor perceives the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorClass {
    /// Optical sight: occluded by terrain, close tiles count as watched.
    #[default]
    Vision,
    /// Indirect detection: ignores terrain, every tile goes through the
    /// jammable sensor path.
    Radar,
}

/// Which ledger counter a reveal incremented on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contribution {
    /// Close-range direct sight. Immune to jamming.
    Watcher,
    /// Long-range or indirect detection. Suppressed by enemy jammers.
    Sensor,
    /// Jamming field.
    Jammer,
}

/// Broad object category, used for logging and snapshot views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    #[default]
    Unit,
    Structure,
    Feature,
}

impl ObjectKind {
    /// Units move; structures and features do not.
    pub fn is_mobile(self) -> bool {
        matches!(self, ObjectKind::Unit)
    }
}
