//! Requests from the object-lifecycle collaborator.
//!
//! Specs describe what to register; the engine turns them into entities and
//! spotters and schedules the matching reveals.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::components::{Footprint, Jammer, RadarDetector, Sensor};
use crate::enums::*;
use crate::player::PlayerId;

/// A simulation object to register with the visibility core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub owner: PlayerId,
    #[serde(default)]
    pub kind: ObjectKind,
    /// Horizontal position in world units.
    pub position: IVec2,
    /// Height above terrain (world units).
    #[serde(default)]
    pub elevation: i32,
    /// Silhouette height above the object's base (world units).
    #[serde(default = "default_silhouette")]
    pub silhouette: i32,
    #[serde(default)]
    pub footprint: Option<Footprint>,
    #[serde(default)]
    pub sensor: Option<Sensor>,
    #[serde(default)]
    pub jammer: Option<Jammer>,
    #[serde(default)]
    pub radar_detector: Option<RadarDetector>,
    /// Structure that blocks line of fire across its footprint.
    #[serde(default)]
    pub blocks_fire: bool,
}

fn default_silhouette() -> i32 {
    64
}

impl ObjectSpec {
    /// A mobile unit with no sensors.
    pub fn unit(owner: PlayerId, position: IVec2) -> Self {
        Self {
            owner,
            kind: ObjectKind::Unit,
            position,
            elevation: 0,
            silhouette: default_silhouette(),
            footprint: None,
            sensor: None,
            jammer: None,
            radar_detector: None,
            blocks_fire: false,
        }
    }

    /// A static structure covering `footprint`.
    pub fn structure(owner: PlayerId, position: IVec2, footprint: Footprint) -> Self {
        Self {
            kind: ObjectKind::Structure,
            footprint: Some(footprint),
            ..Self::unit(owner, position)
        }
    }

    pub fn with_sensor(mut self, radius: i32, class: SensorClass) -> Self {
        self.sensor = Some(Sensor { radius, class });
        self
    }

    pub fn with_jammer(mut self, radius: i32) -> Self {
        self.jammer = Some(Jammer { radius });
        self
    }

    pub fn with_radar_detector(mut self, radius: i32) -> Self {
        self.radar_detector = Some(RadarDetector { radius });
        self
    }

    pub fn with_silhouette(mut self, silhouette: i32) -> Self {
        self.silhouette = silhouette;
        self
    }

    pub fn with_elevation(mut self, elevation: i32) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn blocking_fire(mut self) -> Self {
        self.blocks_fire = true;
        self
    }
}

/// A non-object visibility source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpotterSpec {
    /// Horizontal position in world units.
    pub position: IVec2,
    pub player: PlayerId,
    /// Range in world units.
    pub radius: i32,
    #[serde(default)]
    pub class: SensorClass,
    /// Tick at which the spotter is withdrawn; 0 means never.
    #[serde(default)]
    pub expiry: u64,
}
