//! Scenario files: a map, players, objects, spotters and scripted moves.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glam::IVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sightline_core::commands::{ObjectSpec, SpotterSpec};
use sightline_core::player::PlayerId;
use sightline_terrain::{TerrainError, TerrainGrid};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid terrain: {0}")]
    Terrain(#[from] TerrainError),
    #[error("move at tick {tick} names object #{index}, scenario has {count}")]
    UnknownObject { tick: u64, index: usize, count: usize },
}

/// A raised block of tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hill {
    /// Lower-left tile.
    pub tile: IVec2,
    #[serde(default = "one")]
    pub width: i32,
    #[serde(default = "one")]
    pub breadth: i32,
    pub height: i32,
}

/// Move object `object` (index into `objects`) before tick `tick` runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedMove {
    pub tick: u64,
    pub object: usize,
    pub to: IVec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub width: u32,
    pub height: u32,
    /// Base ground height of every tile.
    #[serde(default)]
    pub ground: i32,
    /// Full row-major heightmap; overrides `ground` when present.
    #[serde(default)]
    pub heights: Option<Vec<i32>>,
    #[serde(default)]
    pub hills: Vec<Hill>,
    #[serde(default)]
    pub alliances: Vec<(PlayerId, PlayerId)>,
    #[serde(default = "yes")]
    pub shared_vision: bool,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub spotters: Vec<SpotterSpec>,
    #[serde(default)]
    pub moves: Vec<ScriptedMove>,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
}

fn one() -> i32 {
    1
}

fn yes() -> bool {
    true
}

fn default_ticks() -> u64 {
    20
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        tracing::debug!(
            target: "sightline::replay",
            width = scenario.width,
            height = scenario.height,
            objects = scenario.objects.len(),
            moves = scenario.moves.len(),
            "scenario.loaded"
        );
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Scenario::from_json_str(&contents)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if let Some(bad) = self.moves.iter().find(|m| m.object >= self.objects.len()) {
            return Err(ScenarioError::UnknownObject {
                tick: bad.tick,
                index: bad.object,
                count: self.objects.len(),
            });
        }
        Ok(())
    }

    /// Build the heightmap: base layer, then hills on top.
    pub fn build_grid(&self) -> Result<TerrainGrid, ScenarioError> {
        let mut grid = match &self.heights {
            Some(heights) => TerrainGrid::new(self.width, self.height, heights.clone())?,
            None => TerrainGrid::new(
                self.width,
                self.height,
                vec![self.ground; self.width as usize * self.height as usize],
            )?,
        };
        for hill in &self.hills {
            for dy in 0..hill.breadth.max(1) {
                for dx in 0..hill.width.max(1) {
                    grid.set_ground_height(hill.tile + IVec2::new(dx, dy), hill.height);
                }
            }
        }
        Ok(grid)
    }

    /// Moves scheduled for `tick`, in file order.
    pub fn moves_at(&self, tick: u64) -> impl Iterator<Item = &ScriptedMove> {
        self.moves.iter().filter(move |m| m.tick == tick)
    }
}

/// Demo scenario printed by `sightline-replay sample`.
pub const SAMPLE_SCENARIO: &str = r#"{
  "width": 48,
  "height": 48,
  "hills": [ { "tile": [20, 0], "width": 1, "breadth": 30, "height": 900 } ],
  "alliances": [ [0, 1] ],
  "objects": [
    { "owner": 0, "position": [1344, 1344], "sensor": { "radius": 1024, "class": "Vision" } },
    { "owner": 1, "position": [704, 2368], "sensor": { "radius": 1280, "class": "Radar" } },
    { "owner": 2, "position": [1728, 1344], "jammer": { "radius": 384 } },
    { "owner": 2, "kind": "Structure", "position": [3136, 1344],
      "footprint": { "width": 2, "breadth": 2 }, "silhouette": 300, "blocks_fire": true,
      "radar_detector": { "radius": 2560 } }
  ],
  "spotters": [ { "position": [4160, 4160], "player": 0, "radius": 512, "expiry": 10 } ],
  "moves": [ { "tick": 5, "object": 0, "to": [2112, 1344] } ],
  "ticks": 15
}"#;
