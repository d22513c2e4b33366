//! Configuration for the visibility pipeline.
//!
//! Loaded from `visibility_config.json`, with an environment variable override
//! for the path and an embedded builtin copy as the fallback.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::TILE_UNITS;

pub const BUILTIN_VISIBILITY_CONFIG: &str = include_str!("data/visibility_config.json");

/// Environment variable naming an alternative config file.
pub const VISIBILITY_CONFIG_ENV: &str = "SIGHTLINE_VISIBILITY_CONFIG";

/// Root configuration for the visibility pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    pub fade: FadeConfig,
    /// Level granted to objects detected only through sensors or radar detectors.
    pub blip_level: u8,
    /// Tiles revealed by vision sensors within this range (world units)
    /// count as watched; farther tiles count as sensed.
    pub watcher_range: i32,
    /// Height leeway (world units) so objects standing slightly above a
    /// hidden tile stay visible. Also the minimum eye height of a viewer.
    pub min_vis_height: i32,
    /// Whether structures block direct sight checks.
    pub walls_block_sight: bool,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            fade: FadeConfig::default(),
            blip_level: 128,
            watcher_range: 8 * TILE_UNITS,
            min_vis_height: 80,
            walls_block_sight: true,
        }
    }
}

/// Per-tick steps of the visibility level ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    /// Maximum rise per tick.
    pub increment: u8,
    /// Maximum fall per tick for mobile objects.
    pub decrement: u8,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            increment: 51,
            decrement: 5,
        }
    }
}

impl VisibilityConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_VISIBILITY_CONFIG)
                .expect("builtin visibility config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: VisibilityConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        VisibilityConfig::from_json_str(&contents)
    }

    /// Reject values that would stall or invert the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fade.increment == 0 {
            return Err(ConfigError::Invalid {
                field: "fade.increment",
                reason: "must be positive or objects never appear".to_string(),
            });
        }
        if self.blip_level == 0 {
            return Err(ConfigError::Invalid {
                field: "blip_level",
                reason: "must be positive".to_string(),
            });
        }
        if self.watcher_range < 0 {
            return Err(ConfigError::Invalid {
                field: "watcher_range",
                reason: format!("{} is negative", self.watcher_range),
            });
        }
        if self.min_vis_height < 0 {
            return Err(ConfigError::Invalid {
                field: "min_vis_height",
                reason: format!("{} is negative", self.min_vis_height),
            });
        }
        Ok(())
    }

    /// `watcher_range` squared, for comparisons against squared distances.
    pub fn watcher_range_sq(&self) -> i64 {
        let range = self.watcher_range as i64;
        range * range
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse visibility config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read visibility config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid visibility config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Load the config named by [`VISIBILITY_CONFIG_ENV`], falling back to the builtin.
pub fn load_visibility_config_from_env() -> Arc<VisibilityConfig> {
    if let Ok(path) = env::var(VISIBILITY_CONFIG_ENV) {
        let path = PathBuf::from(path);
        match VisibilityConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "sightline::config",
                    path = %path.display(),
                    "visibility_config.loaded=file"
                );
                return Arc::new(config);
            }
            Err(err) => {
                tracing::warn!(
                    target: "sightline::config",
                    path = %path.display(),
                    error = %err,
                    "visibility_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "sightline::config", "visibility_config.loaded=builtin");
    VisibilityConfig::builtin()
}
