//! Events emitted by the visibility pipeline for UI and audio feedback.

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// Notifications produced during a tick and drained into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VisibilityEvent {
    /// An object became visible to a player for the first time.
    FirstSighting { object: u64, player: PlayerId },
    /// A spotter reached its expiry tick and was withdrawn.
    SpotterExpired { spotter: u32, player: PlayerId },
}
