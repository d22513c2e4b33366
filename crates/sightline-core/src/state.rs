//! Visibility snapshot: the stabilized state readers consume after each tick.
//!
//! Renderers and network layers read the snapshot of the last completed tick,
//! never the in-progress ledger counters.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PLAYERS;
use crate::enums::ObjectKind;
use crate::events::VisibilityEvent;
use crate::player::PlayerId;
use crate::types::{Position, SimTime};

/// Complete visibility state produced by one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisibilitySnapshot {
    pub time: SimTime,
    pub objects: Vec<ObjectView>,
    pub players: Vec<PlayerView>,
    pub spotters: usize,
    pub events: Vec<VisibilityEvent>,
}

/// Per-object visibility levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectView {
    /// Stable handle bits of the object.
    pub id: u64,
    pub owner: PlayerId,
    pub kind: ObjectKind,
    pub position: Position,
    pub levels: [u8; MAX_PLAYERS],
}

/// Per-player tile summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerView {
    pub player: PlayerId,
    pub explored_tiles: usize,
    pub visible_tiles: usize,
}

impl VisibilitySnapshot {
    /// Level of object `id` for `player`, 0 when unknown.
    pub fn level(&self, id: u64, player: PlayerId) -> u8 {
        let Some(idx) = player.index() else {
            return 0;
        };
        self.objects
            .iter()
            .find(|view| view.id == id)
            .map_or(0, |view| view.levels[idx])
    }
}
