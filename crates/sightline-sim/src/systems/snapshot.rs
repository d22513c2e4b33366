//! Snapshot system: queries the ECS world and builds a complete VisibilitySnapshot.
//!
//! Read-only; it never modifies the world.

use hecs::World;

use sightline_core::components::{Kind, Owner};
use sightline_core::events::VisibilityEvent;
use sightline_core::player::{Alliances, PlayerId, PlayerMask};
use sightline_core::state::{ObjectView, PlayerView, VisibilitySnapshot};
use sightline_core::types::{Position, SimTime};

use crate::ledger::TileLedger;
use crate::levels::VisibilityLevels;

/// Build a complete VisibilitySnapshot from the current world state.
pub fn build_snapshot(
    world: &World,
    time: &SimTime,
    ledger: &TileLedger,
    alliances: &impl Alliances,
    spotters: usize,
    events: Vec<VisibilityEvent>,
) -> VisibilitySnapshot {
    let objects = build_objects(world);
    let owners = objects
        .iter()
        .fold(0 as PlayerMask, |mask, view| mask | view.owner.mask());

    VisibilitySnapshot {
        time: *time,
        players: build_players(ledger, alliances, owners),
        objects,
        spotters,
        events,
    }
}

/// Build ObjectView list, ordered by id so output is stable.
fn build_objects(world: &World) -> Vec<ObjectView> {
    let mut objects: Vec<ObjectView> = world
        .query::<(&Owner, &Kind, &Position, &VisibilityLevels)>()
        .iter()
        .map(|(entity, (owner, kind, pos, levels))| ObjectView {
            id: entity.to_bits().get(),
            owner: owner.0,
            kind: kind.0,
            position: *pos,
            levels: levels.shown,
        })
        .collect();
    objects.sort_by_key(|view| view.id);
    objects
}

/// One PlayerView per player that owns an object or has explored anything.
fn build_players(
    ledger: &TileLedger,
    alliances: &impl Alliances,
    owners: PlayerMask,
) -> Vec<PlayerView> {
    PlayerId::all()
        .filter_map(|player| {
            let explored_tiles = ledger.explored_count(player);
            if explored_tiles == 0 && owners & player.mask() == 0 {
                return None;
            }
            Some(PlayerView {
                player,
                explored_tiles,
                visible_tiles: ledger.visible_count(player, alliances),
            })
        })
        .collect()
}
