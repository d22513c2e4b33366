//! Fade system: clears per-tick targets and steps displayed levels.

use hecs::World;

use sightline_core::components::{footprint_tiles, Footprint, Kind, Owner};
use sightline_core::config::FadeConfig;
use sightline_core::events::VisibilityEvent;
use sightline_core::player::{Alliances, PlayerId};
use sightline_core::types::Position;

use crate::ledger::TileLedger;
use crate::levels::VisibilityLevels;

/// Reset every object's "seen this tick" targets.
pub fn begin_tick(world: &mut World) {
    for (_entity, levels) in world.query_mut::<&mut VisibilityLevels>() {
        levels.begin_tick();
    }
}

/// Step every object's levels toward this tick's targets.
///
/// The first time a player sees an object, the tiles under it become
/// explored for that player and a `FirstSighting` event is queued (except
/// for the owner's own side, which always sees its objects).
pub fn run(
    world: &mut World,
    ledger: &mut TileLedger,
    alliances: &impl Alliances,
    step: FadeConfig,
    events: &mut Vec<VisibilityEvent>,
) {
    let mut sightings = Vec::new();
    for (entity, (levels, owner, kind, pos, footprint)) in world.query_mut::<(
        &mut VisibilityLevels,
        &Owner,
        &Kind,
        &Position,
        Option<&Footprint>,
    )>() {
        let first = levels.fade(owner.0, step, kind.0.is_mobile(), alliances);
        if first != 0 {
            let footprint = footprint.copied().unwrap_or(Footprint::SINGLE);
            sightings.push((entity, owner.0, first, pos.tile(), footprint));
        }
    }
    sightings.sort_by_key(|(entity, ..)| entity.to_bits());

    for (entity, owner, first, center, footprint) in sightings {
        for tile in footprint_tiles(center, footprint) {
            ledger.mark_explored(first, tile);
        }
        let own_side = alliances.vision_mask(owner);
        for player in PlayerId::all().filter(|p| first & p.mask() != 0) {
            if own_side & player.mask() == 0 {
                events.push(VisibilityEvent::FirstSighting {
                    object: entity.to_bits().get(),
                    player,
                });
            }
        }
    }
}
