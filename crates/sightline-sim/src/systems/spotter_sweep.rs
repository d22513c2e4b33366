//! Spotter sweep: expires spotters, then grants full visibility around the rest.

use hecs::{Entity, World};

use sightline_core::constants::VIS_FULL;
use sightline_core::events::VisibilityEvent;
use sightline_core::player::Alliances;

use crate::ledger::TileLedger;
use crate::levels::VisibilityLevels;
use crate::spatial::PointTree;
use crate::spotters::SpotterRegistry;

/// Must run after the index rebuild and `fade::begin_tick`, before the
/// vision pass, so spotter grants land in this tick's targets.
pub fn run(
    world: &mut World,
    spotters: &mut SpotterRegistry,
    ledger: &mut TileLedger,
    index: &mut PointTree<Entity>,
    alliances: &impl Alliances,
    tick: u64,
    events: &mut Vec<VisibilityEvent>,
) {
    for (spotter, player) in spotters.sweep(tick, ledger) {
        events.push(VisibilityEvent::SpotterExpired { spotter, player });
    }

    let mut spotted: Vec<Entity> = Vec::new();
    for spotter in spotters.iter() {
        spotted.clear();
        spotted.extend_from_slice(index.query(spotter.pos.x, spotter.pos.y, spotter.radius()));
        for &entity in &spotted {
            if let Ok(mut levels) = world.get::<&mut VisibilityLevels>(entity) {
                levels.set_instant(spotter.player(), VIS_FULL, alliances);
            }
        }
        tracing::trace!(
            target: "sightline::spotters",
            id = spotter.id,
            objects = spotted.len(),
            "spotter.grant"
        );
    }
}
