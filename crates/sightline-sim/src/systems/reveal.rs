//! Reveal system: refreshes the ledger for objects whose reveal went stale.
//!
//! Every stale object is unrevealed before any is revealed again, so counters
//! never see a new increment stacked on an old one for the same source.

use hecs::{Entity, World};

use sightline_core::components::{Jammer, Owner, RevealDirty, Sensor, Silhouette, WatchedTiles};
use sightline_core::player::Alliances;
use sightline_core::types::Position;

use crate::ledger::{RevealContext, TileLedger, Viewer};

/// Returns the number of objects revealed.
pub fn run<A: Alliances>(
    world: &mut World,
    ledger: &mut TileLedger,
    ctx: &mut RevealContext<'_, A>,
) -> usize {
    let mut dirty: Vec<Entity> = world
        .query_mut::<&RevealDirty>()
        .into_iter()
        .map(|(entity, _)| entity)
        .collect();
    if dirty.is_empty() {
        return 0;
    }
    dirty.sort_by_key(|e| e.to_bits());

    for &entity in &dirty {
        if let Ok(mut watched) = world.get::<&mut WatchedTiles>(entity) {
            ledger.unreveal_from(&mut watched);
        }
    }

    for &entity in &dirty {
        let viewer = {
            let Ok(mut query) = world.query_one::<(
                &Position,
                &Owner,
                &Silhouette,
                Option<&Sensor>,
                Option<&Jammer>,
            )>(entity) else {
                continue;
            };
            let Some((pos, owner, silhouette, sensor, jammer)) = query.get() else {
                continue;
            };
            Viewer {
                pos: *pos,
                player: owner.0,
                silhouette: silhouette.0,
                sensor: sensor.copied(),
                jammer: jammer.copied(),
            }
        };
        if viewer.sensor.is_none() && viewer.jammer.is_none() {
            continue;
        }
        if let Ok(mut watched) = world.get::<&mut WatchedTiles>(entity) {
            ledger.reveal_from(&viewer, ctx, &mut watched);
        }
    }

    for &entity in &dirty {
        let _ = world.remove_one::<RevealDirty>(entity);
    }
    tracing::debug!(target: "sightline::reveal", objects = dirty.len(), "reveal.refreshed");
    dirty.len()
}
