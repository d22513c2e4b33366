//! Index system: rebuilds the point tree from every live object.

use hecs::{Entity, World};

use sightline_core::types::Position;

use crate::levels::VisibilityLevels;
use crate::spatial::{Filter, PointTree};

/// Reinsert every object, sort, and reset each per-player filter.
pub fn rebuild(world: &World, index: &mut PointTree<Entity>, filters: &mut [Filter]) {
    index.clear();
    for (entity, (pos, _)) in world.query::<(&Position, &VisibilityLevels)>().iter() {
        index.insert(entity, pos.x, pos.y);
    }
    index.sort();
    for filter in filters.iter_mut() {
        filter.reset(index);
    }
}
