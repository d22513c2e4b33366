//! Player identity and the alliance relation consumed by the visibility core.
//!
//! Alliance state is game-rule data owned by an external collaborator.
//! The core only asks the questions in [`Alliances`].

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PLAYERS;

/// One bit per player slot.
pub type PlayerMask = u16;

/// A player slot. Valid slots are `0..MAX_PLAYERS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Index into per-player arrays, or `None` for an out-of-range slot.
    #[inline]
    pub fn index(self) -> Option<usize> {
        let idx = self.0 as usize;
        (idx < MAX_PLAYERS).then_some(idx)
    }

    /// Single-bit mask for this player, or 0 for an out-of-range slot.
    #[inline]
    pub fn mask(self) -> PlayerMask {
        self.index().map_or(0, |idx| 1 << idx)
    }

    /// Every valid player slot, in order.
    pub fn all() -> impl Iterator<Item = PlayerId> {
        (0..MAX_PLAYERS as u8).map(PlayerId)
    }
}

/// Questions the visibility core asks about player relations.
pub trait Alliances {
    /// Whether `a` and `b` are allied. Every player is allied with itself.
    fn is_allied(&self, a: PlayerId, b: PlayerId) -> bool;

    /// Whether a visibility grant to `a` is also a grant to `b`
    /// (self, or allied with shared vision enabled).
    fn shares_vision(&self, a: PlayerId, b: PlayerId) -> bool;

    /// Players whose explored bit is set when `player` explores a tile.
    fn exploration_mask(&self, player: PlayerId) -> PlayerMask;

    /// Players that receive grants made to `player`.
    fn vision_mask(&self, player: PlayerId) -> PlayerMask {
        PlayerId::all()
            .filter(|other| self.shares_vision(player, *other))
            .fold(0, |mask, other| mask | other.mask())
    }
}

/// Symmetric alliance matrix with a global shared-vision switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllianceTable {
    allied: [PlayerMask; MAX_PLAYERS],
    /// When set, allies share vision and exploration.
    pub shared_vision: bool,
}

impl Default for AllianceTable {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AllianceTable {
    /// Every player allied only with itself.
    pub fn new(shared_vision: bool) -> Self {
        let mut allied = [0; MAX_PLAYERS];
        for (idx, mask) in allied.iter_mut().enumerate() {
            *mask = 1 << idx;
        }
        Self {
            allied,
            shared_vision,
        }
    }

    /// Make `a` and `b` allies. Ignored for invalid slots.
    pub fn ally(&mut self, a: PlayerId, b: PlayerId) {
        if let (Some(ia), Some(ib)) = (a.index(), b.index()) {
            self.allied[ia] |= 1 << ib;
            self.allied[ib] |= 1 << ia;
        }
    }

    /// Break the alliance between `a` and `b`. A player stays allied with itself.
    pub fn break_alliance(&mut self, a: PlayerId, b: PlayerId) {
        if a == b {
            return;
        }
        if let (Some(ia), Some(ib)) = (a.index(), b.index()) {
            self.allied[ia] &= !(1 << ib);
            self.allied[ib] &= !(1 << ia);
        }
    }

    /// Allies of `player` (including itself), or 0 for an invalid slot.
    pub fn allies_of(&self, player: PlayerId) -> PlayerMask {
        player.index().map_or(0, |idx| self.allied[idx])
    }
}

impl Alliances for AllianceTable {
    fn is_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        self.allies_of(a) & b.mask() != 0
    }

    fn shares_vision(&self, a: PlayerId, b: PlayerId) -> bool {
        if a.index().is_none() || b.index().is_none() {
            return false;
        }
        a == b || (self.shared_vision && self.is_allied(a, b))
    }

    fn exploration_mask(&self, player: PlayerId) -> PlayerMask {
        if self.shared_vision {
            self.allies_of(player)
        } else {
            player.mask()
        }
    }

    fn vision_mask(&self, player: PlayerId) -> PlayerMask {
        self.exploration_mask(player)
    }
}
