//! Per-object, per-player visibility levels with fade-in and fade-out.
//!
//! Each tick starts with [`VisibilityLevels::begin_tick`] clearing the
//! instantaneous targets. Sight checks, blips and spotters then raise targets
//! through [`grant`](VisibilityLevels::grant), which multicasts to every
//! player sharing vision with the recipient. [`fade`](VisibilityLevels::fade)
//! finally moves the displayed level one bounded step toward the target.

use sightline_core::config::FadeConfig;
use sightline_core::constants::{MAX_PLAYERS, VIS_FULL};
use sightline_core::player::{Alliances, PlayerId, PlayerMask};

/// Visibility state of one object. Attached to every object entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityLevels {
    /// Level readers see, per player.
    pub shown: [u8; MAX_PLAYERS],
    /// Highest level granted during the current tick, per player.
    pub seen_this_tick: [u8; MAX_PLAYERS],
    /// Players that have ever seen the object.
    pub ever_seen: PlayerMask,
}

fn indices(mask: PlayerMask) -> impl Iterator<Item = usize> {
    (0..MAX_PLAYERS).filter(move |idx| mask & (1 << idx) != 0)
}

impl VisibilityLevels {
    pub fn begin_tick(&mut self) {
        self.seen_this_tick = [0; MAX_PLAYERS];
    }

    /// Raise this tick's target for `player` and everyone sharing its vision.
    pub fn grant(&mut self, player: PlayerId, level: u8, alliances: &impl Alliances) {
        for idx in indices(alliances.vision_mask(player)) {
            self.seen_this_tick[idx] = self.seen_this_tick[idx].max(level);
        }
    }

    /// Raise both target and displayed level at once, skipping the ramp.
    pub fn set_instant(&mut self, player: PlayerId, level: u8, alliances: &impl Alliances) {
        for idx in indices(alliances.vision_mask(player)) {
            self.seen_this_tick[idx] = self.seen_this_tick[idx].max(level);
            self.shown[idx] = self.shown[idx].max(level);
        }
    }

    /// Displayed level for `player`; 0 for an invalid slot.
    pub fn shown(&self, player: PlayerId) -> u8 {
        player.index().map_or(0, |idx| self.shown[idx])
    }

    /// This tick's target for `player`; 0 for an invalid slot.
    pub fn target(&self, player: PlayerId) -> u8 {
        player.index().map_or(0, |idx| self.seen_this_tick[idx])
    }

    /// Move every displayed level one step toward its target.
    ///
    /// The owner and its vision sharers always see the object at full
    /// visibility, without a ramp. Static objects never fade. Returns the
    /// players that saw the object for the first time.
    pub fn fade(
        &mut self,
        owner: PlayerId,
        step: FadeConfig,
        mobile: bool,
        alliances: &impl Alliances,
    ) -> PlayerMask {
        let owners = alliances.vision_mask(owner);
        let decrement = if mobile { step.decrement } else { 0 };
        let mut first = 0;

        for idx in 0..MAX_PLAYERS {
            let bit: PlayerMask = 1 << idx;
            let shown = self.shown[idx];
            let target = self.seen_this_tick[idx];
            self.shown[idx] = if owners & bit != 0 {
                VIS_FULL
            } else if shown < target {
                shown.saturating_add(step.increment).min(target)
            } else {
                shown.saturating_sub(decrement).max(target)
            };

            if self.shown[idx] > 0 && self.ever_seen & bit == 0 {
                self.ever_seen |= bit;
                first |= bit;
            }
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use sightline_core::player::AllianceTable;

    const STEP: FadeConfig = FadeConfig {
        increment: 51,
        decrement: 5,
    };

    #[test]
    fn test_fade_in_is_bounded() {
        let alliances = AllianceTable::default();
        let mut levels = VisibilityLevels::default();
        let mut history = Vec::new();
        for _ in 0..6 {
            levels.begin_tick();
            levels.grant(PlayerId(1), VIS_FULL, &alliances);
            levels.fade(PlayerId(0), STEP, true, &alliances);
            history.push(levels.shown(PlayerId(1)));
        }
        assert_eq!(history, vec![51, 102, 153, 204, 255, 255]);
    }

    #[test]
    fn test_fade_out_mobile_only() {
        let alliances = AllianceTable::default();
        let mut unit = VisibilityLevels::default();
        let mut tower = VisibilityLevels::default();
        for levels in [&mut unit, &mut tower] {
            levels.set_instant(PlayerId(2), 200, &alliances);
        }
        for _ in 0..3 {
            unit.begin_tick();
            tower.begin_tick();
            unit.fade(PlayerId(0), STEP, true, &alliances);
            tower.fade(PlayerId(0), STEP, false, &alliances);
        }
        assert_eq!(unit.shown(PlayerId(2)), 185);
        assert_eq!(tower.shown(PlayerId(2)), 200);
    }

    #[test]
    fn test_step_bound_and_monotone_approach() {
        let alliances = AllianceTable::default();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut levels = VisibilityLevels::default();
        for _ in 0..500 {
            let target: u8 = rng.gen();
            let mobile = rng.gen_bool(0.7);
            let before = levels.shown(PlayerId(3));
            levels.begin_tick();
            levels.grant(PlayerId(3), target, &alliances);
            levels.fade(PlayerId(0), STEP, mobile, &alliances);
            let after = levels.shown(PlayerId(3));

            let moved = after as i32 - before as i32;
            assert!(moved <= STEP.increment as i32);
            assert!(-moved <= STEP.decrement as i32);
            // Never overshoots and never moves away from the target.
            if before <= target {
                assert!(after >= before && after <= target);
            } else {
                assert!(after <= before && after >= target || !mobile && after == before);
            }
        }
    }

    #[test]
    fn test_grant_multicasts_to_vision_sharers() {
        let mut alliances = AllianceTable::new(true);
        alliances.ally(PlayerId(1), PlayerId(2));
        let mut levels = VisibilityLevels::default();
        levels.grant(PlayerId(1), 90, &alliances);
        assert_eq!(levels.target(PlayerId(1)), 90);
        assert_eq!(levels.target(PlayerId(2)), 90);
        assert_eq!(levels.target(PlayerId(3)), 0);

        alliances.shared_vision = false;
        levels.begin_tick();
        levels.grant(PlayerId(1), 90, &alliances);
        assert_eq!(levels.target(PlayerId(2)), 0);
    }

    #[test]
    fn test_owner_always_full() {
        let alliances = AllianceTable::default();
        let mut levels = VisibilityLevels::default();
        levels.begin_tick();
        levels.fade(PlayerId(4), STEP, true, &alliances);
        assert_eq!(levels.shown(PlayerId(4)), VIS_FULL);
        assert_eq!(levels.shown(PlayerId(5)), 0);
    }

    #[test]
    fn test_first_sighting_reported_once() {
        let alliances = AllianceTable::default();
        let mut levels = VisibilityLevels::default();

        levels.begin_tick();
        let first = levels.fade(PlayerId(0), STEP, true, &alliances);
        assert_eq!(first, PlayerId(0).mask());

        levels.begin_tick();
        levels.grant(PlayerId(6), 100, &alliances);
        assert_eq!(levels.fade(PlayerId(0), STEP, true, &alliances), PlayerId(6).mask());

        // Seen again after fading out: no second report.
        for _ in 0..30 {
            levels.begin_tick();
            levels.fade(PlayerId(0), STEP, true, &alliances);
        }
        assert_eq!(levels.shown(PlayerId(6)), 0);
        levels.begin_tick();
        levels.grant(PlayerId(6), 100, &alliances);
        assert_eq!(levels.fade(PlayerId(0), STEP, true, &alliances), 0);
    }

    #[test]
    fn test_invalid_player_reads_zero() {
        let levels = VisibilityLevels::default();
        assert_eq!(levels.shown(PlayerId(77)), 0);
        assert_eq!(levels.target(PlayerId(77)), 0);
    }
}
