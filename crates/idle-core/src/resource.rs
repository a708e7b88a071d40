//! Resource primitives: energy pools, skills, and items.
//!
//! These are the per-player mutable instances. Each is cloned out of the
//! definition catalog once, at registration or lazy adoption, and carries
//! its own `base_*` fields so derived attributes can be re-baselined
//! before modifiers are reapplied.

use crate::{EffectMap, EnergyId, ItemId, SkillId};
use serde::{Deserialize, Serialize};

/// A depletable, recoverable pool gating how long an activity can run.
///
/// Invariant: `0 <= current_energy <= max_energy`. `recovering` is set
/// exactly when the pool hits zero and cleared when it refills.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Energy {
    pub id: EnergyId,
    pub name: String,
    pub max_energy: f64,
    /// Re-baseline anchor for `max_energy`; raised permanently by the
    /// stamina coupling, never touched by modifiers.
    pub base_max_energy: f64,
    pub current_energy: f64,
    pub recovery_rate: f64,
    pub base_recovery_rate: f64,
    pub passive_recovery_rate: f64,
    pub recovering: bool,
}

impl Energy {
    /// A fresh pool starts full.
    pub fn new(id: EnergyId, name: &str, max_energy: f64, recovery_rate: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            max_energy,
            base_max_energy: max_energy,
            current_energy: max_energy,
            recovery_rate,
            base_recovery_rate: recovery_rate,
            passive_recovery_rate: 0.0,
            recovering: false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_energy >= self.max_energy
    }

    /// Trickle recovery that runs even while an activity is draining the
    /// pool. Additive and clamped; the original implementation overwrote
    /// `current_energy` here, which reset manual recovery progress and is
    /// treated as a defect.
    pub fn passive_recovery(&mut self, seconds: f64) {
        if self.passive_recovery_rate > 0.0 {
            self.current_energy =
                (self.current_energy + self.passive_recovery_rate * seconds).min(self.max_energy);
        }
    }

    /// Recover for up to `seconds`, returning the seconds actually spent
    /// at `recovery_rate`. The pool may fill before the budget runs out,
    /// in which case the caller keeps the remainder.
    pub fn recover(&mut self, seconds: f64) -> f64 {
        self.passive_recovery(seconds);
        if self.recovery_rate <= 0.0 {
            // Rejected at catalog load; consuming the budget here keeps
            // the sub-step loop terminating if one slips through.
            return seconds;
        }
        let start = self.current_energy;
        self.current_energy = (self.current_energy + seconds * self.recovery_rate).min(self.max_energy);
        if self.current_energy >= self.max_energy {
            self.recovering = false;
        }
        (self.current_energy - start) / self.recovery_rate
    }

    /// Remove up to `amount`, returning what was actually removed.
    pub fn deplete(&mut self, amount: f64) -> f64 {
        let start = self.current_energy;
        self.current_energy = (self.current_energy - amount).max(0.0);
        if self.current_energy == 0.0 {
            self.recovering = true;
        }
        start - self.current_energy
    }
}

/// A levellable skill with geometric experience requirements.
///
/// Invariant: `start_level <= current_level <= max_level`. Experience is
/// cumulative; requirements grow per level and collapse to zero at the
/// cap, where further gain is a no-op.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub description: String,
    pub base_exp_requirement: f64,
    pub scaling_factor: f64,
    pub max_level: u32,
    pub start_level: u32,
    pub current_level: u32,
    pub current_exp: f64,
    pub passive_exp_rate: f64,
    /// Experience gained by the most recent reconciliation.
    pub last_gained: f64,
    /// Stat bonuses granted once per level above `start_level`.
    pub effects: EffectMap,
}

impl Skill {
    pub fn new(
        id: SkillId,
        name: &str,
        base_exp_requirement: f64,
        scaling_factor: f64,
        start_level: u32,
        max_level: u32,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            base_exp_requirement,
            scaling_factor,
            max_level,
            start_level,
            current_level: start_level,
            current_exp: 0.0,
            passive_exp_rate: 0.0,
            last_gained: 0.0,
            effects: EffectMap::new(),
        }
    }

    /// Total experience needed to reach the next level, or zero at the cap.
    pub fn exp_to_next_level(&self) -> f64 {
        if self.current_level >= self.max_level {
            return 0.0;
        }
        self.base_exp_requirement
            * self
                .scaling_factor
                .powi((self.current_level - self.start_level) as i32)
    }

    /// Accumulate experience and level up while thresholds are crossed.
    /// Returns whether any level was gained. No-op at max level.
    pub fn add_experience(&mut self, amount: f64) -> bool {
        if self.current_level >= self.max_level {
            return false;
        }
        self.current_exp += amount;
        let mut levelled_up = false;
        while self.current_level < self.max_level && self.current_exp >= self.exp_to_next_level() {
            self.current_level += 1;
            levelled_up = true;
        }
        levelled_up
    }

    pub fn passive_gain(&mut self, seconds: f64) {
        if self.passive_exp_rate > 0.0 {
            self.add_experience(self.passive_exp_rate * seconds);
        }
    }

    /// Levels gained beyond the starting level; each applies the skill's
    /// effects once during modifier aggregation.
    pub fn bonus_levels(&self) -> u32 {
        self.current_level.saturating_sub(self.start_level)
    }
}

/// A countable resource with a storage cap.
///
/// Invariant: `0 <= amount <= capacity`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub amount: f64,
    pub capacity: f64,
    /// Re-baseline anchor for `capacity`.
    pub base_capacity: f64,
    /// Signed clamped delta recorded by the latest `add_amount`.
    pub last_gained: f64,
    pub passive_gain_rate: f64,
}

impl Item {
    pub fn new(id: ItemId, name: &str, capacity: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            amount: 0.0,
            capacity,
            base_capacity: capacity,
            last_gained: 0.0,
            passive_gain_rate: 0.0,
        }
    }

    /// Add (or remove, for negative `amount`) and clamp into
    /// `[0, capacity]`, recording the clamped delta as `last_gained`.
    pub fn add_amount(&mut self, amount: f64) {
        let start = self.amount;
        self.amount = (self.amount + amount).clamp(0.0, self.capacity);
        self.last_gained = self.amount - start;
    }

    pub fn passive_gain(&mut self, seconds: f64) {
        if self.passive_gain_rate > 0.0 {
            self.add_amount(self.passive_gain_rate * seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pool() -> Energy {
        Energy::new(EnergyId(0), "energy", 10.0, 1.0)
    }

    #[test]
    fn deplete_clamps_and_flags_recovering() {
        let mut e = pool();
        assert_eq!(e.deplete(4.0), 4.0);
        assert!(!e.recovering);
        assert_eq!(e.deplete(100.0), 6.0);
        assert_eq!(e.current_energy, 0.0);
        assert!(e.recovering);
    }

    #[test]
    fn recover_reports_seconds_consumed() {
        let mut e = pool();
        e.deplete(10.0);
        // 3 seconds at 1/s recovers 3 energy and consumes 3 seconds.
        assert_eq!(e.recover(3.0), 3.0);
        assert!(e.recovering);
        // A 100-second budget only needs 7 more seconds to fill.
        assert_eq!(e.recover(100.0), 7.0);
        assert!(e.is_full());
        assert!(!e.recovering);
    }

    #[test]
    fn passive_recovery_is_additive() {
        let mut e = pool();
        e.passive_recovery_rate = 0.5;
        e.deplete(10.0);
        e.recovering = false;
        e.current_energy = 4.0;
        e.passive_recovery(2.0);
        assert_eq!(e.current_energy, 5.0);
        e.passive_recovery(100.0);
        assert_eq!(e.current_energy, 10.0);
    }

    #[test]
    fn skill_levels_through_thresholds() {
        let mut s = Skill::new(SkillId(0), "stamina", 10.0, 2.0, 1, 5);
        assert_eq!(s.exp_to_next_level(), 10.0);
        assert!(s.add_experience(10.0));
        assert_eq!(s.current_level, 2);
        assert_eq!(s.exp_to_next_level(), 20.0);
        // 10 (held) + 60 = 70 crosses the 20 and 40 thresholds.
        assert!(s.add_experience(60.0));
        assert_eq!(s.current_level, 4);
    }

    #[test]
    fn skill_gain_is_noop_at_cap() {
        let mut s = Skill::new(SkillId(0), "stamina", 10.0, 2.0, 1, 2);
        assert!(s.add_experience(1000.0));
        assert_eq!(s.current_level, 2);
        assert_eq!(s.exp_to_next_level(), 0.0);
        let exp = s.current_exp;
        assert!(!s.add_experience(50.0));
        assert_eq!(s.current_exp, exp);
    }

    #[test]
    fn item_clamps_to_capacity_and_records_delta() {
        let mut i = Item::new(ItemId(0), "coin", 5.0);
        i.add_amount(3.0);
        assert_eq!(i.last_gained, 3.0);
        i.add_amount(10.0);
        assert_eq!(i.amount, 5.0);
        assert_eq!(i.last_gained, 2.0);
        i.add_amount(1.0);
        assert_eq!(i.last_gained, 0.0);
        i.add_amount(-8.0);
        assert_eq!(i.amount, 0.0);
        assert_eq!(i.last_gained, -5.0);
    }

    proptest! {
        #[test]
        fn energy_bounds_hold(ops in prop::collection::vec((any::<bool>(), 0.0f64..1000.0), 0..50)) {
            let mut e = pool();
            for (recover, x) in ops {
                if recover {
                    e.recover(x);
                } else {
                    e.deplete(x);
                }
                prop_assert!(e.current_energy >= 0.0);
                prop_assert!(e.current_energy <= e.max_energy);
            }
        }

        #[test]
        fn item_bounds_hold(deltas in prop::collection::vec(-500.0f64..500.0, 0..50)) {
            let mut i = Item::new(ItemId(0), "coin", 100.0);
            for d in deltas {
                i.add_amount(d);
                prop_assert!(i.amount >= 0.0);
                prop_assert!(i.amount <= i.capacity);
            }
        }

        #[test]
        fn skill_level_stays_in_range(gains in prop::collection::vec(0.0f64..1e6, 0..30)) {
            let mut s = Skill::new(SkillId(1), "begging", 10.0, 1.5, 1, 20);
            for g in gains {
                s.add_experience(g);
                prop_assert!(s.current_level >= s.start_level);
                prop_assert!(s.current_level <= s.max_level);
            }
        }
    }
}
