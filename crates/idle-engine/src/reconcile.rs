//! Offline-progress reconciliation.
//!
//! Replays the wall-clock interval since a player's last update: passive
//! gains first, then the active activity stepped through alternating
//! energy depletion and recovery phases until the elapsed budget is
//! spent. The loop is variable-step; whole drain/recover cycles are
//! advanced in closed form so a multi-week gap costs a handful of
//! iterations rather than one per cycle.

use crate::{EngineError, EntityKind, Player};
use chrono::{DateTime, Utc};
use idle_core::{
    ActivityDef, ActivityId, Attribute, Catalog, EnergyId, ItemId, SkillId, StatKey,
    BASE_ENERGY_ID, STAMINA_SKILL_ID,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Budget below which the sub-step loop stops; floating-point division
/// can leave slivers that would otherwise spin forever.
pub const MIN_STEP_SECONDS: f64 = 1e-5;

/// Hard cap on sub-step iterations. Valid catalogs stay far below this;
/// hitting it is reported rather than looped through.
pub const MAX_STEPS: usize = 10_000;

/// Depleting the pool with this name feeds the stamina skill.
const STAMINA_POOL_NAME: &str = "energy";

/// Advance `player` to `now`, reconstructing everything that happened
/// while unobserved. Idempotent for a repeated timestamp: gaps under one
/// second are deliberately ignored.
pub fn reconcile(player: &mut Player, catalog: &Catalog, now: DateTime<Utc>) -> Result<(), EngineError> {
    if player.energies.is_empty() {
        return Err(EngineError::NoEnergyPool);
    }

    let dt = (now - player.last_update_time).num_milliseconds() as f64 / 1000.0;
    if dt < 1.0 {
        return Ok(());
    }

    let stamina_level_before = player
        .skills
        .get(&STAMINA_SKILL_ID)
        .map(|s| s.current_level);
    let exp_before: BTreeMap<SkillId, f64> = player
        .skills
        .iter()
        .map(|(id, s)| (*id, s.current_exp))
        .collect();
    let amount_before: BTreeMap<ItemId, f64> = player
        .items
        .iter()
        .map(|(id, i)| (*id, i.amount))
        .collect();

    // Resolve the active activity's references before anything is
    // granted, so a failed lookup does not leave passive gains applied
    // for a gap a retry would replay.
    let activity = match player.current_activity {
        Some(activity_id) => {
            let def = catalog
                .activities
                .get(&activity_id)
                .ok_or_else(|| {
                    EngineError::missing(EntityKind::Activity, activity_id.0.to_string())
                })?
                .clone();
            let refs = resolve_activity(player, catalog, &def)?;
            Some((def, refs))
        }
        None => None,
    };

    // Passive rates run regardless of the active activity.
    for item in player.items.values_mut() {
        item.passive_gain(dt);
    }
    for skill in player.skills.values_mut() {
        skill.passive_gain(dt);
    }

    match &activity {
        Some((def, refs)) => run_activity(player, def, refs, dt)?,
        None => {
            if let Some(base) = player.energies.get_mut(&BASE_ENERGY_ID) {
                if !base.is_full() {
                    base.recover(dt);
                }
            }
        }
    }

    // Net deltas for the caller's status display; entities adopted during
    // this call count their full amount as gained.
    for (id, item) in player.items.iter_mut() {
        item.last_gained = item.amount - amount_before.get(id).copied().unwrap_or(0.0);
    }
    for (id, skill) in player.skills.iter_mut() {
        skill.last_gained = skill.current_exp - exp_before.get(id).copied().unwrap_or(0.0);
    }

    // Stamina level defines the base pool's ceiling. The baseline anchor
    // moves with it so modifier recomputation does not undo the raise.
    let stamina_level_after = player
        .skills
        .get(&STAMINA_SKILL_ID)
        .map(|s| s.current_level);
    if let (Some(before), Some(after)) = (stamina_level_before, stamina_level_after) {
        if after > before {
            if let Some(base) = player.energies.get_mut(&BASE_ENERGY_ID) {
                base.max_energy = f64::from(after);
                base.base_max_energy = base.max_energy;
                base.current_energy = base.current_energy.min(base.max_energy);
                if base.is_full() {
                    base.recovering = false;
                }
            }
        }
    }

    player.time_since_last_update = dt;
    player.last_update_time = now;
    debug!(player = player.id, dt, "reconciled");
    Ok(())
}

/// Reconcile up to `now`, then swap the active activity.
pub fn change_activity(
    player: &mut Player,
    catalog: &Catalog,
    activity: Option<ActivityId>,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if let Some(id) = activity {
        if !catalog.activities.contains_key(&id) {
            return Err(EngineError::missing(EntityKind::Activity, id.0.to_string()));
        }
    }
    reconcile(player, catalog, now)?;
    player.current_activity = activity;
    Ok(())
}

/// Player-side handles for one activity run, resolved up front.
struct ActivityRefs {
    energy: EnergyId,
    feeds_stamina: bool,
    item: Option<ItemId>,
    skill: Option<SkillId>,
    gain_multiplier: f64,
}

/// Resolve the activity's named references against the player, adopting
/// catalog clones for the output item and trained skill on first use.
fn resolve_activity(
    player: &mut Player,
    catalog: &Catalog,
    activity: &ActivityDef,
) -> Result<ActivityRefs, EngineError> {
    let item = match &activity.output_item {
        Some(name) => Some(resolve_item(player, catalog, name)?),
        None => None,
    };
    let skill = match &activity.skill {
        Some(name) => Some(resolve_skill(player, catalog, name)?),
        None => None,
    };
    let (energy, feeds_stamina) = {
        let pool = player
            .energy_by_name(&activity.energy_type)
            .ok_or_else(|| EngineError::missing(EntityKind::Energy, activity.energy_type.clone()))?;
        (pool.id, pool.name.eq_ignore_ascii_case(STAMINA_POOL_NAME))
    };
    let gain_multiplier = activity
        .output_item
        .as_deref()
        .and_then(|name| player.stat_modifiers.get(&StatKey::new(name, Attribute::Gain)))
        .map(|m| m.multiplier)
        .unwrap_or(1.0);
    Ok(ActivityRefs {
        energy,
        feeds_stamina,
        item,
        skill,
        gain_multiplier,
    })
}

fn run_activity(
    player: &mut Player,
    activity: &ActivityDef,
    refs: &ActivityRefs,
    dt: f64,
) -> Result<(), EngineError> {
    let mut remaining = dt;
    let mut steps = 0usize;
    while remaining > MIN_STEP_SECONDS {
        steps += 1;
        if steps > MAX_STEPS {
            return Err(EngineError::IterationCap(MAX_STEPS));
        }

        let pool = pool_mut(player, refs.energy)?;
        if pool.recovering {
            remaining -= pool.recover(remaining);
            continue;
        }

        // At a cycle boundary with a deep budget, advance whole
        // drain-then-recover cycles in closed form; the arithmetic per
        // cycle is identical to stepping it.
        let cycle_seconds =
            pool.max_energy / activity.energy_drain_rate + pool.max_energy / pool.recovery_rate;
        if pool.is_full() && remaining > 2.0 * cycle_seconds {
            let cycles = (remaining / cycle_seconds - 1.0).floor();
            let elapsed = cycles * cycle_seconds;
            let activity_count = cycles * (pool.max_energy / activity.energy_drain_rate);
            let depleted = cycles * pool.max_energy;
            remaining -= elapsed;
            for p in player.energies.values_mut() {
                p.passive_recovery(elapsed);
            }
            grant(player, activity, refs, depleted, activity_count);
            continue;
        }

        for p in player.energies.values_mut() {
            p.passive_recovery(remaining);
        }
        let (depleted, activity_count) = {
            let pool = pool_mut(player, refs.energy)?;
            let energy_to_use = pool.current_energy.min(remaining * activity.energy_drain_rate);
            let activity_count = energy_to_use / activity.energy_drain_rate;
            (pool.deplete(energy_to_use), activity_count)
        };
        remaining -= activity_count;
        grant(player, activity, refs, depleted, activity_count);
    }

    Ok(())
}

/// Apply one slice's worth of activity output.
fn grant(
    player: &mut Player,
    activity: &ActivityDef,
    refs: &ActivityRefs,
    depleted: f64,
    activity_count: f64,
) {
    if refs.feeds_stamina && depleted > 0.0 {
        if let Some(stamina) = player.skills.get_mut(&STAMINA_SKILL_ID) {
            stamina.add_experience(depleted);
        }
    }
    if activity_count <= 0.0 {
        return;
    }
    if let Some(id) = refs.skill {
        if let Some(skill) = player.skills.get_mut(&id) {
            skill.add_experience(activity.skill_exp_rate * activity_count);
        }
    }
    if let Some(id) = refs.item {
        if let Some(item) = player.items.get_mut(&id) {
            item.add_amount(activity.output_amount * activity_count * refs.gain_multiplier);
        }
    }
}

fn pool_mut(player: &mut Player, id: EnergyId) -> Result<&mut idle_core::Energy, EngineError> {
    player
        .energies
        .get_mut(&id)
        .ok_or_else(|| EngineError::missing(EntityKind::Energy, id.0.to_string()))
}

/// Resolve an item by name against the player, adopting a catalog clone
/// on first use.
pub(crate) fn resolve_item(player: &mut Player, catalog: &Catalog, name: &str) -> Result<ItemId, EngineError> {
    if let Some(item) = player.item_by_name(name) {
        return Ok(item.id);
    }
    let item = catalog
        .item_by_name(name)
        .ok_or_else(|| EngineError::missing(EntityKind::Item, name))?
        .clone();
    let id = item.id;
    player.add_item(item);
    Ok(id)
}

/// Resolve a skill by name against the player, adopting a catalog clone
/// on first use.
fn resolve_skill(player: &mut Player, catalog: &Catalog, name: &str) -> Result<SkillId, EngineError> {
    if let Some(skill) = player.skill_by_name(name) {
        return Ok(skill.id);
    }
    let skill = catalog
        .skill_by_name(name)
        .ok_or_else(|| EngineError::missing(EntityKind::Skill, name))?
        .clone();
    let id = skill.id;
    player.add_skill(skill);
    Ok(id)
}
