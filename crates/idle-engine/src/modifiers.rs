//! Modifier aggregation pipeline.
//!
//! Rebuilds a player's stat table from scratch in ordered passes:
//! priority upgrades (those targeting another upgrade's effect values)
//! first, then skill bonuses, then the remaining upgrades and completed
//! tasks. Derived attributes are reset to their baselines before the
//! table is reapplied; without that reset, multipliers would compound
//! across calls.

use crate::{EngineError, EntityKind, OwnedUpgrade, Player};
use idle_core::{Attribute, Catalog, EffectMap, ModifierTable, StatKey, UpgradeId};
use std::collections::BTreeSet;
use tracing::trace;

/// Re-derive `player.stat_modifiers` and every modified attribute from
/// owned upgrades, skill levels, and completed tasks.
///
/// Deterministic in `(upgrades, skills, tasks_completed, baselines)` and
/// idempotent: consecutive calls with no state change in between produce
/// identical tables and identical derived attributes.
pub fn recompute_modifiers(player: &mut Player, catalog: &Catalog) -> Result<(), EngineError> {
    reset_to_baseline(player, catalog)?;

    let mut table = ModifierTable::new();

    let priority: BTreeSet<UpgradeId> = player
        .upgrades
        .values()
        .filter(|owned| is_priority(owned))
        .map(|owned| owned.def.id)
        .collect();

    // Pass 1: priority upgrades, then immediately rewrite the upgrades
    // they target so later passes fold the boosted effect values.
    for owned in player.upgrades.values() {
        if priority.contains(&owned.def.id) {
            fold_effects(&mut table, &owned.def.effects, owned.count);
        }
    }
    apply_upgrade_modifiers(player, &table);

    // Pass 2: skill bonuses, once per level gained above the start level.
    for skill in player.skills.values() {
        fold_effects(&mut table, &skill.effects, skill.bonus_levels());
    }

    // Pass 3: remaining upgrades and completed tasks.
    for owned in player.upgrades.values() {
        if !priority.contains(&owned.def.id) {
            fold_effects(&mut table, &owned.def.effects, owned.count);
        }
    }
    for (task_id, completions) in &player.tasks_completed {
        let task = catalog
            .tasks
            .get(task_id)
            .ok_or_else(|| EngineError::missing(EntityKind::Task, task_id.0.to_string()))?;
        fold_effects(&mut table, &task.effects, *completions);
    }

    apply_upgrade_modifiers(player, &table);
    apply_item_modifiers(player, &table);
    apply_energy_modifiers(player, &table);

    trace!(
        player = player.id,
        stats = table.len(),
        "recomputed modifiers"
    );
    player.stat_modifiers = table;
    Ok(())
}

/// Restore every modifier-derived attribute to its baseline: item
/// capacities and energy attributes from their own `base_*` anchors,
/// upgrade purchase caps, costs, and effect values from the catalog.
/// Held amounts are left alone; the apply passes clamp them against the
/// final capacities, so value above a baseline cap survives the reset.
pub fn reset_to_baseline(player: &mut Player, catalog: &Catalog) -> Result<(), EngineError> {
    for item in player.items.values_mut() {
        item.capacity = item.base_capacity;
    }
    for energy in player.energies.values_mut() {
        energy.max_energy = energy.base_max_energy;
        energy.recovery_rate = energy.base_recovery_rate;
    }
    for owned in player.upgrades.values_mut() {
        let def = catalog
            .upgrades
            .get(&owned.def.id)
            .ok_or_else(|| EngineError::missing(EntityKind::Upgrade, owned.def.name.clone()))?;
        owned.def.max_purchases = def.max_purchases;
        owned.def.cost = def.cost;
        owned.def.effects = def.effects.clone();
    }
    Ok(())
}

/// An upgrade is "priority" when any of its effects targets another
/// upgrade's effect values.
fn is_priority(owned: &OwnedUpgrade) -> bool {
    owned
        .def
        .effects
        .keys()
        .any(|key| key.attribute == Attribute::Effects)
}

fn fold_effects(table: &mut ModifierTable, effects: &EffectMap, times: u32) {
    for (key, effect) in effects {
        let modifier = table.entry(key.clone()).or_default();
        for _ in 0..times {
            modifier.fold(effect);
        }
    }
}

/// Rewrite upgrade attributes named by the table: nested effect values
/// for `*.effects` keys, purchase caps and costs for the numeric ones.
pub fn apply_upgrade_modifiers(player: &mut Player, table: &ModifierTable) {
    for (key, modifier) in table {
        let Some(owned) = player
            .upgrades
            .values_mut()
            .find(|u| u.def.name.eq_ignore_ascii_case(&key.target))
        else {
            continue;
        };
        match key.attribute {
            Attribute::Effects => {
                for effect in owned.def.effects.values_mut() {
                    effect.value = modifier.apply(effect.value);
                }
            }
            Attribute::MaxPurchases => {
                owned.def.max_purchases =
                    modifier.apply(f64::from(owned.def.max_purchases)).round().max(0.0) as u32;
            }
            Attribute::Cost => {
                owned.def.cost = modifier.apply(owned.def.cost);
            }
            _ => {}
        }
    }
}

/// Apply `<item>.capacity` modifiers to owned items.
pub fn apply_item_modifiers(player: &mut Player, table: &ModifierTable) {
    for item in player.items.values_mut() {
        if let Some(modifier) = table.get(&StatKey::new(&item.name, Attribute::Capacity)) {
            item.capacity = modifier.apply(item.capacity);
        }
        item.amount = item.amount.min(item.capacity);
    }
}

/// Apply `<energy>.max_energy` and `<energy>.recovery_rate` modifiers to
/// owned pools.
pub fn apply_energy_modifiers(player: &mut Player, table: &ModifierTable) {
    for energy in player.energies.values_mut() {
        if let Some(modifier) = table.get(&StatKey::new(&energy.name, Attribute::MaxEnergy)) {
            energy.max_energy = modifier.apply(energy.max_energy);
        }
        if let Some(modifier) = table.get(&StatKey::new(&energy.name, Attribute::RecoveryRate)) {
            energy.recovery_rate = modifier.apply(energy.recovery_rate);
        }
        energy.current_energy = energy.current_energy.min(energy.max_energy);
    }
}
