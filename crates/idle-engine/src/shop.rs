//! Purchases, tasks, and unlock evaluation.
//!
//! Failure to afford or to qualify is an outcome, not an error: callers
//! surface [`PurchaseOutcome`] and [`TaskOutcome`] to the player, while
//! `Err` is reserved for content that references definitions which do
//! not exist.

use crate::modifiers::recompute_modifiers;
use crate::reconcile::resolve_item;
use crate::{EngineError, EntityKind, Player};
use idle_core::{
    ActivityDef, Catalog, Condition, EnergyId, ItemId, TaskDef, TaskId, UpgradeDef, UpgradeId,
};
use tracing::debug;

/// Result of a purchase attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased,
    InsufficientFunds,
    /// The purchase would exceed the upgrade's (possibly modified) cap.
    MaxedOut,
    /// Unlock conditions are not met.
    Locked,
}

/// Result of a task attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// An item or energy cost could not be covered.
    InsufficientResources,
    /// Unlock conditions are not met.
    Locked,
}

/// How a gated entry should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// The player has no way to know this exists yet.
    Hidden,
    /// Shown greyed out: every failing condition is a level requirement
    /// on a skill the player already trains.
    Locked,
    /// All conditions pass.
    Available,
}

/// Evaluate a condition list against a player. Empty lists pass.
pub fn conditions_met(player: &Player, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| condition_met(player, c))
}

fn condition_met(player: &Player, condition: &Condition) -> bool {
    match condition {
        // A level gate passes on the skill itself, or when an upgrade or
        // task granted the condition string outright via its unlocks.
        Condition::SkillLevel { skill, level } => {
            player
                .skill_by_name(skill)
                .is_some_and(|s| s.current_level >= *level)
                || has_unlock_string(player, &condition.to_string())
        }
        // Legacy prefixes survive in older content files; they gate nothing.
        Condition::Energy(_) | Condition::Gold(_) => true,
        Condition::Tag(tag) => has_unlock_string(player, tag),
    }
}

fn has_unlock_string(player: &Player, s: &str) -> bool {
    player
        .unlock_conditions
        .iter()
        .any(|u| u.eq_ignore_ascii_case(s))
}

/// Classify a condition list for display purposes.
pub fn visibility(player: &Player, conditions: &[Condition]) -> Visibility {
    let mut all_met = true;
    for condition in conditions {
        if condition_met(player, condition) {
            continue;
        }
        all_met = false;
        // A failing level gate on a known skill is worth teasing; any
        // other failing condition keeps the entry hidden.
        let teasable = matches!(
            condition,
            Condition::SkillLevel { skill, .. } if player.skill_by_name(skill).is_some()
        );
        if !teasable {
            return Visibility::Hidden;
        }
    }
    if all_met {
        Visibility::Available
    } else {
        Visibility::Locked
    }
}

/// Buy `count` copies of an upgrade, deducting `cost * count` of the
/// cost material. The owned copy's rewritten cost and purchase cap take
/// precedence over the catalog's baseline once the upgrade is held.
pub fn buy_upgrade(
    player: &mut Player,
    catalog: &Catalog,
    id: UpgradeId,
    count: u32,
) -> Result<PurchaseOutcome, EngineError> {
    let def = catalog
        .upgrades
        .get(&id)
        .ok_or_else(|| EngineError::missing(EntityKind::Upgrade, id.0.to_string()))?;
    if !conditions_met(player, &def.unlock_conditions) {
        return Ok(PurchaseOutcome::Locked);
    }

    let (cost, max_purchases, owned_count) = match player.upgrades.get(&id) {
        Some(owned) => (owned.def.cost, owned.def.max_purchases, owned.count),
        None => (def.cost, def.max_purchases, 0),
    };
    if owned_count + count > max_purchases {
        return Ok(PurchaseOutcome::MaxedOut);
    }

    let total = cost * f64::from(count);
    let material_id = match player.item_by_name(&def.cost_material) {
        Some(item) => {
            if item.amount < total {
                return Ok(PurchaseOutcome::InsufficientFunds);
            }
            Some(item.id)
        }
        None if catalog.item_by_name(&def.cost_material).is_none() => {
            return Err(EngineError::missing(
                EntityKind::Item,
                def.cost_material.clone(),
            ));
        }
        // Material exists but the player holds none of it.
        None if total > 0.0 => return Ok(PurchaseOutcome::InsufficientFunds),
        None => None,
    };

    if let Some(material_id) = material_id {
        if let Some(material) = player.items.get_mut(&material_id) {
            material.add_amount(-total);
        }
    }
    player.add_upgrade(def.clone(), count);
    player.update_unlock_conditions(catalog);
    recompute_modifiers(player, catalog)?;
    debug!(player = player.id, upgrade = %def.name, count, "purchased upgrade");
    Ok(PurchaseOutcome::Purchased)
}

/// Complete a task once: verify every item and energy cost up front,
/// then deduct costs, grant outputs, and fold the task's effects in.
pub fn complete_task(
    player: &mut Player,
    catalog: &Catalog,
    id: TaskId,
) -> Result<TaskOutcome, EngineError> {
    let task = catalog
        .tasks
        .get(&id)
        .ok_or_else(|| EngineError::missing(EntityKind::Task, id.0.to_string()))?;
    if !conditions_met(player, &task.unlock_conditions) {
        return Ok(TaskOutcome::Locked);
    }

    // Nothing is deducted until every cost is known to be covered.
    let mut item_debits: Vec<(ItemId, f64)> = Vec::new();
    for stack in &task.costs {
        match player.item_by_name(&stack.item) {
            Some(item) if item.amount >= stack.amount => {
                item_debits.push((item.id, stack.amount));
            }
            Some(_) => return Ok(TaskOutcome::InsufficientResources),
            None if catalog.item_by_name(&stack.item).is_none() => {
                return Err(EngineError::missing(EntityKind::Item, stack.item.clone()));
            }
            None => return Ok(TaskOutcome::InsufficientResources),
        }
    }
    let mut energy_debits: Vec<(EnergyId, f64)> = Vec::new();
    for cost in &task.energy_costs {
        match player.energy_by_name(&cost.energy) {
            Some(pool) if pool.current_energy >= cost.amount => {
                energy_debits.push((pool.id, cost.amount));
            }
            Some(_) => return Ok(TaskOutcome::InsufficientResources),
            None if catalog.energy_by_name(&cost.energy).is_none() => {
                return Err(EngineError::missing(EntityKind::Energy, cost.energy.clone()));
            }
            None => return Ok(TaskOutcome::InsufficientResources),
        }
    }

    for (item_id, amount) in item_debits {
        if let Some(item) = player.items.get_mut(&item_id) {
            item.add_amount(-amount);
        }
    }
    for (energy_id, amount) in energy_debits {
        if let Some(pool) = player.energies.get_mut(&energy_id) {
            pool.deplete(amount);
        }
    }
    for output in &task.outputs {
        let item_id = resolve_item(player, catalog, &output.item)?;
        if let Some(item) = player.items.get_mut(&item_id) {
            item.add_amount(output.amount);
        }
    }

    *player.tasks_completed.entry(id).or_insert(0) += 1;
    player.update_unlock_conditions(catalog);
    recompute_modifiers(player, catalog)?;
    debug!(player = player.id, task = %task.name, "completed task");
    Ok(TaskOutcome::Completed)
}

/// Activities whose unlock conditions the player meets.
pub fn available_activities<'a>(player: &Player, catalog: &'a Catalog) -> Vec<&'a ActivityDef> {
    catalog
        .activities
        .values()
        .filter(|a| conditions_met(player, &a.unlock_conditions))
        .collect()
}

/// Unlocked upgrades with purchases remaining, paired with how many more
/// copies can be bought.
pub fn purchasable_upgrades<'a>(player: &Player, catalog: &'a Catalog) -> Vec<(&'a UpgradeDef, u32)> {
    catalog
        .upgrades
        .values()
        .filter(|def| conditions_met(player, &def.unlock_conditions))
        .filter_map(|def| {
            let (owned, max) = match player.upgrades.get(&def.id) {
                Some(o) => (o.count, o.def.max_purchases),
                None => (0, def.max_purchases),
            };
            (owned < max).then_some((def, max - owned))
        })
        .collect()
}

/// Tasks whose unlock conditions the player meets.
pub fn available_tasks<'a>(player: &Player, catalog: &'a Catalog) -> Vec<&'a TaskDef> {
    catalog
        .tasks
        .values()
        .filter(|t| conditions_met(player, &t.unlock_conditions))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::register_player;
    use crate::testkit;
    use chrono::Utc;
    use idle_core::{Attribute, StatKey, BASE_ENERGY_ID};

    fn setup() -> (Player, Catalog) {
        let catalog = testkit::catalog();
        let player = register_player(&catalog, 1, "Tess", Utc::now()).unwrap();
        (player, catalog)
    }

    fn give_coins(player: &mut Player, amount: f64) {
        let id = player.item_by_name("coin").unwrap().id;
        player.items.get_mut(&id).unwrap().add_amount(amount);
    }

    #[test]
    fn purchase_deducts_cost_per_copy() {
        let (mut player, catalog) = setup();
        give_coins(&mut player, 30.0);

        // Two pouches at 10 each.
        let outcome = buy_upgrade(&mut player, &catalog, UpgradeId(1), 2).unwrap();
        assert_eq!(outcome, PurchaseOutcome::Purchased);
        assert_eq!(player.item_by_name("coin").unwrap().amount, 10.0);
        assert_eq!(player.upgrades.get(&UpgradeId(1)).unwrap().count, 2);

        // Modifiers were recomputed as part of the purchase.
        let key = StatKey::new("coin", Attribute::Capacity);
        assert_eq!(player.stat_modifiers.get(&key).unwrap().increase, 10.0);
    }

    #[test]
    fn purchase_fails_without_funds() {
        let (mut player, catalog) = setup();
        give_coins(&mut player, 15.0);
        let outcome = buy_upgrade(&mut player, &catalog, UpgradeId(1), 2).unwrap();
        assert_eq!(outcome, PurchaseOutcome::InsufficientFunds);
        assert_eq!(player.item_by_name("coin").unwrap().amount, 15.0);
        assert!(!player.upgrades.contains_key(&UpgradeId(1)));
    }

    #[test]
    fn purchase_respects_cap() {
        let (mut player, catalog) = setup();
        give_coins(&mut player, 100.0);
        assert_eq!(
            buy_upgrade(&mut player, &catalog, UpgradeId(1), 6).unwrap(),
            PurchaseOutcome::MaxedOut
        );
        // Registration already granted the single allowed copy of Rags.
        assert_eq!(
            buy_upgrade(&mut player, &catalog, UpgradeId(0), 1).unwrap(),
            PurchaseOutcome::MaxedOut
        );
    }

    #[test]
    fn purchase_respects_unlock_conditions() {
        let (mut player, catalog) = setup();
        give_coins(&mut player, 100.0);
        assert_eq!(
            buy_upgrade(&mut player, &catalog, UpgradeId(3), 1).unwrap(),
            PurchaseOutcome::Locked
        );

        // Shoes grant the tag; the level gate still blocks the Cart.
        buy_upgrade(&mut player, &catalog, UpgradeId(2), 1).unwrap();
        assert!(player.unlock_conditions.contains(&"shoes".to_string()));
        assert_eq!(
            buy_upgrade(&mut player, &catalog, UpgradeId(3), 1).unwrap(),
            PurchaseOutcome::Locked
        );

        player.skills.get_mut(&idle_core::STAMINA_SKILL_ID).unwrap().current_level = 2;
        assert_eq!(
            buy_upgrade(&mut player, &catalog, UpgradeId(3), 1).unwrap(),
            PurchaseOutcome::Purchased
        );
    }

    #[test]
    fn granted_level_strings_satisfy_level_gates() {
        let (mut player, _catalog) = setup();
        let gate: Condition = "level.stamina.2".parse().unwrap();
        assert!(!conditions_met(&player, std::slice::from_ref(&gate)));

        // An unlock can hand out the level condition verbatim.
        player.unlock_conditions.push("level.stamina.2".into());
        assert!(conditions_met(&player, std::slice::from_ref(&gate)));
    }

    #[test]
    fn unknown_upgrade_is_an_error() {
        let (mut player, catalog) = setup();
        let err = buy_upgrade(&mut player, &catalog, UpgradeId(99), 1).unwrap_err();
        assert!(matches!(err, EngineError::MissingDefinition { .. }));
    }

    #[test]
    fn visibility_tiers() {
        let (mut player, catalog) = setup();
        let cart = catalog.upgrades.get(&UpgradeId(3)).unwrap();

        // No shoes tag yet: hidden outright.
        assert_eq!(visibility(&player, &cart.unlock_conditions), Visibility::Hidden);

        give_coins(&mut player, 100.0);
        buy_upgrade(&mut player, &catalog, UpgradeId(2), 1).unwrap();
        // Only the stamina gate fails now, and stamina is a known skill.
        assert_eq!(visibility(&player, &cart.unlock_conditions), Visibility::Locked);

        player.skills.get_mut(&idle_core::STAMINA_SKILL_ID).unwrap().current_level = 2;
        assert_eq!(
            visibility(&player, &cart.unlock_conditions),
            Visibility::Available
        );
    }

    #[test]
    fn task_completes_and_unlocks() {
        let (mut player, catalog) = setup();
        let wood = catalog.item_by_name("wood").unwrap().clone();
        player.add_item(wood);
        let wood_id = player.item_by_name("wood").unwrap().id;
        player.items.get_mut(&wood_id).unwrap().add_amount(7.0);

        let outcome = complete_task(&mut player, &catalog, TaskId(0)).unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
        assert_eq!(player.item_by_name("wood").unwrap().amount, 2.0);
        assert_eq!(player.item_by_name("coin").unwrap().amount, 10.0);
        assert_eq!(
            player.energies.get(&BASE_ENERGY_ID).unwrap().current_energy,
            8.0
        );
        assert_eq!(player.tasks_completed.get(&TaskId(0)), Some(&1));
        assert!(player.unlock_conditions.contains(&"market".to_string()));
    }

    #[test]
    fn task_checks_costs_before_deducting() {
        let (mut player, catalog) = setup();
        // No wood at all.
        assert_eq!(
            complete_task(&mut player, &catalog, TaskId(0)).unwrap(),
            TaskOutcome::InsufficientResources
        );

        // Enough wood but a drained pool.
        let wood = catalog.item_by_name("wood").unwrap().clone();
        player.add_item(wood);
        let wood_id = player.item_by_name("wood").unwrap().id;
        player.items.get_mut(&wood_id).unwrap().add_amount(5.0);
        player
            .energies
            .get_mut(&BASE_ENERGY_ID)
            .unwrap()
            .deplete(9.0);
        assert_eq!(
            complete_task(&mut player, &catalog, TaskId(0)).unwrap(),
            TaskOutcome::InsufficientResources
        );
        // Nothing was deducted by the failed attempts.
        assert_eq!(player.item_by_name("wood").unwrap().amount, 5.0);
        assert!(player.tasks_completed.is_empty());
    }

    #[test]
    fn listings_follow_unlocks() {
        let (mut player, catalog) = setup();
        let names: Vec<_> = available_activities(&player, &catalog)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["Begging"]);

        give_coins(&mut player, 100.0);
        buy_upgrade(&mut player, &catalog, UpgradeId(2), 1).unwrap();
        let names: Vec<_> = available_activities(&player, &catalog)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["Begging", "Chopping"]);
    }

    #[test]
    fn purchasable_reports_remaining_copies() {
        let (mut player, catalog) = setup();
        give_coins(&mut player, 30.0);
        buy_upgrade(&mut player, &catalog, UpgradeId(1), 2).unwrap();

        let remaining: Vec<_> = purchasable_upgrades(&player, &catalog)
            .iter()
            .map(|(def, left)| (def.name.as_str(), *left))
            .collect();
        // Rags is maxed out and the Cart is still locked.
        assert_eq!(
            remaining,
            vec![("Bigger Pouch", 3), ("Old Shoes", 1), ("Blessing", 1)]
        );
    }

    #[test]
    fn tasks_list_respects_conditions() {
        let (player, catalog) = setup();
        let names: Vec<_> = available_tasks(&player, &catalog)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sell Firewood"]);
    }
}
