//! Player state and registration.

use crate::{EngineError, EntityKind};
use chrono::{DateTime, Utc};
use idle_core::{
    ActivityId, Catalog, Energy, EnergyId, Item, ItemId, ModifierTable, Skill, SkillId, TaskId,
    UpgradeDef, UpgradeId, BASE_ENERGY_ID, STAMINA_SKILL_ID,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// An upgrade the player owns: a mutable copy of the definition (its
/// numeric attributes and effect values are rewritten by priority
/// modifiers) plus the number of copies purchased.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnedUpgrade {
    pub def: UpgradeDef,
    pub count: u32,
}

/// A player's full mutable state. Entities are cloned out of the catalog
/// once and independently mutated thereafter; `stat_modifiers` and
/// `unlock_conditions` are derived fields, rebuilt rather than persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub display_name: String,
    pub title: String,
    pub energies: BTreeMap<EnergyId, Energy>,
    pub skills: BTreeMap<SkillId, Skill>,
    pub items: BTreeMap<ItemId, Item>,
    pub upgrades: BTreeMap<UpgradeId, OwnedUpgrade>,
    pub tasks_completed: BTreeMap<TaskId, u32>,
    /// Unlock tags accumulated from owned upgrades and completed tasks.
    pub unlock_conditions: Vec<String>,
    /// Derived stat table; rebuilt by `recompute_modifiers`.
    pub stat_modifiers: ModifierTable,
    pub current_activity: Option<ActivityId>,
    pub start_date: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    /// Elapsed seconds covered by the most recent reconciliation.
    pub time_since_last_update: f64,
}

impl Player {
    pub fn new(id: u64, display_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            title: "Beggar".to_string(),
            energies: BTreeMap::new(),
            skills: BTreeMap::new(),
            items: BTreeMap::new(),
            upgrades: BTreeMap::new(),
            tasks_completed: BTreeMap::new(),
            unlock_conditions: Vec::new(),
            stat_modifiers: ModifierTable::new(),
            current_activity: None,
            start_date: now,
            last_update_time: now,
            time_since_last_update: 0.0,
        }
    }

    /// Adopt an energy pool if not already owned.
    pub fn add_energy(&mut self, energy: Energy) {
        self.energies.entry(energy.id).or_insert(energy);
    }

    /// Adopt a skill if not already owned.
    pub fn add_skill(&mut self, skill: Skill) {
        self.skills.entry(skill.id).or_insert(skill);
    }

    /// Adopt an item if not already owned.
    pub fn add_item(&mut self, item: Item) {
        self.items.entry(item.id).or_insert(item);
    }

    /// Add `count` copies of an upgrade, creating the owned entry on
    /// first purchase. Counts are not capped here; affordability and
    /// purchase limits are the shop's concern.
    pub fn add_upgrade(&mut self, def: UpgradeDef, count: u32) {
        if count == 0 {
            return;
        }
        self.upgrades
            .entry(def.id)
            .and_modify(|owned| owned.count += count)
            .or_insert(OwnedUpgrade { def, count });
    }

    pub fn energy_by_name(&self, name: &str) -> Option<&Energy> {
        self.energies
            .values()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn skill_by_name(&self, name: &str) -> Option<&Skill> {
        self.skills
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn item_by_name(&self, name: &str) -> Option<&Item> {
        self.items
            .values()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Rebuild the accumulated unlock tags from owned upgrades and
    /// completed tasks.
    pub fn update_unlock_conditions(&mut self, catalog: &Catalog) {
        self.unlock_conditions.clear();
        for owned in self.upgrades.values() {
            self.unlock_conditions
                .extend(owned.def.unlocks.iter().cloned());
        }
        for task_id in self.tasks_completed.keys() {
            if let Some(task) = catalog.tasks.get(task_id) {
                self.unlock_conditions.extend(task.unlocks.iter().cloned());
            }
        }
    }
}

/// Create a new player owning one copy of the baseline (id 0) energy,
/// skill, item, and upgrade, with derived state computed.
pub fn register_player(
    catalog: &Catalog,
    id: u64,
    display_name: &str,
    now: DateTime<Utc>,
) -> Result<Player, EngineError> {
    let mut player = Player::new(id, display_name, now);

    let energy = catalog
        .energies
        .get(&BASE_ENERGY_ID)
        .ok_or_else(|| EngineError::missing(EntityKind::Energy, "0"))?;
    let skill = catalog
        .skills
        .get(&STAMINA_SKILL_ID)
        .ok_or_else(|| EngineError::missing(EntityKind::Skill, "0"))?;
    let item = catalog
        .items
        .get(&ItemId(0))
        .ok_or_else(|| EngineError::missing(EntityKind::Item, "0"))?;
    let upgrade = catalog
        .upgrades
        .get(&UpgradeId(0))
        .ok_or_else(|| EngineError::missing(EntityKind::Upgrade, "0"))?;

    player.add_energy(energy.clone());
    player.add_skill(skill.clone());
    player.add_item(item.clone());
    player.add_upgrade(upgrade.clone(), 1);
    player.update_unlock_conditions(catalog);
    crate::modifiers::recompute_modifiers(&mut player, catalog)?;

    debug!(player = player.id, "registered player");
    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    #[test]
    fn registration_clones_baseline_entities() {
        let catalog = testkit::catalog();
        let now = Utc::now();
        let player = register_player(&catalog, 7, "Tess", now).unwrap();

        assert_eq!(player.energies.len(), 1);
        assert_eq!(player.skills.len(), 1);
        assert_eq!(player.items.len(), 1);
        assert_eq!(player.upgrades.len(), 1);
        assert_eq!(player.last_update_time, now);
        // Owned copies are independent of the catalog templates.
        let pool = player.energies.get(&BASE_ENERGY_ID).unwrap();
        assert!(pool.is_full());
    }

    #[test]
    fn unlock_tags_accumulate_from_upgrades() {
        let catalog = testkit::catalog();
        let mut player = register_player(&catalog, 7, "Tess", Utc::now()).unwrap();
        assert!(player.unlock_conditions.is_empty());

        let def = catalog.upgrades.get(&UpgradeId(2)).unwrap().clone();
        player.add_upgrade(def, 1);
        player.update_unlock_conditions(&catalog);
        assert!(player.unlock_conditions.contains(&"shoes".to_string()));
    }

    #[test]
    fn repeat_purchases_increment_count() {
        let catalog = testkit::catalog();
        let mut player = register_player(&catalog, 7, "Tess", Utc::now()).unwrap();
        let def = catalog.upgrades.get(&UpgradeId(1)).unwrap().clone();
        player.add_upgrade(def.clone(), 1);
        player.add_upgrade(def, 2);
        assert_eq!(player.upgrades.get(&UpgradeId(1)).unwrap().count, 3);
    }
}
