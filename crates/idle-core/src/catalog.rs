//! Immutable definition catalog.
//!
//! The catalog holds one template per energy/skill/item plus the
//! activity, upgrade, and task definitions. It is loaded once, validated,
//! and then shared by reference; players clone entities out of it at
//! registration or on first use, never per call.

use crate::{
    ActivityId, Condition, EffectMap, Energy, EnergyId, Item, ItemId, Skill, SkillId, TaskId,
    UpgradeId, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A repeatable, continuously-running task a player can be "doing".
/// Entity references are by case-insensitive name, checked at load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityDef {
    pub id: ActivityId,
    pub name: String,
    /// Item produced per activity-second, if any.
    pub output_item: Option<String>,
    pub output_amount: f64,
    /// Name of the energy pool the activity drains.
    pub energy_type: String,
    pub energy_drain_rate: f64,
    /// Skill trained by the activity, if any.
    pub skill: Option<String>,
    pub skill_exp_rate: f64,
    pub unlock_conditions: Vec<Condition>,
    pub description: String,
    pub status_description: String,
}

/// A permanently-owned purchase contributing stat modifiers and/or
/// unlock tags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: String,
    /// Name of the item the upgrade is paid with.
    pub cost_material: String,
    pub cost: f64,
    pub max_purchases: u32,
    pub unlock_conditions: Vec<Condition>,
    /// Unlock tags granted to the owner.
    pub unlocks: Vec<String>,
    pub effects: EffectMap,
    pub description: String,
}

/// An item quantity, used for task costs and outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub amount: f64,
}

/// An energy quantity, used for task costs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyCost {
    pub energy: String,
    pub amount: f64,
}

/// A one-shot, instantly-resolved exchange of costs for outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
    pub id: TaskId,
    pub name: String,
    pub outputs: Vec<ItemStack>,
    pub costs: Vec<ItemStack>,
    pub energy_costs: Vec<EnergyCost>,
    pub unlock_conditions: Vec<Condition>,
    pub unlocks: Vec<String>,
    /// Permanent stat modifiers granted per completion.
    pub effects: EffectMap,
    pub description: String,
}

/// The full immutable content set, keyed by definition id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub energies: BTreeMap<EnergyId, Energy>,
    pub skills: BTreeMap<SkillId, Skill>,
    pub items: BTreeMap<ItemId, Item>,
    pub activities: BTreeMap<ActivityId, ActivityDef>,
    pub upgrades: BTreeMap<UpgradeId, UpgradeDef>,
    pub tasks: BTreeMap<TaskId, TaskDef>,
}

impl Catalog {
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

    /// Validate every definition, including cross-references by name.
    /// Rates the simulation divides by must be strictly positive here so
    /// the sub-step loop never has to guard against them mid-run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for energy in self.energies.values() {
            let entity = format!("energy \"{}\"", energy.name);
            check_finite(&entity, &[energy.max_energy, energy.recovery_rate])?;
            if energy.recovery_rate <= 0.0 {
                return Err(ValidationError::ZeroRate { entity });
            }
            if energy.max_energy <= 0.0 {
                return Err(ValidationError::NonPositiveCapacity(entity));
            }
        }

        for skill in self.skills.values() {
            let entity = format!("skill \"{}\"", skill.name);
            check_finite(&entity, &[skill.base_exp_requirement, skill.scaling_factor])?;
            if skill.max_level < skill.start_level {
                return Err(ValidationError::LevelRange(entity));
            }
            if skill.scaling_factor < 1.0 {
                return Err(ValidationError::BadScaling(entity));
            }
            if skill.base_exp_requirement <= 0.0 {
                return Err(ValidationError::NonPositiveCapacity(entity));
            }
        }

        for item in self.items.values() {
            let entity = format!("item \"{}\"", item.name);
            check_finite(&entity, &[item.capacity])?;
            if item.capacity <= 0.0 {
                return Err(ValidationError::NonPositiveCapacity(entity));
            }
        }

        for activity in self.activities.values() {
            let referrer = format!("activity \"{}\"", activity.name);
            check_finite(
                &referrer,
                &[
                    activity.output_amount,
                    activity.energy_drain_rate,
                    activity.skill_exp_rate,
                ],
            )?;
            if activity.energy_drain_rate <= 0.0 {
                return Err(ValidationError::ZeroRate { entity: referrer });
            }
            if self.energy_by_name(&activity.energy_type).is_none() {
                return Err(ValidationError::MissingReference {
                    referrer,
                    kind: "energy",
                    name: activity.energy_type.clone(),
                });
            }
            if let Some(item) = &activity.output_item {
                if self.item_by_name(item).is_none() {
                    return Err(ValidationError::MissingReference {
                        referrer,
                        kind: "item",
                        name: item.clone(),
                    });
                }
            }
            if let Some(skill) = &activity.skill {
                if self.skill_by_name(skill).is_none() {
                    return Err(ValidationError::MissingReference {
                        referrer,
                        kind: "skill",
                        name: skill.clone(),
                    });
                }
            }
        }

        for upgrade in self.upgrades.values() {
            let referrer = format!("upgrade \"{}\"", upgrade.name);
            check_finite(&referrer, &[upgrade.cost])?;
            if upgrade.cost < 0.0 {
                return Err(ValidationError::NonFinite(referrer));
            }
            if upgrade.max_purchases == 0 {
                return Err(ValidationError::NonPositiveCapacity(referrer));
            }
            if self.item_by_name(&upgrade.cost_material).is_none() {
                return Err(ValidationError::MissingReference {
                    referrer,
                    kind: "item",
                    name: upgrade.cost_material.clone(),
                });
            }
        }

        for task in self.tasks.values() {
            let referrer = format!("task \"{}\"", task.name);
            for stack in task.outputs.iter().chain(task.costs.iter()) {
                check_finite(&referrer, &[stack.amount])?;
                if self.item_by_name(&stack.item).is_none() {
                    return Err(ValidationError::MissingReference {
                        referrer,
                        kind: "item",
                        name: stack.item.clone(),
                    });
                }
            }
            for cost in &task.energy_costs {
                check_finite(&referrer, &[cost.amount])?;
                if self.energy_by_name(&cost.energy).is_none() {
                    return Err(ValidationError::MissingReference {
                        referrer,
                        kind: "energy",
                        name: cost.energy.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn check_finite(entity: &str, values: &[f64]) -> Result<(), ValidationError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::NonFinite(entity.to_string()));
    }
    Ok(())
}
