#![deny(warnings)]

//! Content loading: JSON definition files to a validated [`Catalog`].
//!
//! Each entity kind lives in its own file (`energies.json`,
//! `skills.json`, `currencies.json`, `activities.json`, `upgrades.json`,
//! and optionally `tasks.json`), holding an array of records. Records
//! mirror the content schema, which differs from the in-memory types:
//! currencies become items, defaults fill optional fields, and ids are
//! assigned by the content, not by load order.

use idle_core::{
    ActivityDef, ActivityId, Catalog, Condition, EffectMap, Energy, EnergyCost, EnergyId, Item,
    ItemId, ItemStack, Skill, SkillId, TaskDef, TaskId, UpgradeDef, UpgradeId, ValidationError,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors surfaced while loading content files.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Deserialize)]
struct EnergyRecord {
    id: u32,
    name: String,
    max_energy: f64,
    recovery_rate: f64,
}

#[derive(Debug, Deserialize)]
struct SkillRecord {
    id: u32,
    name: String,
    #[serde(default)]
    description: String,
    start_level: u32,
    max_level: u32,
    base_exp_requirement: f64,
    scaling_factor: f64,
    #[serde(default)]
    effects: EffectMap,
}

#[derive(Debug, Deserialize)]
struct CurrencyRecord {
    id: u32,
    name: String,
    capacity: f64,
}

#[derive(Debug, Deserialize)]
struct ActivityRecord {
    id: u32,
    name: String,
    output_item: Option<String>,
    output_amount: f64,
    energy_type: String,
    energy_drain_rate: f64,
    skill: Option<String>,
    skill_exp_rate: f64,
    #[serde(default)]
    unlock_conditions: Vec<Condition>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status_description: String,
}

#[derive(Debug, Deserialize)]
struct UpgradeRecord {
    id: u32,
    name: String,
    cost_material: String,
    cost: f64,
    max_purchases: u32,
    #[serde(default)]
    unlock_conditions: Vec<Condition>,
    #[serde(default)]
    unlocks: Vec<String>,
    #[serde(default)]
    effects: EffectMap,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TaskRecord {
    id: u32,
    name: String,
    #[serde(default)]
    outputs: Vec<ItemStack>,
    #[serde(default)]
    costs: Vec<ItemStack>,
    #[serde(default)]
    energy_costs: Vec<EnergyCost>,
    #[serde(default)]
    unlock_conditions: Vec<Condition>,
    #[serde(default)]
    unlocks: Vec<String>,
    #[serde(default)]
    effects: EffectMap,
    #[serde(default)]
    description: String,
}

pub fn parse_energies(json: &str) -> Result<Vec<Energy>, serde_json::Error> {
    let records: Vec<EnergyRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| Energy::new(EnergyId(r.id), &r.name, r.max_energy, r.recovery_rate))
        .collect())
}

pub fn parse_skills(json: &str) -> Result<Vec<Skill>, serde_json::Error> {
    let records: Vec<SkillRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| {
            let mut skill = Skill::new(
                SkillId(r.id),
                &r.name,
                r.base_exp_requirement,
                r.scaling_factor,
                r.start_level,
                r.max_level,
            );
            skill.description = r.description;
            skill.effects = r.effects;
            skill
        })
        .collect())
}

/// Currencies are the content files' name for capped countable items.
pub fn parse_currencies(json: &str) -> Result<Vec<Item>, serde_json::Error> {
    let records: Vec<CurrencyRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| Item::new(ItemId(r.id), &r.name, r.capacity))
        .collect())
}

pub fn parse_activities(json: &str) -> Result<Vec<ActivityDef>, serde_json::Error> {
    let records: Vec<ActivityRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| ActivityDef {
            id: ActivityId(r.id),
            name: r.name,
            output_item: r.output_item,
            output_amount: r.output_amount,
            energy_type: r.energy_type,
            energy_drain_rate: r.energy_drain_rate,
            skill: r.skill,
            skill_exp_rate: r.skill_exp_rate,
            unlock_conditions: r.unlock_conditions,
            description: r.description,
            status_description: r.status_description,
        })
        .collect())
}

pub fn parse_upgrades(json: &str) -> Result<Vec<UpgradeDef>, serde_json::Error> {
    let records: Vec<UpgradeRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| UpgradeDef {
            id: UpgradeId(r.id),
            name: r.name,
            cost_material: r.cost_material,
            cost: r.cost,
            max_purchases: r.max_purchases,
            unlock_conditions: r.unlock_conditions,
            unlocks: r.unlocks,
            effects: r.effects,
            description: r.description,
        })
        .collect())
}

pub fn parse_tasks(json: &str) -> Result<Vec<TaskDef>, serde_json::Error> {
    let records: Vec<TaskRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| TaskDef {
            id: TaskId(r.id),
            name: r.name,
            outputs: r.outputs,
            costs: r.costs,
            energy_costs: r.energy_costs,
            unlock_conditions: r.unlock_conditions,
            unlocks: r.unlocks,
            effects: r.effects,
            description: r.description,
        })
        .collect())
}

fn read_file(dir: &Path, file: &str) -> Result<String, CatalogError> {
    let path = dir.join(file);
    std::fs::read_to_string(&path).map_err(|source| CatalogError::Io { path, source })
}

fn parse<T>(
    dir: &Path,
    file: &str,
    parser: impl Fn(&str) -> Result<Vec<T>, serde_json::Error>,
) -> Result<Vec<T>, CatalogError> {
    let json = read_file(dir, file)?;
    parser(&json).map_err(|source| CatalogError::Parse {
        path: dir.join(file),
        source,
    })
}

/// Load and validate a full content set from `dir`. `tasks.json` is
/// optional; the other five files are required.
pub fn load_catalog(dir: &Path) -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::default();
    for energy in parse(dir, "energies.json", parse_energies)? {
        catalog.energies.insert(energy.id, energy);
    }
    for skill in parse(dir, "skills.json", parse_skills)? {
        catalog.skills.insert(skill.id, skill);
    }
    for item in parse(dir, "currencies.json", parse_currencies)? {
        catalog.items.insert(item.id, item);
    }
    for activity in parse(dir, "activities.json", parse_activities)? {
        catalog.activities.insert(activity.id, activity);
    }
    for upgrade in parse(dir, "upgrades.json", parse_upgrades)? {
        catalog.upgrades.insert(upgrade.id, upgrade);
    }
    if dir.join("tasks.json").is_file() {
        for task in parse(dir, "tasks.json", parse_tasks)? {
            catalog.tasks.insert(task.id, task);
        }
    }

    catalog.validate()?;
    info!(
        energies = catalog.energies.len(),
        skills = catalog.skills.len(),
        items = catalog.items.len(),
        activities = catalog.activities.len(),
        upgrades = catalog.upgrades.len(),
        tasks = catalog.tasks.len(),
        "loaded catalog"
    );
    Ok(catalog)
}
