#![deny(warnings)]

//! Save files: compact JSON snapshots of player state.
//!
//! Snapshots store only what cannot be re-derived: per-entity mutable
//! state keyed by definition id, plus timestamps and the active
//! activity. Restoring clones fresh definitions out of the catalog,
//! overlays the stored state, re-levels skills from their cumulative
//! experience, and rebuilds unlock tags and the stat table. Content
//! updates therefore flow into old saves automatically.

use chrono::{DateTime, Utc};
use idle_core::{ActivityId, Catalog, EnergyId, ItemId, SkillId, TaskId, UpgradeId};
use idle_engine::{recompute_modifiers, EngineError, Player};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Bumped when the snapshot layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access save file")]
    Io(#[from] std::io::Error),
    #[error("malformed save file")]
    Json(#[from] serde_json::Error),
    /// The save references a definition the catalog no longer has.
    #[error("save references unknown {kind} id {id}")]
    UnknownEntity { kind: &'static str, id: u32 },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnergyRow {
    pub id: u32,
    pub current_energy: f64,
    /// The permanent ceiling anchor; modifiers are reapplied on top.
    pub base_max_energy: f64,
    pub recovering: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkillRow {
    pub id: u32,
    /// Cumulative experience; the level is re-derived from thresholds.
    pub exp: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: u32,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeRow {
    pub id: u32,
    pub count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: u32,
    pub completions: u32,
}

/// Everything needed to reconstruct a [`Player`] against a catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub version: u32,
    pub id: u64,
    pub display_name: String,
    pub title: String,
    pub energies: Vec<EnergyRow>,
    pub skills: Vec<SkillRow>,
    pub items: Vec<ItemRow>,
    pub upgrades: Vec<UpgradeRow>,
    pub tasks: Vec<TaskRow>,
    pub current_activity: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

/// Capture a player's non-derivable state.
pub fn snapshot(player: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        version: SCHEMA_VERSION,
        id: player.id,
        display_name: player.display_name.clone(),
        title: player.title.clone(),
        energies: player
            .energies
            .values()
            .map(|e| EnergyRow {
                id: e.id.0,
                current_energy: e.current_energy,
                base_max_energy: e.base_max_energy,
                recovering: e.recovering,
            })
            .collect(),
        skills: player
            .skills
            .values()
            .map(|s| SkillRow {
                id: s.id.0,
                exp: s.current_exp,
            })
            .collect(),
        items: player
            .items
            .values()
            .map(|i| ItemRow {
                id: i.id.0,
                amount: i.amount,
            })
            .collect(),
        upgrades: player
            .upgrades
            .values()
            .map(|u| UpgradeRow {
                id: u.def.id.0,
                count: u.count,
            })
            .collect(),
        tasks: player
            .tasks_completed
            .iter()
            .map(|(id, completions)| TaskRow {
                id: id.0,
                completions: *completions,
            })
            .collect(),
        current_activity: player.current_activity.map(|a| a.0),
        start_date: player.start_date,
        last_update_time: player.last_update_time,
    }
}

/// Rebuild a player from a snapshot against the current catalog.
pub fn restore(catalog: &Catalog, snapshot: &PlayerSnapshot) -> Result<Player, SnapshotError> {
    let mut player = Player::new(snapshot.id, &snapshot.display_name, snapshot.start_date);
    player.title = snapshot.title.clone();

    for row in &snapshot.energies {
        let mut energy = catalog
            .energies
            .get(&EnergyId(row.id))
            .ok_or(SnapshotError::UnknownEntity {
                kind: "energy",
                id: row.id,
            })?
            .clone();
        energy.base_max_energy = row.base_max_energy;
        energy.max_energy = row.base_max_energy;
        energy.current_energy = row.current_energy.clamp(0.0, energy.max_energy);
        energy.recovering = row.recovering;
        player.add_energy(energy);
    }
    for row in &snapshot.skills {
        let mut skill = catalog
            .skills
            .get(&SkillId(row.id))
            .ok_or(SnapshotError::UnknownEntity {
                kind: "skill",
                id: row.id,
            })?
            .clone();
        skill.add_experience(row.exp);
        player.add_skill(skill);
    }
    for row in &snapshot.items {
        let mut item = catalog
            .items
            .get(&ItemId(row.id))
            .ok_or(SnapshotError::UnknownEntity {
                kind: "item",
                id: row.id,
            })?
            .clone();
        item.amount = row.amount.max(0.0);
        player.add_item(item);
    }
    for row in &snapshot.upgrades {
        let def = catalog
            .upgrades
            .get(&UpgradeId(row.id))
            .ok_or(SnapshotError::UnknownEntity {
                kind: "upgrade",
                id: row.id,
            })?
            .clone();
        player.add_upgrade(def, row.count);
    }
    for row in &snapshot.tasks {
        if !catalog.tasks.contains_key(&TaskId(row.id)) {
            return Err(SnapshotError::UnknownEntity {
                kind: "task",
                id: row.id,
            });
        }
        player.tasks_completed.insert(TaskId(row.id), row.completions);
    }

    if let Some(activity) = snapshot.current_activity {
        if !catalog.activities.contains_key(&ActivityId(activity)) {
            return Err(SnapshotError::UnknownEntity {
                kind: "activity",
                id: activity,
            });
        }
        player.current_activity = Some(ActivityId(activity));
    }
    player.start_date = snapshot.start_date;
    player.last_update_time = snapshot.last_update_time;

    player.update_unlock_conditions(catalog);
    recompute_modifiers(&mut player, catalog)?;
    Ok(player)
}

/// Default location of the single-player save file.
pub fn default_save_path() -> PathBuf {
    PathBuf::from("saves/player.json")
}

pub fn save_player(path: &Path, player: &Player) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&snapshot(player))?;
    std::fs::write(path, json)?;
    info!(player = player.id, path = %path.display(), "saved player");
    Ok(())
}

pub fn load_player(path: &Path, catalog: &Catalog) -> Result<Player, SnapshotError> {
    let json = std::fs::read_to_string(path)?;
    let snapshot: PlayerSnapshot = serde_json::from_str(&json)?;
    restore(catalog, &snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_core::{
        ActivityDef, Attribute, Effect, EffectMap, Energy, Item, ModifierKind, Skill, StatKey,
        UpgradeDef,
    };
    use idle_engine::register_player;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog
            .energies
            .insert(EnergyId(0), Energy::new(EnergyId(0), "Energy", 10.0, 1.0));
        catalog.skills.insert(
            SkillId(0),
            Skill::new(SkillId(0), "Stamina", 10.0, 2.0, 1, 50),
        );
        catalog
            .items
            .insert(ItemId(0), Item::new(ItemId(0), "coin", 100.0));
        catalog.activities.insert(
            ActivityId(0),
            ActivityDef {
                id: ActivityId(0),
                name: "Begging".into(),
                output_item: Some("coin".into()),
                output_amount: 0.5,
                energy_type: "energy".into(),
                energy_drain_rate: 2.0,
                skill: None,
                skill_exp_rate: 0.0,
                unlock_conditions: vec![],
                description: String::new(),
                status_description: String::new(),
            },
        );
        let effects: EffectMap = [(
            StatKey::new("coin", Attribute::Capacity),
            Effect {
                kind: ModifierKind::Increase,
                value: 5.0,
            },
        )]
        .into_iter()
        .collect();
        catalog.upgrades.insert(
            UpgradeId(0),
            UpgradeDef {
                id: UpgradeId(0),
                name: "Bigger Pouch".into(),
                cost_material: "coin".into(),
                cost: 10.0,
                max_purchases: 5,
                unlock_conditions: vec![],
                unlocks: vec!["pouch".into()],
                effects,
                description: String::new(),
            },
        );
        catalog.validate().unwrap();
        catalog
    }

    #[test]
    fn snapshot_roundtrips_through_restore() {
        let catalog = catalog();
        let now = Utc::now();
        let mut player = register_player(&catalog, 9, "Tess", now).unwrap();

        // Accumulate some non-trivial state.
        player.items.get_mut(&ItemId(0)).unwrap().add_amount(42.0);
        player.skills.get_mut(&SkillId(0)).unwrap().add_experience(35.0);
        player.energies.get_mut(&EnergyId(0)).unwrap().deplete(6.0);
        player.current_activity = Some(ActivityId(0));
        player.update_unlock_conditions(&catalog);
        recompute_modifiers(&mut player, &catalog).unwrap();

        let restored = restore(&catalog, &snapshot(&player)).unwrap();
        assert_eq!(restored.id, 9);
        assert_eq!(restored.display_name, "Tess");
        assert_eq!(restored.items.get(&ItemId(0)).unwrap().amount, 42.0);
        // 35 exp crosses the 10 and 30 thresholds.
        assert_eq!(restored.skills.get(&SkillId(0)).unwrap().current_level, 3);
        assert_eq!(
            restored.energies.get(&EnergyId(0)).unwrap().current_energy,
            4.0
        );
        assert_eq!(restored.current_activity, Some(ActivityId(0)));
        assert_eq!(restored.last_update_time, player.last_update_time);
        assert_eq!(restored.stat_modifiers, player.stat_modifiers);
        assert_eq!(restored.unlock_conditions, vec!["pouch".to_string()]);
    }

    #[test]
    fn restore_reapplies_capacity_modifiers() {
        let catalog = catalog();
        let mut player = register_player(&catalog, 9, "Tess", Utc::now()).unwrap();
        // Registration granted one copy; three more make four.
        let def = catalog.upgrades.get(&UpgradeId(0)).unwrap().clone();
        player.add_upgrade(def, 3);
        recompute_modifiers(&mut player, &catalog).unwrap();
        assert_eq!(player.items.get(&ItemId(0)).unwrap().capacity, 120.0);

        let restored = restore(&catalog, &snapshot(&player)).unwrap();
        assert_eq!(restored.items.get(&ItemId(0)).unwrap().capacity, 120.0);
        assert_eq!(restored.upgrades.get(&UpgradeId(0)).unwrap().count, 4);
    }

    #[test]
    fn restore_keeps_raised_energy_ceiling() {
        let catalog = catalog();
        let mut player = register_player(&catalog, 9, "Tess", Utc::now()).unwrap();
        {
            let pool = player.energies.get_mut(&EnergyId(0)).unwrap();
            pool.max_energy = 23.0;
            pool.base_max_energy = 23.0;
            pool.current_energy = 17.0;
        }

        let restored = restore(&catalog, &snapshot(&player)).unwrap();
        let pool = restored.energies.get(&EnergyId(0)).unwrap();
        assert_eq!(pool.base_max_energy, 23.0);
        assert_eq!(pool.max_energy, 23.0);
        assert_eq!(pool.current_energy, 17.0);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let catalog = catalog();
        let player = register_player(&catalog, 9, "Tess", Utc::now()).unwrap();
        let mut snap = snapshot(&player);
        snap.skills.push(SkillRow { id: 99, exp: 0.0 });

        let err = restore(&catalog, &snap).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnknownEntity { kind: "skill", id: 99 }
        ));
    }

    #[test]
    fn save_and_load_files() {
        let catalog = catalog();
        let now = Utc::now();
        let mut player = register_player(&catalog, 3, "Pell", now).unwrap();
        player.items.get_mut(&ItemId(0)).unwrap().add_amount(7.0);

        let path = std::env::temp_dir().join(format!("idle-save-{}.json", std::process::id()));
        save_player(&path, &player).unwrap();
        let loaded = load_player(&path, &catalog).unwrap();
        assert_eq!(loaded.items.get(&ItemId(0)).unwrap().amount, 7.0);
        assert_eq!(loaded.id, 3);
        std::fs::remove_file(&path).ok();
    }
}
