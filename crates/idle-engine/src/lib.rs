#![deny(warnings)]

//! Offline-progress engine: player state, modifier aggregation, and the
//! reconciliation loop.
//!
//! The engine is a pure in-process computation over values the caller has
//! already loaded: given a player snapshot and the immutable definition
//! catalog, [`reconcile`] replays everything that should have happened
//! since the last observed update, and [`recompute_modifiers`] re-derives
//! every stat from owned upgrades, skill levels, and completed tasks.
//! Callers must serialize operations per player; no internal locking is
//! performed.

use thiserror::Error;

pub mod modifiers;
pub mod player;
pub mod reconcile;
pub mod shop;

#[cfg(test)]
pub(crate) mod testkit;

pub use modifiers::{apply_energy_modifiers, apply_item_modifiers, recompute_modifiers, reset_to_baseline};
pub use player::{register_player, OwnedUpgrade, Player};
pub use reconcile::{change_activity, reconcile, MAX_STEPS, MIN_STEP_SECONDS};
pub use shop::{
    available_activities, available_tasks, buy_upgrade, complete_task, conditions_met,
    purchasable_upgrades, visibility, PurchaseOutcome, TaskOutcome, Visibility,
};

/// Kinds of entity a failed lookup can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Energy,
    Skill,
    Item,
    Activity,
    Upgrade,
    Task,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Energy => "energy",
            EntityKind::Skill => "skill",
            EntityKind::Item => "item",
            EntityKind::Activity => "activity",
            EntityKind::Upgrade => "upgrade",
            EntityKind::Task => "task",
        };
        f.write_str(s)
    }
}

/// Errors produced by the engine. Affordability and unmet unlock
/// conditions are not errors; see [`PurchaseOutcome`] and [`TaskOutcome`].
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// A player or activity referenced a definition that does not exist
    /// in the catalog or in the player's owned collections.
    #[error("missing {kind} definition: {name}")]
    MissingDefinition { kind: EntityKind, name: String },
    /// Reconciliation requires at least one energy pool.
    #[error("player owns no energy pools")]
    NoEnergyPool,
    /// The sub-step loop hit its hard iteration cap; indicates a
    /// misconfigured catalog that validation should have rejected.
    #[error("reconciliation exceeded {0} sub-steps")]
    IterationCap(usize),
}

impl EngineError {
    pub(crate) fn missing(kind: EntityKind, name: impl Into<String>) -> Self {
        EngineError::MissingDefinition {
            kind,
            name: name.into(),
        }
    }
}
