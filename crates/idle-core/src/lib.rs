#![deny(warnings)]

//! Core domain models and invariants for the idle-game engine.
//!
//! This crate defines the resource primitives (energy pools, skills, items),
//! the typed stat-modifier vocabulary, unlock conditions, and the immutable
//! definition catalog, with validation helpers that reject misconfigured
//! content (zero rates, dangling name references) before a simulation ever
//! runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod catalog;
pub mod condition;
pub mod display;
pub mod modifier;
pub mod resource;

pub use catalog::{ActivityDef, Catalog, EnergyCost, ItemStack, TaskDef, UpgradeDef};
pub use condition::Condition;
pub use display::{format_duration, format_number};
pub use modifier::{Attribute, Effect, EffectMap, ModifierKind, ModifierTable, StatKey, StatModifier};
pub use resource::{Energy, Item, Skill};

/// Unique identifier for an energy pool definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnergyId(pub u32);

/// Unique identifier for a skill definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillId(pub u32);

/// Unique identifier for an item/currency definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Unique identifier for an activity definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub u32);

/// Unique identifier for an upgrade definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpgradeId(pub u32);

/// Unique identifier for a task definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u32);

/// The baseline energy pool every registered player owns. The stamina
/// coupling in the reconciliation loop targets this pool.
pub const BASE_ENERGY_ID: EnergyId = EnergyId(0);

/// The stamina skill. Depleting the pool named "energy" feeds it
/// experience, and its level caps the base pool's maximum energy.
pub const STAMINA_SKILL_ID: SkillId = SkillId(0);

/// Errors produced while validating catalog content.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A recovery or drain rate was zero or negative; the sub-step loop
    /// divides by these, so they are rejected at load time.
    #[error("{entity}: rate must be > 0")]
    ZeroRate { entity: String },
    /// A definition refers to an entity name the catalog does not contain.
    #[error("{referrer} refers to unknown {kind} \"{name}\"")]
    MissingReference {
        referrer: String,
        kind: &'static str,
        name: String,
    },
    /// A stat key string did not parse as `<target>.<attribute>`.
    #[error("malformed stat key: {0}")]
    BadStatKey(String),
    /// An unlock condition string did not parse.
    #[error("malformed unlock condition: {0}")]
    BadCondition(String),
    /// Skill level bounds are inconsistent.
    #[error("{0}: max_level must be >= start_level")]
    LevelRange(String),
    /// Skill experience scaling must not shrink requirements.
    #[error("{0}: scaling_factor must be >= 1")]
    BadScaling(String),
    /// Capacity or maximum must be strictly positive.
    #[error("{0}: capacity must be > 0")]
    NonPositiveCapacity(String),
    /// Numeric field must be finite.
    #[error("{0}: non-finite numeric value")]
    NonFinite(String),
}
