//! Typed stat-modifier vocabulary.
//!
//! Content files address attributes with strings like `"coin.capacity"`.
//! Instead of resolving those at runtime by reflection, the key is parsed
//! once into a [`StatKey`] with a closed [`Attribute`] enum; unknown
//! attribute tokens are a load-time error. Modifiers accumulate into a
//! [`ModifierTable`] and apply as `(base + increase) * multiplier`.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How a single effect folds into the accumulator for its stat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    /// Added to the running `increase` sum.
    Increase,
    /// Multiplied into the running `multiplier` product.
    Multiplier,
}

/// One configured effect on a stat, as carried by upgrades, skills, and
/// tasks. Field names match the original content schema.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "modifier_type")]
    pub kind: ModifierKind,
    #[serde(rename = "modifier_value")]
    pub value: f64,
}

/// The closed set of attributes a stat key may target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    /// Item storage cap.
    Capacity,
    /// Activity output scaling for an item (consumed by the
    /// reconciliation loop, not a stored field).
    Gain,
    /// Energy pool ceiling.
    MaxEnergy,
    /// Energy pool recovery rate.
    RecoveryRate,
    /// Upgrade purchase cap.
    MaxPurchases,
    /// Upgrade price.
    Cost,
    /// Another upgrade's effect values; keys with this attribute mark
    /// their owner as a priority upgrade.
    Effects,
}

impl Attribute {
    /// Parse the attribute token of a stat key.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "capacity" => Some(Attribute::Capacity),
            "gain" => Some(Attribute::Gain),
            "max_energy" => Some(Attribute::MaxEnergy),
            "recovery_rate" => Some(Attribute::RecoveryRate),
            "max_purchases" => Some(Attribute::MaxPurchases),
            "cost" => Some(Attribute::Cost),
            "effects" => Some(Attribute::Effects),
            _ => None,
        }
    }

    /// The token used in content files.
    pub fn token(&self) -> &'static str {
        match self {
            Attribute::Capacity => "capacity",
            Attribute::Gain => "gain",
            Attribute::MaxEnergy => "max_energy",
            Attribute::RecoveryRate => "recovery_rate",
            Attribute::MaxPurchases => "max_purchases",
            Attribute::Cost => "cost",
            Attribute::Effects => "effects",
        }
    }
}

/// A parsed stat key: which entity (by lowercased name) and which
/// attribute a modifier targets. Target matching is exact, not prefix.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatKey {
    pub target: String,
    pub attribute: Attribute,
}

impl StatKey {
    pub fn new(target: &str, attribute: Attribute) -> Self {
        Self {
            target: target.to_ascii_lowercase(),
            attribute,
        }
    }
}

impl FromStr for StatKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, token) = s
            .split_once('.')
            .ok_or_else(|| ValidationError::BadStatKey(s.to_string()))?;
        if target.is_empty() {
            return Err(ValidationError::BadStatKey(s.to_string()));
        }
        let attribute =
            Attribute::parse(token).ok_or_else(|| ValidationError::BadStatKey(s.to_string()))?;
        Ok(StatKey::new(target, attribute))
    }
}

impl TryFrom<String> for StatKey {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StatKey> for String {
    fn from(key: StatKey) -> String {
        key.to_string()
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute.token())
    }
}

/// Effects keyed by the stat they target.
pub type EffectMap = BTreeMap<StatKey, Effect>;

/// Accumulated modifier for one stat.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub increase: f64,
    pub multiplier: f64,
}

impl Default for StatModifier {
    fn default() -> Self {
        Self {
            increase: 0.0,
            multiplier: 1.0,
        }
    }
}

impl StatModifier {
    /// Fold one effect occurrence into the accumulator.
    pub fn fold(&mut self, effect: &Effect) {
        match effect.kind {
            ModifierKind::Increase => self.increase += effect.value,
            ModifierKind::Multiplier => self.multiplier *= effect.value,
        }
    }

    /// Apply the accumulated modifier to a base value.
    pub fn apply(&self, base: f64) -> f64 {
        (base + self.increase) * self.multiplier
    }
}

/// The full derived modifier table, rebuilt from scratch on every
/// recomputation.
pub type ModifierTable = BTreeMap<StatKey, StatModifier>;
