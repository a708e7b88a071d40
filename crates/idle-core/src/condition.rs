//! Unlock conditions.
//!
//! Content files gate activities, upgrades, and tasks behind condition
//! strings. The `level.<skill>.<n>` form is evaluated against skill
//! levels; `energy.*` and `gold.*` are recognized legacy prefixes that
//! always pass; everything else is a tag matched against the unlock
//! strings a player has accumulated from owned upgrades and completed
//! tasks.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed unlock condition. `Display` round-trips to the content
/// string form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Condition {
    /// Requires the named skill at or above `level`.
    SkillLevel { skill: String, level: u32 },
    /// Recognized but not evaluated; always satisfied.
    Energy(String),
    /// Recognized but not evaluated; always satisfied.
    Gold(String),
    /// Matched verbatim against the player's accumulated unlock strings.
    Tag(String),
}

impl FromStr for Condition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("level.") {
            let (skill, level) = rest
                .split_once('.')
                .ok_or_else(|| ValidationError::BadCondition(s.to_string()))?;
            if skill.is_empty() {
                return Err(ValidationError::BadCondition(s.to_string()));
            }
            let level: u32 = level
                .parse()
                .map_err(|_| ValidationError::BadCondition(s.to_string()))?;
            return Ok(Condition::SkillLevel {
                skill: skill.to_ascii_lowercase(),
                level,
            });
        }
        if let Some(rest) = s.strip_prefix("energy.") {
            return Ok(Condition::Energy(rest.to_string()));
        }
        if let Some(rest) = s.strip_prefix("gold.") {
            return Ok(Condition::Gold(rest.to_string()));
        }
        if s.is_empty() {
            return Err(ValidationError::BadCondition(s.to_string()));
        }
        Ok(Condition::Tag(s.to_string()))
    }
}

impl TryFrom<String> for Condition {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> String {
        c.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::SkillLevel { skill, level } => write!(f, "level.{skill}.{level}"),
            Condition::Energy(rest) => write!(f, "energy.{rest}"),
            Condition::Gold(rest) => write!(f, "gold.{rest}"),
            Condition::Tag(tag) => write!(f, "{tag}"),
        }
    }
}
