use std::fmt;

use strum::{AsRefStr, Display, EnumString};

/// Identifier of a spell group (a named set of mutually exclusive buffs).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SpellGroupId(pub u32);

impl fmt::Display for SpellGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

/// Stacking rule between two spells that share a group.
///
/// Variants are ordered by strictness; when two spells share several groups
/// the strictest rule applies.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellGroupStackRule {
    #[default]
    Default,
    /// Never coexist on one target.
    Exclusive,
    /// Coexist only when cast by different casters.
    ExclusiveFromSameCaster,
    /// Only the aura with the largest absolute amount is kept.
    ExclusiveHighest,
}
