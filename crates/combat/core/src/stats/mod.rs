//! Actor stat modifiers contributed by aura effects.
//!
//! Each modifier is keyed by the aura effect slot that added it, so removing
//! an aura releases exactly what it acquired regardless of the order in which
//! other auras came and went.

pub mod bonus;

use std::collections::BTreeMap;

use strum::{AsRefStr, Display};

pub use bonus::{Bonus, BonusStack};

use crate::spell::SpellSchool;
use crate::state::AuraId;

/// Stats aura effects can modify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StatKind {
    MaxHealth,
    MaxMana,
    BlockValue,
    /// Resistance to one school; `Physical` is armor.
    Resistance(SpellSchool),
}

impl StatKind {
    /// Decodes the `misc_value` of stat modifier auras.
    pub fn from_misc(misc: i32) -> Option<Self> {
        match misc {
            0 => Some(Self::MaxHealth),
            1 => Some(Self::MaxMana),
            2 => Some(Self::BlockValue),
            _ => None,
        }
    }
}

/// Aura effect slot that contributed a modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifierSource {
    pub aura: AuraId,
    pub slot: u8,
}

impl ModifierSource {
    pub const fn new(aura: AuraId, slot: u8) -> Self {
        Self { aura, slot }
    }
}

/// Per-actor table of active stat modifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModifierTable {
    entries: BTreeMap<(StatKind, ModifierSource), Bonus>,
}

impl ModifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the modifier contributed by `source`.
    pub fn insert(&mut self, stat: StatKind, source: ModifierSource, bonus: Bonus) -> Option<Bonus> {
        self.entries.insert((stat, source), bonus)
    }

    pub fn remove(&mut self, stat: StatKind, source: ModifierSource) -> Option<Bonus> {
        self.entries.remove(&(stat, source))
    }

    /// Drops every modifier contributed by `source`, whatever stat it touched.
    pub fn remove_source(&mut self, source: ModifierSource) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, s), _| *s != source);
        before - self.entries.len()
    }

    pub fn stack(&self, stat: StatKind) -> BonusStack {
        let mut stack = BonusStack::new();
        stack.extend(
            self.entries
                .iter()
                .filter(|((s, _), _)| *s == stat)
                .map(|(_, bonus)| *bonus),
        );
        stack
    }

    /// Final value of `stat` given its base value.
    pub fn apply(&self, stat: StatKind, base: i32) -> i32 {
        self.stack(stat).apply_unclamped(base)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_is_symmetric_regardless_of_order() {
        let mut table = ModifierTable::new();
        let armor = StatKind::Resistance(SpellSchool::Physical);
        let a = ModifierSource::new(AuraId(1), 0);
        let b = ModifierSource::new(AuraId(2), 1);

        table.insert(armor, a, Bonus::Flat(200));
        table.insert(armor, b, Bonus::More(50));
        // (1000 + 200) × 1.5
        assert_eq!(table.apply(armor, 1000), 1800);

        // Remove the first contributor before the second
        table.remove(armor, a);
        assert_eq!(table.apply(armor, 1000), 1500);
        table.remove(armor, b);
        assert_eq!(table.apply(armor, 1000), 1000);
        assert!(table.is_empty());
    }

    #[test]
    fn remove_source_clears_all_stats() {
        let mut table = ModifierTable::new();
        let source = ModifierSource::new(AuraId(7), 2);
        table.insert(StatKind::MaxHealth, source, Bonus::Flat(100));
        table.insert(StatKind::BlockValue, source, Bonus::Flat(30));
        assert_eq!(table.remove_source(source), 2);
        assert_eq!(table.apply(StatKind::MaxHealth, 500), 500);
    }
}
