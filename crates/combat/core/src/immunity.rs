//! Per-actor immunity table.
//!
//! Immunities are purely additive: every aura effect that grants one is
//! recorded as a grant source, and the immunity holds while at least one
//! source remains. Sources are revoked explicitly when the granting effect is
//! unapplied.

use std::collections::BTreeMap;

use strum::{AsRefStr, Display};

use crate::config::CombatConfig;
use crate::spell::{DispelType, Mechanic, SpellAttributes, SpellInfo, SpellSchoolMask};
use crate::state::{AuraId, SpellId};

/// What an immunity entry is keyed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ImmunityCategory {
    /// Specific spell id.
    Id,
    Dispel,
    Mechanic,
    /// Spell effect kind.
    Effect,
    /// Aura type.
    State,
    /// Spells of a school (mask key).
    School,
    /// Damage of a school (mask key).
    Damage,
}

impl ImmunityCategory {
    /// Mask categories are satisfied by the union of all granted masks.
    pub const fn is_mask(self) -> bool {
        matches!(self, Self::School | Self::Damage)
    }
}

/// Aura effect slot that granted an immunity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImmunitySource {
    pub spell: SpellId,
    pub aura: AuraId,
    pub slot: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImmunityTable {
    entries: BTreeMap<(ImmunityCategory, u32), Vec<ImmunitySource>>,
}

impl ImmunityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, category: ImmunityCategory, key: u32, source: ImmunitySource) {
        let sources = self.entries.entry((category, key)).or_default();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    /// Removes one grant. Returns false if `source` was not granting this entry.
    pub fn revoke(&mut self, category: ImmunityCategory, key: u32, source: ImmunitySource) -> bool {
        let Some(sources) = self.entries.get_mut(&(category, key)) else {
            return false;
        };
        let before = sources.len();
        sources.retain(|s| *s != source);
        let removed = sources.len() != before;
        if sources.is_empty() {
            self.entries.remove(&(category, key));
        }
        removed
    }

    pub fn grantors(&self, category: ImmunityCategory, key: u32) -> &[ImmunitySource] {
        self.entries
            .get(&(category, key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Checks whether the actor is immune to `key` in `category`.
    ///
    /// When `purges` is given, only grants whose spell passes the predicate
    /// count. It is used to ask "does any grantor purge existing effects".
    /// For mask categories `key` is a school mask that must be fully covered.
    pub fn is_immune<F>(&self, category: ImmunityCategory, key: u32, mut purges: Option<F>) -> bool
    where
        F: FnMut(SpellId) -> bool,
    {
        let mut counts = |sources: &[ImmunitySource]| match purges.as_mut() {
            Some(predicate) => sources.iter().any(|s| predicate(s.spell)),
            None => !sources.is_empty(),
        };

        if category.is_mask() {
            if key == 0 {
                return false;
            }
            let covered = self
                .entries
                .range((category, 0)..=(category, u32::MAX))
                .filter(|(_, sources)| counts(sources.as_slice()))
                .fold(0u32, |mask, ((_, granted), _)| mask | granted);
            return covered & key == key;
        }

        self.entries
            .get(&(category, key))
            .is_some_and(|sources| counts(sources.as_slice()))
    }

    /// Shorthand for damage-school immunity without the purge requirement.
    pub fn is_immune_to_damage(&self, school: SpellSchoolMask) -> bool {
        self.is_immune::<fn(SpellId) -> bool>(ImmunityCategory::Damage, u32::from(school.bits()), None)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Effect slots of `spell` (within `mask`) that can still land.
    ///
    /// Spell id, dispel type and spell mechanic immunities block the whole
    /// spell; school immunity blocks only harmful spells that are not flagged
    /// to ignore it. Effect kind, aura type and per-effect mechanic
    /// immunities block single slots.
    pub fn effect_mask_for<F>(&self, spell: &SpellInfo, mask: u8, purges: Option<F>) -> u8
    where
        F: Fn(SpellId) -> bool + Copy,
    {
        let immune = |category, key| self.is_immune(category, key, purges);

        if immune(ImmunityCategory::Id, spell.id.0) {
            return 0;
        }
        if !spell.positive
            && !spell.has_attribute(SpellAttributes::UNAFFECTED_BY_SCHOOL_IMMUNE)
            && immune(ImmunityCategory::School, u32::from(spell.school.bits()))
        {
            return 0;
        }
        if spell.dispel != DispelType::None && immune(ImmunityCategory::Dispel, spell.dispel as u32) {
            return 0;
        }
        if spell.mechanic != Mechanic::None && immune(ImmunityCategory::Mechanic, spell.mechanic as u32) {
            return 0;
        }

        let mut allowed = mask;
        for (slot, effect) in spell.effects.iter().enumerate().take(CombatConfig::MAX_EFFECTS) {
            let bit = 1u8 << slot;
            if allowed & bit == 0 {
                continue;
            }
            let blocked = (effect.mechanic != Mechanic::None
                && immune(ImmunityCategory::Mechanic, effect.mechanic as u32))
                || immune(ImmunityCategory::Effect, effect.kind as u32)
                || (effect.is_aura() && immune(ImmunityCategory::State, effect.aura as u32));
            if blocked {
                allowed &= !bit;
            }
        }
        allowed
    }

    /// Shorthand for [`effect_mask_for`](Self::effect_mask_for) without the purge requirement.
    pub fn landing_mask(&self, spell: &SpellInfo, mask: u8) -> u8 {
        self.effect_mask_for::<fn(SpellId) -> bool>(spell, mask, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(spell: u32, aura: u64) -> ImmunitySource {
        ImmunitySource {
            spell: SpellId(spell),
            aura: AuraId(aura),
            slot: 0,
        }
    }

    #[test]
    fn immunity_holds_until_last_grant_is_revoked() {
        let mut table = ImmunityTable::new();
        let stun = 9;
        table.grant(ImmunityCategory::Mechanic, stun, source(1, 1));
        table.grant(ImmunityCategory::Mechanic, stun, source(2, 2));

        assert!(table.is_immune::<fn(SpellId) -> bool>(ImmunityCategory::Mechanic, stun, None));
        assert!(table.revoke(ImmunityCategory::Mechanic, stun, source(1, 1)));
        assert!(table.is_immune::<fn(SpellId) -> bool>(ImmunityCategory::Mechanic, stun, None));
        assert!(table.revoke(ImmunityCategory::Mechanic, stun, source(2, 2)));
        assert!(!table.is_immune::<fn(SpellId) -> bool>(ImmunityCategory::Mechanic, stun, None));
        assert!(table.is_empty());

        // Revoking an unknown grant is a no-op
        assert!(!table.revoke(ImmunityCategory::Mechanic, stun, source(1, 1)));
    }

    #[test]
    fn school_masks_require_full_coverage() {
        let mut table = ImmunityTable::new();
        let fire = u32::from(SpellSchoolMask::FIRE.bits());
        let frost = u32::from(SpellSchoolMask::FROST.bits());
        table.grant(ImmunityCategory::Damage, fire, source(1, 1));

        assert!(table.is_immune_to_damage(SpellSchoolMask::FIRE));
        // Frostfire needs both schools covered
        assert!(!table.is_immune_to_damage(SpellSchoolMask::FIRE | SpellSchoolMask::FROST));

        table.grant(ImmunityCategory::Damage, frost, source(2, 2));
        assert!(table.is_immune_to_damage(SpellSchoolMask::FIRE | SpellSchoolMask::FROST));
    }

    #[test]
    fn spell_filter_blocks_whole_spell_or_single_slots() {
        use crate::spell::{AuraType, SpellEffectInfo};

        let spell = SpellInfo::new(SpellId(30), "hamstring")
            .with_school(SpellSchoolMask::NORMAL)
            .with_effect(SpellEffectInfo::aura(AuraType::ModRoot, 0).with_mechanic(Mechanic::Root))
            .with_effect(SpellEffectInfo::aura(AuraType::PeriodicDamage, 10));
        let mut table = ImmunityTable::new();
        assert_eq!(table.landing_mask(&spell, 0b11), 0b11);

        // Root immunity strips only the root slot
        table.grant(ImmunityCategory::Mechanic, Mechanic::Root as u32, source(1, 1));
        assert_eq!(table.landing_mask(&spell, 0b11), 0b10);

        // Physical school immunity blocks the harmful spell entirely
        table.grant(ImmunityCategory::School, u32::from(SpellSchoolMask::NORMAL.bits()), source(2, 2));
        assert_eq!(table.landing_mask(&spell, 0b11), 0);

        // ...but not a beneficial one
        let buff = spell.clone().positive();
        assert_eq!(table.landing_mask(&buff, 0b11), 0b10);
    }

    #[test]
    fn purge_requirement_filters_grantors() {
        let mut table = ImmunityTable::new();
        table.grant(ImmunityCategory::Mechanic, 4, source(10, 1));
        table.grant(ImmunityCategory::Mechanic, 4, source(11, 2));

        // Only spell 11 purges existing effects
        let purging = |spell: SpellId| spell == SpellId(11);
        assert!(table.is_immune(ImmunityCategory::Mechanic, 4, Some(purging)));

        table.revoke(ImmunityCategory::Mechanic, 4, source(11, 2));
        assert!(!table.is_immune(ImmunityCategory::Mechanic, 4, Some(purging)));
        assert!(table.is_immune::<fn(SpellId) -> bool>(ImmunityCategory::Mechanic, 4, None));
    }
}
