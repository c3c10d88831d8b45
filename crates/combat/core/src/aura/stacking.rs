//! Stacking and exclusivity between a new aura and the auras already on its
//! target.
//!
//! Every conflict is decided before the new aura exists: either the whole
//! application is refused, or the list of auras it displaces is returned.

use super::{ApplicationState, Aura};
use crate::env::CombatEnv;
use crate::error::AuraRefusal;
use crate::spell::{SpellAttributes, SpellGroupStackRule, SpellInfo};
use crate::state::{AuraId, EntityId, ItemId, World};

/// Outcome of the exclusivity checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exclusivity {
    /// The new aura may be created once these existing auras are removed.
    Allowed(Vec<AuraId>),
    Refused(AuraRefusal),
}

pub(crate) fn resolve_exclusivity(
    world: &World,
    env: CombatEnv<'_>,
    spell: &SpellInfo,
    caster: EntityId,
    cast_item: Option<ItemId>,
    target: EntityId,
    mask: u8,
) -> Exclusivity {
    let Some(actor) = world.actor(target) else {
        return Exclusivity::Allowed(Vec::new());
    };

    let mut displaced = Vec::new();
    for app in actor.applications() {
        if !matches!(app.state, ApplicationState::Pending | ApplicationState::Applied) {
            continue;
        }
        let Some(existing) = world.aura(app.aura) else {
            continue;
        };
        let Some(existing_spell) = env.spells().spell(existing.spell) else {
            continue;
        };

        let rule = env.group_rule_between(spell, existing_spell);
        if rule == SpellGroupStackRule::ExclusiveHighest {
            match highest_exclusive_diff(spell, mask, existing) {
                diff if diff > 0 => {
                    // An area aura is never displaced from its own owner.
                    if existing.area && existing.owner == target {
                        return Exclusivity::Refused(AuraRefusal::NotHighest {
                            spell: spell.id,
                            existing: existing.id,
                        });
                    }
                    displaced.push(existing.id);
                }
                _ => {
                    return Exclusivity::Refused(AuraRefusal::NotHighest {
                        spell: spell.id,
                        existing: existing.id,
                    });
                }
            }
            continue;
        }

        if can_stack_with(env, spell, caster, cast_item, existing, existing_spell) {
            continue;
        }
        if spell.stack_priority > existing_spell.stack_priority {
            displaced.push(existing.id);
        } else {
            return Exclusivity::Refused(AuraRefusal::Outranked {
                spell: spell.id,
                existing: existing.id,
            });
        }
    }
    Exclusivity::Allowed(displaced)
}

/// Strength of the new aura relative to an existing exclusive-highest one.
///
/// Compares the summed absolute amounts of the aura types both share; on a
/// tie, or when they share none, the one with more effect slots is stronger.
/// Positive means the new aura wins.
fn highest_exclusive_diff(spell: &SpellInfo, mask: u8, existing: &Aura) -> i64 {
    let new_effects = || {
        spell
            .effects
            .iter()
            .enumerate()
            .filter(move |(slot, effect)| mask & (1 << slot) != 0 && effect.is_aura())
            .map(|(_, effect)| effect)
    };

    let mut new_total = 0i64;
    let mut existing_total = 0i64;
    let mut shared = false;
    for effect in new_effects() {
        let matching: Vec<i64> = existing
            .effects()
            .filter(|other| other.aura_type == effect.aura)
            .map(|other| i64::from(other.amount).abs())
            .collect();
        if matching.is_empty() {
            continue;
        }
        shared = true;
        new_total += i64::from(effect.base_points).abs();
        existing_total += matching.iter().copied().max().unwrap_or(0);
    }

    if !shared {
        // Nothing comparable: the newer aura takes the slot.
        return 1;
    }
    let diff = new_total - existing_total;
    if diff != 0 {
        return diff;
    }
    i64::from(mask.count_ones()) - i64::from(existing.effect_mask().count_ones())
}

/// Whether a new aura of `spell` may coexist with `existing` on one target.
pub fn can_stack_with(
    env: CombatEnv<'_>,
    spell: &SpellInfo,
    caster: EntityId,
    cast_item: Option<ItemId>,
    existing: &Aura,
    existing_spell: &SpellInfo,
) -> bool {
    let same_caster = existing.caster == caster;

    // Passive ranks of one spell from one caster replace each other.
    if same_caster
        && spell.is_passive()
        && existing_spell.is_passive()
        && spell.is_rank_of(existing_spell)
        && cast_item.is_none()
        && existing.cast_item.is_none()
    {
        return false;
    }

    if triggers(spell, existing_spell) || triggers(existing_spell, spell) {
        return true;
    }

    match env.group_rule_between(spell, existing_spell) {
        SpellGroupStackRule::Exclusive | SpellGroupStackRule::ExclusiveHighest => return false,
        SpellGroupStackRule::ExclusiveFromSameCaster if same_caster => return false,
        _ => {}
    }

    if spell.family != existing_spell.family {
        return true;
    }

    if !same_caster {
        if existing_spell.has_attribute(SpellAttributes::CHANNELED)
            || spell.has_attribute(SpellAttributes::STACK_FOR_DIFF_CASTERS)
        {
            return true;
        }
        let shared_periodic = spell.effects.iter().any(|effect| {
            effect.is_aura()
                && effect.aura.is_periodic()
                && existing.has_effect_type(effect.aura)
        });
        if shared_periodic {
            return true;
        }
    }

    if spell.is_rank_of(existing_spell) {
        return spell.is_multi_slot() && !spell.is_area_aura();
    }
    true
}

fn triggers(source: &SpellInfo, target: &SpellInfo) -> bool {
    source
        .effects
        .iter()
        .any(|effect| effect.trigger_spell == Some(target.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::{AuraType, SpellEffectInfo};
    use crate::state::{GameTime, SpellId};
    use std::collections::BTreeSet;

    fn aura_of(spell: &SpellInfo, caster: u32) -> Aura {
        let mut effects: [Option<super::super::AuraEffect>; 3] = Default::default();
        for (slot, info) in spell.effects.iter().enumerate() {
            effects[slot] = Some(super::super::AuraEffect::from_info(slot as u8, info, info.base_points));
        }
        Aura {
            id: AuraId(1),
            spell: spell.id,
            caster: EntityId(caster),
            cast_item: None,
            owner: EntityId(9),
            duration_ms: None,
            max_duration_ms: None,
            charges: 0,
            stacks: 1,
            effects,
            targets: BTreeSet::new(),
            removed: None,
            positive: spell.positive,
            passive: spell.is_passive(),
            area: spell.is_area_aura(),
            single_target: false,
            using_charges: false,
            interrupt_flags: Default::default(),
            diminishing: None,
            absorb_priority: 0,
            chain_depth: 0,
            proc_cooldown_until: GameTime::ZERO,
            applied_at: GameTime::ZERO,
            last_area_refresh: GameTime::ZERO,
        }
    }

    #[test]
    fn larger_amount_wins_then_slot_count() {
        let weak = SpellInfo::new(SpellId(1), "weak")
            .with_effect(SpellEffectInfo::aura(AuraType::ModStat, 50));
        let strong = SpellInfo::new(SpellId(2), "strong")
            .with_effect(SpellEffectInfo::aura(AuraType::ModStat, -80));
        let existing = aura_of(&weak, 1);
        // |-80| beats |50|
        assert_eq!(highest_exclusive_diff(&strong, 0b1, &existing), 30);
        assert_eq!(highest_exclusive_diff(&weak, 0b1, &aura_of(&strong, 1)), -30);

        let wide = SpellInfo::new(SpellId(3), "wide")
            .with_effect(SpellEffectInfo::aura(AuraType::ModStat, 50))
            .with_effect(SpellEffectInfo::aura(AuraType::ModResistance, 5));
        // Equal shared amounts, one more slot
        assert_eq!(highest_exclusive_diff(&wide, 0b11, &existing), 1);
        // Exact tie
        assert_eq!(highest_exclusive_diff(&weak, 0b1, &existing), 0);
    }

    #[test]
    fn periodic_auras_from_different_casters_stack() {
        use crate::config::CombatConfig;
        use crate::env::PcgRng;
        use crate::testing::SpellBook;

        let dot = SpellInfo::new(SpellId(5), "dot")
            .with_effect(SpellEffectInfo::aura(AuraType::PeriodicDamage, 10).with_amplitude(3_000));
        let buff = SpellInfo::new(SpellId(6), "buff")
            .with_effect(SpellEffectInfo::aura(AuraType::ModStat, 10));
        let book = SpellBook::new().with(dot.clone()).with(buff.clone());
        let config = CombatConfig::default();
        let env = CombatEnv::new(&book, &config, &PcgRng);

        assert!(can_stack_with(env, &dot, EntityId(2), None, &aura_of(&dot, 1), &dot));
        // Same non-periodic spell from another caster does not stack
        assert!(!can_stack_with(env, &buff, EntityId(2), None, &aura_of(&buff, 1), &buff));
        // Different spells of the same family stack
        assert!(can_stack_with(env, &buff, EntityId(1), None, &aura_of(&dot, 1), &dot));
    }
}
