//! Armor and resistance mitigation.
//!
//! All constants come from [`ArmorTuning`] and [`ResistanceTuning`]; the
//! functions here only combine them with the participants' stats and the
//! attacker-side penetration auras.

use crate::aura::query::total_modifier;
use crate::config::{ArmorTuning, ResistanceTuning};
use crate::env::{CombatEnv, roll};
use crate::spell::{AuraType, SpellAttributes, SpellInfo, SpellSchoolMask};
use crate::state::{CombatRatingSource, EntityId, World};

/// Number of discrete resist outcomes (0%, 10%, ... 100%).
pub const RESIST_BUCKETS: usize = 11;

/// Fraction of damage removed by `armor` against an attacker of `level`.
pub fn armor_reduction(armor: f32, level: u8, tuning: &ArmorTuning) -> f32 {
    if armor <= 0.0 {
        return 0.0;
    }
    let mut level = f32::from(level);
    let threshold = f32::from(tuning.high_level_threshold);
    if level > threshold {
        level += tuning.high_level_factor * (level - threshold);
    }
    let divisor = (tuning.level_factor * level + tuning.constant) / tuning.scale;
    (armor / (armor + divisor)).clamp(0.0, tuning.max_reduction)
}

/// Victim armor as seen by `attacker`.
///
/// Flat target-resistance auras of the attacker (physical bit) come off
/// first, then the victim's bypass-armor auras cast by the attacker, then the
/// attacker's armor penetration auras and rating.
pub fn effective_armor(world: &World, attacker: Option<EntityId>, victim: EntityId) -> f32 {
    let Some(target) = world.actor(victim) else {
        return 0.0;
    };
    let mut armor = target.armor() as f32;
    let Some(attacker) = attacker.and_then(|id| world.actor(id)) else {
        return armor.max(0.0);
    };

    armor += total_modifier(world, attacker.id, AuraType::ModTargetResistance, |_, effect| {
        SpellSchoolMask::from_misc(effect.misc_value).contains(SpellSchoolMask::NORMAL)
    }) as f32;

    let bypass = total_modifier(world, victim, AuraType::BypassArmorForCaster, |aura, _| {
        aura.caster == attacker.id
    });
    armor -= armor * (bypass as f32 / 100.0);

    let penetration = total_modifier(world, attacker.id, AuraType::ModArmorPenetrationPct, |_, _| true)
        as f32
        + attacker.armor_penetration_pct();
    armor -= armor * (penetration.clamp(0.0, 100.0) / 100.0);

    armor.max(0.0)
}

/// Whether armor applies to damage of `school` from `spell`.
pub fn reduced_by_armor(school: SpellSchoolMask, spell: Option<&SpellInfo>) -> bool {
    school.contains(SpellSchoolMask::NORMAL)
        && !spell.is_some_and(|info| info.has_attribute(SpellAttributes::IGNORE_ARMOR))
}

/// `amount` after armor.
pub fn armor_reduced(
    world: &World,
    env: CombatEnv<'_>,
    attacker: Option<EntityId>,
    victim: EntityId,
    amount: u32,
) -> u32 {
    let level = attacker
        .or(Some(victim))
        .and_then(|id| world.actor(id))
        .map_or(1, |actor| actor.level());
    let armor = effective_armor(world, attacker, victim);
    let reduction = armor_reduction(armor, level, &env.config().armor);
    ((amount as f32 * (1.0 - reduction)).max(0.0) as u32).min(amount)
}

/// Whether damage of `school` from `spell` rolls for partial resists.
pub fn can_resist(school: SpellSchoolMask, spell: Option<&SpellInfo>) -> bool {
    if !school.has_magic() {
        return false;
    }
    if spell.is_some_and(|info| {
        info.has_attribute(SpellAttributes::IGNORE_RESISTANCES)
            || info.has_attribute(SpellAttributes::BINARY)
    }) {
        return false;
    }
    !school.contains(SpellSchoolMask::NORMAL)
        || spell.is_some_and(|info| info.has_attribute(SpellAttributes::NORMAL_WITH_MAGIC))
}

/// Average resisted fraction of a `school` hit on `victim`, in `[0, 1)`.
pub fn average_resist(
    world: &World,
    tuning: &ResistanceTuning,
    attacker: Option<EntityId>,
    victim: EntityId,
    school: SpellSchoolMask,
) -> f32 {
    let Some(target) = world.actor(victim) else {
        return 0.0;
    };
    let magic = school & SpellSchoolMask::MAGIC;
    let mut resistance = target.resistance_for(magic) as f32;

    if let Some(attacker) = attacker.and_then(|id| world.actor(id)) {
        resistance += total_modifier(world, attacker.id, AuraType::ModTargetResistance, |_, effect| {
            SpellSchoolMask::from_misc(effect.misc_value).intersects(magic)
        }) as f32;
        let gap = target.level().saturating_sub(attacker.level());
        resistance += f32::from(gap) * tuning.per_level_difference;
    }
    let resistance = resistance.max(0.0);
    if resistance == 0.0 {
        return 0.0;
    }

    let constant = if target.level() >= tuning.boss_level {
        tuning.boss_constant
    } else {
        f32::from(target.level().max(1)) * tuning.constant_per_level
    };
    resistance / (resistance + constant)
}

/// Probability of each resist bucket for an average resist fraction.
///
/// The distribution is a triangle centred on the average; low averages put
/// most of the weight on the first three buckets.
pub fn resist_distribution(average: f32) -> [f32; RESIST_BUCKETS] {
    let mut buckets = [0.0; RESIST_BUCKETS];
    for (i, p) in buckets.iter_mut().enumerate() {
        *p = (0.5 - 2.5 * (0.1 * i as f32 - average).abs()).max(0.0);
    }
    if average <= 0.1 {
        buckets[0] = 1.0 - 7.5 * average;
        buckets[1] = 5.0 * average;
        buckets[2] = 2.5 * average;
    }
    buckets
}

/// Bucket index (tenths resisted) selected by a uniform roll `r` in `[0, 1)`.
pub fn pick_bucket(distribution: &[f32; RESIST_BUCKETS], r: f32) -> usize {
    let mut index = 0;
    let mut sum = distribution[0];
    while r >= sum && index < RESIST_BUCKETS - 1 {
        index += 1;
        sum += distribution[index];
    }
    index
}

/// Rolls the resisted part of a magic hit of `amount`.
///
/// `armor_reduction` is what armor already removed; spells that are both
/// physical and magical never resist more than that.
#[allow(clippy::too_many_arguments)]
pub fn roll_resist(
    world: &mut World,
    env: CombatEnv<'_>,
    attacker: Option<EntityId>,
    victim: EntityId,
    school: SpellSchoolMask,
    spell: Option<&SpellInfo>,
    amount: u32,
    armor_reduction: u32,
) -> u32 {
    if amount == 0 || !can_resist(school, spell) {
        return 0;
    }
    let average = average_resist(world, &env.config().resistance, attacker, victim, school);
    if average <= 0.0 {
        return 0;
    }
    let seed = world.next_seed(victim, roll::RESIST);
    let bucket = pick_bucket(&resist_distribution(average), env.rng().rand_norm(seed));
    let mut resisted = amount as f32 * bucket as f32 / 10.0;

    if let Some(attacker) = attacker {
        let ignored = total_modifier(world, attacker, AuraType::ModIgnoreTargetResist, |_, effect| {
            SpellSchoolMask::from_misc(effect.misc_value).intersects(school)
        });
        resisted -= resisted * (ignored.clamp(0, 100) as f32 / 100.0);
    }
    if spell.is_some_and(|info| info.has_attribute(SpellAttributes::NORMAL_WITH_MAGIC)) {
        resisted = resisted.min(armor_reduction as f32);
    }
    (resisted.max(0.0) as u32).min(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armor_formula_matches_level_80_values() {
        let tuning = ArmorTuning::default();
        // L' = 80 + 4.5 × 21 = 174.5; divisor = (8.5 × 174.5 + 40) / 0.1 = 15232.5
        let reduction = armor_reduction(10_000.0, 80, &tuning);
        assert!((reduction - 10_000.0 / 25_232.5).abs() < 1e-4);
        // Below the threshold the level is used as-is
        let low = armor_reduction(1_000.0, 50, &tuning);
        assert!((low - 1_000.0 / (1_000.0 + 4_650.0)).abs() < 1e-4);
    }

    #[test]
    fn armor_reduction_is_capped() {
        let tuning = ArmorTuning::default();
        assert_eq!(armor_reduction(1_000_000.0, 1, &tuning), 0.75);
        assert_eq!(armor_reduction(0.0, 80, &tuning), 0.0);
        assert_eq!(armor_reduction(-50.0, 80, &tuning), 0.0);
    }

    #[test]
    fn resist_distribution_sums_to_one() {
        for average in [0.0, 0.05, 0.1, 0.25, 0.5, 0.75] {
            let sum: f32 = resist_distribution(average).iter().sum();
            assert!((sum - 1.0).abs() < 1e-3, "average {average} sums to {sum}");
        }
    }

    #[test]
    fn zero_resist_always_picks_first_bucket() {
        let distribution = resist_distribution(0.0);
        assert_eq!(pick_bucket(&distribution, 0.0), 0);
        assert_eq!(pick_bucket(&distribution, 0.999), 0);

        // Centred at 50%: a roll in the middle lands on bucket 5
        let half = resist_distribution(0.5);
        assert_eq!(pick_bucket(&half, 0.5), 5);
    }

    #[test]
    fn resist_applies_to_pure_magic_only() {
        let mut hybrid = SpellInfo::new(crate::state::SpellId(1), "hybrid");
        assert!(can_resist(SpellSchoolMask::FIRE, None));
        assert!(!can_resist(SpellSchoolMask::NORMAL, None));
        assert!(!can_resist(SpellSchoolMask::NORMAL | SpellSchoolMask::FIRE, Some(&hybrid)));
        hybrid.attributes |= SpellAttributes::NORMAL_WITH_MAGIC;
        assert!(can_resist(SpellSchoolMask::NORMAL | SpellSchoolMask::FIRE, Some(&hybrid)));
        assert!(reduced_by_armor(SpellSchoolMask::NORMAL | SpellSchoolMask::FIRE, Some(&hybrid)));
    }
}
