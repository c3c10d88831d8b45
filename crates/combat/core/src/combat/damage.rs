use super::absorb::{absorb_damage, prevent_death};
use super::death::kill;
use super::mitigation::{armor_reduced, reduced_by_armor, roll_resist};
use super::{AttackType, DamageInfo, DamageRequest, HitFlags, SpellContext};
use crate::aura::AuraEffect;
use crate::aura::interrupt::interrupt_auras;
use crate::aura::query::total_multiplier;
use crate::env::CombatEnv;
use crate::events::CombatEvent;
use crate::proc::{ProcEvent, ProcFlags, ProcHit, ProcSpellType, dispatch_proc};
use crate::spell::{AuraInterruptFlags, AuraType, CastInterruptFlags, DamageClass, SpellInfo, SpellSchoolMask};
use crate::state::{EntityId, World};

/// Resolves one hit end to end: mitigation, absorption, health loss,
/// threat, interrupts and procs.
///
/// A missing, dead or evading victim yields an empty result.
pub fn resolve_damage(world: &mut World, env: CombatEnv<'_>, request: DamageRequest) -> DamageInfo {
    let victim = request.victim;
    let Some(target) = world.actor(victim) else {
        return DamageInfo::nothing(&request);
    };
    if !target.is_alive() || target.is_evading() {
        return DamageInfo::nothing(&request);
    }
    let spell = request
        .spell
        .and_then(|context| env.spells().spell(context.spell));

    let mut info = DamageInfo::from_request(&request);

    if let Some(avoidance) = request.avoided {
        info.amount = 0;
        info.hit |= avoidance.hit_flag();
        finish(world, env, &info);
        return info;
    }

    if is_immune(world, victim, info.school, spell) {
        info.amount = 0;
        info.hit |= HitFlags::IMMUNE;
        env.publish(CombatEvent::Immune {
            attacker: info.attacker,
            victim,
            spell: info.spell.map(|context| context.spell),
        });
        tracing::debug!(victim = %victim, school = ?info.school, "damage nullified by immunity");
        finish(world, env, &info);
        return info;
    }

    apply_percent_modifiers(world, &mut info);
    let critical = request.crit.then(|| critical_multiplier(world, env, &info));
    // Mitigation only shrinks from here.
    info.original = critical.map_or(info.amount, |multiplier| critical_total(info.amount, multiplier));

    let before_armor = info.amount;
    if reduced_by_armor(info.school, spell) {
        info.amount = armor_reduced(world, env, info.attacker, victim, info.amount);
    }
    let armor_reduction = before_armor.saturating_sub(info.amount);

    let resisted = roll_resist(
        world,
        env,
        info.attacker,
        victim,
        info.school,
        spell,
        info.amount,
        armor_reduction,
    );
    if resisted > 0 {
        info.resisted = info.reduce(resisted);
        info.hit |= HitFlags::RESIST;
        if info.amount == 0 {
            info.hit |= HitFlags::FULL_RESIST;
        }
    }

    if let Some(multiplier) = critical
        && info.amount > 0
    {
        info.amount = critical_total(info.amount, multiplier);
        info.hit |= HitFlags::CRITICAL;
    }
    if request.blocked && info.damage_class != DamageClass::Magic && info.amount > 0 {
        let block_value = world.actor(victim).map_or(0, |actor| actor.block_value());
        info.blocked = info.reduce(block_value);
        info.hit |= HitFlags::BLOCK;
        if info.amount == 0 {
            info.hit |= HitFlags::FULL_BLOCK;
        }
    }

    if info.amount > 0 {
        absorb_damage(world, env, &mut info);
        if info.absorbed > 0 {
            info.hit |= HitFlags::ABSORB;
            if info.amount == 0 {
                info.hit |= HitFlags::FULL_ABSORB;
            }
        }
    }
    if info.amount > 0 {
        prevent_death(world, env, &mut info);
    }

    let (_, overkill) = health_loss(
        world,
        env,
        info.attacker,
        victim,
        info.amount,
        info.absorbed,
        info.spell,
        !info.periodic,
    );
    info.overkill = overkill;

    finish(world, env, &info);
    info
}

/// Takes `amount` health from `victim` without mitigation or procs.
///
/// Used for redirected damage (split auras). Still interrupts, generates
/// threat and kills. Returns the overkill.
pub fn deal_damage(
    world: &mut World,
    env: CombatEnv<'_>,
    attacker: Option<EntityId>,
    victim: EntityId,
    amount: u32,
    spell: Option<SpellContext>,
) -> u32 {
    let alive = world.actor(victim).is_some_and(|actor| actor.is_alive());
    if !alive {
        return 0;
    }
    health_loss(world, env, attacker, victim, amount, 0, spell, true).1
}

fn is_immune(world: &World, victim: EntityId, school: SpellSchoolMask, spell: Option<&SpellInfo>) -> bool {
    let Some(target) = world.actor(victim) else {
        return false;
    };
    if target.immunities.is_immune_to_damage(school) {
        return true;
    }
    // A spell with no effect left to land is rejected as a whole.
    spell.is_some_and(|spell| {
        !spell.effects.is_empty() && target.immunities.landing_mask(spell, u8::MAX) == 0
    })
}

fn apply_percent_modifiers(world: &World, info: &mut DamageInfo) {
    let school = info.school;
    let in_school = |effect: &AuraEffect| {
        SpellSchoolMask::from_misc(effect.misc_value).intersects(school)
    };
    let mut multiplier = 1.0;
    if let Some(attacker) = info.attacker {
        multiplier *= total_multiplier(world, attacker, AuraType::ModDamagePercentDone, |_, effect| {
            in_school(effect)
        });
    }
    multiplier *= total_multiplier(world, info.victim, AuraType::ModDamagePercentTaken, |_, effect| {
        in_school(effect)
    });
    info.amount = (info.amount as f32 * multiplier.max(0.0)) as u32;
}

/// Bonus fraction a critical hit adds on top of the hit.
fn critical_multiplier(world: &World, env: CombatEnv<'_>, info: &DamageInfo) -> f32 {
    let tuning = &env.config().crit;
    let pct = match info.damage_class {
        DamageClass::Melee | DamageClass::Ranged => tuning.melee_pct,
        DamageClass::Magic | DamageClass::None if info.spell.is_none() => tuning.melee_pct,
        DamageClass::Magic | DamageClass::None => tuning.spell_pct,
    };
    let taken = total_multiplier(world, info.victim, AuraType::ModCritDamageTakenPct, |_, _| true);
    pct.saturating_sub(100) as f32 / 100.0 * taken.max(0.0)
}

/// `amount` plus its critical bonus; monotonic in `amount`.
fn critical_total(amount: u32, multiplier: f32) -> u32 {
    amount.saturating_add((amount as f32 * multiplier) as u32)
}

/// Health loss and its consequences.
///
/// Returns (health lost, overkill).
#[allow(clippy::too_many_arguments)]
fn health_loss(
    world: &mut World,
    env: CombatEnv<'_>,
    attacker: Option<EntityId>,
    victim: EntityId,
    amount: u32,
    absorbed: u32,
    spell: Option<SpellContext>,
    direct: bool,
) -> (u32, u32) {
    let Some(target) = world.actor_mut(victim) else {
        return (0, 0);
    };
    let lost = (-target.health.modify(-i64::from(amount))) as u32;
    let overkill = amount - lost;
    let dead = target.health.current == 0;

    if let (Some(attacker), Some(threat)) = (attacker, env.threat())
        && attacker != victim
        && amount.saturating_add(absorbed) > 0
    {
        let total = amount.saturating_add(absorbed);
        threat.add_threat(attacker, victim, total as f32, spell.map(|c| c.spell));
    }

    if amount > 0 {
        let except = spell.map(|context| context.spell);
        let mut flags = AuraInterruptFlags::TAKE_DAMAGE;
        if direct {
            flags |= AuraInterruptFlags::DIRECT_DAMAGE;
        }
        interrupt_auras(world, env, victim, flags, except);
        if direct && attacker != Some(victim) {
            disrupt_cast(env, victim);
        }
    }

    if dead {
        kill(world, env, attacker, victim);
    }
    (lost, overkill)
}

/// A damaged caster loses or delays its cast.
fn disrupt_cast(env: CombatEnv<'_>, victim: EntityId) {
    let Some(casts) = env.casts() else {
        return;
    };
    let Some(cast) = casts.current_cast(victim) else {
        return;
    };
    if cast.interrupt.contains(CastInterruptFlags::DAMAGE_CANCELS) {
        casts.interrupt(victim);
    } else if cast.interrupt.contains(CastInterruptFlags::PUSHBACK) {
        casts.delay(victim);
    }
}

fn finish(world: &mut World, env: CombatEnv<'_>, info: &DamageInfo) {
    env.publish(CombatEvent::Damage(info.clone()));
    let Some(attacker) = info.attacker else {
        return;
    };
    let (actor_flags, mut target_flags) = proc_flags(info);
    if info.amount > 0 {
        target_flags |= ProcFlags::TAKEN_DAMAGE;
    }
    let mut event = ProcEvent::new(attacker, Some(info.victim))
        .with_flags(actor_flags, target_flags)
        .with_hit(proc_hit_mask(info))
        .with_damage(info.clone());
    if let Some(context) = info.spell {
        event = event.with_spell(context, ProcSpellType::DAMAGE);
    } else {
        event.spell_type = ProcSpellType::DAMAGE;
    }
    dispatch_proc(world, env, &event);
}

/// Actor-side and target-side proc flags of a resolved hit.
pub(crate) fn proc_flags(info: &DamageInfo) -> (ProcFlags, ProcFlags) {
    if info.periodic {
        return (ProcFlags::DONE_PERIODIC, ProcFlags::TAKEN_PERIODIC);
    }
    if info.spell.is_none() {
        return match info.attack_type {
            AttackType::Ranged => (
                ProcFlags::DONE_RANGED_AUTO_ATTACK,
                ProcFlags::TAKEN_RANGED_AUTO_ATTACK,
            ),
            AttackType::MainHand => (
                ProcFlags::DONE_MELEE_AUTO_ATTACK | ProcFlags::DONE_MAINHAND_ATTACK,
                ProcFlags::TAKEN_MELEE_AUTO_ATTACK,
            ),
            AttackType::OffHand => (
                ProcFlags::DONE_MELEE_AUTO_ATTACK | ProcFlags::DONE_OFFHAND_ATTACK,
                ProcFlags::TAKEN_MELEE_AUTO_ATTACK,
            ),
        };
    }
    match info.damage_class {
        DamageClass::Melee => (
            ProcFlags::DONE_SPELL_MELEE_DMG_CLASS,
            ProcFlags::TAKEN_SPELL_MELEE_DMG_CLASS,
        ),
        DamageClass::Ranged => (
            ProcFlags::DONE_SPELL_RANGED_DMG_CLASS,
            ProcFlags::TAKEN_SPELL_RANGED_DMG_CLASS,
        ),
        DamageClass::Magic => (
            ProcFlags::DONE_SPELL_MAGIC_DMG_CLASS_NEG,
            ProcFlags::TAKEN_SPELL_MAGIC_DMG_CLASS_NEG,
        ),
        DamageClass::None => (
            ProcFlags::DONE_SPELL_NONE_DMG_CLASS_NEG,
            ProcFlags::TAKEN_SPELL_NONE_DMG_CLASS_NEG,
        ),
    }
}

/// Proc hit mask of a resolved hit.
///
/// The hit counts as nullified when it was fully absorbed or fully resisted,
/// or fully blocked. A hit that was not nullified adds CRITICAL or NORMAL; a
/// nullified one adds FULL_RESIST when that is why.
pub fn proc_hit_mask(info: &DamageInfo) -> ProcHit {
    let avoided = [
        (HitFlags::MISS, ProcHit::MISS),
        (HitFlags::DODGE, ProcHit::DODGE),
        (HitFlags::PARRY, ProcHit::PARRY),
        (HitFlags::EVADE, ProcHit::EVADE),
        (HitFlags::IMMUNE, ProcHit::IMMUNE),
    ];
    let mut mask = ProcHit::empty();
    for (flag, hit) in avoided {
        if info.hit.contains(flag) {
            mask |= hit;
        }
    }
    if !mask.is_empty() {
        return mask;
    }

    if info.absorbed > 0 {
        mask |= ProcHit::ABSORB;
    }
    if info.blocked > 0 {
        mask |= ProcHit::BLOCK;
    }
    if info.hit.contains(HitFlags::FULL_BLOCK) {
        mask |= ProcHit::FULL_BLOCK;
    }

    let nullified = info.hit.intersects(HitFlags::FULL_ABSORB | HitFlags::FULL_RESIST)
        || mask.contains(ProcHit::FULL_BLOCK);
    if !nullified {
        mask |= if info.is_critical() {
            ProcHit::CRITICAL
        } else {
            ProcHit::NORMAL
        };
    } else if info.hit.contains(HitFlags::FULL_RESIST) {
        mask |= ProcHit::FULL_RESIST;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SpellId;

    fn hit(flags: HitFlags, absorbed: u32, blocked: u32) -> DamageInfo {
        let mut info = DamageInfo::from_request(&DamageRequest::melee(EntityId(1), EntityId(2), 100));
        info.hit = flags;
        info.absorbed = absorbed;
        info.blocked = blocked;
        info
    }

    #[test]
    fn plain_and_critical_hits() {
        assert_eq!(proc_hit_mask(&hit(HitFlags::empty(), 0, 0)), ProcHit::NORMAL);
        assert_eq!(proc_hit_mask(&hit(HitFlags::CRITICAL, 0, 0)), ProcHit::CRITICAL);
    }

    #[test]
    fn partial_absorb_still_hits() {
        assert_eq!(
            proc_hit_mask(&hit(HitFlags::ABSORB | HitFlags::CRITICAL, 40, 0)),
            ProcHit::ABSORB | ProcHit::CRITICAL
        );
    }

    #[test]
    fn nullified_hits_drop_normal_and_critical() {
        assert_eq!(
            proc_hit_mask(&hit(HitFlags::ABSORB | HitFlags::FULL_ABSORB | HitFlags::CRITICAL, 100, 0)),
            ProcHit::ABSORB
        );
        assert_eq!(
            proc_hit_mask(&hit(HitFlags::RESIST | HitFlags::FULL_RESIST, 0, 0)),
            ProcHit::FULL_RESIST
        );
        assert_eq!(
            proc_hit_mask(&hit(HitFlags::BLOCK | HitFlags::FULL_BLOCK, 0, 100)),
            ProcHit::BLOCK | ProcHit::FULL_BLOCK
        );
    }

    #[test]
    fn avoidance_masks_are_exclusive() {
        assert_eq!(proc_hit_mask(&hit(HitFlags::DODGE, 0, 0)), ProcHit::DODGE);
        assert_eq!(proc_hit_mask(&hit(HitFlags::IMMUNE, 0, 0)), ProcHit::IMMUNE);
    }

    #[test]
    fn proc_flags_follow_attack_kind() {
        let melee = hit(HitFlags::empty(), 0, 0);
        let (done, taken) = proc_flags(&melee);
        assert!(done.contains(ProcFlags::DONE_MELEE_AUTO_ATTACK | ProcFlags::DONE_MAINHAND_ATTACK));
        assert_eq!(taken, ProcFlags::TAKEN_MELEE_AUTO_ATTACK);

        let mut dot = melee.clone();
        dot.spell = Some(SpellContext::new(SpellId(3)));
        dot.periodic = true;
        assert_eq!(proc_flags(&dot), (ProcFlags::DONE_PERIODIC, ProcFlags::TAKEN_PERIODIC));
    }
}
