//! Apply/unapply handlers of aura effects.
//!
//! Handlers only touch state whose lifetime is bounded by the application:
//! stat modifiers, control counters and immunity grants, each keyed by the
//! (aura, slot) that acquired it. Every other aura type is read at use time
//! by the damage pipeline or the proc engine.

use super::interrupt::stop_channel;
use super::remove::remove_application;
use super::{ApplicationState, AuraEffect, RemoveMode};
use crate::env::CombatEnv;
use crate::error::{ErrorContext, InvariantViolation};
use crate::immunity::{ImmunityCategory, ImmunitySource};
use crate::spell::{AuraType, SpellAttributes, SpellSchoolMask};
use crate::state::{AuraId, ControlKind, EntityId, SpellId, World};
use crate::stats::{Bonus, ModifierSource, StatKind};

/// Runs the apply (`apply = true`) or unapply handler of one effect slot.
pub(crate) fn handle_effect(
    world: &mut World,
    env: CombatEnv<'_>,
    id: AuraId,
    target: EntityId,
    slot: u8,
    apply: bool,
) {
    let Some(aura) = world.aura_any(id) else {
        InvariantViolation::MissingAura {
            aura: id,
            context: ErrorContext::new(world.now()).with_actor(target),
        }
        .log();
        return;
    };
    let Some(effect) = aura.effect(slot).cloned() else {
        InvariantViolation::MissingEffectSlot {
            aura: id,
            slot,
            context: ErrorContext::new(world.now())
                .with_actor(target)
                .with_spell(aura.spell),
        }
        .log();
        return;
    };
    let spell = aura.spell;

    match effect.aura_type {
        AuraType::ModStat | AuraType::ModStatPct | AuraType::ModResistance => {
            apply_stat(world, id, target, &effect, apply);
        }
        AuraType::ModStun => {
            control(world, env, target, ControlKind::Stunned, apply, true, true);
        }
        AuraType::ModRoot => {
            control(world, env, target, ControlKind::Rooted, apply, true, false);
        }
        AuraType::ModFear => {
            control(world, env, target, ControlKind::Feared, apply, true, true);
        }
        AuraType::ModSilence => {
            control(world, env, target, ControlKind::Silenced, apply, false, true);
        }
        AuraType::SchoolImmunity
        | AuraType::DamageImmunity
        | AuraType::DispelImmunity
        | AuraType::MechanicImmunity
        | AuraType::EffectImmunity
        | AuraType::StateImmunity
        | AuraType::SpellImmunity => {
            immunity(world, env, spell, id, target, &effect, apply);
        }
        _ => {}
    }
}

/// Re-runs stat handlers after an effect amount changed on refresh.
pub(crate) fn refresh_amount(
    world: &mut World,
    env: CombatEnv<'_>,
    id: AuraId,
    target: EntityId,
    slot: u8,
) {
    let applied = world
        .actor(target)
        .and_then(|actor| actor.application(id))
        .is_some_and(|app| app.state == ApplicationState::Applied && app.applied_mask & (1 << slot) != 0);
    let stat = world
        .aura(id)
        .and_then(|aura| aura.effect(slot))
        .is_some_and(|effect| {
            matches!(
                effect.aura_type,
                AuraType::ModStat | AuraType::ModStatPct | AuraType::ModResistance
            )
        });
    if applied && stat {
        handle_effect(world, env, id, target, slot, false);
        handle_effect(world, env, id, target, slot, true);
    }
}

fn apply_stat(world: &mut World, id: AuraId, target: EntityId, effect: &AuraEffect, apply: bool) {
    let Some(actor) = world.actor_mut(target) else {
        return;
    };
    let source = ModifierSource::new(id, effect.slot);
    if !apply {
        actor.modifiers.remove_source(source);
        actor.refresh_derived();
        return;
    }
    match effect.aura_type {
        AuraType::ModStat | AuraType::ModStatPct => {
            let Some(stat) = StatKind::from_misc(effect.misc_value) else {
                return;
            };
            let bonus = if effect.aura_type == AuraType::ModStat {
                Bonus::Flat(effect.amount)
            } else {
                Bonus::Increased(effect.amount)
            };
            actor.modifiers.insert(stat, source, bonus);
        }
        _ => {
            for school in SpellSchoolMask::from_misc(effect.misc_value).schools() {
                actor
                    .modifiers
                    .insert(StatKind::Resistance(school), source, Bonus::Flat(effect.amount));
            }
        }
    }
    actor.refresh_derived();
}

fn control(
    world: &mut World,
    env: CombatEnv<'_>,
    target: EntityId,
    kind: ControlKind,
    apply: bool,
    stops_movement: bool,
    stops_casting: bool,
) {
    let Some(actor) = world.actor_mut(target) else {
        return;
    };
    actor.adjust_control(kind, apply);
    if !apply {
        return;
    }
    if stops_movement && let Some(motion) = env.motion() {
        motion.stop_moving(target);
    }
    if stops_casting {
        if let Some(casts) = env.casts()
            && casts.current_cast(target).is_some()
        {
            casts.interrupt(target);
        }
        stop_channel(world, env, target);
    }
}

fn immunity_key(effect: &AuraEffect) -> (ImmunityCategory, u32) {
    let misc = effect.misc_value.max(0) as u32;
    match effect.aura_type {
        AuraType::SchoolImmunity => (
            ImmunityCategory::School,
            u32::from(SpellSchoolMask::from_misc(effect.misc_value).bits()),
        ),
        AuraType::DamageImmunity => (
            ImmunityCategory::Damage,
            u32::from(SpellSchoolMask::from_misc(effect.misc_value).bits()),
        ),
        AuraType::DispelImmunity => (ImmunityCategory::Dispel, misc),
        AuraType::MechanicImmunity => (ImmunityCategory::Mechanic, misc),
        AuraType::EffectImmunity => (ImmunityCategory::Effect, misc),
        AuraType::StateImmunity => (ImmunityCategory::State, misc),
        _ => (ImmunityCategory::Id, misc),
    }
}

fn immunity(
    world: &mut World,
    env: CombatEnv<'_>,
    spell: SpellId,
    id: AuraId,
    target: EntityId,
    effect: &AuraEffect,
    apply: bool,
) {
    let (category, key) = immunity_key(effect);
    let source = ImmunitySource {
        spell,
        aura: id,
        slot: effect.slot,
    };
    let Some(actor) = world.actor_mut(target) else {
        return;
    };
    if !apply {
        actor.immunities.revoke(category, key, source);
        return;
    }
    actor.immunities.grant(category, key, source);

    let purges = env
        .spells()
        .spell(spell)
        .is_some_and(|info| info.has_attribute(SpellAttributes::IMMUNITY_PURGES_EFFECT));
    if purges {
        purge_immune_applications(world, env, target, Some(id));
    }
}

/// Grantor predicate for immunities that purge existing effects.
pub(crate) fn purging_grantor(env: CombatEnv<'_>) -> impl Fn(SpellId) -> bool + Copy + '_ {
    move |spell| {
        env.spells()
            .spell(spell)
            .is_some_and(|info| info.has_attribute(SpellAttributes::IMMUNITY_PURGES_EFFECT))
    }
}

/// Removes applications on `target` that a purging immunity now blocks.
pub(crate) fn purge_immune_applications(
    world: &mut World,
    env: CombatEnv<'_>,
    target: EntityId,
    except: Option<AuraId>,
) -> usize {
    let Some(actor) = world.actor(target) else {
        return 0;
    };
    let purging = purging_grantor(env);
    let blocked: Vec<AuraId> = actor
        .applications()
        .filter(|app| app.state == ApplicationState::Applied && Some(app.aura) != except)
        .filter(|app| {
            world
                .aura(app.aura)
                .and_then(|aura| env.spells().spell(aura.spell))
                .is_some_and(|spell| {
                    actor
                        .immunities
                        .effect_mask_for(spell, app.effect_mask, Some(purging))
                        != app.effect_mask
                })
        })
        .map(|app| app.aura)
        .collect();
    for aura in &blocked {
        tracing::debug!(aura = %aura, target = %target, "aura purged by immunity");
        remove_application(world, env, *aura, target, RemoveMode::Default);
    }
    blocked.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::SpellEffectInfo;

    #[test]
    fn immunity_keys_use_masks_for_schools() {
        let fire = SpellEffectInfo::aura(AuraType::DamageImmunity, 0)
            .with_misc(i32::from(SpellSchoolMask::FIRE.bits()));
        let effect = AuraEffect::from_info(1, &fire, 0);
        assert_eq!(
            immunity_key(&effect),
            (ImmunityCategory::Damage, u32::from(SpellSchoolMask::FIRE.bits()))
        );

        let stun = SpellEffectInfo::aura(AuraType::MechanicImmunity, 0).with_misc(9);
        let effect = AuraEffect::from_info(0, &stun, 0);
        assert_eq!(immunity_key(&effect), (ImmunityCategory::Mechanic, 9));
    }
}
