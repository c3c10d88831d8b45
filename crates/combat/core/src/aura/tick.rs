//! Time advancement: periodic effects, expiry, area target maintenance and
//! movement interrupts.

use std::collections::BTreeSet;

use super::apply::{apply_to_target, select_area_targets};
use super::effects::purging_grantor;
use super::interrupt::interrupt_moving;
use super::remove::{remove_application, remove_aura};
use super::{ApplicationState, AuraEffect, RemoveMode};
use crate::combat::{DamageRequest, HealRequest, SpellContext, energize, resolve_damage, resolve_heal};
use crate::config::CombatConfig;
use crate::engine::executor::execute_spell;
use crate::env::CombatEnv;
use crate::events::CombatEvent;
use crate::spell::AuraType;
use crate::state::{AuraId, EntityId, PowerKind, World};

/// Advances the world clock by `delta_ms` and updates every aura.
pub fn tick(world: &mut World, env: CombatEnv<'_>, delta_ms: u32) {
    world.advance(u64::from(delta_ms));

    let ids: Vec<AuraId> = world.auras().map(|aura| aura.id).collect();
    for id in ids {
        update_aura(world, env, id, delta_ms);
    }

    refresh_area_auras(world, env);
    interrupt_moving(world, env);
    world.flush_disposal();
}

fn update_aura(world: &mut World, env: CombatEnv<'_>, id: AuraId, delta_ms: u32) {
    let Some(aura) = world.aura(id) else {
        return;
    };
    // Nothing happens past expiry.
    let budget = aura.duration_ms.map_or(delta_ms, |left| delta_ms.min(left));

    for slot in 0..CombatConfig::MAX_EFFECTS as u8 {
        let Some(effect) = world.aura_mut(id).and_then(|aura| aura.effect_mut(slot)) else {
            continue;
        };
        if !effect.is_periodic() {
            continue;
        }
        effect.period_timer_ms = effect.period_timer_ms.saturating_add(budget);
        let ticks = effect.period_timer_ms / effect.amplitude_ms;
        effect.period_timer_ms %= effect.amplitude_ms;

        for _ in 0..ticks {
            if world.aura(id).is_none() {
                return;
            }
            periodic_tick(world, env, id, slot);
        }
    }

    let Some(aura) = world.aura_mut(id).filter(|aura| !aura.is_removed()) else {
        return;
    };
    if let Some(left) = aura.duration_ms {
        let left = left.saturating_sub(budget);
        aura.duration_ms = Some(left);
        if left == 0 {
            tracing::debug!(aura = %id, spell = %aura.spell, "aura expired");
            remove_aura(world, env, id, RemoveMode::Expire);
        }
    }
}

fn periodic_tick(world: &mut World, env: CombatEnv<'_>, id: AuraId, slot: u8) {
    let Some(aura) = world.aura_mut(id) else {
        return;
    };
    let spell = aura.spell;
    let caster = aura.caster;
    let depth = aura.chain_depth.saturating_add(1);
    let Some(effect) = aura.effect_mut(slot) else {
        return;
    };
    effect.tick_number += 1;
    let effect: AuraEffect = effect.clone();

    let targets: Vec<EntityId> = aura
        .targets
        .iter()
        .copied()
        .collect();
    let attacker = world.actor(caster).map(|actor| actor.id);

    for target in targets {
        let ticking = world
            .actor(target)
            .and_then(|actor| actor.application(id))
            .is_some_and(|app| app.state == ApplicationState::Applied && app.applied_mask & (1 << slot) != 0);
        if !ticking || world.aura(id).is_none() {
            continue;
        }
        let amount = effect.amount.max(0) as u32;
        let context = SpellContext::new(spell);

        match effect.aura_type {
            AuraType::PeriodicDamage => {
                let Some(info) = env.spells().spell(spell) else {
                    continue;
                };
                let request = DamageRequest {
                    damage_class: info.damage_class,
                    ..DamageRequest::spell(attacker, target, amount, info.school, context).periodic()
                };
                resolve_damage(world, env, request);
            }
            AuraType::PeriodicHeal => {
                let request = HealRequest::new(attacker, target, amount)
                    .with_spell(context)
                    .periodic();
                resolve_heal(world, env, request);
            }
            AuraType::PeriodicEnergize => {
                if let Some(power) = PowerKind::from_misc(effect.misc_value) {
                    energize(world, env, caster, target, power, effect.amount);
                }
            }
            AuraType::PeriodicTriggerSpell => {
                let Some(trigger) = effect.trigger_spell else {
                    continue;
                };
                if depth > env.config().max_proc_chain {
                    tracing::warn!(aura = %id, trigger = %trigger, depth, "periodic trigger chain limit reached");
                    env.publish(CombatEvent::ProcChainLimit { actor: target, depth });
                    continue;
                }
                let source = attacker.unwrap_or(target);
                let context = SpellContext::triggered(trigger, spell, depth);
                if let Err(err) = execute_spell(world, env, source, target, context) {
                    world.report_content_error(spell, "dangling_trigger", &err.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Re-selects the targets of area auras whose refresh interval elapsed.
fn refresh_area_auras(world: &mut World, env: CombatEnv<'_>) {
    let now = world.now();
    let interval = env.config().area_refresh_ms;
    let due: Vec<AuraId> = world
        .auras()
        .filter(|aura| aura.area && now.since(aura.last_area_refresh) >= interval)
        .map(|aura| aura.id)
        .collect();

    for id in due {
        let Some(aura) = world.aura_mut(id) else {
            continue;
        };
        aura.last_area_refresh = now;
        let owner = aura.owner;
        let mask = aura.effect_mask();
        let current: Vec<EntityId> = aura.targets.iter().copied().filter(|t| *t != owner).collect();
        let Some(spell) = env.spells().spell(aura.spell) else {
            continue;
        };
        if !world.actor(owner).is_some_and(|actor| actor.is_alive()) {
            continue;
        }

        let selected: BTreeSet<EntityId> = select_area_targets(world, env, spell, owner)
            .into_iter()
            .collect();
        let purging = purging_grantor(env);

        for target in &current {
            let keep = selected.contains(target)
                && world.actor(*target).is_some_and(|actor| {
                    actor.immunities.effect_mask_for(spell, mask, Some(purging)) == mask
                });
            if !keep {
                remove_application(world, env, id, *target, RemoveMode::Default);
            }
        }

        for target in selected {
            if current.contains(&target) || world.aura(id).is_none() {
                continue;
            }
            let Some(actor) = world.actor(target) else {
                continue;
            };
            let target_mask = actor.immunities.landing_mask(spell, mask);
            if target_mask != 0
                && let Err(refusal) = apply_to_target(world, env, id, target, target_mask)
            {
                tracing::debug!(aura = %id, target = %target, error = %refusal, "area target refused");
            }
        }
    }
}
