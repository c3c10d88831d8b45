use super::eligibility::proc_effect_mask;
use super::event::{ProcEvent, ProcEventInfo, ProcReport};
use super::flags::ProcAttributes;
use crate::aura::effects::refresh_amount;
use crate::aura::query::apply_spell_mod;
use crate::aura::remove::remove_aura;
use crate::aura::{ApplicationState, Aura, AuraEffect, RemoveMode};
use crate::combat::{DamageRequest, SpellContext, resolve_damage};
use crate::config::CombatConfig;
use crate::engine::executor::execute_spell;
use crate::engine::run_script;
use crate::env::{CombatEnv, roll};
use crate::events::CombatEvent;
use crate::spell::{AuraType, SpellAttributes, SpellModOp};
use crate::state::{AuraId, CombatRatingSource, EntityId, SpellId, World};

/// One aura that passed the snapshot.
#[derive(Clone, Debug)]
struct Pending {
    aura: AuraId,
    info: ProcEventInfo,
    mask: u8,
}

/// Offers `event` to the auras of both participants.
///
/// The chain depth of this dispatch is one more than the deepest of the
/// triggering spell's recorded depth and the participants' current proc
/// chains. Dispatches deeper than `max_proc_chain` are refused.
pub fn dispatch_proc(world: &mut World, env: CombatEnv<'_>, event: &ProcEvent) -> ProcReport {
    let chain = |id: Option<EntityId>| {
        id.and_then(|id| world.actor(id))
            .map_or(0, |actor| actor.proc_chain_length)
    };
    let depth = event
        .spell
        .map_or(0, |context| context.chain_depth)
        .max(chain(Some(event.actor)))
        .max(chain(event.action_target))
        + 1;
    let mut report = ProcReport {
        depth,
        ..ProcReport::default()
    };

    if depth > env.config().max_proc_chain {
        tracing::warn!(
            actor = %event.actor,
            depth,
            limit = env.config().max_proc_chain,
            "proc chain limit reached"
        );
        env.publish(CombatEvent::ProcChainLimit {
            actor: event.actor,
            depth,
        });
        report.refused = true;
        return report;
    }

    let pending = snapshot(world, env, event);
    report.eligible = pending.iter().map(|p| p.aura).collect();

    let mut fired = Vec::with_capacity(pending.len());
    for entry in &pending {
        if fire(world, env, entry, depth) {
            report.fired.push(entry.aura);
            fired.push(entry.aura);
        }
    }
    for aura in fired {
        consume(world, env, aura);
    }
    report
}

/// Collects every eligible aura before anything fires.
///
/// Actor side first, then the auras of the actor's spell-modifier owner that
/// carry spell modifiers, then the action target's side.
fn snapshot(world: &mut World, env: CombatEnv<'_>, event: &ProcEvent) -> Vec<Pending> {
    let mut pending = Vec::new();

    if let Some(info) = event.side(true) {
        scan(world, env, info, |_| true, &mut pending);
        if let Some(owner) = world.spell_mod_owner(event.actor)
            && owner != event.actor
            && let Some(mut info) = event.side(true)
        {
            info.holder = owner;
            let spell_mods = |aura: &Aura| {
                aura.effects().any(|effect: &AuraEffect| effect.aura_type.is_spell_mod())
            };
            scan(world, env, info, spell_mods, &mut pending);
        }
    }
    if event.action_target != Some(event.actor)
        && let Some(info) = event.side(false)
    {
        scan(world, env, info, |_| true, &mut pending);
    }
    pending
}

fn scan<F>(world: &mut World, env: CombatEnv<'_>, info: ProcEventInfo, keep: F, pending: &mut Vec<Pending>)
where
    F: Fn(&Aura) -> bool,
{
    let holder = info.holder;
    let Some(actor) = world.actor(holder) else {
        return;
    };
    if actor.cannot_proc > 0 {
        tracing::debug!(actor = %holder, "proc scan suppressed");
        return;
    }
    let ids: Vec<AuraId> = actor.applications().map(|app| app.aura).collect();

    for id in ids {
        let Some(aura) = world.aura(id) else {
            continue;
        };
        if !keep(aura) {
            continue;
        }
        let mask = proc_effect_mask(world, env, aura, &info);
        if mask == 0 {
            continue;
        }
        let allowed = env
            .scripts()
            .is_none_or(|scripts| scripts.check_proc(world, id, &info));
        if !allowed || !roll_chance(world, env, id, &info) {
            continue;
        }
        prepare(world, env, id);
        pending.push(Pending {
            aura: id,
            info: info.clone(),
            mask,
        });
    }
}

/// Rolls the proc chance of `aura`.
fn roll_chance(world: &mut World, env: CombatEnv<'_>, aura: AuraId, info: &ProcEventInfo) -> bool {
    let Some(spell) = world.aura(aura).and_then(|aura| env.spells().spell(aura.spell)) else {
        return false;
    };
    let Some(entry) = spell.proc.as_ref() else {
        return false;
    };
    let attack_time = world
        .actor(info.actor)
        .map_or(0, |actor| actor.attack_time_ms());
    let mut chance = entry.base_chance(attack_time);
    if let Some(caster) = world.aura(aura).map(|aura| aura.caster) {
        chance = apply_spell_mod(world, env, caster, spell, SpellModOp::ProcChance, chance);
    }
    if chance >= 100.0 {
        return true;
    }
    let seed = world.next_seed(info.holder, roll::PROC_CHANCE);
    env.rng().roll_chance(seed, chance)
}

/// Takes the charge and starts the cooldown of an aura about to fire.
fn prepare(world: &mut World, env: CombatEnv<'_>, id: AuraId) {
    let now = world.now();
    let Some(aura) = world.aura_mut(id) else {
        return;
    };
    let cooldown = env
        .spells()
        .spell(aura.spell)
        .and_then(|spell| spell.proc.as_ref())
        .map_or(0, |entry| entry.cooldown_ms);
    if cooldown > 0 {
        aura.proc_cooldown_until = now + u64::from(cooldown);
    }
    let stacks_as_charges = uses_stacks_for_charges(env, aura.spell);
    if aura.using_charges && !stacks_as_charges {
        aura.charges = aura.charges.saturating_sub(1);
    }
}

fn uses_stacks_for_charges(env: CombatEnv<'_>, spell: SpellId) -> bool {
    env.spells()
        .spell(spell)
        .and_then(|spell| spell.proc.as_ref())
        .is_some_and(|entry| entry.has_attribute(ProcAttributes::USE_STACKS_FOR_CHARGES))
}

/// Runs the procced effects of one snapshot entry.
///
/// Returns false when the aura was removed before its turn came.
fn fire(world: &mut World, env: CombatEnv<'_>, pending: &Pending, depth: u32) -> bool {
    let holder = pending.info.holder;
    let applied = world
        .actor(holder)
        .and_then(|actor| actor.application(pending.aura))
        .is_some_and(|app| app.state == ApplicationState::Applied);
    let Some(aura) = world.aura(pending.aura).filter(|_| applied) else {
        tracing::debug!(aura = %pending.aura, "procced aura gone before firing");
        return false;
    };
    let spell = aura.spell;
    let effects: Vec<AuraEffect> = aura
        .effects()
        .filter(|effect| pending.mask & (1 << effect.slot) != 0)
        .cloned()
        .collect();
    let suppress = env
        .spells()
        .spell(spell)
        .is_some_and(|info| info.has_attribute(SpellAttributes::SUPPRESS_NESTED_PROCS));

    let Some(actor) = world.actor_mut(holder) else {
        return false;
    };
    let previous = actor.proc_chain_length;
    actor.proc_chain_length = depth;
    if suppress {
        actor.cannot_proc += 1;
    }

    env.publish(CombatEvent::ProcTriggered {
        aura: pending.aura,
        spell,
        holder,
        target: pending.info.proc_target,
        hit: pending.info.hit,
    });
    tracing::trace!(aura = %pending.aura, spell = %spell, holder = %holder, depth, "proc fired");

    for effect in effects.iter().take(CombatConfig::MAX_EFFECTS) {
        if world.aura(pending.aura).is_none() {
            break;
        }
        fire_effect(world, env, pending, spell, effect, depth);
    }

    if let Some(actor) = world.actor_mut(holder) {
        actor.proc_chain_length = previous;
        if suppress {
            actor.cannot_proc = actor.cannot_proc.saturating_sub(1);
        }
    }
    true
}

fn fire_effect(
    world: &mut World,
    env: CombatEnv<'_>,
    pending: &Pending,
    spell: SpellId,
    effect: &AuraEffect,
    depth: u32,
) {
    let holder = pending.info.holder;
    let target = pending.info.proc_target;
    match effect.aura_type {
        AuraType::ProcTriggerSpell => {
            let Some(trigger) = effect.trigger_spell else {
                world.report_content_error(spell, "missing_trigger", "proc effect has no trigger spell");
                return;
            };
            let context = SpellContext::triggered(trigger, spell, depth);
            if let Err(err) = execute_spell(world, env, holder, target, context) {
                world.report_content_error(spell, "dangling_trigger", &err.to_string());
            }
        }
        AuraType::ProcTriggerDamage => {
            let Some(info) = env.spells().spell(spell) else {
                return;
            };
            let amount = effect.amount.max(0) as u32;
            let context = SpellContext::triggered(spell, spell, depth);
            let request = DamageRequest::spell(Some(holder), target, amount, info.school, context)
                .with_damage_class(info.damage_class);
            resolve_damage(world, env, request);
        }
        AuraType::Dummy => {
            let aura = pending.aura;
            let slot = effect.slot;
            let info = pending.info.clone();
            run_script(world, env, |scripts, engine| {
                scripts.on_proc(engine, aura, slot, &info);
            });
        }
        _ => {}
    }
}

/// Spends what firing cost: one stack or the last charge.
fn consume(world: &mut World, env: CombatEnv<'_>, id: AuraId) {
    let stacks_as_charges = world
        .aura(id)
        .is_some_and(|aura| uses_stacks_for_charges(env, aura.spell));
    let Some(aura) = world.aura_mut(id).filter(|aura| !aura.is_removed()) else {
        return;
    };

    if stacks_as_charges {
        if aura.stacks <= 1 {
            remove_aura(world, env, id, RemoveMode::Expire);
            return;
        }
        aura.stacks -= 1;
        aura.recalculate_amounts();
        let targets: Vec<EntityId> = aura.targets.iter().copied().collect();
        let slots: Vec<u8> = aura.effects().map(|effect| effect.slot).collect();
        for target in targets {
            for slot in &slots {
                refresh_amount(world, env, id, target, *slot);
            }
        }
        return;
    }

    if aura.using_charges && aura.charges == 0 {
        tracing::debug!(aura = %id, "proc charges used up");
        remove_aura(world, env, id, RemoveMode::Expire);
    }
}
