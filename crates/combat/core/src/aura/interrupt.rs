//! Interrupt flags: the cached union over an actor's applied auras and its
//! channelled cast, and the removals an interrupting event causes.

use super::remove::remove_application;
use super::{ApplicationState, RemoveMode};
use crate::env::CombatEnv;
use crate::spell::AuraInterruptFlags;
use crate::state::{AuraId, ChannelState, EntityId, SpellId, World};

/// Rebuilds `target`'s cached interrupt mask.
pub(crate) fn recompute_interrupt_mask(world: &mut World, target: EntityId) {
    let Some(actor) = world.actor(target) else {
        return;
    };
    let mut mask = actor
        .channel
        .map_or(AuraInterruptFlags::empty(), |channel| channel.interrupt);
    for app in actor.applications() {
        if !matches!(app.state, ApplicationState::Pending | ApplicationState::Applied) {
            continue;
        }
        if let Some(aura) = world.aura(app.aura) {
            mask |= aura.interrupt_flags;
        }
    }
    if let Some(actor) = world.actor_mut(target) {
        actor.interrupt_mask = mask;
    }
}

/// Removes every application on `target` (and its channel) interrupted by
/// any of `flags`, except those of `except`.
///
/// Returns how many applications were removed.
pub fn interrupt_auras(
    world: &mut World,
    env: CombatEnv<'_>,
    target: EntityId,
    flags: AuraInterruptFlags,
    except: Option<SpellId>,
) -> usize {
    let Some(actor) = world.actor(target) else {
        return 0;
    };
    if !actor.interrupt_mask.intersects(flags) {
        return 0;
    }

    let interrupted: Vec<AuraId> = actor
        .applications()
        .filter(|app| app.state == ApplicationState::Applied)
        .filter_map(|app| world.aura(app.aura))
        .filter(|aura| aura.interrupt_flags.intersects(flags) && Some(aura.spell) != except)
        .map(|aura| aura.id)
        .collect();
    let channel_hit = actor
        .channel
        .is_some_and(|channel| channel.interrupt.intersects(flags) && Some(channel.spell) != except);

    for id in &interrupted {
        remove_application(world, env, *id, target, RemoveMode::Interrupt);
    }
    if channel_hit {
        stop_channel(world, env, target);
    }
    if !interrupted.is_empty() {
        tracing::debug!(actor = %target, ?flags, count = interrupted.len(), "auras interrupted");
    }
    interrupted.len()
}

/// Records a channelled cast whose interrupt flags join the actor's mask.
pub fn start_channel(world: &mut World, target: EntityId, spell: SpellId, interrupt: AuraInterruptFlags) {
    if let Some(actor) = world.actor_mut(target) {
        actor.channel = Some(ChannelState { spell, interrupt });
    }
    recompute_interrupt_mask(world, target);
}

/// Ends the actor's channel, telling the cast collaborator when one is present.
pub fn stop_channel(world: &mut World, env: CombatEnv<'_>, target: EntityId) -> Option<ChannelState> {
    let channel = world.actor_mut(target)?.channel.take()?;
    if let Some(casts) = env.casts() {
        casts.interrupt(target);
    }
    recompute_interrupt_mask(world, target);
    Some(channel)
}

/// Interrupts MOVE-flagged auras of every actor the motion collaborator
/// reports as moving.
pub(crate) fn interrupt_moving(world: &mut World, env: CombatEnv<'_>) {
    let Some(motion) = env.motion() else {
        return;
    };
    let moving: Vec<EntityId> = world
        .actors()
        .filter(|actor| actor.interrupt_mask.contains(AuraInterruptFlags::MOVE))
        .map(|actor| actor.id)
        .filter(|id| motion.is_moving(*id))
        .collect();
    for id in moving {
        interrupt_auras(world, env, id, AuraInterruptFlags::MOVE, None);
    }
}
