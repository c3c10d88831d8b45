use crate::aura::interrupt::stop_channel;
use crate::aura::remove::remove_auras_on_death;
use crate::env::CombatEnv;
use crate::events::CombatEvent;
use crate::proc::{ProcEvent, ProcFlags, dispatch_proc};
use crate::state::{ActorFlags, DeathState, EntityId, World};

/// Kills `victim`.
///
/// The victim is marked dead before anything else runs, so damage dealt by
/// death procs cannot kill it twice. KILL and KILLED procs are offered to
/// the killer and victim, then DEATH procs to the victim, all while the
/// victim's auras are still attached. The `JustDied` transition then strips
/// its non-persistent auras.
pub fn kill(world: &mut World, env: CombatEnv<'_>, killer: Option<EntityId>, victim: EntityId) {
    let Some(actor) = world.actor_mut(victim) else {
        return;
    };
    if !actor.is_alive() {
        return;
    }
    actor.health.current = 0;
    actor.death_state = DeathState::JustDied;

    if let Some(killer) = killer.filter(|killer| *killer != victim) {
        let event = ProcEvent::new(killer, Some(victim)).with_flags(ProcFlags::KILL, ProcFlags::KILLED);
        dispatch_proc(world, env, &event);
    }
    let event = ProcEvent::new(victim, Some(victim)).with_flags(ProcFlags::DEATH, ProcFlags::empty());
    dispatch_proc(world, env, &event);

    enter_just_died(world, env, victim);

    env.publish(CombatEvent::Died { victim, killer });
    tracing::info!(victim = %victim, killer = ?killer, "actor died");
}

/// Moves `actor` to `state`, running the side effects of the transition.
///
/// `JustDied` behaves like [`kill`] without procs. `Alive` resurrects with
/// at least one health point.
pub fn set_death_state(world: &mut World, env: CombatEnv<'_>, actor: EntityId, state: DeathState) {
    let Some(record) = world.actor_mut(actor) else {
        return;
    };
    let previous = record.death_state;
    if previous == state {
        return;
    }
    record.death_state = state;
    match state {
        DeathState::JustDied => {
            record.health.current = 0;
            enter_just_died(world, env, actor);
        }
        DeathState::Alive => {
            record.health.current = record.health.current.max(1);
            tracing::info!(actor = %actor, "actor resurrected");
        }
        DeathState::Corpse | DeathState::Dead => {}
    }
    tracing::debug!(actor = %actor, from = %previous, to = %state, "death state changed");
}

fn enter_just_died(world: &mut World, env: CombatEnv<'_>, victim: EntityId) {
    if let Some(actor) = world.actor_mut(victim) {
        actor.flags.remove(ActorFlags::IN_COMBAT);
    }
    if let Some(casts) = env.casts()
        && casts.current_cast(victim).is_some()
    {
        casts.interrupt(victim);
    }
    stop_channel(world, env, victim);
    remove_auras_on_death(world, env, victim);
}
