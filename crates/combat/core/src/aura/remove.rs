//! Aura and application removal.
//!
//! Removal is re-entrant: an unapply handler or hook may ask to remove the
//! same application again, or the whole aura, while a removal is already
//! unwinding. A repeated request only helps unwind the remaining slots; the
//! application is finalized (detached, logged, hooked) exactly once by
//! whichever call finds it fully unwound.

use super::apply::record_application;
use super::effects::handle_effect;
use super::interrupt::recompute_interrupt_mask;
use super::{ApplicationState, RemoveMode};
use crate::engine::run_script;
use crate::env::CombatEnv;
use crate::events::CombatEvent;
use crate::state::{AuraId, EntityId, SpellId, World};

/// Removes `aura`'s application from `target`.
///
/// Removing the owner's application removes the whole aura.
pub fn remove_application(
    world: &mut World,
    env: CombatEnv<'_>,
    aura: AuraId,
    target: EntityId,
    mode: RemoveMode,
) {
    {
        let Some(app) = world
            .actor_mut(target)
            .and_then(|actor| actor.applied.get_mut(&aura))
        else {
            return;
        };
        if app.state.is_active() {
            app.state = ApplicationState::Removing(mode);
        }
    }

    loop {
        let Some(app) = world
            .actor_mut(target)
            .and_then(|actor| actor.applied.get_mut(&aura))
        else {
            return;
        };
        if app.applied_mask == 0 {
            break;
        }
        let slot = app.applied_mask.trailing_zeros() as u8;
        app.applied_mask &= !(1 << slot);
        handle_effect(world, env, aura, target, slot, false);
    }

    finalize(world, env, aura, target, mode);
}

fn finalize(world: &mut World, env: CombatEnv<'_>, id: AuraId, target: EntityId, mode: RemoveMode) {
    let Some(actor) = world.actor_mut(target) else {
        return;
    };
    let Some(mut app) = actor.applied.remove(&id) else {
        return;
    };
    let mode = app.state.remove_mode().unwrap_or(mode);
    app.state = ApplicationState::Removed(mode);

    let Some(aura) = world.aura_mut(id) else {
        return;
    };
    aura.targets.remove(&target);
    let spell = aura.spell;
    let owner = aura.owner;
    let group = aura.diminishing;
    let orphaned = aura.targets.is_empty() && !aura.passive;

    if let Some(group) = group {
        record_application(world, target, group, false);
    }
    recompute_interrupt_mask(world, target);

    env.publish(CombatEvent::AuraRemoved {
        aura: id,
        spell,
        target,
        mode,
    });
    tracing::debug!(aura = %id, spell = %spell, target = %target, %mode, "aura application removed");
    run_script(world, env, |scripts, engine| {
        scripts.on_aura_removed(engine, id, target, mode);
    });

    if target == owner || orphaned {
        remove_aura(world, env, id, mode);
    }
}

/// Removes an aura from every target and schedules it for disposal.
///
/// Returns false if the aura was already removed (or never existed).
pub fn remove_aura(world: &mut World, env: CombatEnv<'_>, id: AuraId, mode: RemoveMode) -> bool {
    let Some(aura) = world.aura_mut(id) else {
        return false;
    };
    if aura.is_removed() {
        return false;
    }
    aura.removed = Some(mode);
    let owner = aura.owner;
    let caster = aura.caster;
    let others: Vec<EntityId> = aura.targets.iter().copied().filter(|t| *t != owner).collect();

    for target in others {
        remove_application(world, env, id, target, mode);
    }
    remove_application(world, env, id, owner, mode);

    // Hooks may have attached new applications while we were unwinding.
    let leftovers: Vec<EntityId> = world
        .aura_any(id)
        .map(|aura| aura.targets.iter().copied().collect())
        .unwrap_or_default();
    for target in leftovers {
        remove_application(world, env, id, target, mode);
    }

    if let Some(actor) = world.actor_mut(owner) {
        actor.owned_auras.remove(&id);
    }
    if let Some(actor) = world.actor_mut(caster) {
        actor.single_target_auras.retain(|other| *other != id);
    }
    world.pending_disposal.push(id);
    true
}

/// Removes applications of `spell` on `target`, optionally only those from `caster`.
pub fn remove_auras_by_spell(
    world: &mut World,
    env: CombatEnv<'_>,
    target: EntityId,
    spell: SpellId,
    caster: Option<EntityId>,
    mode: RemoveMode,
) -> usize {
    let matching = snapshot(world, target, |world, id| {
        world
            .aura(id)
            .is_some_and(|aura| aura.spell == spell && caster.is_none_or(|c| aura.caster == c))
    });
    for id in &matching {
        remove_application(world, env, *id, target, mode);
    }
    matching.len()
}

/// Removes everything a death takes away: applied and owned auras that are
/// neither passive nor death-persistent.
pub fn remove_auras_on_death(world: &mut World, env: CombatEnv<'_>, target: EntityId) -> usize {
    let survives = |world: &World, id: AuraId| {
        world.aura(id).is_none_or(|aura| {
            aura.passive
                || env
                    .spells()
                    .spell(aura.spell)
                    .is_some_and(|spell| spell.is_death_persistent())
        })
    };
    let applied = snapshot(world, target, |world, id| !survives(world, id));
    for id in &applied {
        remove_application(world, env, *id, target, RemoveMode::Death);
    }

    let owned: Vec<AuraId> = world
        .actor(target)
        .map(|actor| actor.owned_auras().filter(|id| !survives(world, *id)).collect())
        .unwrap_or_default();
    for id in &owned {
        remove_aura(world, env, *id, RemoveMode::Death);
    }
    applied.len() + owned.len()
}

/// Strips every aura touching `target`: applied, owned and single-target
/// auras it cast elsewhere.
pub fn remove_all_auras(world: &mut World, env: CombatEnv<'_>, target: EntityId) {
    // Hooks may re-apply auras during removal; bound the passes.
    for _ in 0..8 {
        let applied = snapshot(world, target, |_, _| true);
        let (owned, cast): (Vec<AuraId>, Vec<AuraId>) = match world.actor(target) {
            Some(actor) => (actor.owned_auras().collect(), actor.single_target_auras.clone()),
            None => return,
        };
        if applied.is_empty() && owned.is_empty() && cast.is_empty() {
            return;
        }
        for id in applied {
            remove_application(world, env, id, target, RemoveMode::Default);
        }
        for id in owned.into_iter().chain(cast) {
            remove_aura(world, env, id, RemoveMode::Default);
        }
    }
    tracing::warn!(actor = %target, "auras still attached after cleanup passes");
}

/// Ids of auras applied to `target` passing `keep`.
fn snapshot<F>(world: &World, target: EntityId, keep: F) -> Vec<AuraId>
where
    F: Fn(&World, AuraId) -> bool,
{
    world
        .actor(target)
        .map(|actor| {
            actor
                .applications()
                .map(|app| app.aura)
                .filter(|id| keep(world, *id))
                .collect()
        })
        .unwrap_or_default()
}
