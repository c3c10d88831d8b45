use super::absorb::absorb_heal;
use super::{HealInfo, HealRequest};
use crate::aura::query::total_multiplier;
use crate::env::CombatEnv;
use crate::events::CombatEvent;
use crate::proc::{ProcEvent, ProcFlags, ProcHit, ProcSpellType, dispatch_proc};
use crate::spell::AuraType;
use crate::state::{EntityId, PowerKind, ResourcePool, World};

/// Resolves one heal: healing-taken modifiers, critical bonus, heal absorbs,
/// then the actual health gain.
///
/// A missing, dead or evading target yields an empty result.
pub fn resolve_heal(world: &mut World, env: CombatEnv<'_>, request: HealRequest) -> HealInfo {
    let mut info = HealInfo {
        healer: request.healer,
        target: request.target,
        spell: request.spell,
        original: request.amount,
        amount: 0,
        absorbed: 0,
        effective: 0,
        critical: false,
        periodic: request.periodic,
    };
    let healable = world
        .actor(request.target)
        .is_some_and(|actor| actor.is_alive() && !actor.is_evading());
    if !healable {
        return info;
    }

    let taken = total_multiplier(world, request.target, AuraType::ModHealingPct, |_, _| true);
    info.amount = (request.amount as f32 * taken.max(0.0)) as u32;
    if request.crit && info.amount > 0 {
        let scaled = u64::from(info.amount) * u64::from(env.config().crit.spell_pct) / 100;
        info.amount = u32::try_from(scaled).unwrap_or(u32::MAX);
        info.critical = true;
    }

    if info.amount > 0 {
        absorb_heal(world, env, &mut info);
    }
    if let Some(target) = world.actor_mut(info.target) {
        info.effective = target.health.modify(i64::from(info.amount)) as u32;
    }

    if let (Some(healer), Some(threat)) = (info.healer, env.threat())
        && info.effective > 0
    {
        let amount = info.effective as f32 * env.config().heal_threat_factor;
        threat.forward_heal_threat(healer, info.target, amount, info.spell.map(|c| c.spell));
    }

    env.publish(CombatEvent::Heal(info.clone()));
    tracing::trace!(
        target = %info.target,
        amount = info.amount,
        effective = info.effective,
        "heal resolved"
    );

    if let Some(healer) = info.healer {
        let (actor_flags, target_flags) = if info.periodic {
            (ProcFlags::DONE_PERIODIC, ProcFlags::TAKEN_PERIODIC)
        } else {
            (
                ProcFlags::DONE_SPELL_MAGIC_DMG_CLASS_POS,
                ProcFlags::TAKEN_SPELL_MAGIC_DMG_CLASS_POS,
            )
        };
        let hit = if info.critical {
            ProcHit::CRITICAL
        } else {
            ProcHit::NORMAL
        };
        let mut event = ProcEvent::new(healer, Some(info.target))
            .with_flags(actor_flags, target_flags)
            .with_hit(hit)
            .with_heal(info.clone());
        if let Some(context) = info.spell {
            event = event.with_spell(context, ProcSpellType::HEAL);
            if let Some(spell) = env.spells().spell(context.spell) {
                event = event.with_school(spell.school);
            }
        } else {
            event.spell_type = ProcSpellType::HEAL;
        }
        dispatch_proc(world, env, &event);
    }
    info
}

/// Restores `amount` of `power` to `target` (negative drains).
///
/// Gains forward threat like healing. Returns the change actually made.
pub fn energize(
    world: &mut World,
    env: CombatEnv<'_>,
    caster: EntityId,
    target: EntityId,
    power: PowerKind,
    amount: i32,
) -> i64 {
    let Some(actor) = world.actor_mut(target) else {
        return 0;
    };
    if !actor.is_alive() {
        return 0;
    }
    let gained = actor.modify_power(power, i64::from(amount));
    env.publish(CombatEvent::Energize {
        caster,
        target,
        power,
        amount: gained,
    });
    if gained > 0
        && let Some(threat) = env.threat()
    {
        let amount = gained as f32 * env.config().heal_threat_factor;
        threat.forward_heal_threat(caster, target, amount, None);
    }
    gained
}
