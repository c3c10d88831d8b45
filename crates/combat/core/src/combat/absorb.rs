//! Absorption stages of the damage and heal pipelines.
//!
//! Shields are read from a snapshot of (aura, slot) pairs and re-validated
//! one by one: a shield removed by an earlier stage (or by a hook) is
//! skipped, never touched.

use super::damage::deal_damage;
use super::{DamageInfo, HealInfo};
use crate::aura::RemoveMode;
use crate::aura::query::{effects_of_type, total_modifier};
use crate::aura::remove::remove_aura;
use crate::env::CombatEnv;
use crate::events::CombatEvent;
use crate::spell::{AuraType, SpellSchoolMask};
use crate::state::{AuraId, EntityId, PowerKind, ResourcePool, SpellId, World};

/// One shield slot taken from the victim's auras.
#[derive(Clone, Copy, Debug)]
struct Shield {
    aura: AuraId,
    slot: u8,
    priority: i32,
}

fn shields(world: &World, victim: EntityId, aura_type: AuraType, school: Option<SpellSchoolMask>) -> Vec<Shield> {
    effects_of_type(world, victim, aura_type)
        .filter(|(_, effect)| {
            school.is_none_or(|school| SpellSchoolMask::from_misc(effect.misc_value).intersects(school))
        })
        .map(|(aura, effect)| Shield {
            aura: aura.id,
            slot: effect.slot,
            priority: aura.absorb_priority,
        })
        .collect()
}

/// Remaining capacity of a shield, `None` when it is gone.
fn capacity(world: &World, victim: EntityId, shield: Shield) -> Option<u32> {
    let applied = world
        .actor(victim)
        .and_then(|actor| actor.application(shield.aura))
        .is_some_and(|app| app.applied_mask() & (1 << shield.slot) != 0);
    if !applied {
        return None;
    }
    world
        .aura(shield.aura)
        .and_then(|aura| aura.effect(shield.slot))
        .map(|effect| effect.amount.max(0) as u32)
}

/// Takes `amount` from a shield, removing its aura once empty.
fn drain(world: &mut World, env: CombatEnv<'_>, victim: EntityId, shield: Shield, amount: u32) {
    let Some(aura) = world.aura_mut(shield.aura) else {
        return;
    };
    let spell = aura.spell;
    let Some(effect) = aura.effect_mut(shield.slot) else {
        return;
    };
    effect.amount = effect.amount.saturating_sub(amount as i32).max(0);
    let depleted = effect.amount == 0;

    env.publish(CombatEvent::Absorb {
        victim,
        aura: shield.aura,
        spell,
        amount,
    });
    if depleted {
        tracing::debug!(aura = %shield.aura, victim = %victim, "shield depleted");
        remove_aura(world, env, shield.aura, RemoveMode::EnemySpell);
    }
}

/// Runs the absorb stage on `info.amount`.
///
/// Order: the attacker's ignore-absorb share is set aside, school shields
/// absorb by ascending priority (oldest first on ties), mana shields drain
/// mana, split auras redirect a share of what is left to their casters. The
/// set-aside share is added back at the end.
pub(crate) fn absorb_damage(world: &mut World, env: CombatEnv<'_>, info: &mut DamageInfo) {
    let victim = info.victim;
    let school = info.school;

    let carved = match info.attacker {
        Some(attacker) if info.amount > 0 => {
            let pct = total_modifier(world, attacker, AuraType::ModTargetAbsorbSchool, |_, effect| {
                SpellSchoolMask::from_misc(effect.misc_value).intersects(school)
            })
            .clamp(0, 100) as u32;
            let carved = (u64::from(info.amount) * u64::from(pct) / 100) as u32;
            info.amount -= carved;
            carved
        }
        _ => 0,
    };

    let mut school_shields = shields(world, victim, AuraType::SchoolAbsorb, Some(school));
    school_shields.sort_by_key(|shield| (shield.priority, shield.aura));
    for shield in school_shields {
        if info.amount == 0 {
            break;
        }
        let Some(available) = capacity(world, victim, shield) else {
            continue;
        };
        let absorbed = available.min(info.amount);
        if absorbed == 0 {
            continue;
        }
        info.amount -= absorbed;
        info.absorbed += absorbed;
        drain(world, env, victim, shield, absorbed);
    }

    for shield in shields(world, victim, AuraType::ManaShield, Some(school)) {
        if info.amount == 0 {
            break;
        }
        let Some(available) = capacity(world, victim, shield) else {
            continue;
        };
        let ratio = world
            .aura(shield.aura)
            .and_then(|aura| aura.effect(shield.slot))
            .map_or(0.0, |effect| effect.value_multiplier.max(0.0));
        let mana = world
            .actor(victim)
            .map_or(0, |actor| actor.power(PowerKind::Mana).current);
        let affordable = if ratio > 0.0 {
            (mana as f32 / ratio) as u32
        } else {
            u32::MAX
        };
        let absorbed = available.min(info.amount).min(affordable);
        if absorbed == 0 {
            continue;
        }
        if let Some(actor) = world.actor_mut(victim) {
            actor.modify_power(PowerKind::Mana, -((absorbed as f32 * ratio) as i64));
        }
        info.amount -= absorbed;
        info.absorbed += absorbed;
        drain(world, env, victim, shield, absorbed);
    }

    let splits: Vec<(AuraId, EntityId, i32, SpellId)> =
        effects_of_type(world, victim, AuraType::SplitDamagePct)
            .filter(|(aura, effect)| {
                aura.caster != victim
                    && SpellSchoolMask::from_misc(effect.misc_value).intersects(school)
            })
            .map(|(aura, effect)| (aura.id, aura.caster, effect.amount, aura.spell))
            .collect();
    let base = info.amount;
    for (aura, receiver, pct, spell) in splits {
        if info.amount == 0 || world.aura(aura).is_none() {
            continue;
        }
        let alive = world.actor(receiver).is_some_and(|actor| actor.is_alive());
        if !alive {
            continue;
        }
        let share = (u64::from(base) * pct.clamp(0, 100) as u64 / 100) as u32;
        let share = share.min(info.amount);
        if share == 0 {
            continue;
        }
        info.amount -= share;
        info.absorbed += share;
        env.publish(CombatEvent::Split {
            victim,
            receiver,
            spell,
            amount: share,
        });
        deal_damage(world, env, info.attacker, receiver, share, info.spell);
    }

    info.amount += carved;
}

/// Death prevention: cancels lethal excess once the remaining hit reaches
/// `health × (100 + threshold) / 100`.
///
/// What these shields cancel goes to `death_prevented`, not `absorbed`.
pub(crate) fn prevent_death(world: &mut World, env: CombatEnv<'_>, info: &mut DamageInfo) {
    let victim = info.victim;
    let mut guards = shields(world, victim, AuraType::SchoolAbsorbOverkill, Some(info.school));
    guards.sort_by_key(|shield| (shield.priority, shield.aura));

    for shield in guards {
        let health = world.actor(victim).map_or(0, |actor| actor.health.current);
        if info.amount < health {
            return;
        }
        let Some(available) = capacity(world, victim, shield) else {
            continue;
        };
        let threshold = world
            .aura(shield.aura)
            .and_then(|aura| aura.effect(shield.slot))
            .map_or(0, |effect| effect.misc_value_b.max(0));
        let trigger = u64::from(health) * (100 + threshold as u64) / 100;
        if u64::from(info.amount) < trigger {
            continue;
        }
        // Leave the victim at one health point.
        let excess = info.amount - health.saturating_sub(1);
        let prevented = excess.min(available);
        if prevented == 0 {
            continue;
        }
        info.amount -= prevented;
        info.death_prevented += prevented;
        drain(world, env, victim, shield, prevented);
    }
}

/// Heal-absorb shields consume healing, oldest first.
pub(crate) fn absorb_heal(world: &mut World, env: CombatEnv<'_>, info: &mut HealInfo) {
    let target = info.target;
    for shield in shields(world, target, AuraType::SchoolHealAbsorb, None) {
        if info.amount == 0 {
            break;
        }
        let Some(available) = capacity(world, target, shield) else {
            continue;
        };
        let absorbed = available.min(info.amount);
        if absorbed == 0 {
            continue;
        }
        info.amount -= absorbed;
        info.absorbed += absorbed;
        drain(world, env, target, shield, absorbed);
    }
}
