//! Instant execution of a spell definition's effects.
//!
//! Used for procs, periodic triggers and direct casts. There is no cast time,
//! no hit roll and no cost: every effect lands in slot order on its receiver.

use super::run_script;
use crate::aura::apply::{AuraRequest, try_apply};
use crate::aura::query::apply_spell_mod;
use crate::combat::{DamageRequest, HealRequest, SpellContext, energize, resolve_damage, resolve_heal};
use crate::config::CombatConfig;
use crate::env::{CombatEnv, OracleError};
use crate::spell::{EffectTarget, SpellEffectKind, SpellInfo, SpellModOp};
use crate::state::{EntityId, PowerKind, World};

/// Executes every effect of `context.spell` from `caster`.
///
/// Effects aimed at [`EffectTarget::Caster`] land on the caster, the rest on
/// `target`. Aura slots are applied together, once per receiver, when the
/// first of them is reached. Nested trigger effects run one chain level
/// deeper and stop at the proc chain limit.
///
/// # Errors
///
/// Returns [`OracleError::SpellNotFound`] for an unknown spell and
/// [`OracleError::DanglingReference`] when a trigger effect names a missing
/// spell. Effects before the failing one have already landed.
pub fn execute_spell(
    world: &mut World,
    env: CombatEnv<'_>,
    caster: EntityId,
    target: EntityId,
    context: SpellContext,
) -> Result<(), OracleError> {
    let spell = env.spell(context.spell)?;
    if world.actor(caster).is_none() {
        tracing::debug!(caster = %caster, spell = %spell.id, "spell skipped: caster gone");
        return Ok(());
    }

    let receiver_of = |kind: EffectTarget| match kind {
        EffectTarget::Caster => caster,
        EffectTarget::Target => target,
    };
    let aura_mask = |receiver: EntityId| {
        spell
            .effects
            .iter()
            .enumerate()
            .filter(|(_, effect)| effect.is_aura() && receiver_of(effect.target) == receiver)
            .fold(0u8, |mask, (slot, _)| mask | (1 << slot))
    };

    for (slot, effect) in spell.effects.iter().enumerate().take(CombatConfig::MAX_EFFECTS) {
        let slot = slot as u8;
        let receiver = receiver_of(effect.target);
        if world.actor(receiver).is_none() {
            continue;
        }

        match effect.kind {
            SpellEffectKind::SchoolDamage => {
                let amount = effect_amount(world, env, caster, spell, effect.base_points);
                let request = DamageRequest::spell(Some(caster), receiver, amount, spell.school, context)
                    .with_damage_class(spell.damage_class);
                resolve_damage(world, env, request);
            }
            SpellEffectKind::Heal => {
                let amount = effect_amount(world, env, caster, spell, effect.base_points);
                let request = HealRequest::new(Some(caster), receiver, amount).with_spell(context);
                resolve_heal(world, env, request);
            }
            SpellEffectKind::Energize => {
                let Some(power) = PowerKind::from_misc(effect.misc_value) else {
                    world.report_content_error(spell.id, "unknown_power", "energize effect names no power");
                    continue;
                };
                energize(world, env, caster, receiver, power, effect.base_points);
            }
            SpellEffectKind::ApplyAura | SpellEffectKind::ApplyAreaAura => {
                let mask = aura_mask(receiver);
                // Only the lowest aura slot of a receiver applies the aura.
                if mask.trailing_zeros() != u32::from(slot) {
                    continue;
                }
                let mut request = AuraRequest::new(spell.id, caster, receiver)
                    .with_effect_mask(mask)
                    .with_chain_depth(context.chain_depth);
                if let Some(item) = context.cast_item {
                    request = request.with_cast_item(item);
                }
                // The remaining effects still run.
                if let Err(refusal) = try_apply(world, env, request) {
                    tracing::debug!(spell = %spell.id, target = %receiver, error = %refusal, "aura effect skipped");
                }
            }
            SpellEffectKind::TriggerSpell => {
                let Some(trigger) = effect.trigger_spell else {
                    world.report_content_error(spell.id, "missing_trigger", "trigger effect has no spell");
                    continue;
                };
                if env.spells().spell(trigger).is_none() {
                    return Err(OracleError::DanglingReference {
                        spell: spell.id,
                        missing: trigger,
                    });
                }
                let depth = context.chain_depth + 1;
                if depth > env.config().max_proc_chain {
                    tracing::warn!(spell = %spell.id, trigger = %trigger, depth, "trigger chain limit reached");
                    continue;
                }
                let nested = SpellContext::triggered(trigger, spell.id, depth);
                execute_spell(world, env, caster, receiver, nested)?;
            }
            SpellEffectKind::Dummy => {
                let spell_id = spell.id;
                run_script(world, env, |scripts, engine| {
                    scripts.on_dummy_effect(engine, caster, receiver, spell_id, slot);
                });
            }
        }
    }
    Ok(())
}

/// Base points after the caster's damage spell modifiers, never negative.
fn effect_amount(world: &World, env: CombatEnv<'_>, caster: EntityId, spell: &SpellInfo, base: i32) -> u32 {
    apply_spell_mod(world, env, caster, spell, SpellModOp::Damage, base as f32).max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::query::has_aura;
    use crate::env::PcgRng;
    use crate::spell::{AuraType, SpellEffectInfo, SpellGroupId, SpellGroupStackRule};
    use crate::state::{Actor, SpellId};
    use crate::testing::SpellBook;

    #[test]
    fn effects_land_on_their_receivers() {
        let book = SpellBook::new().with(
            SpellInfo::new(SpellId(1), "drain")
                .with_effect(SpellEffectInfo::immediate(SpellEffectKind::SchoolDamage, 40))
                .with_effect(
                    SpellEffectInfo::immediate(SpellEffectKind::Heal, 25).with_target(EffectTarget::Caster),
                ),
        );
        let config = CombatConfig::default();
        let rng = PcgRng;
        let env = CombatEnv::new(&book, &config, &rng);

        let mut world = World::new(1);
        let caster = world.spawn(Actor::player(EntityId(1), 80).with_health(100));
        let target = world.spawn(Actor::creature(EntityId(2), 80).with_health(100));
        if let Some(actor) = world.actor_mut(caster) {
            actor.health.modify(-50);
        }

        execute_spell(&mut world, env, caster, target, SpellContext::new(SpellId(1))).unwrap();
        assert_eq!(world.actor(target).unwrap().health.current, 60);
        assert_eq!(world.actor(caster).unwrap().health.current, 75);
    }

    #[test]
    fn refused_auras_do_not_stop_later_effects() {
        let group = SpellGroupId(1);
        let mut rally = SpellInfo::new(SpellId(1), "rally")
            .with_effect(SpellEffectInfo::aura(AuraType::ModStat, 100).with_misc(0));
        rally.groups = vec![group];
        let mut strike = SpellInfo::new(SpellId(2), "rallying strike")
            .with_effect(SpellEffectInfo::aura(AuraType::ModStat, 50).with_misc(0))
            .with_effect(SpellEffectInfo::immediate(SpellEffectKind::SchoolDamage, 40));
        strike.groups = vec![group];
        let book = SpellBook::new()
            .with(rally)
            .with(strike)
            .with_group_rule(group, SpellGroupStackRule::ExclusiveHighest);
        let config = CombatConfig::default();
        let rng = PcgRng;
        let env = CombatEnv::new(&book, &config, &rng);
        let mut world = World::new(1);
        let caster = world.spawn(Actor::player(EntityId(1), 80));
        let target = world.spawn(Actor::creature(EntityId(2), 80).with_health(100));

        try_apply(&mut world, env, AuraRequest::new(SpellId(1), caster, target)).unwrap();
        let before = world.actor(target).unwrap().health.current;
        execute_spell(&mut world, env, caster, target, SpellContext::new(SpellId(2))).unwrap();

        assert!(!has_aura(&world, target, SpellId(2), None));
        assert_eq!(world.actor(target).unwrap().health.current, before - 40);
    }

    #[test]
    fn missing_trigger_is_reported() {
        let book = SpellBook::new().with(
            SpellInfo::new(SpellId(1), "broken")
                .with_effect(SpellEffectInfo::immediate(SpellEffectKind::TriggerSpell, 0).with_trigger(SpellId(77))),
        );
        let config = CombatConfig::default();
        let rng = PcgRng;
        let env = CombatEnv::new(&book, &config, &rng);
        let mut world = World::new(1);
        let caster = world.spawn(Actor::player(EntityId(1), 80));

        let err = execute_spell(&mut world, env, caster, caster, SpellContext::new(SpellId(1))).unwrap_err();
        assert_eq!(
            err,
            OracleError::DanglingReference {
                spell: SpellId(1),
                missing: SpellId(77)
            }
        );
        assert_eq!(
            execute_spell(&mut world, env, caster, caster, SpellContext::new(SpellId(5))),
            Err(OracleError::SpellNotFound(SpellId(5)))
        );
    }
}
