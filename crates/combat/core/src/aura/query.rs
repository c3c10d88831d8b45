//! Read-only views over applied aura effects.
//!
//! Only slots whose apply handler ran (and has not been unwound) count, so an
//! aura mid-removal stops contributing as soon as each slot is released.

use super::{Aura, AuraEffect, ApplicationState};
use crate::env::CombatEnv;
use crate::spell::{AuraType, SpellInfo, SpellModOp};
use crate::state::{EntityId, SpellId, World};

/// Active effects of `aura_type` on `target`, oldest aura first.
pub fn effects_of_type<'w>(
    world: &'w World,
    target: EntityId,
    aura_type: AuraType,
) -> impl Iterator<Item = (&'w Aura, &'w AuraEffect)> + 'w {
    world
        .actor(target)
        .into_iter()
        .flat_map(|actor| actor.applications())
        .filter(|app| app.state == ApplicationState::Applied)
        .filter_map(move |app| {
            let aura = world.aura(app.aura)?;
            Some((app, aura))
        })
        .flat_map(move |(app, aura)| {
            aura.effects()
                .filter(move |effect| {
                    effect.aura_type == aura_type && app.applied_mask & (1 << effect.slot) != 0
                })
                .map(move |effect| (aura, effect))
        })
}

/// Sum of effect amounts of `aura_type` passing `filter`.
pub fn total_modifier<F>(world: &World, target: EntityId, aura_type: AuraType, filter: F) -> i32
where
    F: Fn(&Aura, &AuraEffect) -> bool,
{
    effects_of_type(world, target, aura_type)
        .filter(|(aura, effect)| filter(aura, effect))
        .map(|(_, effect)| effect.amount)
        .sum()
}

/// Product of `(100 + amount) / 100` over effects of `aura_type` passing `filter`.
pub fn total_multiplier<F>(world: &World, target: EntityId, aura_type: AuraType, filter: F) -> f32
where
    F: Fn(&Aura, &AuraEffect) -> bool,
{
    effects_of_type(world, target, aura_type)
        .filter(|(aura, effect)| filter(aura, effect))
        .fold(1.0, |acc, (_, effect)| acc * (100.0 + effect.amount as f32) / 100.0)
}

/// Whether `target` holds an applied aura of `spell`, optionally from `caster`.
pub fn has_aura(world: &World, target: EntityId, spell: SpellId, caster: Option<EntityId>) -> bool {
    let Some(actor) = world.actor(target) else {
        return false;
    };
    actor
        .applications()
        .filter(|app| app.state == ApplicationState::Applied)
        .filter_map(|app| world.aura(app.aura))
        .any(|aura| aura.spell == spell && caster.is_none_or(|c| aura.caster == c))
}

/// Current amount of effect `slot` of the oldest applied aura of `spell` on `target`.
pub fn aura_effect_value(world: &World, target: EntityId, spell: SpellId, slot: u8) -> Option<i32> {
    let actor = world.actor(target)?;
    actor
        .applications()
        .filter(|app| app.state == ApplicationState::Applied && app.has_effect(slot))
        .filter_map(|app| world.aura(app.aura))
        .find(|aura| aura.spell == spell)
        .and_then(|aura| aura.effect(slot))
        .map(|effect| effect.amount)
}

/// Applies the caster's spell modifiers for `op` to `base`.
///
/// Modifiers live on the caster's spell-mod owner (the player, or the player
/// controlling a pet). A modifier affects `spell` when its aura's family and
/// the effect's secondary misc value (family mask) match, see
/// [`SpellInfo::is_affected`]. Flat modifiers are added before percent
/// modifiers multiply.
pub fn apply_spell_mod(
    world: &World,
    env: CombatEnv<'_>,
    caster: EntityId,
    spell: &SpellInfo,
    op: SpellModOp,
    base: f32,
) -> f32 {
    let Some(owner) = world.spell_mod_owner(caster) else {
        return base;
    };
    let affects = |aura: &Aura, effect: &AuraEffect| {
        if effect.misc_value != op as i32 {
            return false;
        }
        env.spells()
            .spell(aura.spell)
            .is_some_and(|source| spell.is_affected(source.family, effect.misc_value_b as u32 as u64))
    };
    let flat = total_modifier(world, owner, AuraType::AddFlatModifier, affects);
    let pct = total_multiplier(world, owner, AuraType::AddPctModifier, affects);
    (base + flat as f32) * pct
}
