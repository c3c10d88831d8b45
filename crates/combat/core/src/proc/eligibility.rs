//! Static proc filters: which effect slots of an aura may react to an event.
//!
//! Chance rolls, cooldown bookkeeping and charges are handled by the
//! dispatcher; everything here is a pure read of the world.

use super::entry::ProcEntry;
use super::event::ProcEventInfo;
use super::flags::{ProcAttributes, ProcFlags, ProcHit};
use crate::aura::{ApplicationState, Aura, AuraEffect};
use crate::env::CombatEnv;
use crate::spell::{AuraType, SpellAttributes, SpellInfo};
use crate::state::World;

/// Aura types that do something when their aura procs.
fn is_trigger_type(aura_type: AuraType) -> bool {
    matches!(
        aura_type,
        AuraType::ProcTriggerSpell | AuraType::ProcTriggerDamage | AuraType::Dummy
    )
}

/// Effect slots of `aura` that may proc from `info`, zero when none.
///
/// Checks, in order: the holder's application, the event type, cooldown and
/// charges, then the school, family, spell type, phase and hit filters of
/// the proc entry, and finally the conditions on the triggering spell.
/// KILL, KILLED and DEATH events skip the filter checks once the type
/// matches.
pub fn proc_effect_mask(world: &World, env: CombatEnv<'_>, aura: &Aura, info: &ProcEventInfo) -> u8 {
    let Some(spell) = env.spells().spell(aura.spell) else {
        return 0;
    };
    let Some(entry) = spell.proc.as_ref() else {
        return 0;
    };
    let Some(holder) = world.actor(info.holder) else {
        return 0;
    };
    let Some(app) = holder
        .application(aura.id)
        .filter(|app| app.state == ApplicationState::Applied)
    else {
        return 0;
    };

    if !entry.flags.intersects(info.type_mask) {
        return 0;
    }
    let death_event = info
        .type_mask
        .intersects(ProcFlags::DEATH | ProcFlags::KILLED);
    if !holder.is_alive() && !death_event {
        return 0;
    }
    if aura.proc_cooldown_until > world.now() {
        return 0;
    }
    if aura.using_charges && aura.charges == 0 {
        return 0;
    }

    let event_spell = info.spell.and_then(|context| env.spells().spell(context.spell));
    if !info.type_mask.intersects(ProcFlags::ALWAYS_TRIGGER_MASK)
        && !passes_filters(entry, info, event_spell)
    {
        return 0;
    }
    if !passes_spell_conditions(env, aura, spell, entry, info, event_spell) {
        return 0;
    }

    let mask = aura
        .effects()
        .filter(|effect| is_trigger_type(effect.aura_type))
        .fold(0u8, |mask, effect: &AuraEffect| mask | (1 << effect.slot));
    mask & app.applied_mask() & !entry.disable_effects_mask
}

/// School, family, spell type, phase and hit filters.
fn passes_filters(entry: &ProcEntry, info: &ProcEventInfo, event_spell: Option<&SpellInfo>) -> bool {
    if !entry.school.is_empty() && !entry.school.intersects(info.school) {
        return false;
    }

    if entry.family != 0 || entry.family_mask != 0 {
        // Filtering on a family only applies to spell events.
        if let Some(spell) = event_spell
            && !spell.is_affected(entry.family, entry.family_mask)
        {
            return false;
        }
    }

    if info.type_mask.intersects(ProcFlags::SPELL_MASK)
        && !entry.effective_spell_type().intersects(info.spell_type)
    {
        return false;
    }

    if info.type_mask.intersects(ProcFlags::REQ_SPELL_PHASE_MASK)
        && !entry.effective_phase().intersects(info.phase)
    {
        return false;
    }

    let hit_event = info
        .type_mask
        .intersects(ProcFlags::DONE_HIT_MASK | ProcFlags::TAKEN_HIT_MASK);
    if hit_event {
        let wanted = if !entry.hit.is_empty() {
            entry.hit
        } else if info.holder == info.actor {
            ProcHit::NORMAL | ProcHit::CRITICAL | ProcHit::ABSORB
        } else {
            ProcHit::NORMAL | ProcHit::CRITICAL
        };
        if !wanted.intersects(info.hit) {
            return false;
        }
    }
    true
}

/// Conditions on the spell that caused the event.
fn passes_spell_conditions(
    env: CombatEnv<'_>,
    aura: &Aura,
    aura_spell: &SpellInfo,
    entry: &ProcEntry,
    info: &ProcEventInfo,
    event_spell: Option<&SpellInfo>,
) -> bool {
    let Some(context) = info.spell else {
        return !entry.has_attribute(ProcAttributes::REQ_SPELLMOD);
    };
    if event_spell.is_some_and(|spell| spell.has_attribute(SpellAttributes::DISABLE_PROC)) {
        return false;
    }
    // An aura never reacts to what it triggered itself.
    if context.is_triggered_by(aura.spell) && info.actor == info.holder {
        return false;
    }
    if context.triggered && !info.type_mask.intersects(ProcFlags::AUTO_ATTACK_MASK) {
        let allowed = entry.has_attribute(ProcAttributes::TRIGGERED_CAN_PROC)
            || aura_spell.has_attribute(SpellAttributes::CAN_PROC_FROM_PROCS)
            || event_spell
                .is_some_and(|spell| spell.has_attribute(SpellAttributes::TRIGGERED_CAN_TRIGGER_PROC));
        if !allowed {
            return false;
        }
    }
    if context.cast_item.is_some() && entry.has_attribute(ProcAttributes::CANT_PROC_FROM_ITEM_CAST) {
        return false;
    }
    if entry.has_attribute(ProcAttributes::REQ_SPELLMOD) {
        let Some(event_spell) = event_spell else {
            return false;
        };
        return modifies(env, aura, event_spell);
    }
    true
}

/// Whether one of `aura`'s spell modifiers applies to `spell`.
fn modifies(env: CombatEnv<'_>, aura: &Aura, spell: &SpellInfo) -> bool {
    let family = env.spells().spell(aura.spell).map_or(0, |source| source.family);
    aura.effects()
        .filter(|effect| effect.aura_type.is_spell_mod())
        .any(|effect| spell.is_affected(family, effect.misc_value_b as u32 as u64))
}
