//! Aura creation: validation, diminishing returns, refresh, exclusivity and
//! effect application.

use std::collections::BTreeSet;

use super::effects;
use super::interrupt::recompute_interrupt_mask;
use super::query::apply_spell_mod;
use super::remove::remove_aura;
use super::stacking::{Exclusivity, resolve_exclusivity};
use super::{ApplicationState, Aura, AuraApplication, AuraEffect, RemoveMode};
use crate::config::CombatConfig;
use crate::diminishing::{self, DiminishingType};
use crate::engine::run_script;
use crate::env::CombatEnv;
use crate::error::{AuraRefusal, ErrorContext, InvariantViolation};
use crate::events::CombatEvent;
use crate::spell::{AuraType, SpellAttributes, SpellEffectInfo, SpellInfo, SpellModOp};
use crate::state::{AuraId, EntityId, ItemId, SpellId, World};

/// Request to put the aura part of a spell on a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuraRequest {
    pub spell: SpellId,
    pub caster: EntityId,
    pub target: EntityId,
    /// Effect slots to apply; intersected with the spell's aura slots.
    pub effect_mask: u8,
    pub cast_item: Option<ItemId>,
    /// Trigger depth of the spell that carries this aura.
    pub chain_depth: u32,
}

impl AuraRequest {
    pub fn new(spell: SpellId, caster: EntityId, target: EntityId) -> Self {
        Self {
            spell,
            caster,
            target,
            effect_mask: u8::MAX,
            cast_item: None,
            chain_depth: 0,
        }
    }

    pub fn with_effect_mask(mut self, effect_mask: u8) -> Self {
        self.effect_mask = effect_mask;
        self
    }

    pub fn with_cast_item(mut self, item: ItemId) -> Self {
        self.cast_item = Some(item);
        self
    }

    pub fn with_chain_depth(mut self, depth: u32) -> Self {
        self.chain_depth = depth;
        self
    }
}

/// Successful application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created(AuraId),
    /// An aura with the same key was refreshed (and possibly stacked).
    Refreshed(AuraId),
}

impl ApplyOutcome {
    pub fn aura(self) -> AuraId {
        match self {
            Self::Created(id) | Self::Refreshed(id) => id,
        }
    }
}

/// Applies the aura part of a spell to its target.
///
/// # Errors
///
/// Returns an [`AuraRefusal`] describing why nothing was applied. Refusals
/// are ordinary outcomes and are only logged at debug level.
pub fn try_apply(
    world: &mut World,
    env: CombatEnv<'_>,
    request: AuraRequest,
) -> Result<ApplyOutcome, AuraRefusal> {
    let result = apply_inner(world, env, request);
    if let Err(refusal) = &result {
        match refusal {
            AuraRefusal::Internal(violation) => violation.log(),
            _ => tracing::debug!(
                spell = %request.spell,
                caster = %request.caster,
                target = %request.target,
                "aura refused: {refusal}"
            ),
        }
    }
    result
}

fn apply_inner(
    world: &mut World,
    env: CombatEnv<'_>,
    request: AuraRequest,
) -> Result<ApplyOutcome, AuraRefusal> {
    let AuraRequest {
        spell: spell_id,
        caster,
        target,
        ..
    } = request;
    let spell = env
        .spell(spell_id)
        .map_err(|_| AuraRefusal::UnknownSpell(spell_id))?;

    let requested = spell.aura_effect_mask() & request.effect_mask;
    if requested == 0 {
        return Err(AuraRefusal::NoAuraEffects(spell_id));
    }

    let actor = world
        .actor(target)
        .ok_or(AuraRefusal::TargetMissing(target))?;
    if actor.in_cleanup() {
        return Err(AuraRefusal::TargetInCleanup(target));
    }
    if !actor.is_alive() && !spell.is_passive() && !spell.is_death_persistent() {
        return Err(AuraRefusal::TargetDead(target));
    }

    let mask = actor.immunities.landing_mask(spell, requested);
    if mask == 0 {
        env.publish(CombatEvent::Immune {
            attacker: Some(caster),
            victim: target,
            spell: Some(spell_id),
        });
        return Err(AuraRefusal::Immune {
            target,
            spell: spell_id,
        });
    }

    let mut duration = spell.duration_ms.map(|base| {
        apply_spell_mod(world, env, caster, spell, SpellModOp::Duration, base as f32).max(0.0)
            as u32
    });

    if let Some(rule) = spell.diminishing {
        let previous = current_level(world, env, target, rule.group);
        if rule.kind == DiminishingType::All || world.is_player_controlled(target) {
            let tuning = &env.config().diminishing;
            let max_level = diminishing::max_level(tuning, rule.group);
            let now = world.now();
            if let Some(actor) = world.actor_mut(target) {
                actor
                    .diminishing
                    .increment(rule.group, max_level, now, tuning.reset_ms);
            }
        }
        if !apply_duration_scaling(world, env, spell, &mut duration, caster, target, previous) {
            return Err(AuraRefusal::Diminished {
                target,
                spell: spell_id,
            });
        }
    }

    if !spell.is_multi_slot()
        && let Some(existing) = find_refreshable(world, target, spell_id, caster, request.cast_item, mask)
    {
        refresh(world, env, spell, existing, duration, request.chain_depth)?;
        return Ok(ApplyOutcome::Refreshed(existing));
    }

    let displaced = match resolve_exclusivity(world, env, spell, caster, request.cast_item, target, mask) {
        Exclusivity::Allowed(displaced) => displaced,
        Exclusivity::Refused(refusal) => return Err(refusal),
    };
    for existing in displaced {
        remove_aura(world, env, existing, RemoveMode::Default);
    }

    let id = create(world, env, spell, &request, mask, duration);
    evict_single_target(world, env, spell, caster);

    apply_to_target(world, env, id, target, mask)?;
    if spell.is_area_aura() {
        for other in select_area_targets(world, env, spell, target) {
            let Some(actor) = world.actor(other) else {
                continue;
            };
            let other_mask = actor.immunities.landing_mask(spell, mask);
            // Refusals on secondary targets do not affect the owner's aura.
            if other_mask != 0
                && let Err(refusal) = apply_to_target(world, env, id, other, other_mask)
            {
                tracing::debug!(aura = %id, target = %other, error = %refusal, "secondary target refused");
            }
        }
    }

    tracing::debug!(aura = %id, spell = %spell_id, caster = %caster, target = %target, "aura created");
    Ok(ApplyOutcome::Created(id))
}

/// Hit level the next aura of `group` would be scaled with on `target`.
pub fn current_level(
    world: &World,
    env: CombatEnv<'_>,
    target: EntityId,
    group: diminishing::DiminishingGroup,
) -> u8 {
    world.actor(target).map_or(1, |actor| {
        actor
            .diminishing
            .current_level(group, world.now(), env.config().diminishing.reset_ms)
    })
}

/// Scales `duration` for diminishing returns.
///
/// A player-controlled source against a player-controlled target is first
/// capped by the rule's duration limit. The curve entry for
/// `previous_level` is then applied when the group diminishes on the target's
/// population. Permanent auras are never scaled.
///
/// Returns false when the scaled duration is zero.
pub fn apply_duration_scaling(
    world: &World,
    env: CombatEnv<'_>,
    spell: &SpellInfo,
    duration: &mut Option<u32>,
    caster: EntityId,
    target: EntityId,
    previous_level: u8,
) -> bool {
    let Some(rule) = spell.diminishing else {
        return true;
    };
    let Some(mut ms) = *duration else {
        return true;
    };

    let target_protected = world.is_player_controlled(target);
    if let Some(limit) = rule.limit_duration_ms
        && target_protected
        && world.is_player_controlled(caster)
    {
        ms = ms.min(limit);
    }

    let population = rule.kind == DiminishingType::All || target_protected;
    if population && previous_level > 1 {
        let curve = diminishing::curve(&env.config().diminishing, rule.group);
        ms = diminishing::scale_duration(curve, previous_level, ms);
    }

    *duration = Some(ms);
    ms > 0
}

/// Records an aura of `group` being applied to (or removed from) `target`.
pub fn record_application(
    world: &mut World,
    target: EntityId,
    group: diminishing::DiminishingGroup,
    apply: bool,
) {
    let now = world.now();
    if let Some(actor) = world.actor_mut(target) {
        actor.diminishing.record_application(group, apply, now);
    }
}

fn find_refreshable(
    world: &World,
    owner: EntityId,
    spell: SpellId,
    caster: EntityId,
    cast_item: Option<ItemId>,
    mask: u8,
) -> Option<AuraId> {
    let actor = world.actor(owner)?;
    actor
        .owned_auras()
        .filter_map(|id| world.aura(id))
        .find(|aura| aura.matches_key(spell, caster, cast_item) && aura.effect_mask() == mask)
        .map(|aura| aura.id)
}

fn refresh(
    world: &mut World,
    env: CombatEnv<'_>,
    spell: &SpellInfo,
    id: AuraId,
    duration: Option<u32>,
    chain_depth: u32,
) -> Result<(), AuraRefusal> {
    let now = world.now();
    let missing = move || {
        AuraRefusal::from(InvariantViolation::MissingAura {
            aura: id,
            context: ErrorContext::new(now)
                .with_spell(spell.id)
                .with_message("refresh target vanished"),
        })
    };
    let (caster, owner) = world
        .aura(id)
        .map(|aura| (aura.caster, aura.owner))
        .ok_or(AuraRefusal::RemovedDuringApply(id))?;
    if world.actor(owner).and_then(|actor| actor.application(id)).is_none() {
        return Err(AuraRefusal::from(InvariantViolation::OwnerWithoutApplication {
            aura: id,
            owner,
            context: ErrorContext::new(now)
                .with_spell(spell.id)
                .with_actor(owner)
                .with_message("refreshing an aura its owner does not carry"),
        }));
    }
    let points: Vec<(u8, i32)> = spell
        .effects
        .iter()
        .enumerate()
        .map(|(slot, info)| (slot as u8, base_points(world, env, caster, spell, info)))
        .collect();
    let aura = world.aura_mut(id).ok_or(AuraRefusal::RemovedDuringApply(id))?;

    for effect in aura.effects.iter_mut().flatten() {
        let (Some(info), Some(&(_, bp))) = (
            spell.effect(effect.slot),
            points.iter().find(|(slot, _)| *slot == effect.slot),
        ) else {
            continue;
        };
        if info.points_stack {
            effect.base_amount = effect.base_amount.saturating_add(bp);
        } else {
            effect.base_amount = bp;
        }
        if !spell.has_attribute(SpellAttributes::DONT_RESET_PERIODIC_TIMER) {
            effect.reset_period();
        }
    }
    let cap = spell.max_stacks.clamp(1, CombatConfig::MAX_STACK_CAP);
    aura.stacks = aura.stacks.saturating_add(1).min(cap);
    aura.recalculate_amounts();
    aura.max_duration_ms = duration;
    aura.duration_ms = spell.refresh.refreshed(aura.duration_ms, duration);
    aura.charges = spell.proc_charges;
    aura.applied_at = now;
    aura.chain_depth = aura.chain_depth.max(chain_depth);

    let stacks = aura.stacks;
    let remaining = aura.duration_ms;
    let targets: Vec<EntityId> = aura.targets.iter().copied().collect();
    let slots: Vec<u8> = aura.effects().map(|effect| effect.slot).collect();

    for target in &targets {
        for slot in &slots {
            effects::refresh_amount(world, env, id, *target, *slot);
        }
    }

    let owner = world.aura_any(id).map(|aura| aura.owner).ok_or_else(missing)?;
    env.publish(CombatEvent::AuraRefreshed {
        aura: id,
        spell: spell.id,
        target: owner,
        stacks,
        duration_ms: remaining,
    });
    tracing::debug!(aura = %id, spell = %spell.id, stacks, "aura refreshed");
    Ok(())
}

fn create(
    world: &mut World,
    env: CombatEnv<'_>,
    spell: &SpellInfo,
    request: &AuraRequest,
    mask: u8,
    duration: Option<u32>,
) -> AuraId {
    let id = world.allocate_aura_id();
    let now = world.now();

    let mut effects: [Option<AuraEffect>; CombatConfig::MAX_EFFECTS] = Default::default();
    for (slot, info) in spell.effects.iter().enumerate() {
        if mask & (1 << slot) != 0 && info.is_aura() {
            let base = base_points(world, env, request.caster, spell, info);
            effects[slot] = Some(AuraEffect::from_info(slot as u8, info, base));
        }
    }

    let aura = Aura {
        id,
        spell: spell.id,
        caster: request.caster,
        cast_item: request.cast_item,
        owner: request.target,
        duration_ms: duration,
        max_duration_ms: duration,
        charges: spell.proc_charges,
        stacks: 1,
        effects,
        targets: BTreeSet::new(),
        removed: None,
        positive: spell.positive,
        passive: spell.is_passive(),
        area: spell.is_area_aura(),
        single_target: spell.single_target.is_some(),
        using_charges: spell.proc_charges > 0,
        interrupt_flags: spell.aura_interrupt,
        diminishing: spell.diminishing.map(|rule| rule.group),
        absorb_priority: spell.absorb_priority,
        chain_depth: request.chain_depth,
        proc_cooldown_until: now,
        applied_at: now,
        last_area_refresh: now,
    };
    world.auras.insert(id, aura);
    if let Some(owner) = world.actor_mut(request.target) {
        owner.owned_auras.insert(id);
    }
    if spell.single_target.is_some()
        && let Some(caster) = world.actor_mut(request.caster)
    {
        caster.single_target_auras.push(id);
    }
    id
}

/// Base points of an aura effect. Periodic damage and healing take the
/// caster's damage modifiers once, when the aura is cast.
fn base_points(
    world: &World,
    env: CombatEnv<'_>,
    caster: EntityId,
    spell: &SpellInfo,
    info: &SpellEffectInfo,
) -> i32 {
    if matches!(info.aura, AuraType::PeriodicDamage | AuraType::PeriodicHeal) {
        apply_spell_mod(world, env, caster, spell, SpellModOp::Damage, info.base_points as f32) as i32
    } else {
        info.base_points
    }
}

/// Drops the caster's oldest single-target auras of the same group beyond the cap.
fn evict_single_target(world: &mut World, env: CombatEnv<'_>, spell: &SpellInfo, caster: EntityId) {
    let Some(rule) = spell.single_target else {
        return;
    };
    let Some(actor) = world.actor(caster) else {
        return;
    };
    let same_group: Vec<AuraId> = actor
        .single_target_auras
        .iter()
        .copied()
        .filter(|id| {
            world
                .aura(*id)
                .and_then(|aura| env.spells().spell(aura.spell))
                .and_then(|info| info.single_target)
                .is_some_and(|other| other.group == rule.group)
        })
        .collect();
    let cap = usize::from(rule.cap.max(1));
    let excess = same_group.len().saturating_sub(cap);
    for id in same_group.into_iter().take(excess) {
        tracing::debug!(aura = %id, caster = %caster, "single-target aura evicted");
        remove_aura(world, env, id, RemoveMode::Default);
    }
}

/// Candidate secondary targets of an area aura owned by `owner`.
pub(crate) fn select_area_targets(
    world: &World,
    env: CombatEnv<'_>,
    spell: &SpellInfo,
    owner: EntityId,
) -> Vec<EntityId> {
    let Some(selector) = env.area() else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    selector
        .select(world, owner, spell)
        .into_iter()
        .filter(|id| *id != owner && seen.insert(*id))
        .filter(|id| {
            world
                .actor(*id)
                .is_some_and(|actor| actor.is_alive() && !actor.in_cleanup())
        })
        .collect()
}

/// Registers an application of `aura` on `target` and runs its apply handlers.
///
/// # Errors
///
/// Returns [`AuraRefusal::RemovedDuringApply`] when a handler or hook removed
/// the aura or the application before all slots were applied.
pub(crate) fn apply_to_target(
    world: &mut World,
    env: CombatEnv<'_>,
    id: AuraId,
    target: EntityId,
    mask: u8,
) -> Result<(), AuraRefusal> {
    let aura = world
        .aura_mut(id)
        .filter(|aura| !aura.is_removed())
        .ok_or(AuraRefusal::RemovedDuringApply(id))?;
    aura.targets.insert(target);
    let positive = aura.positive;
    let interrupt = aura.interrupt_flags;
    let group = aura.diminishing;
    let spell = aura.spell;

    let now = world.now();
    let Some(actor) = world.actor_mut(target) else {
        if let Some(aura) = world.aura_mut(id) {
            aura.targets.remove(&target);
        }
        // Targets are validated before creation; losing one here is a desync.
        return Err(AuraRefusal::from(InvariantViolation::MissingActor {
            actor: target,
            context: ErrorContext::new(now)
                .with_spell(spell)
                .with_aura(id)
                .with_message("application target vanished"),
        }));
    };
    actor
        .applied
        .insert(id, AuraApplication::new(id, target, mask, positive));

    for slot in 0..CombatConfig::MAX_EFFECTS as u8 {
        if mask & (1 << slot) == 0 {
            continue;
        }
        match pending_application(world, id, target) {
            Some(app) => app.applied_mask |= 1 << slot,
            None => return Err(AuraRefusal::RemovedDuringApply(id)),
        }
        effects::handle_effect(world, env, id, target, slot, true);
    }

    match pending_application(world, id, target) {
        Some(app) => app.state = ApplicationState::Applied,
        None => return Err(AuraRefusal::RemovedDuringApply(id)),
    }

    if let Some(group) = group {
        record_application(world, target, group, true);
    }
    if !interrupt.is_empty() {
        recompute_interrupt_mask(world, target);
    }

    if let Some(aura) = world.aura(id) {
        env.publish(CombatEvent::AuraApplied {
            aura: id,
            spell: aura.spell,
            caster: aura.caster,
            target,
            stacks: aura.stacks,
            duration_ms: aura.duration_ms,
        });
    }
    run_script(world, env, |scripts, engine| {
        scripts.on_aura_applied(engine, id, target);
    });
    Ok(())
}

fn pending_application(world: &mut World, id: AuraId, target: EntityId) -> Option<&mut AuraApplication> {
    world
        .actor_mut(target)?
        .applied
        .get_mut(&id)
        .filter(|app| app.state == ApplicationState::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CombatError;
    use crate::state::Actor;
    use crate::testing::{FixedRng, SpellBook};

    const SHOUT: SpellId = SpellId(1);

    fn book() -> SpellBook {
        SpellBook::new().with(
            SpellInfo::new(SHOUT, "shout")
                .with_duration(60_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ModStat, 10))
                .positive(),
        )
    }

    #[test]
    fn refreshing_an_aura_its_owner_lost_is_refused() {
        let book = book();
        let config = CombatConfig::default();
        let rng = FixedRng::lucky();
        let env = CombatEnv::new(&book, &config, &rng);
        let mut world = World::new(1);
        let caster = world.spawn(Actor::creature(EntityId(1), 80));
        let target = world.spawn(Actor::player(EntityId(2), 80));

        let id = try_apply(&mut world, env, AuraRequest::new(SHOUT, caster, target))
            .unwrap()
            .aura();
        world.actor_mut(target).unwrap().applied.remove(&id);

        let refusal = try_apply(&mut world, env, AuraRequest::new(SHOUT, caster, target)).unwrap_err();
        assert!(matches!(
            &refusal,
            AuraRefusal::Internal(InvariantViolation::OwnerWithoutApplication { aura, owner, .. })
                if *aura == id && *owner == target
        ));
        assert!(refusal.severity().is_internal());
        assert_eq!(world.aura(id).map(|aura| aura.stacks), Some(1));
    }

    #[test]
    fn applying_to_a_vanished_actor_is_a_violation() {
        let book = book();
        let config = CombatConfig::default();
        let rng = FixedRng::lucky();
        let env = CombatEnv::new(&book, &config, &rng);
        let mut world = World::new(2);
        let caster = world.spawn(Actor::creature(EntityId(1), 80));
        let target = world.spawn(Actor::player(EntityId(2), 80));
        let id = try_apply(&mut world, env, AuraRequest::new(SHOUT, caster, target))
            .unwrap()
            .aura();

        let ghost = EntityId(99);
        let Err(AuraRefusal::Internal(violation)) = apply_to_target(&mut world, env, id, ghost, 0b1) else {
            panic!("expected an invariant violation");
        };
        assert_eq!(violation.error_code(), "INVARIANT_MISSING_ACTOR");
        assert_eq!(violation.context().and_then(|ctx| ctx.aura), Some(id));
        assert!(!world.aura(id).unwrap().targets.contains(&ghost));
    }
}
