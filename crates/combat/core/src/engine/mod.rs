//! Engine facade.
//!
//! [`CombatEngine`] borrows the [`World`] mutably together with a
//! [`CombatEnv`] and exposes every combat operation as a method. The free
//! functions behind it (`combat::resolve_damage`, `aura::apply::try_apply`,
//! `proc::dispatch_proc`, ...) take the same pair explicitly, so nested calls
//! never need more than one mutable borrow of the world.
//!
//! Script hooks receive a fresh engine over the same world and may re-enter
//! any operation.

pub mod executor;

use crate::aura::apply::{self, AuraRequest, ApplyOutcome};
use crate::aura::{RemoveMode, interrupt, query, remove, tick};
use crate::combat::{self, DamageInfo, DamageRequest, HealInfo, HealRequest, SpellContext};
use crate::diminishing::DiminishingGroup;
use crate::env::{CombatEnv, CombatScripts, OracleError};
use crate::error::AuraRefusal;
use crate::proc::{self, ProcEvent, ProcReport};
use crate::spell::{AuraInterruptFlags, SpellInfo};
use crate::state::{ActorFlags, AuraId, DeathState, EntityId, SpellId, World};

/// Combat engine over one world.
pub struct CombatEngine<'a> {
    world: &'a mut World,
    env: CombatEnv<'a>,
}

impl<'a> CombatEngine<'a> {
    pub fn new(world: &'a mut World, env: CombatEnv<'a>) -> Self {
        Self { world, env }
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    /// Direct access to the world, bypassing combat semantics.
    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    pub fn env(&self) -> CombatEnv<'a> {
        self.env
    }

    // ===== damage and healing =====

    pub fn resolve_damage(&mut self, request: DamageRequest) -> DamageInfo {
        combat::resolve_damage(self.world, self.env, request)
    }

    pub fn resolve_heal(&mut self, request: HealRequest) -> HealInfo {
        combat::resolve_heal(self.world, self.env, request)
    }

    pub fn kill(&mut self, killer: Option<EntityId>, victim: EntityId) {
        combat::kill(self.world, self.env, killer, victim);
    }

    pub fn set_death_state(&mut self, actor: EntityId, state: DeathState) {
        combat::set_death_state(self.world, self.env, actor, state);
    }

    // ===== auras =====

    /// Applies the aura part of a spell.
    ///
    /// # Errors
    ///
    /// Returns the [`AuraRefusal`] that prevented the application.
    pub fn apply_aura(&mut self, request: AuraRequest) -> Result<ApplyOutcome, AuraRefusal> {
        apply::try_apply(self.world, self.env, request)
    }

    pub fn remove_aura(&mut self, aura: AuraId, mode: RemoveMode) -> bool {
        remove::remove_aura(self.world, self.env, aura, mode)
    }

    pub fn remove_application(&mut self, aura: AuraId, target: EntityId, mode: RemoveMode) {
        remove::remove_application(self.world, self.env, aura, target, mode);
    }

    pub fn remove_auras_by_spell(
        &mut self,
        target: EntityId,
        spell: SpellId,
        caster: Option<EntityId>,
        mode: RemoveMode,
    ) -> usize {
        remove::remove_auras_by_spell(self.world, self.env, target, spell, caster, mode)
    }

    pub fn remove_auras_with_interrupt_flags(
        &mut self,
        target: EntityId,
        flags: AuraInterruptFlags,
        except: Option<SpellId>,
    ) -> usize {
        interrupt::interrupt_auras(self.world, self.env, target, flags, except)
    }

    pub fn remove_auras_on_death(&mut self, target: EntityId) -> usize {
        remove::remove_auras_on_death(self.world, self.env, target)
    }

    pub fn remove_all_auras(&mut self, target: EntityId) {
        remove::remove_all_auras(self.world, self.env, target);
    }

    pub fn has_aura(&self, target: EntityId, spell: SpellId, caster: Option<EntityId>) -> bool {
        query::has_aura(self.world, target, spell, caster)
    }

    pub fn aura_effect_value(&self, target: EntityId, spell: SpellId, slot: u8) -> Option<i32> {
        query::aura_effect_value(self.world, target, spell, slot)
    }

    // ===== diminishing returns =====

    pub fn current_level(&self, target: EntityId, group: DiminishingGroup) -> u8 {
        apply::current_level(self.world, self.env, target, group)
    }

    pub fn apply_duration_scaling(
        &self,
        spell: &SpellInfo,
        duration: &mut Option<u32>,
        caster: EntityId,
        target: EntityId,
        previous_level: u8,
    ) -> bool {
        apply::apply_duration_scaling(self.world, self.env, spell, duration, caster, target, previous_level)
    }

    pub fn record_application(&mut self, target: EntityId, group: DiminishingGroup, apply: bool) {
        apply::record_application(self.world, target, group, apply);
    }

    // ===== procs and spells =====

    pub fn dispatch_proc(&mut self, event: &ProcEvent) -> ProcReport {
        proc::dispatch_proc(self.world, self.env, event)
    }

    /// Executes `spell` from `caster` on `target` without a cast time.
    ///
    /// The caster's CAST-interruptible auras are removed first.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] when the spell or one it triggers is unknown.
    pub fn cast_spell(&mut self, caster: EntityId, target: EntityId, spell: SpellId) -> Result<(), OracleError> {
        self.env.spell(spell)?;
        interrupt::interrupt_auras(self.world, self.env, caster, AuraInterruptFlags::CAST, Some(spell));
        executor::execute_spell(self.world, self.env, caster, target, SpellContext::new(spell))
    }

    /// Starts a channel of `spell` on `caster`, interruptible by the spell's
    /// channel interrupt flags.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::SpellNotFound`] for an unknown spell.
    pub fn start_channel(&mut self, caster: EntityId, spell: SpellId) -> Result<(), OracleError> {
        let info = self.env.spell(spell)?;
        interrupt::start_channel(self.world, caster, spell, info.channel_interrupt);
        Ok(())
    }

    pub fn stop_channel(&mut self, caster: EntityId) {
        interrupt::stop_channel(self.world, self.env, caster);
    }

    // ===== time and movement =====

    pub fn tick(&mut self, delta_ms: u32) {
        tick::tick(self.world, self.env, delta_ms);
    }

    /// `actor` moved: its MOVE-interruptible auras and channel end.
    pub fn notify_moved(&mut self, actor: EntityId) -> usize {
        interrupt::interrupt_auras(self.world, self.env, actor, AuraInterruptFlags::MOVE, None)
    }

    // ===== actors =====

    /// Tears an actor down: strips every aura it holds, owns or cast as a
    /// single-target aura, then removes it from the world.
    pub fn despawn(&mut self, actor: EntityId) -> bool {
        let Some(record) = self.world.actor_mut(actor) else {
            return false;
        };
        record.flags.insert(ActorFlags::CLEANUP);
        remove::remove_all_auras(self.world, self.env, actor);
        self.world.flush_disposal();
        self.world.remove_actor(actor);
        tracing::debug!(actor = %actor, "actor despawned");
        true
    }
}

/// Runs a script hook, if scripts are installed, with an engine over `world`.
pub(crate) fn run_script<F>(world: &mut World, env: CombatEnv<'_>, hook: F)
where
    F: FnOnce(&dyn CombatScripts, &mut CombatEngine<'_>),
{
    let Some(scripts) = env.scripts() else {
        return;
    };
    let mut engine = CombatEngine::new(world, env);
    hook(scripts, &mut engine);
}
