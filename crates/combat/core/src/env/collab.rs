//! External collaborators consumed by the engine.
//!
//! Collaborators are optional: an absent threat tracker simply means no
//! threat is recorded. All methods take `&self`; implementations that record
//! calls use interior mutability since the engine is single-threaded.

use crate::aura::RemoveMode;
use crate::engine::CombatEngine;
use crate::events::CombatEvent;
use crate::proc::ProcEventInfo;
use crate::spell::{CastInterruptFlags, SpellInfo};
use crate::state::{AuraId, EntityId, SpellId, World};

/// Threat and combat-list bookkeeping.
pub trait ThreatTracker {
    /// `source` generated `amount` threat on `victim`.
    fn add_threat(&self, source: EntityId, victim: EntityId, amount: f32, spell: Option<SpellId>);

    /// `healer` helped `target`; the tracker spreads `amount` threat to
    /// everything fighting the target.
    fn forward_heal_threat(
        &self,
        healer: EntityId,
        target: EntityId,
        amount: f32,
        spell: Option<SpellId>,
    );
}

/// Movement state, queried and stopped but never owned by the engine.
pub trait MotionOracle {
    fn is_moving(&self, actor: EntityId) -> bool;

    fn stop_moving(&self, actor: EntityId);
}

/// Cast in progress, as reported by the casting state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CastInfo {
    pub spell: SpellId,
    pub interrupt: CastInterruptFlags,
    /// The cast is channelled rather than being prepared.
    pub channeled: bool,
}

/// Spell-cast state machine.
pub trait CastControl {
    fn current_cast(&self, actor: EntityId) -> Option<CastInfo>;

    fn interrupt(&self, actor: EntityId);

    /// Pushes the cast back after the caster was hit.
    fn delay(&self, actor: EntityId);
}

/// Receives combat log entries and aura notifications.
pub trait CombatEventSink {
    fn publish(&self, event: &CombatEvent);
}

/// Picks the actors an area aura should currently affect around its owner.
///
/// The owner itself is always affected and need not be returned.
pub trait AreaTargetSelector {
    fn select(&self, world: &World, owner: EntityId, spell: &SpellInfo) -> Vec<EntityId>;
}

/// Content hooks. Every hook has a no-op default.
///
/// Hooks receive the engine and may re-enter it (apply or remove auras, deal
/// damage); the engine re-validates its own state after each hook returns.
pub trait CombatScripts {
    /// Extra veto over an otherwise eligible proc.
    fn check_proc(&self, _world: &World, _aura: AuraId, _event: &ProcEventInfo) -> bool {
        true
    }

    /// A `Dummy` aura effect procced.
    fn on_proc(&self, _engine: &mut CombatEngine<'_>, _aura: AuraId, _slot: u8, _event: &ProcEventInfo) {}

    fn on_aura_applied(&self, _engine: &mut CombatEngine<'_>, _aura: AuraId, _target: EntityId) {}

    fn on_aura_removed(
        &self,
        _engine: &mut CombatEngine<'_>,
        _aura: AuraId,
        _target: EntityId,
        _mode: RemoveMode,
    ) {
    }

    /// A `Dummy` spell effect was executed.
    fn on_dummy_effect(
        &self,
        _engine: &mut CombatEngine<'_>,
        _caster: EntityId,
        _target: EntityId,
        _spell: SpellId,
        _slot: u8,
    ) {
    }
}
