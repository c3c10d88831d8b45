//! Notifications published to the [`CombatEventSink`](crate::env::CombatEventSink).
//!
//! Events are the engine's only outward channel for combat log entries and
//! aura changes. They carry plain ids so sinks can serialize them as-is.

use crate::aura::RemoveMode;
use crate::combat::{DamageInfo, HealInfo};
use crate::proc::ProcHit;
use crate::state::{AuraId, EntityId, PowerKind, SpellId};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum CombatEvent {
    Damage(DamageInfo),
    Heal(HealInfo),
    /// Damage or an aura was nullified by an immunity.
    Immune {
        attacker: Option<EntityId>,
        victim: EntityId,
        spell: Option<SpellId>,
    },
    /// A shield consumed part of a hit.
    Absorb {
        victim: EntityId,
        aura: AuraId,
        spell: SpellId,
        amount: u32,
    },
    /// Part of a hit was redirected to the caster of a split-damage aura.
    Split {
        victim: EntityId,
        receiver: EntityId,
        spell: SpellId,
        amount: u32,
    },
    Energize {
        caster: EntityId,
        target: EntityId,
        power: PowerKind,
        amount: i64,
    },
    AuraApplied {
        aura: AuraId,
        spell: SpellId,
        caster: EntityId,
        target: EntityId,
        stacks: u8,
        duration_ms: Option<u32>,
    },
    AuraRefreshed {
        aura: AuraId,
        spell: SpellId,
        target: EntityId,
        stacks: u8,
        duration_ms: Option<u32>,
    },
    AuraRemoved {
        aura: AuraId,
        spell: SpellId,
        target: EntityId,
        mode: RemoveMode,
    },
    ProcTriggered {
        aura: AuraId,
        spell: SpellId,
        holder: EntityId,
        target: EntityId,
        hit: ProcHit,
    },
    /// A proc dispatch was refused because the chain grew too deep.
    ProcChainLimit {
        actor: EntityId,
        depth: u32,
    },
    Died {
        victim: EntityId,
        killer: Option<EntityId>,
    },
}
