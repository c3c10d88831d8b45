//! Deterministic combat resolution and aura effects.
//!
//! `combat-core` owns the rules that decide what happens when one actor hits,
//! heals or buffs another: the aura lifecycle (apply, stack, refresh, tick,
//! remove), per-actor immunity and diminishing-returns tables, the proc
//! engine and the damage/heal pipeline. All mutation flows through
//! [`CombatEngine`]; spell definitions, tuning and randomness are injected
//! through [`CombatEnv`].
//!
//! The engine performs no I/O. Content crates load definitions from disk and
//! serve them through [`SpellOracle`](env::SpellOracle).
pub mod aura;
pub mod combat;
pub mod config;
pub mod diminishing;
pub mod engine;
pub mod env;
pub mod error;
pub mod events;
pub mod immunity;
pub mod proc;
pub mod spell;
pub mod state;
pub mod stats;
pub mod testing;

pub use aura::{
    ApplicationState, ApplyOutcome, Aura, AuraApplication, AuraEffect, AuraRequest, RemoveMode,
};
pub use combat::{
    AttackType, Avoidance, DamageInfo, DamageRequest, HealInfo, HealRequest, HitFlags, SpellContext,
};
pub use config::CombatConfig;
pub use diminishing::{DiminishingGroup, DiminishingRule, DiminishingType};
pub use engine::CombatEngine;
pub use env::{
    AreaTargetSelector, CastControl, CastInfo, CombatEnv, CombatEventSink, CombatScripts,
    MotionOracle, OracleError, PcgRng, RngOracle, SpellOracle, ThreatTracker,
};
pub use error::{AuraRefusal, CombatError, ErrorSeverity, InvariantViolation};
pub use events::CombatEvent;
pub use immunity::{ImmunityCategory, ImmunityTable};
pub use proc::{
    ProcAttributes, ProcEntry, ProcEvent, ProcEventInfo, ProcFlags, ProcHit, ProcReport,
    ProcSpellPhase, ProcSpellType,
};
pub use spell::{
    AuraInterruptFlags, AuraType, CastInterruptFlags, DamageClass, DispelType, EffectTarget,
    Mechanic, RefreshPolicy, SpellAttributes, SpellEffectInfo, SpellEffectKind, SpellGroupId,
    SpellGroupStackRule, SpellInfo, SpellModOp, SpellSchool, SpellSchoolMask,
};
pub use state::{
    Actor, ActorFlags, ActorKind, AuraId, DeathState, EntityId, GameTime, ItemId, PowerKind,
    ResourceMeter, SpellId, World,
};
