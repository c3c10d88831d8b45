//! Mutable combat state.
//!
//! [`World`] owns every [`Actor`] and every live aura. Actors hold the
//! per-target halves of the aura model (applications, immunities,
//! diminishing returns); auras hold the shared halves (duration, stacks,
//! effect amounts).
mod actor;
mod common;
mod world;

pub use actor::{
    Actor, ActorFlags, ActorKind, BaseStats, ChannelState, CombatRatingSource, ControlKind,
    DeathState, PlayerControlled, PowerKind, ResourcePool,
};
pub use common::{AuraId, EntityId, GameTime, ItemId, ResourceMeter, SpellId};
pub use world::World;
