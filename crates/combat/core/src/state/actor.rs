//! Actor record and the capability traits the engine depends on.
//!
//! The engine never branches on a concrete actor kind beyond what the
//! [`PlayerControlled`], [`ResourcePool`] and [`CombatRatingSource`] traits
//! expose; content layers can wrap or replace [`Actor`] as long as those
//! answers stay consistent.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

use super::{AuraId, EntityId, ResourceMeter, SpellId};
use crate::aura::AuraApplication;
use crate::diminishing::DiminishingTable;
use crate::immunity::ImmunityTable;
use crate::spell::{AuraInterruptFlags, SpellSchool, SpellSchoolMask};
use crate::stats::{ModifierTable, StatKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActorKind {
    Player,
    #[default]
    Creature,
}

/// Secondary resource pools.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumCount, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PowerKind {
    Mana = 0,
    Rage = 1,
    Energy = 2,
}

impl PowerKind {
    pub fn from_misc(misc: i32) -> Option<Self> {
        match misc {
            0 => Some(Self::Mana),
            1 => Some(Self::Rage),
            2 => Some(Self::Energy),
            _ => None,
        }
    }
}

/// Life-cycle state of an actor.
///
/// `Alive → JustDied → Corpse → Dead`, with `Alive` reachable again through
/// resurrection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeathState {
    #[default]
    Alive,
    JustDied,
    Corpse,
    Dead,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ActorFlags: u8 {
        /// Returning to its spawn point; ignores all damage and healing.
        const EVADING           = 1 << 0;
        const IN_COMBAT         = 1 << 1;
        /// Teardown started; no new state may be attached.
        const CLEANUP           = 1 << 2;
        /// A player or something a player controls.
        const PLAYER_CONTROLLED = 1 << 3;
    }
}

/// Loss-of-control states maintained by aura handlers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumCount, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ControlKind {
    Stunned = 0,
    Rooted = 1,
    Feared = 2,
    Silenced = 3,
}

/// Base numbers supplied by the stat layer. Aura modifiers are applied on top.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BaseStats {
    pub max_health: u32,
    pub max_mana: u32,
    /// Indexed by [`SpellSchool::index`]; the physical slot is armor.
    pub resistances: [i32; SpellSchool::COUNT],
    pub block_value: u32,
    pub attack_time_ms: u32,
}

impl Default for BaseStats {
    fn default() -> Self {
        Self {
            max_health: 1,
            max_mana: 0,
            resistances: [0; SpellSchool::COUNT],
            block_value: 0,
            attack_time_ms: 2_000,
        }
    }
}

/// Channelled cast currently held by an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelState {
    pub spell: SpellId,
    pub interrupt: AuraInterruptFlags,
}

// ===== capability traits =====

pub trait PlayerControlled {
    fn is_player_controlled(&self) -> bool;

    /// Actor whose commands this one follows (pet owner, charmer).
    fn controller(&self) -> Option<EntityId>;
}

pub trait ResourcePool {
    fn power(&self, kind: PowerKind) -> ResourceMeter;

    /// Applies `delta` and returns the change actually made.
    fn modify_power(&mut self, kind: PowerKind, delta: i64) -> i64;
}

pub trait CombatRatingSource {
    fn level(&self) -> u8;

    /// Percent of the victim's armor ignored, from ratings (0-100).
    fn armor_penetration_pct(&self) -> f32;

    /// Weapon swing time used by procs-per-minute.
    fn attack_time_ms(&self) -> u32;
}

/// Combat-relevant state of one simulated entity.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: EntityId,
    pub kind: ActorKind,
    pub level: u8,
    pub controller: Option<EntityId>,
    pub health: ResourceMeter,
    pub base: BaseStats,
    pub modifiers: ModifierTable,
    pub death_state: DeathState,
    pub flags: ActorFlags,
    pub armor_penetration_rating_pct: f32,

    powers: [ResourceMeter; PowerKind::COUNT],
    control: [u16; ControlKind::COUNT],

    pub immunities: ImmunityTable,
    pub diminishing: DiminishingTable,

    /// Auras this actor created and must dispose of.
    pub(crate) owned_auras: BTreeSet<AuraId>,
    /// Aura applications currently affecting this actor, oldest aura first.
    pub(crate) applied: BTreeMap<AuraId, AuraApplication>,
    /// Single-target auras cast by this actor, in creation order.
    pub(crate) single_target_auras: Vec<AuraId>,
    pub(crate) interrupt_mask: AuraInterruptFlags,
    pub(crate) channel: Option<ChannelState>,

    /// Depth of the proc dispatch currently firing this actor's auras.
    pub proc_chain_length: u32,
    /// While positive, proc scans over this actor's auras yield nothing.
    pub cannot_proc: u32,
}

impl Actor {
    pub fn new(id: EntityId, kind: ActorKind, level: u8) -> Self {
        let base = BaseStats::default();
        let mut flags = ActorFlags::empty();
        flags.set(ActorFlags::PLAYER_CONTROLLED, kind == ActorKind::Player);
        Self {
            id,
            kind,
            level,
            controller: None,
            health: ResourceMeter::full(base.max_health),
            base,
            modifiers: ModifierTable::new(),
            death_state: DeathState::Alive,
            flags,
            armor_penetration_rating_pct: 0.0,
            powers: [ResourceMeter::default(); PowerKind::COUNT],
            control: [0; ControlKind::COUNT],
            immunities: ImmunityTable::new(),
            diminishing: DiminishingTable::new(),
            owned_auras: BTreeSet::new(),
            applied: BTreeMap::new(),
            single_target_auras: Vec::new(),
            interrupt_mask: AuraInterruptFlags::empty(),
            channel: None,
            proc_chain_length: 0,
            cannot_proc: 0,
        }
    }

    pub fn player(id: EntityId, level: u8) -> Self {
        Self::new(id, ActorKind::Player, level)
    }

    pub fn creature(id: EntityId, level: u8) -> Self {
        Self::new(id, ActorKind::Creature, level)
    }

    // ----- builders -----

    pub fn with_health(mut self, max_health: u32) -> Self {
        self.base.max_health = max_health;
        self.health = ResourceMeter::full(max_health);
        self
    }

    pub fn with_armor(self, armor: i32) -> Self {
        self.with_resistance(SpellSchool::Physical, armor)
    }

    pub fn with_resistance(mut self, school: SpellSchool, value: i32) -> Self {
        self.base.resistances[school.index()] = value;
        self
    }

    pub fn with_mana(mut self, max_mana: u32) -> Self {
        self.base.max_mana = max_mana;
        self.powers[PowerKind::Mana as usize] = ResourceMeter::full(max_mana);
        self
    }

    pub fn with_power(mut self, kind: PowerKind, meter: ResourceMeter) -> Self {
        self.powers[kind as usize] = meter;
        self
    }

    pub fn with_block_value(mut self, block_value: u32) -> Self {
        self.base.block_value = block_value;
        self
    }

    pub fn with_attack_time(mut self, attack_time_ms: u32) -> Self {
        self.base.attack_time_ms = attack_time_ms;
        self
    }

    pub fn with_armor_penetration(mut self, pct: f32) -> Self {
        self.armor_penetration_rating_pct = pct;
        self
    }

    /// Makes this actor follow `owner`'s commands (pet, summon).
    pub fn owned_by(mut self, owner: EntityId) -> Self {
        self.controller = Some(owner);
        self
    }

    // ----- life cycle -----

    pub fn is_alive(&self) -> bool {
        self.death_state == DeathState::Alive
    }

    pub fn is_evading(&self) -> bool {
        self.flags.contains(ActorFlags::EVADING)
    }

    pub fn in_cleanup(&self) -> bool {
        self.flags.contains(ActorFlags::CLEANUP)
    }

    pub fn set_evading(&mut self, evading: bool) {
        self.flags.set(ActorFlags::EVADING, evading);
    }

    // ----- derived stats -----

    pub fn armor(&self) -> i32 {
        self.resistance(SpellSchool::Physical)
    }

    pub fn resistance(&self, school: SpellSchool) -> i32 {
        self.modifiers
            .apply(StatKind::Resistance(school), self.base.resistances[school.index()])
    }

    /// Lowest resistance among the schools of `mask`.
    pub fn resistance_for(&self, mask: SpellSchoolMask) -> i32 {
        mask.schools()
            .map(|school| self.resistance(school))
            .min()
            .unwrap_or(0)
    }

    pub fn block_value(&self) -> u32 {
        self.modifiers
            .apply(StatKind::BlockValue, self.base.block_value as i32)
            .max(0) as u32
    }

    /// Recomputes pool maxima after a stat modifier changed, clamping current values.
    pub fn refresh_derived(&mut self) {
        let max_health = self
            .modifiers
            .apply(StatKind::MaxHealth, self.base.max_health as i32)
            .max(1) as u32;
        self.health = ResourceMeter::new(self.health.current, max_health);

        let max_mana = self
            .modifiers
            .apply(StatKind::MaxMana, self.base.max_mana as i32)
            .max(0) as u32;
        let mana = &mut self.powers[PowerKind::Mana as usize];
        *mana = ResourceMeter::new(mana.current, max_mana);
    }

    // ----- control -----

    pub fn has_control(&self, kind: ControlKind) -> bool {
        self.control[kind as usize] > 0
    }

    pub(crate) fn adjust_control(&mut self, kind: ControlKind, apply: bool) {
        let counter = &mut self.control[kind as usize];
        *counter = if apply {
            counter.saturating_add(1)
        } else {
            counter.saturating_sub(1)
        };
    }

    // ----- aura bookkeeping (read-only views) -----

    pub fn applications(&self) -> impl Iterator<Item = &AuraApplication> {
        self.applied.values()
    }

    pub fn application(&self, aura: AuraId) -> Option<&AuraApplication> {
        self.applied.get(&aura)
    }

    /// Single-target auras this actor cast, oldest first.
    pub fn single_target_auras(&self) -> &[AuraId] {
        &self.single_target_auras
    }

    pub fn owned_auras(&self) -> impl Iterator<Item = AuraId> + '_ {
        self.owned_auras.iter().copied()
    }

    /// Cached union of interrupt flags of applied auras and the channel.
    pub fn interrupt_mask(&self) -> AuraInterruptFlags {
        self.interrupt_mask
    }

    pub fn channel(&self) -> Option<ChannelState> {
        self.channel
    }
}

impl PlayerControlled for Actor {
    fn is_player_controlled(&self) -> bool {
        self.flags.contains(ActorFlags::PLAYER_CONTROLLED)
    }

    fn controller(&self) -> Option<EntityId> {
        self.controller
    }
}

impl ResourcePool for Actor {
    fn power(&self, kind: PowerKind) -> ResourceMeter {
        self.powers[kind as usize]
    }

    fn modify_power(&mut self, kind: PowerKind, delta: i64) -> i64 {
        self.powers[kind as usize].modify(delta)
    }
}

impl CombatRatingSource for Actor {
    fn level(&self) -> u8 {
        self.level
    }

    fn armor_penetration_pct(&self) -> f32 {
        self.armor_penetration_rating_pct.clamp(0.0, 100.0)
    }

    fn attack_time_ms(&self) -> u32 {
        self.base.attack_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Bonus, ModifierSource};

    #[test]
    fn derived_pools_follow_modifiers() {
        let mut actor = Actor::player(EntityId(1), 80).with_health(1_000).with_mana(500);
        let source = ModifierSource::new(AuraId(1), 0);
        actor.modifiers.insert(StatKind::MaxHealth, source, Bonus::Flat(200));
        actor.refresh_derived();
        assert_eq!(actor.health.maximum, 1_200);
        // Current health is not raised by a max health buff
        assert_eq!(actor.health.current, 1_000);

        actor.modifiers.remove(StatKind::MaxHealth, source);
        actor.health.modify(200);
        actor.refresh_derived();
        assert_eq!(actor.health, ResourceMeter::new(1_000, 1_000));
    }

    #[test]
    fn mixed_school_resistance_uses_weakest_school() {
        let actor = Actor::creature(EntityId(2), 80)
            .with_resistance(SpellSchool::Fire, 100)
            .with_resistance(SpellSchool::Frost, 40);
        assert_eq!(actor.resistance_for(SpellSchoolMask::FIRE | SpellSchoolMask::FROST), 40);
        assert_eq!(actor.resistance_for(SpellSchoolMask::FIRE), 100);
    }

    #[test]
    fn resource_pool_reports_applied_change() {
        let mut actor = Actor::player(EntityId(3), 80).with_mana(100);
        assert_eq!(actor.modify_power(PowerKind::Mana, -150), -100);
        assert_eq!(actor.power(PowerKind::Mana).current, 0);
        assert!(actor.is_player_controlled());
    }
}
