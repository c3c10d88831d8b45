//! Effect slots of a spell definition.
//!
//! A definition carries up to [`CombatConfig::MAX_EFFECTS`](crate::CombatConfig::MAX_EFFECTS)
//! effects. Effects of kind [`SpellEffectKind::ApplyAura`] (or its area variant)
//! become [`AuraEffect`](crate::aura::AuraEffect) slots on the resulting aura;
//! the remaining kinds are executed immediately by the triggered-spell executor.

use strum::{AsRefStr, Display, EnumString, FromRepr};

use super::Mechanic;
use crate::state::SpellId;

/// What a spell effect does when the spell lands.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr, FromRepr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellEffectKind {
    #[default]
    Dummy = 0,
    SchoolDamage = 1,
    Heal = 2,
    Energize = 3,
    TriggerSpell = 4,
    ApplyAura = 5,
    /// Aura owned by the caster that spreads applications to nearby targets.
    ApplyAreaAura = 6,
}

impl SpellEffectKind {
    pub const fn is_aura(self) -> bool {
        matches!(self, Self::ApplyAura | Self::ApplyAreaAura)
    }
}

/// Aura behaviours understood by the engine.
///
/// The meaning of an effect's `misc_value` depends on the aura type and is noted
/// on each variant; unlisted variants ignore it.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    EnumString,
    AsRefStr,
    FromRepr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuraType {
    #[default]
    Dummy = 0,

    // ----- periodic -----
    PeriodicDamage = 1,
    PeriodicHeal = 2,
    /// `misc_value`: [`PowerKind`](crate::state::PowerKind) index.
    PeriodicEnergize = 3,
    PeriodicTriggerSpell = 4,

    // ----- control -----
    ModStun = 10,
    ModRoot = 11,
    ModFear = 12,
    ModSilence = 13,

    // ----- stat modifiers -----
    /// `misc_value`: [`StatKind`](crate::stats::StatKind) index.
    ModStat = 20,
    /// `misc_value`: [`StatKind`](crate::stats::StatKind) index.
    ModStatPct = 21,
    /// `misc_value`: school mask. The physical bit modifies armor.
    ModResistance = 22,

    // ----- damage and healing modifiers -----
    /// `misc_value`: school mask.
    ModDamagePercentTaken = 30,
    /// `misc_value`: school mask.
    ModDamagePercentDone = 31,
    ModHealingPct = 32,
    ModCritDamageTakenPct = 33,

    // ----- absorption -----
    /// `misc_value`: school mask.
    SchoolAbsorb = 40,
    /// `misc_value`: school mask. Mana drained per absorbed point is the
    /// effect's `value_multiplier`.
    ManaShield = 41,
    /// `misc_value`: school mask.
    SplitDamagePct = 42,
    SchoolHealAbsorb = 43,
    /// Death prevention. `misc_value`: school mask, `misc_value_b`: overkill
    /// threshold percent.
    SchoolAbsorbOverkill = 44,

    // ----- immunities -----
    /// `misc_value`: school mask. Immune to spells of the school.
    SchoolImmunity = 50,
    /// `misc_value`: school mask. Immune to damage of the school.
    DamageImmunity = 51,
    /// `misc_value`: [`DispelType`](super::DispelType) index.
    DispelImmunity = 52,
    /// `misc_value`: [`Mechanic`] index.
    MechanicImmunity = 53,
    /// `misc_value`: [`SpellEffectKind`] index.
    EffectImmunity = 54,
    /// `misc_value`: [`AuraType`] index.
    StateImmunity = 55,
    /// `misc_value`: spell id.
    SpellImmunity = 56,

    // ----- procs -----
    ProcTriggerSpell = 60,
    ProcTriggerDamage = 61,

    // ----- attacker-side penetration -----
    /// `misc_value`: school mask. Negative amounts lower the victim's resistance.
    ModTargetResistance = 70,
    ModArmorPenetrationPct = 71,
    /// Lowers armor against the aura's caster only.
    BypassArmorForCaster = 72,
    /// `misc_value`: school mask.
    ModIgnoreTargetResist = 73,
    /// `misc_value`: school mask. Percent of damage that bypasses absorbs.
    ModTargetAbsorbSchool = 74,

    // ----- spell modifiers -----
    /// `misc_value`: [`SpellModOp`] index, `misc_value_b`: family mask of
    /// the affected spells.
    AddFlatModifier = 80,
    /// `misc_value`: [`SpellModOp`] index, `misc_value_b`: family mask of
    /// the affected spells.
    AddPctModifier = 81,
}

impl AuraType {
    pub const fn is_periodic(self) -> bool {
        matches!(
            self,
            Self::PeriodicDamage
                | Self::PeriodicHeal
                | Self::PeriodicEnergize
                | Self::PeriodicTriggerSpell
        )
    }

    pub const fn is_spell_mod(self) -> bool {
        matches!(self, Self::AddFlatModifier | Self::AddPctModifier)
    }
}

/// Which property of an affected spell a spell modifier changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, FromRepr)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum SpellModOp {
    Damage = 0,
    Duration = 1,
    ProcChance = 2,
}

/// Who an immediate effect lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectTarget {
    #[default]
    Target,
    Caster,
}

/// One effect slot of a spell definition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellEffectInfo {
    pub kind: SpellEffectKind,
    /// Aura behaviour, for [`SpellEffectKind::ApplyAura`] slots.
    pub aura: AuraType,
    pub base_points: i32,
    pub misc_value: i32,
    pub misc_value_b: i32,
    /// Period of periodic auras, in milliseconds.
    pub amplitude_ms: u32,
    pub trigger_spell: Option<SpellId>,
    pub mechanic: Mechanic,
    pub target: EffectTarget,
    /// Refreshing the aura adds base points instead of replacing them.
    pub points_stack: bool,
    pub value_multiplier: f32,
}

impl Default for SpellEffectInfo {
    fn default() -> Self {
        Self {
            kind: SpellEffectKind::Dummy,
            aura: AuraType::Dummy,
            base_points: 0,
            misc_value: 0,
            misc_value_b: 0,
            amplitude_ms: 0,
            trigger_spell: None,
            mechanic: Mechanic::None,
            target: EffectTarget::Target,
            points_stack: false,
            value_multiplier: 1.0,
        }
    }
}

impl SpellEffectInfo {
    pub fn aura(aura: AuraType, base_points: i32) -> Self {
        Self {
            kind: SpellEffectKind::ApplyAura,
            aura,
            base_points,
            ..Self::default()
        }
    }

    pub fn area_aura(aura: AuraType, base_points: i32) -> Self {
        Self {
            kind: SpellEffectKind::ApplyAreaAura,
            ..Self::aura(aura, base_points)
        }
    }

    pub fn immediate(kind: SpellEffectKind, base_points: i32) -> Self {
        Self {
            kind,
            base_points,
            ..Self::default()
        }
    }

    pub fn with_misc(mut self, misc_value: i32) -> Self {
        self.misc_value = misc_value;
        self
    }

    pub fn with_misc_b(mut self, misc_value_b: i32) -> Self {
        self.misc_value_b = misc_value_b;
        self
    }

    pub fn with_amplitude(mut self, amplitude_ms: u32) -> Self {
        self.amplitude_ms = amplitude_ms;
        self
    }

    pub fn with_trigger(mut self, spell: SpellId) -> Self {
        self.trigger_spell = Some(spell);
        self
    }

    pub fn with_target(mut self, target: EffectTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_mechanic(mut self, mechanic: Mechanic) -> Self {
        self.mechanic = mechanic;
        self
    }

    pub fn with_value_multiplier(mut self, multiplier: f32) -> Self {
        self.value_multiplier = multiplier;
        self
    }

    pub fn stacking_points(mut self) -> Self {
        self.points_stack = true;
        self
    }

    pub fn is_aura(&self) -> bool {
        self.kind.is_aura()
    }
}
