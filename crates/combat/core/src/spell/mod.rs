//! Static spell definitions.
//!
//! Definitions are content: the engine never mutates them and only reads them
//! through [`SpellOracle`](crate::env::SpellOracle). Everything an aura needs to
//! decide stacking, immunity, diminishing returns and proc eligibility lives on
//! [`SpellInfo`].

mod effect;
mod group;
mod school;

pub use effect::{AuraType, EffectTarget, SpellEffectInfo, SpellEffectKind, SpellModOp};
pub use group::{SpellGroupId, SpellGroupStackRule};
pub use school::{SpellSchool, SpellSchoolMask};

use arrayvec::ArrayVec;
use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumString, FromRepr};

use crate::config::CombatConfig;
use crate::diminishing::DiminishingRule;
use crate::proc::ProcEntry;
use crate::state::SpellId;

bitflags! {
    /// Behavioural switches of a spell definition.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SpellAttributes: u32 {
        /// Always-on aura; survives death and may stack with itself.
        const PASSIVE                     = 1 << 0;
        /// Not removed when the owner dies.
        const DEATH_PERSISTENT            = 1 << 1;
        /// Resisted entirely or not at all; no level-based partial resist.
        const BINARY                      = 1 << 2;
        /// Physical and magic: resisted amount is capped by armor reduction.
        const NORMAL_WITH_MAGIC           = 1 << 3;
        const IGNORE_RESISTANCES          = 1 << 4;
        const IGNORE_ARMOR                = 1 << 5;
        /// Auras of this spell may proc from triggered spells.
        const CAN_PROC_FROM_PROCS         = 1 << 6;
        /// Effects of this spell never cause procs.
        const DISABLE_PROC                = 1 << 7;
        /// Immunities granted by this spell purge already-applied matching auras.
        const IMMUNITY_PURGES_EFFECT      = 1 << 8;
        /// Lands even on targets immune to its school.
        const UNAFFECTED_BY_SCHOOL_IMMUNE = 1 << 9;
        /// When triggered, this spell may still cause procs.
        const TRIGGERED_CAN_TRIGGER_PROC  = 1 << 10;
        /// Instances from different casters stack.
        const STACK_FOR_DIFF_CASTERS      = 1 << 11;
        const CHANNELED                   = 1 << 12;
        /// Procs from this aura suppress nested proc scans on its owner.
        const SUPPRESS_NESTED_PROCS       = 1 << 13;
        /// Refreshing keeps the periodic timer running.
        const DONT_RESET_PERIODIC_TIMER   = 1 << 14;
    }
}

bitflags! {
    /// Events that cancel an aura (or a channel) on its target.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct AuraInterruptFlags: u32 {
        const HIT_BY_SPELL  = 1 << 0;
        /// Any damage, including periodic.
        const TAKE_DAMAGE   = 1 << 1;
        const CAST          = 1 << 2;
        const MOVE          = 1 << 3;
        const TURNING       = 1 << 4;
        const MELEE_ATTACK  = 1 << 5;
        const SPELL_ATTACK  = 1 << 6;
        /// Direct (non-periodic) damage only.
        const DIRECT_DAMAGE = 1 << 7;
        const ENTER_COMBAT  = 1 << 8;
    }
}

bitflags! {
    /// How an in-progress cast reacts to the caster taking damage.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct CastInterruptFlags: u8 {
        const MOVEMENT = 1 << 0;
        /// Damage delays the cast.
        const PUSHBACK = 1 << 1;
        /// Damage cancels the cast.
        const DAMAGE_CANCELS = 1 << 2;
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr, FromRepr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispelType {
    #[default]
    None = 0,
    Magic = 1,
    Curse = 2,
    Disease = 3,
    Poison = 4,
    Stealth = 5,
    Invisibility = 6,
    Enrage = 7,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr, FromRepr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mechanic {
    #[default]
    None = 0,
    Charm = 1,
    Disoriented = 2,
    Disarm = 3,
    Fear = 4,
    Root = 5,
    Silence = 6,
    Sleep = 7,
    Snare = 8,
    Stun = 9,
    Freeze = 10,
    Knockout = 11,
    Bleed = 12,
    Polymorph = 13,
    Banish = 14,
    Shield = 15,
    Horror = 16,
    Interrupt = 17,
    Daze = 18,
    Sapped = 19,
}

/// Defense category a spell is resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageClass {
    #[default]
    None,
    Magic,
    Melee,
    Ranged,
}

/// What happens to the remaining duration when an aura is refreshed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefreshPolicy {
    /// Duration restarts at the (new) maximum.
    #[default]
    Reset,
    /// New maximum is added to what remains.
    Extend,
    /// Restart, carrying over up to 30% of the new maximum from what remains.
    Pandemic,
    /// Duration is left untouched.
    Keep,
}

impl RefreshPolicy {
    /// Remaining duration after a refresh, `None` meaning permanent.
    pub fn refreshed(self, remaining: Option<u32>, new_max: Option<u32>) -> Option<u32> {
        match (self, remaining, new_max) {
            (_, _, None) => None,
            (Self::Reset, _, Some(max)) | (_, None, Some(max)) => Some(max),
            (Self::Extend, Some(left), Some(max)) => Some(left.saturating_add(max)),
            (Self::Pandemic, Some(left), Some(max)) => Some(max + left.min(max * 3 / 10)),
            (Self::Keep, Some(left), Some(_)) => Some(left),
        }
    }
}

/// Limits how many live instances of a single-target aura one caster may keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingleTargetRule {
    /// Spells sharing a group count against the same cap.
    pub group: u32,
    pub cap: u8,
}

/// Complete definition of a spell.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellInfo {
    pub id: SpellId,
    pub name: String,
    pub school: SpellSchoolMask,
    pub damage_class: DamageClass,
    pub dispel: DispelType,
    pub mechanic: Mechanic,
    pub attributes: SpellAttributes,
    /// Beneficial spell (buff or heal).
    pub positive: bool,

    /// Spell family used by proc and spell-modifier filters. Zero matches nothing specific.
    pub family: u32,
    pub family_mask: u64,
    /// First rank of this spell's rank chain, `None` when it is its own chain.
    pub first_rank: Option<SpellId>,
    /// Higher priority wins no-stack conflicts.
    pub stack_priority: i32,
    pub groups: Vec<SpellGroupId>,

    /// Base duration in milliseconds, `None` for permanent auras.
    pub duration_ms: Option<u32>,
    /// Stack cap. Zero means the aura does not stack.
    pub max_stacks: u8,
    /// Proc charges granted on application, zero when charges are unused.
    pub proc_charges: u8,
    pub refresh: RefreshPolicy,
    pub diminishing: Option<DiminishingRule>,
    pub single_target: Option<SingleTargetRule>,

    pub aura_interrupt: AuraInterruptFlags,
    pub channel_interrupt: AuraInterruptFlags,
    pub cast_interrupt: CastInterruptFlags,

    /// Lower values absorb first.
    pub absorb_priority: i32,
    pub proc: Option<ProcEntry>,
    pub effects: ArrayVec<SpellEffectInfo, { CombatConfig::MAX_EFFECTS }>,
}

impl SpellInfo {
    pub fn new(id: SpellId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            school: SpellSchoolMask::NORMAL,
            ..Self::default()
        }
    }

    pub fn has_attribute(&self, attribute: SpellAttributes) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn is_passive(&self) -> bool {
        self.has_attribute(SpellAttributes::PASSIVE)
    }

    pub fn is_death_persistent(&self) -> bool {
        self.has_attribute(SpellAttributes::DEATH_PERSISTENT)
    }

    /// Passive auras may hold several instances of the same key.
    pub fn is_multi_slot(&self) -> bool {
        self.is_passive()
    }

    pub fn effect(&self, slot: u8) -> Option<&SpellEffectInfo> {
        self.effects.get(usize::from(slot))
    }

    /// Bitmask of effect slots that create aura effects.
    pub fn aura_effect_mask(&self) -> u8 {
        self.effects
            .iter()
            .enumerate()
            .filter(|(_, effect)| effect.is_aura())
            .fold(0, |mask, (slot, _)| mask | (1 << slot))
    }

    pub fn is_area_aura(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.kind == SpellEffectKind::ApplyAreaAura)
    }

    pub fn has_aura_type(&self, aura: AuraType) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.is_aura() && effect.aura == aura)
    }

    pub fn has_periodic_effect(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.is_aura() && effect.aura.is_periodic())
    }

    pub fn first_rank_id(&self) -> SpellId {
        self.first_rank.unwrap_or(self.id)
    }

    pub fn is_rank_of(&self, other: &SpellInfo) -> bool {
        self.first_rank_id() == other.first_rank_id()
    }

    /// Family filter used by proc entries and spell modifiers.
    ///
    /// A zero family matches every spell; otherwise the family must match and
    /// a non-zero mask must share at least one bit.
    pub fn is_affected(&self, family: u32, family_mask: u64) -> bool {
        if family == 0 {
            return true;
        }
        if family != self.family {
            return false;
        }
        family_mask == 0 || family_mask & self.family_mask != 0
    }

    // Builder helpers used by fixtures and tools.

    pub fn with_school(mut self, school: SpellSchoolMask) -> Self {
        self.school = school;
        self
    }

    pub fn with_attributes(mut self, attributes: SpellAttributes) -> Self {
        self.attributes |= attributes;
        self
    }

    pub fn with_duration(mut self, duration_ms: u32) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_max_stacks(mut self, max_stacks: u8) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    pub fn with_effect(mut self, effect: SpellEffectInfo) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_proc(mut self, proc: ProcEntry) -> Self {
        self.proc = Some(proc);
        self
    }

    pub fn with_charges(mut self, charges: u8) -> Self {
        self.proc_charges = charges;
        self
    }

    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aura_effect_mask_skips_immediate_effects() {
        let spell = SpellInfo::new(SpellId(1), "mixed")
            .with_effect(SpellEffectInfo::immediate(SpellEffectKind::SchoolDamage, 50))
            .with_effect(SpellEffectInfo::aura(AuraType::PeriodicDamage, 10))
            .with_effect(SpellEffectInfo::area_aura(AuraType::ModStat, 5));
        // Slots 1 and 2 create aura effects
        assert_eq!(spell.aura_effect_mask(), 0b110);
        assert!(spell.is_area_aura());
    }

    #[test]
    fn refresh_policies() {
        // 4s left on a 10s aura
        let left = Some(4_000);
        let max = Some(10_000);
        assert_eq!(RefreshPolicy::Reset.refreshed(left, max), Some(10_000));
        assert_eq!(RefreshPolicy::Extend.refreshed(left, max), Some(14_000));
        // Pandemic carries at most 3s (30% of 10s)
        assert_eq!(RefreshPolicy::Pandemic.refreshed(left, max), Some(13_000));
        assert_eq!(RefreshPolicy::Keep.refreshed(left, max), Some(4_000));
        assert_eq!(RefreshPolicy::Reset.refreshed(left, None), None);
    }

    #[test]
    fn family_filter() {
        let mut spell = SpellInfo::new(SpellId(2), "bolt");
        spell.family = 3;
        spell.family_mask = 0b0100;
        assert!(spell.is_affected(0, 0));
        assert!(spell.is_affected(3, 0));
        assert!(spell.is_affected(3, 0b0110));
        assert!(!spell.is_affected(3, 0b0001));
        assert!(!spell.is_affected(4, 0));
    }
}
