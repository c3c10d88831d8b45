//! Damage and heal resolution.
//!
//! [`resolve_damage`] runs one hit through the fixed pipeline:
//!
//! ```text
//! avoidance → immunity → done/taken % → armor → resist → crit/block
//!           → absorb (ignore-absorb carve-out, shields, mana shields, split)
//!           → death prevention → health loss → death → procs
//! ```
//!
//! [`resolve_heal`] mirrors it with heal-absorb shields and an effective
//! (overheal-free) amount.

mod absorb;
mod context;
mod damage;
mod death;
mod heal;
pub mod mitigation;

pub use context::SpellContext;
pub use damage::{deal_damage, resolve_damage};
pub use death::{kill, set_death_state};
pub use heal::{energize, resolve_heal};

use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumString};

use crate::spell::{DamageClass, SpellSchoolMask};
use crate::state::EntityId;

bitflags! {
    /// Outcome bits of one resolved hit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct HitFlags: u16 {
        const CRITICAL    = 1 << 0;
        const MISS        = 1 << 1;
        const DODGE       = 1 << 2;
        const PARRY       = 1 << 3;
        const EVADE       = 1 << 4;
        const BLOCK       = 1 << 5;
        const FULL_BLOCK  = 1 << 6;
        const ABSORB      = 1 << 7;
        const FULL_ABSORB = 1 << 8;
        const RESIST      = 1 << 9;
        const FULL_RESIST = 1 << 10;
        const IMMUNE      = 1 << 11;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AttackType {
    #[default]
    MainHand,
    OffHand,
    Ranged,
}

/// Attack table outcome decided by the caller before resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Avoidance {
    Miss,
    Dodge,
    Parry,
    Evade,
}

impl Avoidance {
    pub const fn hit_flag(self) -> HitFlags {
        match self {
            Self::Miss => HitFlags::MISS,
            Self::Dodge => HitFlags::DODGE,
            Self::Parry => HitFlags::PARRY,
            Self::Evade => HitFlags::EVADE,
        }
    }
}

/// One hit to resolve.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageRequest {
    pub attacker: Option<EntityId>,
    pub victim: EntityId,
    pub amount: u32,
    pub school: SpellSchoolMask,
    pub spell: Option<SpellContext>,
    pub attack_type: AttackType,
    pub damage_class: DamageClass,
    pub crit: bool,
    pub blocked: bool,
    pub avoided: Option<Avoidance>,
    /// Tick of a periodic aura.
    pub periodic: bool,
}

impl DamageRequest {
    /// White melee swing.
    pub fn melee(attacker: EntityId, victim: EntityId, amount: u32) -> Self {
        Self {
            attacker: Some(attacker),
            victim,
            amount,
            school: SpellSchoolMask::NORMAL,
            spell: None,
            attack_type: AttackType::MainHand,
            damage_class: DamageClass::Melee,
            crit: false,
            blocked: false,
            avoided: None,
            periodic: false,
        }
    }

    /// Direct spell damage.
    pub fn spell(
        attacker: Option<EntityId>,
        victim: EntityId,
        amount: u32,
        school: SpellSchoolMask,
        spell: SpellContext,
    ) -> Self {
        Self {
            attacker,
            victim,
            amount,
            school,
            spell: Some(spell),
            attack_type: AttackType::MainHand,
            damage_class: DamageClass::Magic,
            crit: false,
            blocked: false,
            avoided: None,
            periodic: false,
        }
    }

    pub fn with_attack_type(mut self, attack_type: AttackType) -> Self {
        self.attack_type = attack_type;
        self
    }

    pub fn with_damage_class(mut self, damage_class: DamageClass) -> Self {
        self.damage_class = damage_class;
        self
    }

    pub fn critical(mut self) -> Self {
        self.crit = true;
        self
    }

    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }

    pub fn avoided(mut self, avoidance: Avoidance) -> Self {
        self.avoided = Some(avoidance);
        self
    }

    pub fn periodic(mut self) -> Self {
        self.periodic = true;
        self
    }
}

/// Resolved hit, as logged and handed to procs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageInfo {
    pub attacker: Option<EntityId>,
    pub victim: EntityId,
    pub spell: Option<SpellContext>,
    pub school: SpellSchoolMask,
    pub attack_type: AttackType,
    pub damage_class: DamageClass,
    /// Amount after done/taken and critical scaling, before any mitigation.
    pub original: u32,
    /// Health actually lost by the victim, plus overkill.
    pub amount: u32,
    pub absorbed: u32,
    pub resisted: u32,
    pub blocked: u32,
    /// Lethal excess cancelled by death prevention; not part of `absorbed`.
    pub death_prevented: u32,
    pub overkill: u32,
    pub hit: HitFlags,
    pub periodic: bool,
}

impl DamageInfo {
    pub(crate) fn from_request(request: &DamageRequest) -> Self {
        Self {
            attacker: request.attacker,
            victim: request.victim,
            spell: request.spell,
            school: request.school,
            attack_type: request.attack_type,
            damage_class: request.damage_class,
            original: request.amount,
            amount: request.amount,
            absorbed: 0,
            resisted: 0,
            blocked: 0,
            death_prevented: 0,
            overkill: 0,
            hit: HitFlags::empty(),
            periodic: request.periodic,
        }
    }

    /// Result with nothing applied (missing, dead or evading victim).
    pub(crate) fn nothing(request: &DamageRequest) -> Self {
        let mut info = Self::from_request(request);
        info.amount = 0;
        info
    }

    /// Reduces the running amount, never below zero.
    pub(crate) fn reduce(&mut self, by: u32) -> u32 {
        let taken = by.min(self.amount);
        self.amount -= taken;
        taken
    }

    pub fn is_critical(&self) -> bool {
        self.hit.contains(HitFlags::CRITICAL)
    }
}

/// One heal to resolve.
#[derive(Clone, Debug, PartialEq)]
pub struct HealRequest {
    pub healer: Option<EntityId>,
    pub target: EntityId,
    pub amount: u32,
    pub spell: Option<SpellContext>,
    pub crit: bool,
    pub periodic: bool,
}

impl HealRequest {
    pub fn new(healer: Option<EntityId>, target: EntityId, amount: u32) -> Self {
        Self {
            healer,
            target,
            amount,
            spell: None,
            crit: false,
            periodic: false,
        }
    }

    pub fn with_spell(mut self, spell: SpellContext) -> Self {
        self.spell = Some(spell);
        self
    }

    pub fn critical(mut self) -> Self {
        self.crit = true;
        self
    }

    pub fn periodic(mut self) -> Self {
        self.periodic = true;
        self
    }
}

/// Resolved heal.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealInfo {
    pub healer: Option<EntityId>,
    pub target: EntityId,
    pub spell: Option<SpellContext>,
    pub original: u32,
    /// Heal after modifiers and heal absorbs.
    pub amount: u32,
    pub absorbed: u32,
    /// Health actually restored.
    pub effective: u32,
    pub critical: bool,
    pub periodic: bool,
}

impl HealInfo {
    pub fn overheal(&self) -> u32 {
        self.amount - self.effective
    }
}
