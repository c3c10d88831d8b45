//! Aura lifecycle: creation, stacking, effect handlers, ticking and removal.
//!
//! An [`Aura`] is one instance of a timed effect keyed by
//! (spell, caster, cast item). It lives in the [`World`](crate::World) and
//! is owned by one actor. Each actor it currently affects holds an
//! [`AuraApplication`] that walks through
//! `Pending → Applied → Removing → Removed`.
//!
//! Every loop over auras or applications iterates a snapshot of ids and
//! re-validates each element, because effect handlers, procs and scripts may
//! remove arbitrary auras while the loop runs.

pub mod apply;
pub mod effects;
pub mod interrupt;
pub mod query;
pub mod remove;
pub mod stacking;
pub mod tick;

use std::collections::BTreeSet;

use strum::{AsRefStr, Display, EnumString};

use crate::config::CombatConfig;
use crate::diminishing::DiminishingGroup;
use crate::spell::{AuraInterruptFlags, AuraType, Mechanic, SpellEffectInfo};
use crate::state::{AuraId, EntityId, GameTime, ItemId, SpellId};

pub use apply::{AuraRequest, ApplyOutcome};

/// Why an application was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RemoveMode {
    /// Replaced, evicted, left an area or removed by script.
    Default,
    /// An interrupt flag fired.
    Interrupt,
    /// Cancelled by the target.
    Cancel,
    /// Consumed or dispelled by a hostile action (depleted shields).
    EnemySpell,
    Expire,
    Death,
}

/// Per-target state machine of an application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplicationState {
    /// Registered on the target, effects being applied.
    Pending,
    Applied,
    /// Removal started; remaining effect slots are being unwound.
    Removing(RemoveMode),
    Removed(RemoveMode),
}

impl ApplicationState {
    pub fn remove_mode(self) -> Option<RemoveMode> {
        match self {
            Self::Removing(mode) | Self::Removed(mode) => Some(mode),
            Self::Pending | Self::Applied => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Applied)
    }
}

/// Relationship between one aura and one target actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuraApplication {
    pub aura: AuraId,
    pub target: EntityId,
    /// Effect slots active on this target.
    pub effect_mask: u8,
    /// Slots whose apply handler ran and has not been unwound yet.
    pub(crate) applied_mask: u8,
    /// Buff (true) or debuff from the target's perspective.
    pub positive: bool,
    pub state: ApplicationState,
}

impl AuraApplication {
    pub(crate) fn new(aura: AuraId, target: EntityId, effect_mask: u8, positive: bool) -> Self {
        Self {
            aura,
            target,
            effect_mask,
            applied_mask: 0,
            positive,
            state: ApplicationState::Pending,
        }
    }

    pub fn has_effect(&self, slot: u8) -> bool {
        self.effect_mask & (1 << slot) != 0
    }

    pub fn applied_mask(&self) -> u8 {
        self.applied_mask
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// One effect slot of a live aura.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraEffect {
    pub slot: u8,
    pub aura_type: AuraType,
    /// Amount per stack.
    pub base_amount: i32,
    /// Current amount (`base_amount × stacks`, minus consumption for shields).
    pub amount: i32,
    pub misc_value: i32,
    pub misc_value_b: i32,
    pub mechanic: Mechanic,
    pub amplitude_ms: u32,
    pub period_timer_ms: u32,
    pub tick_number: u32,
    pub trigger_spell: Option<SpellId>,
    pub value_multiplier: f32,
    /// Refreshes add to `base_amount` instead of multiplying it by stacks.
    pub points_stack: bool,
}

impl AuraEffect {
    pub(crate) fn from_info(slot: u8, info: &SpellEffectInfo, base_amount: i32) -> Self {
        Self {
            slot,
            aura_type: info.aura,
            base_amount,
            amount: base_amount,
            misc_value: info.misc_value,
            misc_value_b: info.misc_value_b,
            mechanic: info.mechanic,
            amplitude_ms: info.amplitude_ms,
            period_timer_ms: 0,
            tick_number: 0,
            trigger_spell: info.trigger_spell,
            value_multiplier: info.value_multiplier,
            points_stack: info.points_stack,
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.aura_type.is_periodic() && self.amplitude_ms > 0
    }

    pub(crate) fn reset_period(&mut self) {
        self.period_timer_ms = 0;
        self.tick_number = 0;
    }
}

/// One live instance of a timed effect.
#[derive(Clone, Debug, PartialEq)]
pub struct Aura {
    pub id: AuraId,
    pub spell: SpellId,
    pub caster: EntityId,
    pub cast_item: Option<ItemId>,
    pub owner: EntityId,

    /// Remaining duration, `None` for permanent auras.
    pub duration_ms: Option<u32>,
    pub max_duration_ms: Option<u32>,
    pub charges: u8,
    pub stacks: u8,
    pub effects: [Option<AuraEffect>; CombatConfig::MAX_EFFECTS],

    /// Actors holding an application of this aura.
    pub targets: BTreeSet<EntityId>,
    pub(crate) removed: Option<RemoveMode>,

    pub positive: bool,
    pub passive: bool,
    pub area: bool,
    pub single_target: bool,
    pub using_charges: bool,
    pub interrupt_flags: AuraInterruptFlags,
    pub diminishing: Option<DiminishingGroup>,
    pub absorb_priority: i32,
    /// Trigger depth inherited by spells this aura fires periodically.
    pub chain_depth: u32,

    pub proc_cooldown_until: GameTime,
    pub applied_at: GameTime,
    pub(crate) last_area_refresh: GameTime,
}

impl Aura {
    pub fn is_removed(&self) -> bool {
        self.removed.is_some()
    }

    pub fn removed_mode(&self) -> Option<RemoveMode> {
        self.removed
    }

    pub fn effect(&self, slot: u8) -> Option<&AuraEffect> {
        self.effects.get(usize::from(slot)).and_then(Option::as_ref)
    }

    pub(crate) fn effect_mut(&mut self, slot: u8) -> Option<&mut AuraEffect> {
        self.effects.get_mut(usize::from(slot)).and_then(Option::as_mut)
    }

    pub fn effect_mask(&self) -> u8 {
        self.effects
            .iter()
            .enumerate()
            .filter(|(_, effect)| effect.is_some())
            .fold(0, |mask, (slot, _)| mask | (1 << slot))
    }

    pub fn effects(&self) -> impl Iterator<Item = &AuraEffect> {
        self.effects.iter().flatten()
    }

    pub fn has_effect_type(&self, aura_type: AuraType) -> bool {
        self.effects().any(|effect| effect.aura_type == aura_type)
    }

    pub fn has_periodic_effect(&self) -> bool {
        self.effects().any(AuraEffect::is_periodic)
    }

    /// Same (spell, caster, cast item) key.
    pub fn matches_key(&self, spell: SpellId, caster: EntityId, cast_item: Option<ItemId>) -> bool {
        self.spell == spell && self.caster == caster && self.cast_item == cast_item
    }

    /// Recomputes every effect amount as `base_amount × stacks`.
    ///
    /// Effects whose points stack already carry the sum in `base_amount`.
    pub(crate) fn recalculate_amounts(&mut self) {
        let stacks = i32::from(self.stacks.max(1));
        for effect in self.effects.iter_mut().flatten() {
            effect.amount = if effect.points_stack {
                effect.base_amount
            } else {
                effect.base_amount.saturating_mul(stacks)
            };
        }
    }
}
