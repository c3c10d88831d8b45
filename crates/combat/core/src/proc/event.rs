use super::flags::{ProcFlags, ProcHit, ProcSpellPhase, ProcSpellType};
use crate::combat::{DamageInfo, HealInfo, SpellContext};
use crate::spell::SpellSchoolMask;
use crate::state::{AuraId, EntityId};

/// A combat event offered to both participants' auras.
///
/// `actor_flags` are matched against the actor's auras, `target_flags`
/// against the action target's.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcEvent {
    pub actor: EntityId,
    pub action_target: Option<EntityId>,
    pub actor_flags: ProcFlags,
    pub target_flags: ProcFlags,
    pub spell_type: ProcSpellType,
    pub phase: ProcSpellPhase,
    pub hit: ProcHit,
    pub spell: Option<SpellContext>,
    pub school: SpellSchoolMask,
    pub damage: Option<DamageInfo>,
    pub heal: Option<HealInfo>,
}

impl ProcEvent {
    pub fn new(actor: EntityId, action_target: Option<EntityId>) -> Self {
        Self {
            actor,
            action_target,
            actor_flags: ProcFlags::empty(),
            target_flags: ProcFlags::empty(),
            spell_type: ProcSpellType::empty(),
            phase: ProcSpellPhase::HIT,
            hit: ProcHit::empty(),
            spell: None,
            school: SpellSchoolMask::empty(),
            damage: None,
            heal: None,
        }
    }

    pub fn with_flags(mut self, actor_flags: ProcFlags, target_flags: ProcFlags) -> Self {
        self.actor_flags = actor_flags;
        self.target_flags = target_flags;
        self
    }

    pub fn with_hit(mut self, hit: ProcHit) -> Self {
        self.hit = hit;
        self
    }

    pub fn with_spell(mut self, spell: SpellContext, spell_type: ProcSpellType) -> Self {
        self.spell = Some(spell);
        self.spell_type = spell_type;
        self
    }

    pub fn with_phase(mut self, phase: ProcSpellPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_school(mut self, school: SpellSchoolMask) -> Self {
        self.school = school;
        self
    }

    pub fn with_damage(mut self, damage: DamageInfo) -> Self {
        self.school = damage.school;
        self.damage = Some(damage);
        self
    }

    pub fn with_heal(mut self, heal: HealInfo) -> Self {
        self.heal = Some(heal);
        self
    }

    /// View of the event from one side.
    ///
    /// The actor side procs on the action target; the target side procs back
    /// on the actor.
    pub fn side(&self, holder_is_actor: bool) -> Option<ProcEventInfo> {
        let (holder, proc_target, type_mask) = if holder_is_actor {
            (self.actor, self.action_target.unwrap_or(self.actor), self.actor_flags)
        } else {
            (self.action_target?, self.actor, self.target_flags)
        };
        Some(ProcEventInfo {
            actor: self.actor,
            action_target: self.action_target,
            holder,
            proc_target,
            type_mask,
            spell_type: self.spell_type,
            phase: self.phase,
            hit: self.hit,
            spell: self.spell,
            school: self.school,
            damage: self.damage.clone(),
            heal: self.heal.clone(),
        })
    }
}

/// Immutable snapshot of a proc event from one holder's perspective.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcEventInfo {
    pub actor: EntityId,
    pub action_target: Option<EntityId>,
    /// Actor whose auras are being tested.
    pub holder: EntityId,
    /// Receiver of whatever the proc does.
    pub proc_target: EntityId,
    pub type_mask: ProcFlags,
    pub spell_type: ProcSpellType,
    pub phase: ProcSpellPhase,
    pub hit: ProcHit,
    pub spell: Option<SpellContext>,
    pub school: SpellSchoolMask,
    pub damage: Option<DamageInfo>,
    pub heal: Option<HealInfo>,
}

impl ProcEventInfo {
    pub fn damage_amount(&self) -> u32 {
        self.damage.as_ref().map_or(0, |info| info.amount)
    }

    pub fn heal_amount(&self) -> u32 {
        self.heal.as_ref().map_or(0, |info| info.effective)
    }
}

/// What a dispatch did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcReport {
    /// Chain depth of this dispatch.
    pub depth: u32,
    /// The dispatch was refused by the chain limit.
    pub refused: bool,
    /// Auras in the snapshot, actor side first.
    pub eligible: Vec<AuraId>,
    /// Auras that actually fired.
    pub fired: Vec<AuraId>,
}
