use super::flags::{ProcAttributes, ProcFlags, ProcHit, ProcSpellPhase, ProcSpellType};
use crate::spell::SpellSchoolMask;

/// Proc conditions of an aura definition.
///
/// Empty masks mean "unfiltered": an empty `school` matches every school, an
/// empty `spell_type` matches every spell type, an empty `phase` defaults to
/// [`ProcSpellPhase::HIT`] and an empty `hit` uses the per-side default
/// (normal and critical hits, plus absorbs on the acting side).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProcEntry {
    pub school: SpellSchoolMask,
    pub family: u32,
    pub family_mask: u64,
    pub flags: ProcFlags,
    pub spell_type: ProcSpellType,
    pub phase: ProcSpellPhase,
    pub hit: ProcHit,
    pub attributes: ProcAttributes,
    /// Effect slots that never proc, as a bitmask.
    pub disable_effects_mask: u8,
    /// Flat chance in percent.
    pub chance: f32,
    /// Procs per minute; overrides `chance` when positive.
    pub ppm: f32,
    pub cooldown_ms: u32,
}

impl Default for ProcEntry {
    fn default() -> Self {
        Self {
            school: SpellSchoolMask::empty(),
            family: 0,
            family_mask: 0,
            flags: ProcFlags::empty(),
            spell_type: ProcSpellType::empty(),
            phase: ProcSpellPhase::empty(),
            hit: ProcHit::empty(),
            attributes: ProcAttributes::empty(),
            disable_effects_mask: 0,
            chance: 100.0,
            ppm: 0.0,
            cooldown_ms: 0,
        }
    }
}

impl ProcEntry {
    pub fn new(flags: ProcFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    pub fn with_hit(mut self, hit: ProcHit) -> Self {
        self.hit = hit;
        self
    }

    pub fn with_spell_type(mut self, spell_type: ProcSpellType) -> Self {
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

    pub fn with_family(mut self, family: u32, family_mask: u64) -> Self {
        self.family = family;
        self.family_mask = family_mask;
        self
    }

    pub fn with_attributes(mut self, attributes: ProcAttributes) -> Self {
        self.attributes |= attributes;
        self
    }

    pub fn with_chance(mut self, chance: f32) -> Self {
        self.chance = chance;
        self
    }

    pub fn with_ppm(mut self, ppm: f32) -> Self {
        self.ppm = ppm;
        self
    }

    pub fn with_cooldown(mut self, cooldown_ms: u32) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn disabling_effects(mut self, mask: u8) -> Self {
        self.disable_effects_mask = mask;
        self
    }

    pub fn has_attribute(&self, attribute: ProcAttributes) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn effective_spell_type(&self) -> ProcSpellType {
        if self.spell_type.is_empty() {
            ProcSpellType::all()
        } else {
            self.spell_type
        }
    }

    pub fn effective_phase(&self) -> ProcSpellPhase {
        if self.phase.is_empty() {
            ProcSpellPhase::HIT
        } else {
            self.phase
        }
    }

    /// Chance in percent for an actor swinging every `attack_time_ms`.
    pub fn base_chance(&self, attack_time_ms: u32) -> f32 {
        if self.ppm > 0.0 {
            ppm_chance(attack_time_ms, self.ppm)
        } else {
            self.chance
        }
    }
}

/// Converts procs-per-minute into a per-swing chance in percent.
///
/// ```text
/// chance = attack_time_ms × ppm / 600
/// ```
pub fn ppm_chance(attack_time_ms: u32, ppm: f32) -> f32 {
    attack_time_ms as f32 * ppm / 600.0
}
