use bitflags::bitflags;

bitflags! {
    /// Event kinds that can trigger procs.
    ///
    /// `DONE_*` flags describe the acting side of an event, `TAKEN_*` the
    /// receiving side.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcFlags: u32 {
        const KILLED                          = 0x0000_0001;
        const KILL                            = 0x0000_0002;
        const DONE_MELEE_AUTO_ATTACK          = 0x0000_0004;
        const TAKEN_MELEE_AUTO_ATTACK         = 0x0000_0008;
        const DONE_SPELL_MELEE_DMG_CLASS      = 0x0000_0010;
        const TAKEN_SPELL_MELEE_DMG_CLASS     = 0x0000_0020;
        const DONE_RANGED_AUTO_ATTACK         = 0x0000_0040;
        const TAKEN_RANGED_AUTO_ATTACK        = 0x0000_0080;
        const DONE_SPELL_RANGED_DMG_CLASS     = 0x0000_0100;
        const TAKEN_SPELL_RANGED_DMG_CLASS    = 0x0000_0200;
        const DONE_SPELL_NONE_DMG_CLASS_POS   = 0x0000_0400;
        const TAKEN_SPELL_NONE_DMG_CLASS_POS  = 0x0000_0800;
        const DONE_SPELL_NONE_DMG_CLASS_NEG   = 0x0000_1000;
        const TAKEN_SPELL_NONE_DMG_CLASS_NEG  = 0x0000_2000;
        const DONE_SPELL_MAGIC_DMG_CLASS_POS  = 0x0000_4000;
        const TAKEN_SPELL_MAGIC_DMG_CLASS_POS = 0x0000_8000;
        const DONE_SPELL_MAGIC_DMG_CLASS_NEG  = 0x0001_0000;
        const TAKEN_SPELL_MAGIC_DMG_CLASS_NEG = 0x0002_0000;
        const DONE_PERIODIC                   = 0x0004_0000;
        const TAKEN_PERIODIC                  = 0x0008_0000;
        const TAKEN_DAMAGE                    = 0x0010_0000;
        const DONE_TRAP_ACTIVATION            = 0x0020_0000;
        const DONE_MAINHAND_ATTACK            = 0x0040_0000;
        const DONE_OFFHAND_ATTACK             = 0x0080_0000;
        const DEATH                           = 0x0100_0000;
    }
}

impl ProcFlags {
    pub const AUTO_ATTACK_MASK: Self = Self::DONE_MELEE_AUTO_ATTACK
        .union(Self::TAKEN_MELEE_AUTO_ATTACK)
        .union(Self::DONE_RANGED_AUTO_ATTACK)
        .union(Self::TAKEN_RANGED_AUTO_ATTACK);

    pub const SPELL_MASK: Self = Self::DONE_SPELL_MELEE_DMG_CLASS
        .union(Self::TAKEN_SPELL_MELEE_DMG_CLASS)
        .union(Self::DONE_SPELL_RANGED_DMG_CLASS)
        .union(Self::TAKEN_SPELL_RANGED_DMG_CLASS)
        .union(Self::DONE_SPELL_NONE_DMG_CLASS_POS)
        .union(Self::TAKEN_SPELL_NONE_DMG_CLASS_POS)
        .union(Self::DONE_SPELL_NONE_DMG_CLASS_NEG)
        .union(Self::TAKEN_SPELL_NONE_DMG_CLASS_NEG)
        .union(Self::DONE_SPELL_MAGIC_DMG_CLASS_POS)
        .union(Self::TAKEN_SPELL_MAGIC_DMG_CLASS_POS)
        .union(Self::DONE_SPELL_MAGIC_DMG_CLASS_NEG)
        .union(Self::TAKEN_SPELL_MAGIC_DMG_CLASS_NEG)
        .union(Self::DONE_PERIODIC)
        .union(Self::TAKEN_PERIODIC)
        .union(Self::DONE_TRAP_ACTIVATION);

    pub const DONE_HIT_MASK: Self = Self::DONE_MELEE_AUTO_ATTACK
        .union(Self::DONE_RANGED_AUTO_ATTACK)
        .union(Self::DONE_SPELL_MELEE_DMG_CLASS)
        .union(Self::DONE_SPELL_RANGED_DMG_CLASS)
        .union(Self::DONE_SPELL_NONE_DMG_CLASS_POS)
        .union(Self::DONE_SPELL_NONE_DMG_CLASS_NEG)
        .union(Self::DONE_SPELL_MAGIC_DMG_CLASS_POS)
        .union(Self::DONE_SPELL_MAGIC_DMG_CLASS_NEG)
        .union(Self::DONE_PERIODIC)
        .union(Self::DONE_MAINHAND_ATTACK)
        .union(Self::DONE_OFFHAND_ATTACK);

    pub const TAKEN_HIT_MASK: Self = Self::TAKEN_MELEE_AUTO_ATTACK
        .union(Self::TAKEN_RANGED_AUTO_ATTACK)
        .union(Self::TAKEN_SPELL_MELEE_DMG_CLASS)
        .union(Self::TAKEN_SPELL_RANGED_DMG_CLASS)
        .union(Self::TAKEN_SPELL_NONE_DMG_CLASS_POS)
        .union(Self::TAKEN_SPELL_NONE_DMG_CLASS_NEG)
        .union(Self::TAKEN_SPELL_MAGIC_DMG_CLASS_POS)
        .union(Self::TAKEN_SPELL_MAGIC_DMG_CLASS_NEG)
        .union(Self::TAKEN_PERIODIC)
        .union(Self::TAKEN_DAMAGE);

    /// Spell events whose phase must match the proc entry.
    pub const REQ_SPELL_PHASE_MASK: Self = Self::SPELL_MASK.intersection(Self::DONE_HIT_MASK);

    /// Events that always pass the filter checks once the type matches.
    pub const ALWAYS_TRIGGER_MASK: Self = Self::KILLED.union(Self::KILL).union(Self::DEATH);
}

bitflags! {
    /// What a spell event did.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcSpellType: u8 {
        const DAMAGE      = 0x1;
        const HEAL        = 0x2;
        const NO_DMG_HEAL = 0x4;
    }
}

bitflags! {
    /// When in a spell's life the event happened.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcSpellPhase: u8 {
        const CAST   = 0x1;
        const HIT    = 0x2;
        const FINISH = 0x4;
    }
}

bitflags! {
    /// Outcome of the hit that caused the event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcHit: u16 {
        const NORMAL      = 0x0001;
        const CRITICAL    = 0x0002;
        const MISS        = 0x0004;
        const FULL_RESIST = 0x0008;
        const DODGE       = 0x0010;
        const PARRY       = 0x0020;
        /// Partial or full block.
        const BLOCK       = 0x0040;
        const EVADE       = 0x0080;
        const IMMUNE      = 0x0100;
        const DEFLECT     = 0x0200;
        /// Partial or full absorb.
        const ABSORB      = 0x0400;
        const REFLECT     = 0x0800;
        const INTERRUPT   = 0x1000;
        const FULL_BLOCK  = 0x2000;
    }
}

bitflags! {
    /// Behavioural switches of a proc entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcAttributes: u8 {
        /// The aura may proc from triggered spells.
        const TRIGGERED_CAN_PROC     = 0x01;
        /// Charges are tracked as stacks: each proc removes one stack.
        const USE_STACKS_FOR_CHARGES = 0x02;
        /// Only procs from spells the aura modified (spell-modifier owner scan).
        const REQ_SPELLMOD           = 0x04;
        const CANT_PROC_FROM_ITEM_CAST = 0x08;
    }
}
