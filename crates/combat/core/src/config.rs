/// Armor mitigation tuning.
///
/// `reduction = armor / (armor + (level_factor * L' + constant) / scale)`,
/// where `L' = L + high_level_factor * (L - high_level_threshold)` above the
/// threshold, clamped to `[0, max_reduction]`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArmorTuning {
    pub level_factor: f32,
    pub constant: f32,
    pub scale: f32,
    pub high_level_threshold: u8,
    pub high_level_factor: f32,
    pub max_reduction: f32,
}

impl Default for ArmorTuning {
    fn default() -> Self {
        Self {
            level_factor: 8.5,
            constant: 40.0,
            scale: 0.1,
            high_level_threshold: 59,
            high_level_factor: 4.5,
            max_reduction: 0.75,
        }
    }
}

/// Magic resistance tuning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResistanceTuning {
    /// Resistance constant per victim level.
    pub constant_per_level: f32,
    /// Victim level that uses `boss_constant` instead.
    pub boss_level: u8,
    pub boss_constant: f32,
    /// Bonus resistance per level the victim has over the attacker.
    pub per_level_difference: f32,
}

impl Default for ResistanceTuning {
    fn default() -> Self {
        Self {
            constant_per_level: 5.0,
            boss_level: 83,
            boss_constant: 510.0,
            per_level_difference: 5.0,
        }
    }
}

/// Critical strike multipliers, in percent of the pre-crit amount.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CritTuning {
    pub melee_pct: u32,
    pub spell_pct: u32,
}

impl Default for CritTuning {
    fn default() -> Self {
        Self {
            melee_pct: 200,
            spell_pct: 150,
        }
    }
}

/// Diminishing-returns window and duration curves.
///
/// Curves are percentages indexed by `level - 1`; the curve length is the
/// group's maximum level.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DiminishingTuning {
    /// Quiet period after the last aura of a group expires before the level resets.
    pub reset_ms: u64,
    pub default_curve: Vec<f32>,
    pub taunt_curve: Vec<f32>,
    pub knockback_curve: Vec<f32>,
}

impl Default for DiminishingTuning {
    fn default() -> Self {
        Self {
            reset_ms: 18_000,
            default_curve: vec![100.0, 50.0, 25.0, 0.0],
            taunt_curve: vec![100.0, 65.0, 42.25, 27.4625, 0.0],
            knockback_curve: vec![100.0, 50.0],
        }
    }
}

/// Combat tuning and runtime-adjustable limits.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatConfig {
    pub armor: ArmorTuning,
    pub resistance: ResistanceTuning,
    pub crit: CritTuning,
    pub diminishing: DiminishingTuning,
    /// Deepest nested proc dispatch allowed.
    pub max_proc_chain: u32,
    /// Share of effective healing forwarded as threat.
    pub heal_threat_factor: f32,
    /// How often area auras re-select their targets, in milliseconds.
    pub area_refresh_ms: u64,
}

impl CombatConfig {
    // ===== compile-time constants used as type parameters =====
    /// Effect slots per spell definition and per aura.
    pub const MAX_EFFECTS: usize = 3;
    /// Highest stack count any aura may reach.
    pub const MAX_STACK_CAP: u8 = u8::MAX;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_PROC_CHAIN: u32 = 10;
    pub const DEFAULT_HEAL_THREAT_FACTOR: f32 = 0.5;
    pub const DEFAULT_AREA_REFRESH_MS: u64 = 1_000;

    pub fn new() -> Self {
        Self {
            armor: ArmorTuning::default(),
            resistance: ResistanceTuning::default(),
            crit: CritTuning::default(),
            diminishing: DiminishingTuning::default(),
            max_proc_chain: Self::DEFAULT_MAX_PROC_CHAIN,
            heal_threat_factor: Self::DEFAULT_HEAL_THREAT_FACTOR,
            area_refresh_ms: Self::DEFAULT_AREA_REFRESH_MS,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}
