//! Diminishing returns on repeated crowd control.
//!
//! Each actor tracks, per [`DiminishingGroup`], how many auras of the group are
//! currently applied (`stack`), the current hit level and when the last aura
//! of the group went away. The level rises by one per application, is capped
//! at the group curve's length, and decays back to 1 once the stack has been
//! empty for the configured reset window (18 s by default).
//!
//! Levels are 1-based: level 1 is full duration, the last curve entry is the
//! group's cap (usually immunity).

use std::collections::BTreeMap;

use strum::{AsRefStr, Display, EnumString};

use crate::config::DiminishingTuning;
use crate::state::GameTime;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiminishingGroup {
    Stun,
    Root,
    Fear,
    Incapacitate,
    Silence,
    Disarm,
    Horror,
    Taunt,
    Knockback,
}

/// Which populations a group diminishes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiminishingType {
    /// Player-controlled targets (players, their pets) only.
    #[default]
    Player,
    /// Every target.
    All,
}

/// Diminishing-returns settings of a spell definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiminishingRule {
    pub group: DiminishingGroup,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: DiminishingType,
    /// Hard duration cap applied when a player-controlled source hits a
    /// player-controlled target.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limit_duration_ms: Option<u32>,
}

impl DiminishingRule {
    pub const fn new(group: DiminishingGroup) -> Self {
        Self {
            group,
            kind: DiminishingType::Player,
            limit_duration_ms: None,
        }
    }

    pub const fn all(mut self) -> Self {
        self.kind = DiminishingType::All;
        self
    }

    pub const fn with_limit(mut self, limit_ms: u32) -> Self {
        self.limit_duration_ms = Some(limit_ms);
        self
    }
}

/// Duration curve (percent per level) of a group.
pub fn curve(tuning: &DiminishingTuning, group: DiminishingGroup) -> &[f32] {
    match group {
        DiminishingGroup::Taunt => &tuning.taunt_curve,
        DiminishingGroup::Knockback => &tuning.knockback_curve,
        _ => &tuning.default_curve,
    }
}

/// Highest level the group can reach.
pub fn max_level(tuning: &DiminishingTuning, group: DiminishingGroup) -> u8 {
    curve(tuning, group).len().clamp(1, usize::from(u8::MAX)) as u8
}

/// Scales `duration_ms` by the curve entry for `previous_level`.
///
/// Levels past the end of the curve use its last entry.
pub fn scale_duration(curve: &[f32], previous_level: u8, duration_ms: u32) -> u32 {
    let index = usize::from(previous_level.max(1) - 1);
    let pct = curve
        .get(index)
        .or_else(|| curve.last())
        .copied()
        .unwrap_or(100.0);
    (duration_ms as f32 * pct / 100.0) as u32
}

/// Decay state of one group on one actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiminishingReturn {
    /// Auras of the group currently applied.
    pub stack: u32,
    /// Level the next application will be scaled with; zero when never hit.
    pub hit_count: u8,
    /// When the stack last dropped to zero.
    pub hit_time: GameTime,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiminishingTable {
    entries: BTreeMap<DiminishingGroup, DiminishingReturn>,
}

impl DiminishingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: DiminishingGroup) -> Option<&DiminishingReturn> {
        self.entries.get(&group)
    }

    /// Current level of `group`, honoring decay.
    pub fn current_level(&self, group: DiminishingGroup, now: GameTime, reset_ms: u64) -> u8 {
        let Some(entry) = self.entries.get(&group) else {
            return 1;
        };
        if entry.hit_count == 0 {
            return 1;
        }
        if entry.stack == 0 && now.since(entry.hit_time) >= reset_ms {
            return 1;
        }
        entry.hit_count
    }

    /// Raises the level by one, up to `max_level`.
    pub fn increment(&mut self, group: DiminishingGroup, max_level: u8, now: GameTime, reset_ms: u64) {
        let current = self.current_level(group, now, reset_ms);
        let entry = self.entries.entry(group).or_default();
        if current < max_level {
            entry.hit_count = current + 1;
        } else {
            entry.hit_count = current;
        }
    }

    /// Tracks aura applications (`apply = true`) and removals of the group.
    pub fn record_application(&mut self, group: DiminishingGroup, apply: bool, now: GameTime) {
        let entry = self.entries.entry(group).or_default();
        if apply {
            entry.stack += 1;
        } else if entry.stack > 0 {
            entry.stack -= 1;
            if entry.stack == 0 {
                entry.hit_time = now;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESET: u64 = 18_000;

    #[test]
    fn default_curve_halves_then_quarters_then_immune() {
        let tuning = DiminishingTuning::default();
        let stun = curve(&tuning, DiminishingGroup::Stun);
        assert_eq!(scale_duration(stun, 1, 6_000), 6_000);
        assert_eq!(scale_duration(stun, 2, 6_000), 3_000);
        assert_eq!(scale_duration(stun, 3, 6_000), 1_500);
        assert_eq!(scale_duration(stun, 4, 6_000), 0);
        assert_eq!(max_level(&tuning, DiminishingGroup::Stun), 4);
    }

    #[test]
    fn taunt_and_knockback_curves() {
        let tuning = DiminishingTuning::default();
        let taunt = curve(&tuning, DiminishingGroup::Taunt);
        // 10s × 42.25% = 4225ms
        assert_eq!(scale_duration(taunt, 3, 10_000), 4_225);
        assert_eq!(max_level(&tuning, DiminishingGroup::Taunt), 5);

        // Knockback caps at level 2 and stays at 50%
        let knockback = curve(&tuning, DiminishingGroup::Knockback);
        assert_eq!(max_level(&tuning, DiminishingGroup::Knockback), 2);
        assert_eq!(scale_duration(knockback, 2, 1_000), 500);
    }

    #[test]
    fn level_rises_per_application_and_caps() {
        let mut table = DiminishingTable::new();
        let now = GameTime::ZERO;
        assert_eq!(table.current_level(DiminishingGroup::Root, now, RESET), 1);

        for expected in [2, 3, 4, 4, 4] {
            table.increment(DiminishingGroup::Root, 4, now, RESET);
            assert_eq!(table.current_level(DiminishingGroup::Root, now, RESET), expected);
        }
    }

    #[test]
    fn level_decays_only_after_stack_empty_for_window() {
        let mut table = DiminishingTable::new();
        let group = DiminishingGroup::Fear;
        let start = GameTime::ZERO;

        table.increment(group, 4, start, RESET);
        table.record_application(group, true, start);

        // Still applied: never decays no matter how long
        let later = GameTime::from_millis(60_000);
        assert_eq!(table.current_level(group, later, RESET), 2);

        // Removed at 60s; level 2 holds until the full 18s window has passed
        table.record_application(group, false, later);
        assert_eq!(table.current_level(group, later + (RESET - 1), RESET), 2);
        assert_eq!(table.current_level(group, later + RESET, RESET), 1);
    }
}
