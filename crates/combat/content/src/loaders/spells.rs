//! Spell definition loader.

use std::path::Path;

use combat_core::{SpellInfo, SpellSchoolMask};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Spell file structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellFile {
    pub spells: Vec<SpellInfo>,
}

/// Loader for spell definitions from RON files.
pub struct SpellLoader;

impl SpellLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<SpellInfo>> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse spell RON {}: {}", path.display(), e))
    }

    /// Parses a spell file. A spell without a school is physical.
    pub fn parse(content: &str) -> LoadResult<Vec<SpellInfo>> {
        let file: SpellFile = ron::from_str(content)?;
        let spells = file
            .spells
            .into_iter()
            .map(|mut spell| {
                if spell.school.is_empty() {
                    spell.school = SpellSchoolMask::NORMAL;
                }
                spell
            })
            .collect();
        Ok(spells)
    }
}

#[cfg(test)]
mod tests {
    use combat_core::{AuraType, DiminishingGroup, ProcFlags, SpellEffectKind, SpellId};

    use super::*;

    #[test]
    fn parses_flags_options_and_defaults() {
        let spells = SpellLoader::parse(
            r#"(spells: [
                (
                    id: 7,
                    name: "stun",
                    duration_ms: Some(4000),
                    diminishing: Some((group: Stun)),
                    proc: Some((flags: "KILL | TAKEN_MELEE_AUTO_ATTACK")),
                    effects: [(kind: ApplyAura, aura: ModStun)],
                ),
            ])"#,
        )
        .unwrap();

        let spell = &spells[0];
        assert_eq!(spell.id, SpellId(7));
        assert_eq!(spell.school, SpellSchoolMask::NORMAL);
        assert_eq!(spell.duration_ms, Some(4_000));
        assert_eq!(spell.diminishing.map(|rule| rule.group), Some(DiminishingGroup::Stun));
        let proc = spell.proc.as_ref().unwrap();
        assert_eq!(proc.flags, ProcFlags::KILL | ProcFlags::TAKEN_MELEE_AUTO_ATTACK);
        assert_eq!(proc.chance, 100.0);
        assert_eq!(spell.effects[0].kind, SpellEffectKind::ApplyAura);
        assert_eq!(spell.effects[0].aura, AuraType::ModStun);
        assert_eq!(spell.effects[0].value_multiplier, 1.0);
    }

    #[test]
    fn more_effects_than_slots_fail() {
        let text = r#"(spells: [(id: 1, effects: [(), (), (), ()])])"#;
        assert!(SpellLoader::parse(text).is_err());
    }
}
