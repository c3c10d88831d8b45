//! In-memory spell catalog served to the engine.

use std::collections::{BTreeMap, BTreeSet};

use combat_core::{SpellGroupId, SpellGroupStackRule, SpellId, SpellInfo, SpellOracle};

/// A spell group as written in content: its rule and member spells.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellGroupDef {
    pub id: SpellGroupId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rule: SpellGroupStackRule,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spells: Vec<SpellId>,
}

/// Content problem found while building a catalog. The offending entry is
/// skipped.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogIssue {
    #[error("spell {0} is defined more than once")]
    DuplicateSpell(SpellId),

    #[error("spell {spell} triggers unknown spell {missing}")]
    DanglingTrigger { spell: SpellId, missing: SpellId },

    #[error("{0} is defined more than once")]
    DuplicateGroup(SpellGroupId),

    #[error("{group} lists unknown spell {spell}")]
    UnknownGroupMember { group: SpellGroupId, spell: SpellId },
}

/// Validated spell definitions and group rules.
#[derive(Clone, Debug, Default)]
pub struct SpellCatalog {
    spells: BTreeMap<SpellId, SpellInfo>,
    rules: BTreeMap<SpellGroupId, SpellGroupStackRule>,
    issues: Vec<CatalogIssue>,
}

impl SpellCatalog {
    /// Builds a catalog from loaded definitions.
    ///
    /// Duplicate ids keep their first definition. Spells whose trigger
    /// effects name a spell that is missing (or was itself skipped) are
    /// dropped. Group membership is written into the member definitions.
    /// Every skipped entry is logged once and kept in [`issues`](Self::issues).
    pub fn build(spells: Vec<SpellInfo>, groups: Vec<SpellGroupDef>) -> Self {
        let mut catalog = Self::default();

        for spell in spells {
            if catalog.spells.contains_key(&spell.id) {
                catalog.record(CatalogIssue::DuplicateSpell(spell.id));
                continue;
            }
            catalog.spells.insert(spell.id, spell);
        }
        catalog.drop_dangling_triggers();

        for group in groups {
            if catalog.rules.contains_key(&group.id) {
                catalog.record(CatalogIssue::DuplicateGroup(group.id));
                continue;
            }
            catalog.rules.insert(group.id, group.rule);
            for member in group.spells {
                match catalog.spells.get_mut(&member) {
                    Some(spell) if !spell.groups.contains(&group.id) => spell.groups.push(group.id),
                    Some(_) => {}
                    None => catalog.record(CatalogIssue::UnknownGroupMember {
                        group: group.id,
                        spell: member,
                    }),
                }
            }
        }

        tracing::debug!(
            spells = catalog.spells.len(),
            groups = catalog.rules.len(),
            skipped = catalog.issues.len(),
            "spell catalog built"
        );
        catalog
    }

    /// Removes spells with unresolvable triggers until none are left.
    fn drop_dangling_triggers(&mut self) {
        loop {
            let known: BTreeSet<SpellId> = self.spells.keys().copied().collect();
            let dangling: Vec<(SpellId, SpellId)> = self
                .spells
                .values()
                .filter_map(|spell| {
                    spell
                        .effects
                        .iter()
                        .filter_map(|effect| effect.trigger_spell)
                        .find(|trigger| !known.contains(trigger))
                        .map(|missing| (spell.id, missing))
                })
                .collect();
            if dangling.is_empty() {
                return;
            }
            for (spell, missing) in dangling {
                self.spells.remove(&spell);
                self.record(CatalogIssue::DanglingTrigger { spell, missing });
            }
        }
    }

    fn record(&mut self, issue: CatalogIssue) {
        tracing::error!("content entry skipped: {issue}");
        self.issues.push(issue);
    }

    /// Adds or replaces one definition without validation.
    pub fn insert(&mut self, spell: SpellInfo) {
        self.spells.insert(spell.id, spell);
    }

    pub fn issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn spells(&self) -> impl Iterator<Item = &SpellInfo> {
        self.spells.values()
    }

    /// Looks a spell up by its content name.
    pub fn find(&self, name: &str) -> Option<&SpellInfo> {
        self.spells.values().find(|spell| spell.name == name)
    }
}

impl SpellOracle for SpellCatalog {
    fn spell(&self, id: SpellId) -> Option<&SpellInfo> {
        self.spells.get(&id)
    }

    fn group_rule(&self, group: SpellGroupId) -> Option<SpellGroupStackRule> {
        self.rules.get(&group).copied()
    }
}

#[cfg(test)]
mod tests {
    use combat_core::{SpellEffectInfo, SpellEffectKind};

    use super::*;

    fn trigger(id: u32, target: u32) -> SpellInfo {
        SpellInfo::new(SpellId(id), format!("t{id}"))
            .with_effect(SpellEffectInfo::immediate(SpellEffectKind::TriggerSpell, 0).with_trigger(SpellId(target)))
    }

    #[test]
    fn dangling_triggers_cascade() {
        // 3 -> 2 -> 1 -> missing 9
        let spells = vec![trigger(1, 9), trigger(2, 1), trigger(3, 2), SpellInfo::new(SpellId(4), "ok")];
        let catalog = SpellCatalog::build(spells, Vec::new());

        assert_eq!(catalog.len(), 1);
        assert!(catalog.spell(SpellId(4)).is_some());
        assert_eq!(catalog.issues().len(), 3);
        assert_eq!(
            catalog.issues()[0],
            CatalogIssue::DanglingTrigger {
                spell: SpellId(1),
                missing: SpellId(9)
            }
        );
    }

    #[test]
    fn groups_assign_membership() {
        let spells = vec![SpellInfo::new(SpellId(1), "a"), SpellInfo::new(SpellId(2), "b")];
        let groups = vec![
            SpellGroupDef {
                id: SpellGroupId(5),
                rule: SpellGroupStackRule::Exclusive,
                spells: vec![SpellId(1), SpellId(2), SpellId(3)],
            },
            SpellGroupDef {
                id: SpellGroupId(5),
                rule: SpellGroupStackRule::Default,
                spells: vec![],
            },
        ];
        let catalog = SpellCatalog::build(spells, groups);

        assert_eq!(catalog.spell(SpellId(1)).unwrap().groups, vec![SpellGroupId(5)]);
        assert_eq!(catalog.group_rule(SpellGroupId(5)), Some(SpellGroupStackRule::Exclusive));
        assert_eq!(
            catalog.issues(),
            &[
                CatalogIssue::UnknownGroupMember {
                    group: SpellGroupId(5),
                    spell: SpellId(3)
                },
                CatalogIssue::DuplicateGroup(SpellGroupId(5)),
            ]
        );
    }

    #[test]
    fn first_definition_wins() {
        let spells = vec![SpellInfo::new(SpellId(1), "first"), SpellInfo::new(SpellId(1), "second")];
        let catalog = SpellCatalog::build(spells, Vec::new());
        assert_eq!(catalog.find("first").map(|spell| spell.id), Some(SpellId(1)));
        assert!(catalog.find("second").is_none());
        assert_eq!(catalog.issues(), &[CatalogIssue::DuplicateSpell(SpellId(1))]);
    }
}
