//! Scenario files: the actors of a fight and the steps to replay.

use std::path::Path;

use anyhow::{Context, Result};
use combat_content::SpellCatalog;
use combat_core::{Actor, ActorKind, EntityId, PowerKind, ResourceMeter, SpellId, SpellSchool};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// World seed for every random roll of the run.
    #[serde(default)]
    pub seed: u64,
    pub actors: Vec<ActorSpec>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSpec {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ActorKind,
    #[serde(default = "default_level")]
    pub level: u8,
    pub health: u32,
    #[serde(default)]
    pub mana: u32,
    #[serde(default)]
    pub rage: u32,
    #[serde(default)]
    pub armor: i32,
    #[serde(default)]
    pub resistances: Vec<(SpellSchool, i32)>,
    #[serde(default)]
    pub block_value: u32,
    /// Controlling actor, for pets.
    #[serde(default)]
    pub owner: Option<u32>,
}

fn default_level() -> u8 {
    80
}

impl ActorSpec {
    pub fn build(&self) -> Actor {
        let id = EntityId(self.id);
        let mut actor = Actor::new(id, self.kind, self.level)
            .with_health(self.health)
            .with_armor(self.armor)
            .with_block_value(self.block_value);
        if self.mana > 0 {
            actor = actor.with_mana(self.mana);
        }
        if self.rage > 0 {
            actor = actor.with_power(PowerKind::Rage, ResourceMeter::new(0, self.rage));
        }
        for (school, value) in &self.resistances {
            actor = actor.with_resistance(*school, *value);
        }
        if let Some(owner) = self.owner {
            actor = actor.owned_by(EntityId(owner));
        }
        actor
    }
}

/// One scripted action. Spells are named as in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Step {
    Melee {
        attacker: u32,
        victim: u32,
        amount: u32,
        #[serde(default)]
        crit: bool,
        #[serde(default)]
        blocked: bool,
    },
    Heal {
        healer: u32,
        target: u32,
        amount: u32,
        #[serde(default)]
        crit: bool,
    },
    /// Castless execution of every effect of a spell.
    Cast { caster: u32, target: u32, spell: String },
    /// Applies only the aura part of a spell.
    Apply { caster: u32, target: u32, spell: String },
    Remove { target: u32, spell: String },
    Tick { ms: u32 },
    Move { actor: u32 },
    Kill {
        #[serde(default)]
        killer: Option<u32>,
        victim: u32,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Checks that every step names known actors and spells.
    pub fn validate(&self, catalog: &SpellCatalog) -> Result<()> {
        let known = |id: u32| self.actors.iter().any(|actor| actor.id == id);
        for (index, step) in self.steps.iter().enumerate() {
            for actor in step.actors() {
                if !known(actor) {
                    anyhow::bail!("step {index}: unknown actor {actor}");
                }
            }
            if let Some(name) = step.spell() {
                resolve_spell(catalog, name).with_context(|| format!("step {index}"))?;
            }
        }
        Ok(())
    }
}

impl Step {
    fn actors(&self) -> Vec<u32> {
        match self {
            Self::Melee { attacker, victim, .. } => vec![*attacker, *victim],
            Self::Heal { healer, target, .. } => vec![*healer, *target],
            Self::Cast { caster, target, .. } | Self::Apply { caster, target, .. } => vec![*caster, *target],
            Self::Remove { target, .. } => vec![*target],
            Self::Tick { .. } => Vec::new(),
            Self::Move { actor } => vec![*actor],
            Self::Kill { killer, victim } => killer.iter().copied().chain([*victim]).collect(),
        }
    }

    fn spell(&self) -> Option<&str> {
        match self {
            Self::Cast { spell, .. } | Self::Apply { spell, .. } | Self::Remove { spell, .. } => Some(spell),
            _ => None,
        }
    }
}

pub fn resolve_spell(catalog: &SpellCatalog, name: &str) -> Result<SpellId> {
    catalog
        .find(name)
        .map(|spell| spell.id)
        .ok_or_else(|| anyhow::anyhow!("unknown spell '{name}'"))
}

#[cfg(test)]
mod tests {
    use combat_content::ContentFactory;

    use super::*;

    const SAMPLE: &str = r#"(
        seed: 3,
        actors: [
            (id: 1, kind: creature, health: 500),
            (id: 2, kind: player, health: 1000, resistances: [(fire, 50)]),
        ],
        steps: [
            Apply(caster: 2, target: 2, spell: "barrier"),
            Melee(attacker: 1, victim: 2, amount: 300),
            Tick(ms: 1000),
        ],
    )"#;

    #[test]
    fn parses_and_validates() {
        let scenario = Scenario::parse(SAMPLE).unwrap();
        let catalog = ContentFactory::embedded_catalog().unwrap();
        assert_eq!(scenario.actors[0].level, 80);
        assert_eq!(scenario.steps.len(), 3);
        scenario.validate(&catalog).unwrap();

        let actor = scenario.actors[1].build();
        assert_eq!(actor.resistance(SpellSchool::Fire), 50);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let catalog = ContentFactory::embedded_catalog().unwrap();
        let mut scenario = Scenario::parse(SAMPLE).unwrap();
        scenario.steps.push(Step::Cast {
            caster: 1,
            target: 2,
            spell: "meteor".into(),
        });
        assert!(scenario.validate(&catalog).is_err());

        scenario.steps.pop();
        scenario.steps.push(Step::Move { actor: 9 });
        assert!(scenario.validate(&catalog).is_err());
    }
}
