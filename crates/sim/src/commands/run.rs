//! Run a scenario file against the engine.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use combat_content::SpellCatalog;
use combat_core::testing::ThreatLog;
use combat_core::{
    AuraRequest, CombatConfig, CombatEngine, CombatEnv, DamageRequest, EntityId, HealRequest, PcgRng,
    RemoveMode, World,
};

use crate::output::{EventBuffer, OutputFormat, write_event};
use crate::scenario::{Scenario, Step, resolve_spell};

/// Run a scenario file and print the published events
#[derive(Parser)]
pub struct Run {
    /// Scenario file (RON)
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Combat tuning (TOML); defaults to the data directory's or the embedded one
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Data directory with spells.ron and spell_groups.ron
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl Run {
    pub fn execute(self) -> Result<()> {
        let catalog = super::load_catalog(self.data_dir.as_deref())?;
        let config = super::load_config(self.config.as_deref(), self.data_dir.as_deref())?;
        let scenario = Scenario::load(&self.scenario)?;
        scenario.validate(&catalog)?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        run_scenario(&scenario, &catalog, &config, self.format, &mut out)?;
        summarize(&self.scenario, &scenario);
        Ok(())
    }
}

/// Replays `scenario`, writing events as each step completes.
pub(crate) fn run_scenario(
    scenario: &Scenario,
    catalog: &SpellCatalog,
    config: &CombatConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<World> {
    let rng = PcgRng;
    let events = EventBuffer::default();
    let threat = ThreatLog::new();
    let env = CombatEnv::new(catalog, config, &rng)
        .with_events(&events)
        .with_threat(&threat);

    let mut world = World::new(scenario.seed);
    for spec in &scenario.actors {
        world.spawn(spec.build());
    }

    let mut engine = CombatEngine::new(&mut world, env);
    for (index, step) in scenario.steps.iter().enumerate() {
        tracing::debug!(step = index, ?step, "running step");
        run_step(&mut engine, catalog, step)?;
        for event in events.drain() {
            write_event(out, format, index, &event)?;
        }
    }
    drop(engine);
    Ok(world)
}

fn run_step(engine: &mut CombatEngine<'_>, catalog: &SpellCatalog, step: &Step) -> Result<()> {
    match step {
        Step::Melee {
            attacker,
            victim,
            amount,
            crit,
            blocked,
        } => {
            let mut request = DamageRequest::melee(EntityId(*attacker), EntityId(*victim), *amount);
            if *crit {
                request = request.critical();
            }
            if *blocked {
                request = request.blocked();
            }
            engine.resolve_damage(request);
        }
        Step::Heal {
            healer,
            target,
            amount,
            crit,
        } => {
            let mut request = HealRequest::new(Some(EntityId(*healer)), EntityId(*target), *amount);
            if *crit {
                request = request.critical();
            }
            engine.resolve_heal(request);
        }
        Step::Cast { caster, target, spell } => {
            let spell = resolve_spell(catalog, spell)?;
            engine.cast_spell(EntityId(*caster), EntityId(*target), spell)?;
        }
        Step::Apply { caster, target, spell } => {
            let spell = resolve_spell(catalog, spell)?;
            if let Err(refusal) = engine.apply_aura(AuraRequest::new(spell, EntityId(*caster), EntityId(*target))) {
                tracing::info!(spell = %spell, "aura not applied: {refusal}");
            }
        }
        Step::Remove { target, spell } => {
            let spell = resolve_spell(catalog, spell)?;
            engine.remove_auras_by_spell(EntityId(*target), spell, None, RemoveMode::Cancel);
        }
        Step::Tick { ms } => engine.tick(*ms),
        Step::Move { actor } => {
            engine.notify_moved(EntityId(*actor));
        }
        Step::Kill { killer, victim } => engine.kill(killer.map(EntityId), EntityId(*victim)),
    }
    Ok(())
}

fn summarize(path: &Path, scenario: &Scenario) {
    tracing::info!(
        scenario = %path.display(),
        name = %scenario.name,
        steps = scenario.steps.len(),
        "scenario finished"
    );
}

#[cfg(test)]
mod tests {
    use combat_content::ContentFactory;

    use super::*;

    fn run(text: &str, format: OutputFormat) -> (World, String) {
        let scenario = Scenario::parse(text).unwrap();
        let catalog = ContentFactory::embedded_catalog().unwrap();
        let config = ContentFactory::embedded_config().unwrap();
        scenario.validate(&catalog).unwrap();
        let mut out = Vec::new();
        let world = run_scenario(&scenario, &catalog, &config, format, &mut out).unwrap();
        (world, String::from_utf8(out).unwrap())
    }

    #[test]
    fn shielded_hit_scenario() {
        let (world, text) = run(
            r#"(
                actors: [
                    (id: 1, kind: creature, health: 500),
                    (id: 2, kind: player, health: 1000),
                ],
                steps: [
                    Melee(attacker: 1, victim: 2, amount: 300),
                    Apply(caster: 2, target: 2, spell: "barrier"),
                    Melee(attacker: 1, victim: 2, amount: 500),
                ],
            )"#,
            OutputFormat::Text,
        );
        assert_eq!(world.actor(EntityId(2)).unwrap().health.current, 500);
        assert!(text.contains("(300 absorbed)"), "{text}");
    }

    #[test]
    fn json_lines_are_tagged() {
        let (_, text) = run(
            r#"(
                actors: [(id: 1, health: 100), (id: 2, kind: player, health: 100)],
                steps: [Kill(killer: Some(1), victim: 2)],
            )"#,
            OutputFormat::Json,
        );
        let last = text.lines().last().unwrap();
        let value: serde_json::Value = serde_json::from_str(last).unwrap();
        assert_eq!(value["step"], 0);
        assert_eq!(value["data"]["event"], "died");
    }

    #[test]
    fn shipped_scenarios_run() {
        let shipped = [
            include_str!("../../scenarios/shield.ron"),
            include_str!("../../scenarios/stun_dr.ron"),
            include_str!("../../scenarios/procs.ron"),
        ];
        for text in shipped {
            let (_, output) = run(text, OutputFormat::Text);
            assert!(!output.is_empty());
        }
    }
}
