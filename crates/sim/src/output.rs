//! Event collection and rendering.

use std::cell::RefCell;
use std::io::Write;

use anyhow::Result;
use combat_core::{CombatEvent, CombatEventSink};

/// How events are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line of prose per event
    Text,
    /// One JSON object per line
    Json,
}

/// Buffers published events until the runner drains them.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: RefCell<Vec<CombatEvent>>,
}

impl EventBuffer {
    pub fn drain(&self) -> Vec<CombatEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl CombatEventSink for EventBuffer {
    fn publish(&self, event: &CombatEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

pub fn write_event(out: &mut impl Write, format: OutputFormat, step: usize, event: &CombatEvent) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let line = serde_json::json!({ "step": step, "data": event });
            writeln!(out, "{line}")?;
        }
        OutputFormat::Text => writeln!(out, "[{step:>3}] {}", describe(event))?,
    }
    Ok(())
}

fn describe(event: &CombatEvent) -> String {
    match event {
        CombatEvent::Damage(info) => {
            let source = info.attacker.map_or_else(|| "environment".to_string(), |id| id.to_string());
            let mut line = format!("{source} hits {} for {}", info.victim, info.amount);
            if info.absorbed > 0 {
                line.push_str(&format!(" ({} absorbed)", info.absorbed));
            }
            if info.resisted > 0 {
                line.push_str(&format!(" ({} resisted)", info.resisted));
            }
            if info.blocked > 0 {
                line.push_str(&format!(" ({} blocked)", info.blocked));
            }
            if info.overkill > 0 {
                line.push_str(&format!(" ({} overkill)", info.overkill));
            }
            line
        }
        CombatEvent::Heal(info) => format!(
            "{} healed for {} ({} overheal)",
            info.target,
            info.effective,
            info.overheal()
        ),
        CombatEvent::Immune { victim, spell, .. } => match spell {
            Some(spell) => format!("{victim} is immune to {spell}"),
            None => format!("{victim} is immune"),
        },
        CombatEvent::Absorb { victim, spell, amount, .. } => {
            format!("{spell} absorbs {amount} for {victim}")
        }
        CombatEvent::Split {
            victim,
            receiver,
            amount,
            ..
        } => format!("{receiver} takes {amount} on behalf of {victim}"),
        CombatEvent::Energize {
            target,
            power,
            amount,
            ..
        } => format!("{target} gains {amount} {power}"),
        CombatEvent::AuraApplied {
            spell,
            target,
            duration_ms,
            ..
        } => match duration_ms {
            Some(ms) => format!("{target} gains {spell} for {ms} ms"),
            None => format!("{target} gains {spell}"),
        },
        CombatEvent::AuraRefreshed {
            spell,
            target,
            stacks,
            duration_ms,
            ..
        } => format!("{spell} on {target} refreshed: {stacks} stacks, {duration_ms:?} ms"),
        CombatEvent::AuraRemoved { spell, target, mode, .. } => {
            format!("{spell} fades from {target} ({mode:?})")
        }
        CombatEvent::ProcTriggered { spell, holder, target, .. } => {
            format!("{spell} on {holder} procs against {target}")
        }
        CombatEvent::ProcChainLimit { actor, depth } => {
            format!("proc chain from {actor} stopped at depth {depth}")
        }
        CombatEvent::Died { victim, killer } => match killer {
            Some(killer) => format!("{victim} is killed by {killer}"),
            None => format!("{victim} dies"),
        },
    }
}
