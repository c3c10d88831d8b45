//! Read-only context and collaborators injected into the engine.
//!
//! Spell definitions, tuning and randomness are required; everything else
//! (threat, motion, cast state, event sink, area selection, scripts) is an
//! optional collaborator. The [`CombatEnv`] aggregate is `Copy`, so nested
//! calls hand it down by value.
mod collab;
mod error;
mod rng;

pub use collab::{
    AreaTargetSelector, CastControl, CastInfo, CombatEventSink, CombatScripts, MotionOracle,
    ThreatTracker,
};
pub use error::OracleError;
pub use rng::{PcgRng, RngOracle, compute_seed, roll};

use crate::config::CombatConfig;
use crate::events::CombatEvent;
use crate::spell::{SpellGroupId, SpellGroupStackRule, SpellInfo};
use crate::state::SpellId;

/// Source of spell definitions and spell-group stacking rules.
pub trait SpellOracle {
    fn spell(&self, id: SpellId) -> Option<&SpellInfo>;

    /// Stacking rule of a spell group; `None` behaves as
    /// [`SpellGroupStackRule::Default`].
    fn group_rule(&self, group: SpellGroupId) -> Option<SpellGroupStackRule>;
}

/// Aggregates the oracles and collaborators used by the engine.
#[derive(Clone, Copy)]
pub struct CombatEnv<'a> {
    spells: &'a dyn SpellOracle,
    config: &'a CombatConfig,
    rng: &'a dyn RngOracle,
    threat: Option<&'a dyn ThreatTracker>,
    motion: Option<&'a dyn MotionOracle>,
    casts: Option<&'a dyn CastControl>,
    events: Option<&'a dyn CombatEventSink>,
    area: Option<&'a dyn AreaTargetSelector>,
    scripts: Option<&'a dyn CombatScripts>,
}

impl<'a> CombatEnv<'a> {
    pub fn new(spells: &'a dyn SpellOracle, config: &'a CombatConfig, rng: &'a dyn RngOracle) -> Self {
        Self {
            spells,
            config,
            rng,
            threat: None,
            motion: None,
            casts: None,
            events: None,
            area: None,
            scripts: None,
        }
    }

    pub fn with_threat(mut self, threat: &'a dyn ThreatTracker) -> Self {
        self.threat = Some(threat);
        self
    }

    pub fn with_motion(mut self, motion: &'a dyn MotionOracle) -> Self {
        self.motion = Some(motion);
        self
    }

    pub fn with_casts(mut self, casts: &'a dyn CastControl) -> Self {
        self.casts = Some(casts);
        self
    }

    pub fn with_events(mut self, events: &'a dyn CombatEventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_area_selector(mut self, area: &'a dyn AreaTargetSelector) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_scripts(mut self, scripts: &'a dyn CombatScripts) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn spells(&self) -> &'a dyn SpellOracle {
        self.spells
    }

    /// Looks up a spell definition.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::SpellNotFound` if the oracle has no such spell.
    pub fn spell(&self, id: SpellId) -> Result<&'a SpellInfo, OracleError> {
        self.spells.spell(id).ok_or(OracleError::SpellNotFound(id))
    }

    pub fn config(&self) -> &'a CombatConfig {
        self.config
    }

    pub fn rng(&self) -> &'a dyn RngOracle {
        self.rng
    }

    pub fn threat(&self) -> Option<&'a dyn ThreatTracker> {
        self.threat
    }

    pub fn motion(&self) -> Option<&'a dyn MotionOracle> {
        self.motion
    }

    pub fn casts(&self) -> Option<&'a dyn CastControl> {
        self.casts
    }

    pub fn area(&self) -> Option<&'a dyn AreaTargetSelector> {
        self.area
    }

    pub fn scripts(&self) -> Option<&'a dyn CombatScripts> {
        self.scripts
    }

    /// Sends `event` to the sink, if any.
    pub fn publish(&self, event: CombatEvent) {
        if let Some(sink) = self.events {
            sink.publish(&event);
        }
    }

    /// Strictest stacking rule among the groups two spells share.
    pub fn group_rule_between(&self, a: &SpellInfo, b: &SpellInfo) -> SpellGroupStackRule {
        a.groups
            .iter()
            .filter(|group| b.groups.contains(group))
            .map(|group| self.spells.group_rule(*group).unwrap_or_default())
            .max()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for CombatEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatEnv")
            .field("config", self.config)
            .field("threat", &self.threat.is_some())
            .field("motion", &self.motion.is_some())
            .field("casts", &self.casts.is_some())
            .field("events", &self.events.is_some())
            .field("area", &self.area.is_some())
            .field("scripts", &self.scripts.is_some())
            .finish()
    }
}
