//! In-memory oracles and recording collaborators.
//!
//! Used by unit and integration tests and by tools that drive the engine
//! without a content database. Recorders use interior mutability because
//! collaborators are only ever borrowed shared.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::env::{
    AreaTargetSelector, CastControl, CastInfo, CombatEventSink, MotionOracle, RngOracle, SpellOracle,
    ThreatTracker,
};
use crate::events::CombatEvent;
use crate::spell::{SpellGroupId, SpellGroupStackRule, SpellInfo};
use crate::state::{EntityId, SpellId, World};

/// Spell definitions and group rules kept in memory.
#[derive(Clone, Debug, Default)]
pub struct SpellBook {
    spells: BTreeMap<SpellId, SpellInfo>,
    rules: BTreeMap<SpellGroupId, SpellGroupStackRule>,
}

impl SpellBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, spell: SpellInfo) -> Self {
        self.insert(spell);
        self
    }

    pub fn with_group_rule(mut self, group: SpellGroupId, rule: SpellGroupStackRule) -> Self {
        self.rules.insert(group, rule);
        self
    }

    /// Adds or replaces a definition.
    pub fn insert(&mut self, spell: SpellInfo) {
        self.spells.insert(spell.id, spell);
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

impl SpellOracle for SpellBook {
    fn spell(&self, id: SpellId) -> Option<&SpellInfo> {
        self.spells.get(&id)
    }

    fn group_rule(&self, group: SpellGroupId) -> Option<SpellGroupStackRule> {
        self.rules.get(&group).copied()
    }
}

/// Rng returning the same raw value for every seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedRng(pub u32);

impl FixedRng {
    /// Every chance above zero succeeds and resist rolls land in the lowest bucket.
    pub const fn lucky() -> Self {
        Self(0)
    }

    /// Every chance below 100 fails.
    pub const fn unlucky() -> Self {
        Self(u32::MAX)
    }
}

impl RngOracle for FixedRng {
    fn next_u32(&self, _seed: u64) -> u32 {
        self.0
    }
}

/// Collects published events in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RefCell<Vec<CombatEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CombatEvent> {
        self.events.borrow().clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&CombatEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    pub fn take(&self) -> Vec<CombatEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl CombatEventSink for EventLog {
    fn publish(&self, event: &CombatEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// One threat call seen by a [`ThreatLog`].
#[derive(Clone, Debug, PartialEq)]
pub struct ThreatEntry {
    pub source: EntityId,
    pub victim: EntityId,
    pub amount: f32,
    pub spell: Option<SpellId>,
    /// Forwarded healing threat rather than direct threat.
    pub forwarded: bool,
}

/// Records threat calls instead of maintaining threat lists.
#[derive(Debug, Default)]
pub struct ThreatLog {
    entries: RefCell<Vec<ThreatEntry>>,
}

impl ThreatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ThreatEntry> {
        self.entries.borrow().clone()
    }

    /// Direct threat `source` generated on `victim`.
    pub fn total(&self, source: EntityId, victim: EntityId) -> f32 {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| !entry.forwarded && entry.source == source && entry.victim == victim)
            .map(|entry| entry.amount)
            .sum()
    }
}

impl ThreatTracker for ThreatLog {
    fn add_threat(&self, source: EntityId, victim: EntityId, amount: f32, spell: Option<SpellId>) {
        self.entries.borrow_mut().push(ThreatEntry {
            source,
            victim,
            amount,
            spell,
            forwarded: false,
        });
    }

    fn forward_heal_threat(&self, healer: EntityId, target: EntityId, amount: f32, spell: Option<SpellId>) {
        self.entries.borrow_mut().push(ThreatEntry {
            source: healer,
            victim: target,
            amount,
            spell,
            forwarded: true,
        });
    }
}

/// Movement flags set by the test.
#[derive(Debug, Default)]
pub struct MotionFlags {
    moving: RefCell<BTreeSet<EntityId>>,
}

impl MotionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_moving(&self, actor: EntityId, moving: bool) {
        let mut set = self.moving.borrow_mut();
        if moving {
            set.insert(actor);
        } else {
            set.remove(&actor);
        }
    }
}

impl MotionOracle for MotionFlags {
    fn is_moving(&self, actor: EntityId) -> bool {
        self.moving.borrow().contains(&actor)
    }

    fn stop_moving(&self, actor: EntityId) {
        self.moving.borrow_mut().remove(&actor);
    }
}

/// Casts in progress, with the interrupts and pushbacks they received.
#[derive(Debug, Default)]
pub struct CastLog {
    casts: RefCell<BTreeMap<EntityId, CastInfo>>,
    interrupted: RefCell<Vec<EntityId>>,
    delayed: RefCell<Vec<EntityId>>,
}

impl CastLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, actor: EntityId, cast: CastInfo) {
        self.casts.borrow_mut().insert(actor, cast);
    }

    pub fn interrupted(&self) -> Vec<EntityId> {
        self.interrupted.borrow().clone()
    }

    pub fn delayed(&self) -> Vec<EntityId> {
        self.delayed.borrow().clone()
    }
}

impl CastControl for CastLog {
    fn current_cast(&self, actor: EntityId) -> Option<CastInfo> {
        self.casts.borrow().get(&actor).copied()
    }

    fn interrupt(&self, actor: EntityId) {
        if self.casts.borrow_mut().remove(&actor).is_some() {
            self.interrupted.borrow_mut().push(actor);
        }
    }

    fn delay(&self, actor: EntityId) {
        self.delayed.borrow_mut().push(actor);
    }
}

/// Area selection from a fixed neighbour list per owner.
#[derive(Debug, Default)]
pub struct FixedArea {
    members: RefCell<BTreeMap<EntityId, Vec<EntityId>>>,
}

impl FixedArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, owner: EntityId, members: Vec<EntityId>) {
        self.members.borrow_mut().insert(owner, members);
    }
}

impl AreaTargetSelector for FixedArea {
    fn select(&self, world: &World, owner: EntityId, _spell: &SpellInfo) -> Vec<EntityId> {
        self.members
            .borrow()
            .get(&owner)
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .filter(|id| world.actor(*id).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }
}
