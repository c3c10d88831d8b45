use std::collections::{BTreeMap, BTreeSet};

use super::{Actor, ActorFlags, ActorKind, AuraId, EntityId, GameTime, SpellId};
use crate::aura::Aura;
use crate::env::compute_seed;

/// All combat state of one simulation: actors, live auras and the clock.
///
/// The world is plain data. Every mutation that has combat semantics goes
/// through [`CombatEngine`](crate::CombatEngine).
#[derive(Clone, Debug, Default)]
pub struct World {
    actors: BTreeMap<EntityId, Actor>,
    pub(crate) auras: BTreeMap<AuraId, Aura>,
    next_aura_id: u64,
    now: GameTime,

    /// Base seed combined with `nonce` for every random roll.
    seed: u64,
    nonce: u64,

    /// Auras removed but not yet dropped.
    pub(crate) pending_disposal: Vec<AuraId>,
    reported: BTreeSet<(SpellId, &'static str)>,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            next_aura_id: 1,
            ..Self::default()
        }
    }

    pub fn now(&self) -> GameTime {
        self.now
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn advance(&mut self, delta_ms: u64) {
        self.now = self.now + delta_ms;
    }

    /// Adds an actor, replacing any previous actor with the same id.
    ///
    /// Pets and summons of a player inherit player control.
    pub fn spawn(&mut self, mut actor: Actor) -> EntityId {
        let controlled_by_player = actor
            .controller
            .and_then(|owner| self.actors.get(&owner))
            .is_some_and(|owner| owner.kind == ActorKind::Player);
        if controlled_by_player {
            actor.flags.insert(ActorFlags::PLAYER_CONTROLLED);
        }
        let id = actor.id;
        self.actors.insert(id, actor);
        id
    }

    pub(crate) fn remove_actor(&mut self, id: EntityId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn actor_ids(&self) -> Vec<EntityId> {
        self.actors.keys().copied().collect()
    }

    /// Live aura by id. Removed auras awaiting disposal are not returned.
    pub fn aura(&self, id: AuraId) -> Option<&Aura> {
        self.auras.get(&id).filter(|aura| !aura.is_removed())
    }

    pub(crate) fn aura_mut(&mut self, id: AuraId) -> Option<&mut Aura> {
        self.auras.get_mut(&id)
    }

    /// Aura by id, including ones already removed.
    pub(crate) fn aura_any(&self, id: AuraId) -> Option<&Aura> {
        self.auras.get(&id)
    }

    pub fn auras(&self) -> impl Iterator<Item = &Aura> {
        self.auras.values().filter(|aura| !aura.is_removed())
    }

    pub(crate) fn allocate_aura_id(&mut self) -> AuraId {
        let id = AuraId(self.next_aura_id);
        self.next_aura_id += 1;
        id
    }

    /// Seed for the next random roll made on behalf of `actor`.
    pub(crate) fn next_seed(&mut self, actor: EntityId, context: u32) -> u64 {
        let seed = compute_seed(self.seed, self.nonce, actor.0, context);
        self.nonce += 1;
        seed
    }

    /// Whether `id` is a player or controlled by one.
    pub fn is_player_controlled(&self, id: EntityId) -> bool {
        self.actors
            .get(&id)
            .is_some_and(|actor| actor.flags.contains(ActorFlags::PLAYER_CONTROLLED))
    }

    /// Player whose spell modifiers apply to `id`'s spells.
    pub fn spell_mod_owner(&self, id: EntityId) -> Option<EntityId> {
        let actor = self.actors.get(&id)?;
        if actor.kind == ActorKind::Player {
            return Some(id);
        }
        let owner = self.actors.get(&actor.controller?)?;
        (owner.kind == ActorKind::Player).then_some(owner.id)
    }

    /// Logs a content error at most once per (spell, kind).
    ///
    /// Returns true the first time the pair is reported.
    pub fn report_content_error(&mut self, spell: SpellId, kind: &'static str, detail: &str) -> bool {
        if !self.reported.insert((spell, kind)) {
            return false;
        }
        tracing::error!(spell = %spell, kind, "content error: {detail}");
        true
    }

    /// Drops removed auras that no application references any more.
    pub(crate) fn flush_disposal(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_disposal);
        let mut disposed = 0;
        for id in pending {
            match self.auras.get(&id) {
                Some(aura) if aura.is_removed() && aura.targets.is_empty() => {
                    self.auras.remove(&id);
                    disposed += 1;
                }
                Some(aura) if aura.is_removed() => self.pending_disposal.push(id),
                _ => {}
            }
        }
        disposed
    }
}
