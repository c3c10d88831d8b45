use combat_core::state::ResourcePool;
use combat_core::testing::{EventLog, FixedRng, SpellBook};
use combat_core::{
    Actor, AuraId, AuraRequest, AuraType, CombatConfig, CombatEngine, CombatEnv, CombatEvent,
    CombatScripts, DamageClass, DamageRequest, DeathState, EffectTarget, EntityId, PowerKind,
    ProcAttributes, ProcEntry, ProcEvent, ProcEventInfo, ProcFlags, ProcHit, RemoveMode,
    ResourceMeter, SpellAttributes, SpellEffectInfo, SpellEffectKind, SpellId, SpellInfo,
    SpellSchoolMask, World,
};

const THORNS: SpellId = SpellId(300);
const FIRST: SpellId = SpellId(301);
const SECOND: SpellId = SpellId(302);
const SPOILS: SpellId = SpellId(303);
const SPOILS_MANA: SpellId = SpellId(304);
const LAST_STAND: SpellId = SpellId(305);
const RALLY: SpellId = SpellId(306);
const GUARD: SpellId = SpellId(307);
const QUIET_THORNS: SpellId = SpellId(308);

fn thorns() -> SpellInfo {
    let mut spell = SpellInfo::new(THORNS, "thorns")
        .with_school(SpellSchoolMask::NATURE)
        .with_duration(60_000)
        .with_effect(SpellEffectInfo::aura(AuraType::ProcTriggerDamage, 1))
        .with_proc(
            ProcEntry::new(ProcFlags::TAKEN_MELEE_AUTO_ATTACK | ProcFlags::TAKEN_SPELL_MAGIC_DMG_CLASS_NEG)
                .with_attributes(ProcAttributes::TRIGGERED_CAN_PROC),
        )
        .positive();
    spell.damage_class = DamageClass::Magic;
    spell
}

fn dummy_proc(id: SpellId, name: &str) -> SpellInfo {
    SpellInfo::new(id, name)
        .with_duration(60_000)
        .with_effect(SpellEffectInfo::aura(AuraType::Dummy, 0))
        .with_proc(ProcEntry::new(ProcFlags::TAKEN_MELEE_AUTO_ATTACK))
        .positive()
}

fn book() -> SpellBook {
    let mut last_stand = SpellInfo::new(LAST_STAND, "last stand")
        .with_effect(SpellEffectInfo::aura(AuraType::Dummy, 0))
        .with_attributes(SpellAttributes::DEATH_PERSISTENT)
        .positive();
    last_stand.duration_ms = None;

    let mut quiet_thorns = thorns().with_attributes(SpellAttributes::SUPPRESS_NESTED_PROCS);
    quiet_thorns.id = QUIET_THORNS;

    SpellBook::new()
        .with(thorns())
        .with(quiet_thorns)
        .with(dummy_proc(FIRST, "first"))
        .with(dummy_proc(SECOND, "second"))
        .with(dummy_proc(GUARD, "guard").with_charges(2))
        .with(
            SpellInfo::new(SPOILS, "spoils")
                .with_duration(60_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ProcTriggerSpell, 0).with_trigger(SPOILS_MANA))
                .with_proc(ProcEntry::new(ProcFlags::KILL))
                .positive(),
        )
        .with(
            SpellInfo::new(SPOILS_MANA, "spoils mana").with_effect(
                SpellEffectInfo::immediate(SpellEffectKind::Energize, 10)
                    .with_misc(PowerKind::Mana as i32)
                    .with_target(EffectTarget::Caster),
            ),
        )
        .with(last_stand)
        .with(
            SpellInfo::new(RALLY, "rally")
                .with_duration(60_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ModStat, 5))
                .positive(),
        )
}

fn health(engine: &CombatEngine<'_>, actor: EntityId) -> u32 {
    engine.world().actor(actor).unwrap().health.current
}

#[test]
fn mutual_reflection_stops_at_chain_limit() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let events = EventLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_events(&events);
    let mut world = World::new(1);
    let a = world.spawn(Actor::creature(EntityId(1), 80).with_health(1_000));
    let b = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(THORNS, a, a)).unwrap();
    engine.apply_aura(AuraRequest::new(THORNS, b, b)).unwrap();

    engine.resolve_damage(DamageRequest::melee(a, b, 100));

    let limit = CombatConfig::DEFAULT_MAX_PROC_CHAIN as usize;
    assert_eq!(
        events.count(|event| matches!(event, CombatEvent::ProcTriggered { .. })),
        limit
    );
    assert_eq!(
        events.count(|event| matches!(event, CombatEvent::ProcChainLimit { .. })),
        1
    );
    // Reflections alternate, starting with the one aimed back at the attacker.
    assert_eq!(health(&engine, a), 1_000 - 5);
    assert_eq!(health(&engine, b), 1_000 - 100 - 5);
    assert_eq!(engine.world().actor(a).unwrap().proc_chain_length, 0);
    assert_eq!(engine.world().actor(b).unwrap().proc_chain_length, 0);
}

#[test]
fn suppressing_auras_block_nested_procs_on_their_holder() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let events = EventLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_events(&events);
    let mut world = World::new(6);
    let a = world.spawn(Actor::creature(EntityId(1), 80).with_health(1_000));
    let b = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(THORNS, a, a)).unwrap();
    engine.apply_aura(AuraRequest::new(QUIET_THORNS, b, b)).unwrap();

    engine.resolve_damage(DamageRequest::melee(a, b, 100));

    // b's reflection and a's answer; nothing procs on b under its own aura.
    assert_eq!(
        events.count(|event| matches!(event, CombatEvent::ProcTriggered { .. })),
        2
    );
    assert_eq!(
        events.count(|event| matches!(event, CombatEvent::ProcChainLimit { .. })),
        0
    );
    assert_eq!(engine.world().actor(b).unwrap().cannot_proc, 0);
}

/// Removes every aura of `victim` on the holder whenever a dummy procs.
struct RemoveOnProc {
    victim: SpellId,
}

impl CombatScripts for RemoveOnProc {
    fn on_proc(&self, engine: &mut CombatEngine<'_>, _aura: AuraId, _slot: u8, event: &ProcEventInfo) {
        engine.remove_auras_by_spell(event.holder, self.victim, None, RemoveMode::Default);
    }
}

#[test]
fn auras_removed_mid_dispatch_do_not_fire() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let scripts = RemoveOnProc { victim: SECOND };
    let env = CombatEnv::new(&book, &config, &rng).with_scripts(&scripts);
    let mut world = World::new(2);
    let a = world.spawn(Actor::creature(EntityId(1), 80));
    let b = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    let first = engine.apply_aura(AuraRequest::new(FIRST, b, b)).unwrap().aura();
    let second = engine.apply_aura(AuraRequest::new(SECOND, b, b)).unwrap().aura();

    let event = ProcEvent::new(a, Some(b))
        .with_flags(ProcFlags::DONE_MELEE_AUTO_ATTACK, ProcFlags::TAKEN_MELEE_AUTO_ATTACK)
        .with_hit(ProcHit::NORMAL);
    let report = engine.dispatch_proc(&event);

    assert_eq!(report.depth, 1);
    assert!(!report.refused);
    assert_eq!(report.eligible, vec![first, second]);
    assert_eq!(report.fired, vec![first]);
    assert!(!engine.has_aura(b, SECOND, None));
}

#[test]
fn fully_absorbed_hits_do_not_proc_for_the_victim() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let env = CombatEnv::new(&book, &config, &rng);
    let mut world = World::new(3);
    let a = world.spawn(Actor::creature(EntityId(1), 80));
    let b = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    let first = engine.apply_aura(AuraRequest::new(FIRST, b, b)).unwrap().aura();

    let absorbed = ProcEvent::new(a, Some(b))
        .with_flags(ProcFlags::DONE_MELEE_AUTO_ATTACK, ProcFlags::TAKEN_MELEE_AUTO_ATTACK)
        .with_hit(ProcHit::ABSORB);
    assert!(engine.dispatch_proc(&absorbed).eligible.is_empty());

    let landed = absorbed.clone().with_hit(ProcHit::NORMAL | ProcHit::ABSORB);
    assert_eq!(engine.dispatch_proc(&landed).fired, vec![first]);
}

#[test]
fn charges_are_spent_per_proc() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let env = CombatEnv::new(&book, &config, &rng);
    let mut world = World::new(4);
    let a = world.spawn(Actor::creature(EntityId(1), 80));
    let b = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    let guard = engine.apply_aura(AuraRequest::new(GUARD, b, b)).unwrap().aura();

    engine.resolve_damage(DamageRequest::melee(a, b, 10));
    assert_eq!(engine.world().aura(guard).map(|aura| aura.charges), Some(1));
    engine.resolve_damage(DamageRequest::melee(a, b, 10));
    assert!(!engine.has_aura(b, GUARD, None));
}

#[test]
fn killing_blow_procs_then_death_strips_auras() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let events = EventLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_events(&events);
    let mut world = World::new(5);
    let killer = world.spawn(
        Actor::creature(EntityId(1), 80).with_power(PowerKind::Mana, ResourceMeter::new(0, 100)),
    );
    let victim = world.spawn(Actor::player(EntityId(2), 80).with_health(500));
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(SPOILS, killer, killer)).unwrap();
    engine.apply_aura(AuraRequest::new(RALLY, victim, victim)).unwrap();
    engine.apply_aura(AuraRequest::new(LAST_STAND, victim, victim)).unwrap();

    let info = engine.resolve_damage(DamageRequest::melee(killer, victim, 800));
    assert_eq!(info.overkill, 300);

    let dead = engine.world().actor(victim).unwrap();
    assert_eq!(dead.death_state, DeathState::JustDied);
    assert_eq!(dead.health.current, 0);
    assert_eq!(
        engine.world().actor(killer).unwrap().power(PowerKind::Mana).current,
        10
    );
    assert!(!engine.has_aura(victim, RALLY, None));
    assert!(engine.has_aura(victim, LAST_STAND, None));
    assert_eq!(
        events.count(|event| matches!(
            event,
            CombatEvent::Died { victim: v, killer: Some(k) } if *v == victim && *k == killer
        )),
        1
    );
}
