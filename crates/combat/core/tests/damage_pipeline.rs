use combat_core::state::ResourcePool;
use combat_core::testing::{CastLog, EventLog, FixedRng, SpellBook, ThreatLog};
use combat_core::{
    Actor, AuraInterruptFlags, AuraRequest, AuraType, CastInfo, CastInterruptFlags, CombatConfig,
    CombatEngine, CombatEnv, CombatEvent, DamageRequest, EntityId, HealRequest, HitFlags, PowerKind,
    SpellContext, SpellEffectInfo, SpellId, SpellInfo, SpellSchool, SpellSchoolMask, World,
};

const WARD: SpellId = SpellId(100);
const SMALL_WARD: SpellId = SpellId(101);
const BIG_WARD: SpellId = SpellId(102);
const SLEEP: SpellId = SpellId(103);
const FIREBALL: SpellId = SpellId(104);
const MANA_SHIELD: SpellId = SpellId(105);
const SACRIFICE: SpellId = SpellId(106);
const GUARDIAN_WARD: SpellId = SpellId(107);
const SHATTER: SpellId = SpellId(108);
const FRAILTY: SpellId = SpellId(109);

fn physical() -> i32 {
    i32::from(SpellSchoolMask::NORMAL.bits())
}

fn ward(id: SpellId, capacity: i32, priority: i32) -> SpellInfo {
    let mut spell = SpellInfo::new(id, "ward")
        .with_duration(30_000)
        .with_effect(
            SpellEffectInfo::aura(AuraType::SchoolAbsorb, capacity)
                .with_misc(i32::from(SpellSchoolMask::NORMAL.bits())),
        )
        .positive();
    spell.absorb_priority = priority;
    spell
}

fn book() -> SpellBook {
    let mut sleep = SpellInfo::new(SLEEP, "sleep")
        .with_duration(20_000)
        .with_effect(SpellEffectInfo::aura(AuraType::ModStun, 0));
    sleep.aura_interrupt = AuraInterruptFlags::TAKE_DAMAGE;

    SpellBook::new()
        .with(ward(WARD, 100, 0))
        .with(ward(SMALL_WARD, 500, 1))
        .with(ward(BIG_WARD, 500, 5))
        .with(sleep)
        .with(SpellInfo::new(FIREBALL, "fireball").with_school(SpellSchoolMask::FIRE))
        .with(
            SpellInfo::new(MANA_SHIELD, "mana shield")
                .with_duration(60_000)
                .with_effect(
                    SpellEffectInfo::aura(AuraType::ManaShield, 500)
                        .with_misc(physical())
                        .with_value_multiplier(2.0),
                )
                .positive(),
        )
        .with(
            SpellInfo::new(SACRIFICE, "sacrifice")
                .with_duration(30_000)
                .with_effect(SpellEffectInfo::aura(AuraType::SplitDamagePct, 30).with_misc(physical()))
                .positive(),
        )
        .with(
            SpellInfo::new(GUARDIAN_WARD, "guardian ward")
                .with_duration(30_000)
                .with_effect(SpellEffectInfo::aura(AuraType::SchoolAbsorbOverkill, 1_000).with_misc(physical()))
                .positive(),
        )
        .with(
            SpellInfo::new(SHATTER, "shatter")
                .with_duration(30_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ModTargetAbsorbSchool, 50).with_misc(physical()))
                .positive(),
        )
        .with(
            SpellInfo::new(FRAILTY, "frailty")
                .with_duration(30_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ModDamagePercentTaken, 50).with_misc(physical())),
        )
}

fn spawn_pair(world: &mut World) -> (EntityId, EntityId) {
    let attacker = world.spawn(Actor::creature(EntityId(1), 80));
    let victim = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    (attacker, victim)
}

#[test]
fn plain_hit_then_shielded_hit() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let events = EventLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_events(&events);
    let mut world = World::new(1);
    let (attacker, victim) = spawn_pair(&mut world);
    let mut engine = CombatEngine::new(&mut world, env);

    let info = engine.resolve_damage(DamageRequest::melee(attacker, victim, 300));
    assert_eq!(info.amount, 300);
    assert_eq!(engine.world().actor(victim).unwrap().health.current, 700);

    engine
        .apply_aura(AuraRequest::new(WARD, victim, victim))
        .unwrap();
    let info = engine.resolve_damage(DamageRequest::melee(attacker, victim, 300));
    assert_eq!(info.absorbed, 100);
    assert_eq!(info.amount, 200);
    assert!(info.hit.contains(HitFlags::ABSORB));
    assert!(!info.hit.contains(HitFlags::FULL_ABSORB));
    assert_eq!(engine.world().actor(victim).unwrap().health.current, 500);
    // The depleted shield is gone
    assert!(!engine.has_aura(victim, WARD, None));
    assert_eq!(
        events.count(|event| matches!(event, CombatEvent::Absorb { amount: 100, .. })),
        1
    );
}

#[test]
fn lowest_priority_shield_absorbs_first() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let env = CombatEnv::new(&book, &config, &rng);
    let mut world = World::new(2);
    let (attacker, victim) = spawn_pair(&mut world);
    let mut engine = CombatEngine::new(&mut world, env);

    // Applied high priority first so creation order does not decide
    engine.apply_aura(AuraRequest::new(BIG_WARD, victim, victim)).unwrap();
    engine.apply_aura(AuraRequest::new(SMALL_WARD, victim, victim)).unwrap();

    let info = engine.resolve_damage(DamageRequest::melee(attacker, victim, 200));
    assert_eq!(info.amount, 0);
    assert!(info.hit.contains(HitFlags::FULL_ABSORB));
    assert_eq!(engine.aura_effect_value(victim, SMALL_WARD, 0), Some(300));
    assert_eq!(engine.aura_effect_value(victim, BIG_WARD, 0), Some(500));
}

#[test]
fn final_amount_never_exceeds_original() {
    let book = book();
    let config = CombatConfig::default();
    for raw in [0u32, 1, 7, 150, 999, 25_000] {
        for rng in [FixedRng::lucky(), FixedRng::unlucky(), FixedRng(0x8000_0000)] {
            let env = CombatEnv::new(&book, &config, &rng);
            let mut world = World::new(u64::from(raw));
            let attacker = world.spawn(Actor::creature(EntityId(1), 80));
            let victim = world.spawn(
                Actor::player(EntityId(2), 83)
                    .with_health(100_000)
                    .with_armor(4_000)
                    .with_resistance(SpellSchool::Fire, 250)
                    .with_block_value(40),
            );
            let mut engine = CombatEngine::new(&mut world, env);
            engine.apply_aura(AuraRequest::new(WARD, victim, victim)).unwrap();

            let melee = engine.resolve_damage(DamageRequest::melee(attacker, victim, raw).blocked());
            assert!(melee.amount <= raw, "melee {raw}: {}", melee.amount);

            let crit = engine.resolve_damage(DamageRequest::melee(attacker, victim, raw).critical());
            assert!(crit.amount <= crit.original, "crit {raw}: {}", crit.amount);

            let fire = engine.resolve_damage(DamageRequest::spell(
                Some(attacker),
                victim,
                raw,
                SpellSchoolMask::FIRE,
                SpellContext::new(FIREBALL),
            ));
            assert!(fire.amount <= raw, "fire {raw}: {}", fire.amount);
            assert!(fire.resisted <= raw);
        }
    }
}

#[test]
fn damage_breaks_fragile_auras_and_casts() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let casts = CastLog::new();
    let threat = ThreatLog::new();
    let env = CombatEnv::new(&book, &config, &rng)
        .with_casts(&casts)
        .with_threat(&threat);
    let mut world = World::new(3);
    let (attacker, victim) = spawn_pair(&mut world);
    let mut engine = CombatEngine::new(&mut world, env);

    engine.apply_aura(AuraRequest::new(SLEEP, attacker, victim)).unwrap();
    casts.begin(
        victim,
        CastInfo {
            spell: FIREBALL,
            interrupt: CastInterruptFlags::DAMAGE_CANCELS,
            channeled: false,
        },
    );

    engine.resolve_damage(DamageRequest::melee(attacker, victim, 50));
    assert!(!engine.has_aura(victim, SLEEP, None));
    assert_eq!(casts.interrupted(), vec![victim]);
    assert_eq!(threat.total(attacker, victim), 50.0);
}

#[test]
fn overheal_is_not_effective() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let threat = ThreatLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_threat(&threat);
    let mut world = World::new(4);
    let (healer, target) = spawn_pair(&mut world);
    let mut engine = CombatEngine::new(&mut world, env);

    engine.resolve_damage(DamageRequest::melee(healer, target, 100));
    let info = engine.resolve_heal(HealRequest::new(Some(healer), target, 250));
    assert_eq!(info.amount, 250);
    assert_eq!(info.effective, 100);
    assert_eq!(info.overheal(), 150);
    assert_eq!(engine.world().actor(target).unwrap().health.current, 1_000);

    let forwarded: f32 = threat
        .entries()
        .iter()
        .filter(|entry| entry.forwarded)
        .map(|entry| entry.amount)
        .sum();
    assert_eq!(forwarded, 100.0 * CombatConfig::DEFAULT_HEAL_THREAT_FACTOR);
}

#[test]
fn dead_victims_take_nothing() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let events = EventLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_events(&events);
    let mut world = World::new(5);
    let (attacker, victim) = spawn_pair(&mut world);
    let mut engine = CombatEngine::new(&mut world, env);

    let lethal = engine.resolve_damage(DamageRequest::melee(attacker, victim, 1_500));
    assert_eq!(lethal.overkill, 500);
    assert!(!engine.world().actor(victim).unwrap().is_alive());
    assert_eq!(events.count(|event| matches!(event, CombatEvent::Died { .. })), 1);

    let after = engine.resolve_damage(DamageRequest::melee(attacker, victim, 100));
    assert_eq!(after.amount, 0);
    assert_eq!(events.count(|event| matches!(event, CombatEvent::Died { .. })), 1);
}

#[test]
fn critical_hits_stay_within_original() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let env = CombatEnv::new(&book, &config, &rng);
    let mut world = World::new(6);
    let attacker = world.spawn(Actor::creature(EntityId(1), 80));
    let victim = world.spawn(Actor::player(EntityId(2), 80).with_health(10_000));
    let mut engine = CombatEngine::new(&mut world, env);

    let crit = engine.resolve_damage(DamageRequest::melee(attacker, victim, 100).critical());
    assert!(crit.hit.contains(HitFlags::CRITICAL));
    assert_eq!(crit.amount, 200);
    assert_eq!(crit.original, 200);

    engine.apply_aura(AuraRequest::new(FRAILTY, attacker, victim)).unwrap();
    let frail = engine.resolve_damage(DamageRequest::melee(attacker, victim, 200));
    assert_eq!(frail.amount, 300);
    assert_eq!(frail.original, 300);

    let both = engine.resolve_damage(DamageRequest::melee(attacker, victim, 200).critical());
    assert_eq!(both.amount, 600);
    assert!(both.amount <= both.original);
}

#[test]
fn huge_critical_hits_saturate() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let threat = ThreatLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_threat(&threat);
    let mut world = World::new(7);
    let (attacker, victim) = spawn_pair(&mut world);
    let bystander = world.spawn(Actor::player(EntityId(3), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(WARD, victim, victim)).unwrap();

    let info = engine.resolve_damage(DamageRequest::melee(attacker, victim, u32::MAX - 10).critical());
    assert_eq!(info.original, u32::MAX);
    assert!(info.amount <= info.original);
    assert_eq!(info.absorbed, 100);
    assert!(!engine.world().actor(victim).unwrap().is_alive());

    let heal = engine.resolve_heal(HealRequest::new(Some(attacker), bystander, u32::MAX).critical());
    assert_eq!(heal.amount, u32::MAX);
    assert_eq!(heal.effective, 0);
    assert!(heal.critical);
}

#[test]
fn mana_shield_drains_mana_by_ratio() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let env = CombatEnv::new(&book, &config, &rng);
    let mut world = World::new(8);
    let attacker = world.spawn(Actor::creature(EntityId(1), 80));
    let victim = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000).with_mana(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(MANA_SHIELD, victim, victim)).unwrap();

    let first = engine.resolve_damage(DamageRequest::melee(attacker, victim, 100));
    assert_eq!(first.absorbed, 100);
    assert_eq!(first.amount, 0);
    assert_eq!(engine.world().actor(victim).unwrap().power(PowerKind::Mana).current, 800);
    assert_eq!(engine.aura_effect_value(victim, MANA_SHIELD, 0), Some(400));

    // 800 mana at two per point pays for 400 more.
    let second = engine.resolve_damage(DamageRequest::melee(attacker, victim, 1_000));
    assert_eq!(second.absorbed, 400);
    assert_eq!(second.amount, 600);
    assert_eq!(engine.world().actor(victim).unwrap().power(PowerKind::Mana).current, 0);
    assert!(!engine.has_aura(victim, MANA_SHIELD, None));
    assert_eq!(engine.world().actor(victim).unwrap().health.current, 400);
}

#[test]
fn split_share_counts_as_absorbed() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let events = EventLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_events(&events);
    let mut world = World::new(9);
    let (attacker, victim) = spawn_pair(&mut world);
    let guardian = world.spawn(Actor::player(EntityId(3), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(SACRIFICE, guardian, victim)).unwrap();

    let info = engine.resolve_damage(DamageRequest::melee(attacker, victim, 100));
    assert_eq!(info.absorbed, 30);
    assert_eq!(info.amount, 70);
    assert!(info.hit.contains(HitFlags::ABSORB));
    assert_eq!(engine.world().actor(victim).unwrap().health.current, 930);
    assert_eq!(engine.world().actor(guardian).unwrap().health.current, 970);
    assert_eq!(
        events.count(|event| matches!(
            event,
            CombatEvent::Split { receiver, amount: 30, .. } if *receiver == guardian
        )),
        1
    );
}

#[test]
fn death_prevention_leaves_one_health() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let events = EventLog::new();
    let env = CombatEnv::new(&book, &config, &rng).with_events(&events);
    let mut world = World::new(10);
    let (attacker, victim) = spawn_pair(&mut world);
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(GUARDIAN_WARD, victim, victim)).unwrap();

    let info = engine.resolve_damage(DamageRequest::melee(attacker, victim, 1_500));
    assert_eq!(info.amount, 999);
    assert_eq!(info.death_prevented, 501);
    assert_eq!(info.absorbed, 0);
    assert_eq!(info.overkill, 0);
    let survivor = engine.world().actor(victim).unwrap();
    assert!(survivor.is_alive());
    assert_eq!(survivor.health.current, 1);
    assert_eq!(engine.aura_effect_value(victim, GUARDIAN_WARD, 0), Some(499));
    assert_eq!(events.count(|event| matches!(event, CombatEvent::Died { .. })), 0);
}

#[test]
fn ignored_share_bypasses_shields() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let env = CombatEnv::new(&book, &config, &rng);
    let mut world = World::new(11);
    let (attacker, victim) = spawn_pair(&mut world);
    let mut engine = CombatEngine::new(&mut world, env);
    engine.apply_aura(AuraRequest::new(SHATTER, attacker, attacker)).unwrap();
    engine.apply_aura(AuraRequest::new(SMALL_WARD, victim, victim)).unwrap();

    let info = engine.resolve_damage(DamageRequest::melee(attacker, victim, 300));
    // Half of the hit never reaches the shield.
    assert_eq!(info.absorbed, 150);
    assert_eq!(info.amount, 150);
    assert!(!info.hit.contains(HitFlags::FULL_ABSORB));
    assert_eq!(engine.aura_effect_value(victim, SMALL_WARD, 0), Some(350));
    assert_eq!(engine.world().actor(victim).unwrap().health.current, 850);
}
