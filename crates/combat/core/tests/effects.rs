use combat_core::state::ControlKind;
use combat_core::testing::{FixedArea, FixedRng, MotionFlags, SpellBook};
use combat_core::{
    Actor, AuraRequest, AuraType, CombatConfig, CombatEngine, CombatEnv, DamageRequest, EntityId,
    MotionOracle, RemoveMode, SpellEffectInfo, SpellId, SpellInfo, SpellSchoolMask, World,
};

const STUN: SpellId = SpellId(400);
const FRAILTY: SpellId = SpellId(401);
const WEAKNESS: SpellId = SpellId(402);
const FORTITUDE_AURA: SpellId = SpellId(403);

fn physical() -> i32 {
    i32::from(SpellSchoolMask::NORMAL.bits())
}

fn book() -> SpellBook {
    SpellBook::new()
        .with(
            SpellInfo::new(STUN, "bash")
                .with_duration(4_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ModStun, 0)),
        )
        .with(
            SpellInfo::new(FRAILTY, "frailty")
                .with_duration(10_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ModDamagePercentTaken, 50).with_misc(physical())),
        )
        .with(
            SpellInfo::new(WEAKNESS, "weakness")
                .with_duration(10_000)
                .with_effect(SpellEffectInfo::aura(AuraType::ModDamagePercentDone, -50).with_misc(physical())),
        )
        .with(
            SpellInfo::new(FORTITUDE_AURA, "fortitude aura")
                .with_duration(60_000)
                .with_effect(SpellEffectInfo::area_aura(AuraType::ModStat, 100).with_misc(0))
                .positive(),
        )
}

#[test]
fn stuns_hold_control_and_stop_movement() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let motion = MotionFlags::new();
    let env = CombatEnv::new(&book, &config, &rng).with_motion(&motion);
    let mut world = World::new(1);
    let caster = world.spawn(Actor::creature(EntityId(1), 80).with_health(1_000));
    let target = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);

    motion.set_moving(target, true);
    let stun = engine.apply_aura(AuraRequest::new(STUN, caster, target)).unwrap().aura();
    assert!(engine.world().actor(target).unwrap().has_control(ControlKind::Stunned));
    assert!(!motion.is_moving(target));

    engine.remove_aura(stun, RemoveMode::Cancel);
    assert!(!engine.world().actor(target).unwrap().has_control(ControlKind::Stunned));
}

#[test]
fn percent_modifiers_scale_damage() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let env = CombatEnv::new(&book, &config, &rng);
    let mut world = World::new(2);
    let attacker = world.spawn(Actor::creature(EntityId(1), 80).with_health(1_000));
    let victim = world.spawn(Actor::player(EntityId(2), 80).with_health(10_000));
    let mut engine = CombatEngine::new(&mut world, env);

    engine.apply_aura(AuraRequest::new(FRAILTY, attacker, victim)).unwrap();
    let taken = engine.resolve_damage(DamageRequest::melee(attacker, victim, 200));
    assert_eq!(taken.amount, 300);

    engine.apply_aura(AuraRequest::new(WEAKNESS, victim, attacker)).unwrap();
    let both = engine.resolve_damage(DamageRequest::melee(attacker, victim, 200));
    assert_eq!(both.amount, 150);
}

#[test]
fn area_auras_follow_the_selected_targets() {
    let book = book();
    let config = CombatConfig::default();
    let rng = FixedRng::lucky();
    let area = FixedArea::new();
    let env = CombatEnv::new(&book, &config, &rng).with_area_selector(&area);
    let mut world = World::new(3);
    let owner = world.spawn(Actor::player(EntityId(1), 80).with_health(1_000));
    let ally = world.spawn(Actor::player(EntityId(2), 80).with_health(1_000));
    let mut engine = CombatEngine::new(&mut world, env);

    area.set(owner, vec![ally]);
    engine.apply_aura(AuraRequest::new(FORTITUDE_AURA, owner, owner)).unwrap();
    assert!(engine.has_aura(ally, FORTITUDE_AURA, None));
    assert_eq!(engine.world().actor(ally).unwrap().health.maximum, 1_100);

    // The ally walks out of range.
    area.set(owner, Vec::new());
    engine.tick(CombatConfig::DEFAULT_AREA_REFRESH_MS as u32);
    assert!(!engine.has_aura(ally, FORTITUDE_AURA, None));
    assert!(engine.has_aura(owner, FORTITUDE_AURA, None));
    assert_eq!(engine.world().actor(ally).unwrap().health.maximum, 1_000);

    area.set(owner, vec![ally]);
    engine.tick(CombatConfig::DEFAULT_AREA_REFRESH_MS as u32);
    assert!(engine.has_aura(ally, FORTITUDE_AURA, None));
}
