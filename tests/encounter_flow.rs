mod common;

use nenquest::game::types::StatsUpdate;
use nenquest::game::{
    Decision, EncounterEngine, GameError, Location, RngDice, RoundOutcome, ScriptedDice,
    MAX_LEVEL, xp_required,
};

// Level 0 vs a 20 HP enemy: 15/5 then 18/2 wins in two rounds for 20 XP.
#[test]
fn scripted_two_round_victory() {
    let (_dir, store) = common::temp_store();
    let c = store.create_character("alice", "Gon", None, 100).expect("create");
    let c = store
        .update_character_stats(c.id, &StatsUpdate::location(Some(Location::HighSchool)))
        .expect("enter");

    let engine = EncounterEngine::default();
    let mut dice = ScriptedDice::new().with_values([20]).with_rolls([15, 5, 18, 2]);
    let session = engine
        .begin_fight(&store, &c, "Possessed Locker", &mut dice)
        .expect("begin");

    let r1 = engine
        .submit_decision(session.id, Decision::Fight, &store, &mut dice)
        .expect("round 1");
    assert_eq!(r1.session.enemy_hp, 10);
    assert!(!r1.outcome.is_terminal());

    let r2 = engine
        .submit_decision(session.id, Decision::Fight, &store, &mut dice)
        .expect("round 2");
    match r2.outcome {
        RoundOutcome::Victory(v) => {
            assert_eq!(v.xp_gained, 20);
            assert_eq!(v.character.xp, 20);
            assert_eq!(v.character.level, 0);
        }
        other => panic!("expected victory, got {:?}", other),
    }
    assert!(engine.active_session(c.id).is_none());
}

#[test]
fn second_session_is_rejected_until_first_ends() {
    let (_dir, store) = common::temp_store();
    let c = store.create_character("alice", "Gon", None, 100).expect("create");
    let c = store
        .update_character_stats(c.id, &StatsUpdate::location(Some(Location::Forest)))
        .expect("enter");
    let engine = EncounterEngine::default();
    let mut dice = ScriptedDice::new();
    let first = engine
        .begin_random(&store, &c, &mut dice)
        .expect("begin")
        .expect("enemy");
    assert!(matches!(
        engine.begin_random(&store, &c, &mut dice),
        Err(GameError::EncounterAlreadyActive)
    ));
    engine
        .submit_decision(first.id, Decision::Flee, &store, &mut dice)
        .expect("flee");
    assert!(engine
        .begin_random(&store, &c, &mut dice)
        .expect("begin again")
        .is_some());
}

// Seeded fights always end and never break the stat invariants.
#[test]
fn seeded_fights_keep_invariants() {
    let (_dir, store) = common::temp_store();
    let engine = EncounterEngine::default();
    let mut dice = RngDice::seeded(2024);

    for (i, location) in Location::ALL.into_iter().enumerate() {
        let c = store
            .create_character("alice", &format!("Hunter {}", i), None, 100)
            .expect("create");
        let c = store
            .update_character_stats(c.id, &StatsUpdate::location(Some(location)))
            .expect("enter");
        let session = engine
            .begin_random(&store, &c, &mut dice)
            .expect("begin")
            .expect("enemy");
        let mut rounds = 0;
        loop {
            rounds += 1;
            assert!(rounds < 10_000, "fight never ended");
            let report = engine
                .submit_decision(session.id, Decision::Fight, &store, &mut dice)
                .expect("round");
            let now = store.get_character_by_id(c.id).expect("get");
            assert!(now.hp >= 0 && now.hp <= now.max_hp());
            assert!(now.level <= MAX_LEVEL);
            assert!(now.xp < xp_required(now.level));
            if report.outcome.is_terminal() {
                break;
            }
        }
    }
    assert!(engine.registry().is_empty());
}

#[test]
fn same_seed_same_fight() {
    fn play(seed: u64) -> Vec<(Option<nenquest::game::encounter::Rolls>, i32)> {
        let (_dir, store) = common::temp_store();
        let c = store.create_character("alice", "Gon", None, 100).expect("create");
        let c = store
            .update_character_stats(c.id, &StatsUpdate::location(Some(Location::Beach)))
            .expect("enter");
        let engine = EncounterEngine::default();
        let mut dice = RngDice::seeded(seed);
        let session = engine
            .begin_random(&store, &c, &mut dice)
            .expect("begin")
            .expect("enemy");
        let mut trace = Vec::new();
        loop {
            let report = engine
                .submit_decision(session.id, Decision::Fight, &store, &mut dice)
                .expect("round");
            trace.push((report.rolls, report.session.enemy_hp));
            if report.outcome.is_terminal() {
                break;
            }
        }
        trace
    }

    assert_eq!(play(99), play(99));
}
