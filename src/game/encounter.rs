//! Combat sessions.
//!
//! A session is created by naming an enemy (`fight`), by an ambush while
//! searching for loot, or by a random encounter. Each round the player either
//! flees or fights: both sides roll a d20, the higher roll deals the difference
//! as damage (the player's damage grows 10% per level) and a tie does nothing.
//! The session ends on victory, defeat or flight and is removed from the
//! registry; only the character's stats and inventory are persisted.
//!
//! ```text
//!   NONE ──begin──▶ ENGAGED ──fight──▶ ENGAGED (tie / hit exchanged)
//!                      │
//!                      ├──fight──▶ VICTORY (xp, maybe loot)
//!                      ├──fight──▶ DEFEAT  (hp 0, knocked out)
//!                      └──flee───▶ FLED    (nothing persisted)
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::game::catalogue;
use crate::game::dice::Dice;
use crate::game::errors::GameError;
use crate::game::locations::Location;
use crate::game::progression::apply_xp;
use crate::game::storage::GameStore;
use crate::game::types::{
    CharacterId, CharacterRecord, EnemyTemplate, ItemRecord, NewItem, StatsUpdate,
};
use crate::logutil::escape_log;
use crate::metrics;

/// HP at or below this after a hit is reported as critical.
pub const CRITICAL_HP: i32 = 10;

/// How the session came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncounterOrigin {
    Fight,
    Ambush,
    Random,
}

impl EncounterOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            EncounterOrigin::Fight => "fight",
            EncounterOrigin::Ambush => "ambush",
            EncounterOrigin::Random => "random",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Flee,
    Fight,
}

/// One live fight. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterSession {
    pub id: Uuid,
    pub character_id: CharacterId,
    pub enemy_name: String,
    pub enemy_description: String,
    pub location: Location,
    pub enemy_hp: i32,
    pub max_enemy_hp: i32,
    /// Completed fight rounds.
    pub round: u32,
    pub origin: EncounterOrigin,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl EncounterSession {
    fn new(
        character_id: CharacterId,
        enemy: &EnemyTemplate,
        location: Location,
        enemy_hp: i32,
        origin: EncounterOrigin,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            character_id,
            enemy_name: enemy.name.clone(),
            enemy_description: enemy.description.clone(),
            location,
            enemy_hp,
            max_enemy_hp: enemy_hp,
            round: 0,
            origin,
            started_at: now,
            last_activity: now,
        }
    }
}

/// Both d20 results of a fight round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rolls {
    pub player: u32,
    pub enemy: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VictorySummary {
    pub damage: i32,
    pub xp_gained: u32,
    pub leveled_up: bool,
    pub new_level: u8,
    pub loot: Option<ItemRecord>,
    pub character: CharacterRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    Tie,
    PlayerHit { damage: i32 },
    EnemyHit {
        damage: i32,
        hp: i32,
        critically_wounded: bool,
    },
    Victory(VictorySummary),
    Defeat { damage: i32 },
    Fled,
}

impl RoundOutcome {
    /// True when the session no longer exists after this round.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RoundOutcome::Victory(_) | RoundOutcome::Defeat { .. } | RoundOutcome::Fled
        )
    }
}

/// Result of [`EncounterEngine::submit_decision`]. `session` is the state after the round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub session: EncounterSession,
    pub rolls: Option<Rolls>,
    pub outcome: RoundOutcome,
}

/// Player damage for a winning roll difference: trunc(diff × (1 + level × 0.10)).
pub fn player_damage(diff: u32, level: u8) -> i32 {
    (diff as i64 * (10 + level as i64) / 10) as i32
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_character: HashMap<CharacterId, EncounterSession>,
    by_session: HashMap<Uuid, CharacterId>,
}

/// Live sessions, at most one per character.
#[derive(Debug, Default)]
pub struct EncounterRegistry {
    inner: RwLock<RegistryInner>,
}

impl EncounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert unless the character already has a session.
    fn insert(&self, session: EncounterSession) -> Result<(), GameError> {
        let mut inner = self.write();
        if inner.by_character.contains_key(&session.character_id) {
            return Err(GameError::EncounterAlreadyActive);
        }
        inner.by_session.insert(session.id, session.character_id);
        inner.by_character.insert(session.character_id, session);
        Ok(())
    }

    pub fn get(&self, session_id: Uuid) -> Option<EncounterSession> {
        let inner = self.read();
        let character_id = inner.by_session.get(&session_id)?;
        inner.by_character.get(character_id).cloned()
    }

    pub fn for_character(&self, character_id: CharacterId) -> Option<EncounterSession> {
        self.read().by_character.get(&character_id).cloned()
    }

    fn update(&self, session: &EncounterSession) {
        let mut inner = self.write();
        if let Some(slot) = inner.by_character.get_mut(&session.character_id) {
            if slot.id == session.id {
                *slot = session.clone();
            }
        }
    }

    fn remove(&self, session_id: Uuid) -> Option<EncounterSession> {
        let mut inner = self.write();
        let character_id = inner.by_session.remove(&session_id)?;
        inner.by_character.remove(&character_id)
    }

    pub fn len(&self) -> usize {
        self.read().by_character.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions whose last activity is older than `now - timeout`.
    fn drain_idle(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<EncounterSession> {
        let mut inner = self.write();
        let stale: Vec<CharacterId> = inner
            .by_character
            .values()
            .filter(|s| now.signed_duration_since(s.last_activity) > timeout)
            .map(|s| s.character_id)
            .collect();
        let mut removed = Vec::with_capacity(stale.len());
        for character_id in stale {
            if let Some(session) = inner.by_character.remove(&character_id) {
                inner.by_session.remove(&session.id);
                removed.push(session);
            }
        }
        removed
    }
}

/// Tunables read from `[game]` config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncounterSettings {
    pub loot_drop_chance: f64,
    pub idle_timeout: Duration,
}

impl Default for EncounterSettings {
    fn default() -> Self {
        Self {
            loot_drop_chance: 0.70,
            idle_timeout: Duration::minutes(15),
        }
    }
}

/// Owns the session registry and resolves rounds against the store.
#[derive(Debug, Default)]
pub struct EncounterEngine {
    registry: EncounterRegistry,
    settings: EncounterSettings,
}

impl EncounterEngine {
    pub fn new(settings: EncounterSettings) -> Self {
        Self {
            registry: EncounterRegistry::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &EncounterSettings {
        &self.settings
    }

    pub fn registry(&self) -> &EncounterRegistry {
        &self.registry
    }

    pub fn active_session(&self, character_id: CharacterId) -> Option<EncounterSession> {
        self.registry.for_character(character_id)
    }

    /// Where a new encounter would take place, or why it cannot start.
    fn ready_location(&self, character: &CharacterRecord) -> Result<Location, GameError> {
        if self.registry.for_character(character.id).is_some() {
            return Err(GameError::EncounterAlreadyActive);
        }
        let location = character.active_location.ok_or(GameError::NotInLocation)?;
        if character.is_knocked_out() {
            return Err(GameError::InvalidState(format!(
                "{} is knocked out. HEAL before fighting again.",
                character.display_name()
            )));
        }
        Ok(location)
    }

    fn start(
        &self,
        character: &CharacterRecord,
        enemy: &EnemyTemplate,
        location: Location,
        origin: EncounterOrigin,
        dice: &mut dyn Dice,
    ) -> Result<EncounterSession, GameError> {
        let hp = dice.between(location.profile().enemy_hp);
        let session = EncounterSession::new(character.id, enemy, location, hp, origin);
        self.registry.insert(session.clone())?;
        metrics::record_encounter_started(origin);
        info!(
            "encounter start: char={} enemy={} hp={} origin={} session={}",
            character.id,
            escape_log(&session.enemy_name),
            hp,
            origin.as_str(),
            session.id
        );
        Ok(session)
    }

    /// Engage a named enemy from the character's current area.
    pub fn begin_fight(
        &self,
        store: &GameStore,
        character: &CharacterRecord,
        enemy_name: &str,
        dice: &mut dyn Dice,
    ) -> Result<EncounterSession, GameError> {
        let location = self.ready_location(character)?;
        let enemies = store.enemies_in(location)?;
        let enemy = catalogue::find_enemy(&enemies, enemy_name).ok_or_else(|| {
            GameError::EnemyNotFound {
                enemy: enemy_name.trim().to_string(),
                location: location.name().to_string(),
            }
        })?;
        self.start(character, enemy, location, EncounterOrigin::Fight, dice)
    }

    /// Random enemy from the current area. `Ok(None)` when the area has no enemies.
    pub fn begin_random(
        &self,
        store: &GameStore,
        character: &CharacterRecord,
        dice: &mut dyn Dice,
    ) -> Result<Option<EncounterSession>, GameError> {
        self.begin_sampled(store, character, EncounterOrigin::Random, dice)
    }

    /// Like [`begin_random`](Self::begin_random) but tagged as an ambush.
    pub fn begin_ambush(
        &self,
        store: &GameStore,
        character: &CharacterRecord,
        dice: &mut dyn Dice,
    ) -> Result<Option<EncounterSession>, GameError> {
        self.begin_sampled(store, character, EncounterOrigin::Ambush, dice)
    }

    fn begin_sampled(
        &self,
        store: &GameStore,
        character: &CharacterRecord,
        origin: EncounterOrigin,
        dice: &mut dyn Dice,
    ) -> Result<Option<EncounterSession>, GameError> {
        let location = self.ready_location(character)?;
        let Some(enemy) = store.random_enemy(location, dice)? else {
            return Ok(None);
        };
        self.start(character, &enemy, location, origin, dice).map(Some)
    }

    /// Resolve one round of the session.
    pub fn submit_decision(
        &self,
        session_id: Uuid,
        decision: Decision,
        store: &GameStore,
        dice: &mut dyn Dice,
    ) -> Result<RoundReport, GameError> {
        let mut session = self
            .registry
            .get(session_id)
            .ok_or(GameError::NoActiveEncounter)?;

        if decision == Decision::Flee {
            self.registry.remove(session_id);
            metrics::record_encounter_finished(session.origin, metrics::EncounterResult::Fled);
            info!(
                "encounter fled: char={} enemy={} rounds={}",
                session.character_id,
                escape_log(&session.enemy_name),
                session.round
            );
            return Ok(RoundReport {
                session,
                rolls: None,
                outcome: RoundOutcome::Fled,
            });
        }

        let character = store.get_character_by_id(session.character_id)?;
        let rolls = Rolls {
            player: dice.d20(),
            enemy: dice.d20(),
        };
        session.round += 1;
        session.last_activity = Utc::now();
        debug!(
            "encounter round: session={} round={} player={} enemy={}",
            session.id, session.round, rolls.player, rolls.enemy
        );

        let outcome = if rolls.player == rolls.enemy {
            RoundOutcome::Tie
        } else if rolls.player > rolls.enemy {
            let damage = player_damage(rolls.player - rolls.enemy, character.level);
            session.enemy_hp -= damage;
            if session.enemy_hp <= 0 {
                let summary = self.resolve_victory(&session, &character, damage, store, dice)?;
                self.registry.remove(session_id);
                RoundOutcome::Victory(summary)
            } else {
                RoundOutcome::PlayerHit { damage }
            }
        } else {
            let damage = (rolls.enemy - rolls.player) as i32;
            let hp = (character.hp - damage).max(0);
            store.update_character_stats(character.id, &StatsUpdate::hp(hp))?;
            if hp == 0 {
                self.registry.remove(session_id);
                metrics::record_encounter_finished(session.origin, metrics::EncounterResult::Defeat);
                info!(
                    "encounter defeat: char={} enemy={} rounds={}",
                    character.id,
                    escape_log(&session.enemy_name),
                    session.round
                );
                RoundOutcome::Defeat { damage }
            } else {
                RoundOutcome::EnemyHit {
                    damage,
                    hp,
                    critically_wounded: hp <= CRITICAL_HP,
                }
            }
        };

        if !outcome.is_terminal() {
            self.registry.update(&session);
        }
        Ok(RoundReport {
            session,
            rolls: Some(rolls),
            outcome,
        })
    }

    fn resolve_victory(
        &self,
        session: &EncounterSession,
        character: &CharacterRecord,
        damage: i32,
        store: &GameStore,
        dice: &mut dyn Dice,
    ) -> Result<VictorySummary, GameError> {
        let xp_gained = session.location.profile().victory_xp;
        let progress = apply_xp(character.level, character.xp, character.hp, xp_gained);
        let loot = if dice.chance(self.settings.loot_drop_chance) {
            store
                .random_loot(session.location, dice)?
                .map(|template| NewItem::from(&template))
        } else {
            None
        };
        let update = StatsUpdate {
            level: Some(progress.level),
            xp: Some(progress.xp),
            hp: Some(progress.hp),
            ..StatsUpdate::default()
        };
        let (updated, loot) = store.record_victory(character.id, &update, loot)?;
        metrics::record_encounter_finished(session.origin, metrics::EncounterResult::Victory);
        info!(
            "encounter victory: char={} enemy={} xp={} level={} loot={}",
            character.id,
            escape_log(&session.enemy_name),
            xp_gained,
            progress.level,
            loot.as_ref().map(|i| i.name.as_str()).unwrap_or("-")
        );
        Ok(VictorySummary {
            damage,
            xp_gained,
            leveled_up: progress.leveled_up,
            new_level: progress.level,
            loot,
            character: updated,
        })
    }

    /// Discard a character's session without resolving it (character deleted).
    pub fn abandon(&self, character_id: CharacterId) -> Option<EncounterSession> {
        let session = self.registry.for_character(character_id)?;
        let removed = self.registry.remove(session.id)?;
        metrics::record_encounter_finished(removed.origin, metrics::EncounterResult::Abandoned);
        Some(removed)
    }

    /// Drop sessions idle past `timeout`. Returns what was dropped.
    pub fn expire_idle(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<EncounterSession> {
        let expired = self.registry.drain_idle(now, timeout);
        for session in &expired {
            metrics::record_encounter_finished(session.origin, metrics::EncounterResult::Expired);
            warn!(
                "encounter expired: char={} enemy={} idle_since={}",
                session.character_id,
                escape_log(&session.enemy_name),
                session.last_activity
            );
        }
        expired
    }

    /// [`expire_idle`](Self::expire_idle) with the configured timeout.
    pub fn expire_idle_now(&self) -> Vec<EncounterSession> {
        self.expire_idle(Utc::now(), self.settings.idle_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::ScriptedDice;
    use crate::game::storage::GameStoreBuilder;
    use tempfile::TempDir;

    fn setup(location: Location) -> (TempDir, GameStore, CharacterRecord) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let c = store.create_character("u1", "Gon", None, 100).expect("create");
        let c = store
            .update_character_stats(c.id, &StatsUpdate::location(Some(location)))
            .expect("enter");
        (dir, store, c)
    }

    #[test]
    fn player_damage_scales_with_level() {
        assert_eq!(player_damage(10, 0), 10);
        assert_eq!(player_damage(7, 3), 9);
        assert_eq!(player_damage(16, 10), 32);
        assert_eq!(player_damage(1, 9), 1);
    }

    #[test]
    fn level_zero_fight_won_in_two_rounds() {
        let (_dir, store, c) = setup(Location::HighSchool);
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new()
            .with_values([20])
            .with_rolls([15, 5, 18, 2])
            .with_chances([false]);

        let session = engine
            .begin_fight(&store, &c, "library ghoul", &mut dice)
            .expect("begin");
        assert_eq!(session.max_enemy_hp, 20);

        let first = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round 1");
        assert_eq!(first.outcome, RoundOutcome::PlayerHit { damage: 10 });
        assert_eq!(first.session.enemy_hp, 10);

        let second = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round 2");
        let summary = match second.outcome {
            RoundOutcome::Victory(summary) => summary,
            other => panic!("expected victory, got {:?}", other),
        };
        assert_eq!(summary.damage, 16);
        assert_eq!(summary.xp_gained, 20);
        assert!(!summary.leveled_up);
        assert!(summary.loot.is_none());
        assert_eq!(store.get_character_by_id(c.id).expect("get").xp, 20);
        assert!(engine.active_session(c.id).is_none());
    }

    #[test]
    fn enemy_hits_persist_and_flag_critical() {
        let (_dir, store, c) = setup(Location::HighSchool);
        store
            .update_character_stats(c.id, &StatsUpdate::hp(15))
            .expect("hp");
        let c = store.get_character_by_id(c.id).expect("get");
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new().with_values([20]).with_rolls([2, 8, 1, 20]);
        let session = engine
            .begin_random(&store, &c, &mut dice)
            .expect("begin")
            .expect("enemy");

        let hit = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round");
        assert_eq!(
            hit.outcome,
            RoundOutcome::EnemyHit {
                damage: 6,
                hp: 9,
                critically_wounded: true
            }
        );
        assert_eq!(store.get_character_by_id(c.id).expect("get").hp, 9);

        let down = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round");
        assert_eq!(down.outcome, RoundOutcome::Defeat { damage: 19 });
        let after = store.get_character_by_id(c.id).expect("get");
        assert_eq!(after.hp, 0);
        assert_eq!(after.xp, 0);
        assert!(store.list_inventory(c.id).expect("inv").is_empty());
        assert!(matches!(
            engine.submit_decision(session.id, Decision::Fight, &store, &mut dice),
            Err(GameError::NoActiveEncounter)
        ));
        // knocked out characters cannot start again
        assert!(matches!(
            engine.begin_random(&store, &after, &mut dice),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn critical_flag_starts_at_ten_hp() {
        for (start_hp, left, flagged) in [(16, 10, true), (17, 11, false)] {
            let (_dir, store, c) = setup(Location::HighSchool);
            let c = store
                .update_character_stats(c.id, &StatsUpdate::hp(start_hp))
                .expect("hp");
            let engine = EncounterEngine::default();
            let mut dice = ScriptedDice::new().with_values([20]).with_rolls([2, 8]);
            let session = engine
                .begin_fight(&store, &c, "Janitor", &mut dice)
                .expect("begin");
            let report = engine
                .submit_decision(session.id, Decision::Fight, &store, &mut dice)
                .expect("round");
            assert_eq!(
                report.outcome,
                RoundOutcome::EnemyHit {
                    damage: 6,
                    hp: left,
                    critically_wounded: flagged
                },
                "starting at {} HP",
                start_hp
            );
        }
    }

    #[test]
    fn higher_levels_hit_harder_through_the_round_loop() {
        let (_dir, store, c) = setup(Location::HighSchool);
        let update = StatsUpdate {
            level: Some(5),
            ..StatsUpdate::default()
        };
        let c = store.update_character_stats(c.id, &update).expect("level");
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new()
            .with_values([20])
            .with_rolls([12, 2, 4, 1, 9, 2])
            .with_chances([false]);
        let session = engine
            .begin_fight(&store, &c, "Library Ghoul", &mut dice)
            .expect("begin");

        // diff 10 at level 5: 10 * 15 / 10
        let first = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round 1");
        assert_eq!(first.outcome, RoundOutcome::PlayerHit { damage: 15 });
        assert_eq!(first.session.enemy_hp, 5);

        // diff 3: 45 / 10 rounds down
        let second = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round 2");
        assert_eq!(second.outcome, RoundOutcome::PlayerHit { damage: 4 });
        assert_eq!(second.session.enemy_hp, 1);

        let third = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round 3");
        let summary = match third.outcome {
            RoundOutcome::Victory(summary) => summary,
            other => panic!("expected victory, got {:?}", other),
        };
        assert_eq!(summary.damage, 10);
        assert_eq!(summary.new_level, 5);
        let after = store.get_character_by_id(c.id).expect("get");
        assert_eq!((after.level, after.xp, after.hp), (5, 20, 100));
    }

    #[test]
    fn abandoned_sessions_are_counted() {
        let (_dir, store, c) = setup(Location::HighSchool);
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new();
        engine
            .begin_fight(&store, &c, "Janitor", &mut dice)
            .expect("begin");
        let before = metrics::snapshot().abandoned;
        let dropped = engine.abandon(c.id).expect("session");
        assert_eq!(dropped.character_id, c.id);
        assert!(metrics::snapshot().abandoned > before);
        assert!(engine.active_session(c.id).is_none());
        assert!(engine.abandon(c.id).is_none());
    }

    #[test]
    fn ties_change_nothing_but_the_round() {
        let (_dir, store, c) = setup(Location::HighSchool);
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new().with_values([15]).with_rolls([7, 7]);
        let session = engine
            .begin_fight(&store, &c, "Janitor", &mut dice)
            .expect("begin");
        let report = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round");
        assert_eq!(report.outcome, RoundOutcome::Tie);
        assert_eq!(report.session.enemy_hp, 15);
        assert_eq!(report.session.round, 1);
        assert_eq!(engine.active_session(c.id).expect("session").round, 1);
        assert_eq!(store.get_character_by_id(c.id).expect("get").hp, 100);
    }

    #[test]
    fn one_session_per_character() {
        let (_dir, store, c) = setup(Location::HighSchool);
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new();
        engine
            .begin_fight(&store, &c, "Janitor", &mut dice)
            .expect("begin");
        assert!(matches!(
            engine.begin_fight(&store, &c, "Janitor", &mut dice),
            Err(GameError::EncounterAlreadyActive)
        ));
        assert!(matches!(
            engine.begin_ambush(&store, &c, &mut dice),
            Err(GameError::EncounterAlreadyActive)
        ));
        assert_eq!(engine.registry().len(), 1);
    }

    #[test]
    fn flee_leaves_stats_untouched() {
        let (_dir, store, c) = setup(Location::Beach);
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new().with_rolls([1, 20]);
        let session = engine
            .begin_random(&store, &c, &mut dice)
            .expect("begin")
            .expect("enemy");
        engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round");
        let report = engine
            .submit_decision(session.id, Decision::Flee, &store, &mut dice)
            .expect("flee");
        assert_eq!(report.outcome, RoundOutcome::Fled);
        assert!(report.rolls.is_none());
        assert!(engine.registry().is_empty());
        // the hit taken before fleeing stays
        assert_eq!(store.get_character_by_id(c.id).expect("get").hp, 81);
    }

    #[test]
    fn begin_requires_location_and_known_enemy() {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let c = store.create_character("u1", "Gon", None, 100).expect("create");
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new();
        assert!(matches!(
            engine.begin_fight(&store, &c, "Janitor", &mut dice),
            Err(GameError::NotInLocation)
        ));
        let c = store
            .update_character_stats(c.id, &StatsUpdate::location(Some(Location::Park)))
            .expect("enter");
        assert!(matches!(
            engine.begin_fight(&store, &c, "Janitor", &mut dice),
            Err(GameError::EnemyNotFound { .. })
        ));
    }

    #[test]
    fn victory_can_drop_loot() {
        let (_dir, store, c) = setup(Location::HighSchool);
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new()
            .with_values([10])
            .with_rolls([20, 1])
            .with_chances([true])
            .with_picks([0, 1]);
        let session = engine
            .begin_random(&store, &c, &mut dice)
            .expect("begin")
            .expect("enemy");
        let report = engine
            .submit_decision(session.id, Decision::Fight, &store, &mut dice)
            .expect("round");
        let RoundOutcome::Victory(summary) = report.outcome else {
            panic!("expected victory");
        };
        let loot = summary.loot.expect("loot");
        assert_eq!(store.list_inventory(c.id).expect("inv"), vec![loot]);
    }

    #[test]
    fn idle_sessions_expire() {
        let (_dir, store, c) = setup(Location::HighSchool);
        let engine = EncounterEngine::default();
        let mut dice = ScriptedDice::new();
        engine
            .begin_random(&store, &c, &mut dice)
            .expect("begin")
            .expect("enemy");
        assert!(engine
            .expire_idle(Utc::now(), Duration::minutes(15))
            .is_empty());
        let later = Utc::now() + Duration::minutes(16);
        let expired = engine.expire_idle(later, Duration::minutes(15));
        assert_eq!(expired.len(), 1);
        assert!(engine.active_session(c.id).is_none());
    }
}
