//! Front-end facing game operations.
//!
//! [`GameService`] is what a chat transport talks to. Every call that reads or
//! writes a character first takes that character's lock from [`CharacterLocks`],
//! so two messages from the same player can never interleave a combat round
//! with a purchase. Different characters never contend: production calls
//! draw from a fresh thread-local generator, so no lock is shared across
//! characters while a round writes to the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};

use crate::config::GameConfig;
use crate::game::dice::{roll_spec, Dice, DiceRoll, RngDice};
use crate::game::encounter::{Decision, EncounterEngine, EncounterSession, RoundReport};
use crate::game::errors::GameError;
use crate::game::locations::Location;
use crate::game::progression::{apply_xp, max_hp, MAX_LEVEL};
use crate::game::shop::{find_shop_item, sell_price};
use crate::game::storage::GameStore;
use crate::game::types::{
    CharacterId, CharacterRecord, ItemRecord, LootTemplate, NenType, NewItem, StatsUpdate,
};
use crate::game::weather::{Weather, WeatherState};
use crate::logutil::{character_tag, escape_log};
use crate::metrics;
use crate::validation::{
    parse_dice, parse_options, validate_character_name, validate_nickname,
};

/// Keyed mutex registry, one lock per character id.
#[derive(Debug, Default)]
pub struct CharacterLocks {
    locks: Mutex<HashMap<CharacterId, Arc<Mutex<()>>>>,
}

impl CharacterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, id: CharacterId) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id).or_default().clone()
    }

    /// Forget the lock of a deleted character.
    pub fn forget(&self, id: CharacterId) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Character sheet plus inventory and any live fight.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub character: CharacterRecord,
    pub inventory: Vec<ItemRecord>,
    pub encounter: Option<EncounterSession>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreReport {
    pub character: CharacterRecord,
    pub location: Location,
    /// Set when the character is below the area's recommended level.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleReport {
    pub character: CharacterRecord,
    pub item: ItemRecord,
    pub refund: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealReport {
    pub character: CharacterRecord,
    pub item: ItemRecord,
    pub healed: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// An enemy jumped out; the session is live.
    Ambush(EncounterSession),
    Found {
        item: ItemRecord,
        xp_gained: u32,
        gp_gained: u64,
        leveled_up: bool,
        character: CharacterRecord,
    },
    Nothing,
}

/// What a search drew before anything is written.
enum SearchDraw {
    Ambush(EncounterSession),
    Loot { template: LootTemplate, gp: u64 },
    Nothing,
}

/// Where service calls get their randomness.
enum DiceSource {
    /// Fresh thread-local generator per call.
    PerCall,
    /// One injected source, locked for the whole call. Serializes every
    /// rolling call, so it is meant for scripted tests and replays.
    Shared(Mutex<Box<dyn Dice + Send>>),
}

/// Game operations over one store and one encounter engine.
pub struct GameService {
    store: GameStore,
    engine: EncounterEngine,
    locks: CharacterLocks,
    config: GameConfig,
    weather: WeatherState,
    dice: DiceSource,
}

impl GameService {
    pub fn new(store: GameStore, config: GameConfig) -> Self {
        Self::build(store, config, DiceSource::PerCall)
    }

    /// Replace the random source, e.g. with scripted dice in tests.
    pub fn with_dice(store: GameStore, config: GameConfig, dice: Box<dyn Dice + Send>) -> Self {
        Self::build(store, config, DiceSource::Shared(Mutex::new(dice)))
    }

    fn build(store: GameStore, config: GameConfig, dice: DiceSource) -> Self {
        let engine = EncounterEngine::new(config.encounter_settings());
        Self {
            store,
            engine,
            locks: CharacterLocks::new(),
            config,
            weather: WeatherState::new(),
            dice,
        }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn engine(&self) -> &EncounterEngine {
        &self.engine
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn roll_with<T>(&self, f: impl FnOnce(&mut dyn Dice) -> T) -> T {
        match &self.dice {
            DiceSource::PerCall => f(&mut RngDice::new(rand::thread_rng())),
            DiceSource::Shared(shared) => {
                let mut dice = shared
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                f(&mut **dice)
            }
        }
    }

    /// Run `f` holding the character's lock, on a fresh read of the record.
    fn with_character<T>(
        &self,
        owner: &str,
        name: &str,
        f: impl FnOnce(CharacterRecord) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let id = self.store.get_character(owner, name)?.id;
        let lock = self.locks.handle(id);
        let _guard = hold(&lock);
        let character = self.store.get_character_by_id(id)?;
        f(character)
    }

    fn ensure_not_fighting(&self, character: &CharacterRecord) -> Result<(), GameError> {
        if self.engine.active_session(character.id).is_some() {
            return Err(GameError::EncounterAlreadyActive);
        }
        Ok(())
    }

    fn sweep_idle(&self) {
        let expired = self.engine.expire_idle_now();
        if !expired.is_empty() {
            info!("expired {} idle encounter(s)", expired.len());
        }
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    pub fn create_character(
        &self,
        owner: &str,
        name: &str,
        nen_type: Option<&str>,
    ) -> Result<CharacterRecord, GameError> {
        let name = validate_character_name(name)?;
        let nen_type = match nen_type {
            Some(raw) => Some(NenType::parse(raw).ok_or_else(|| {
                GameError::Validation(format!(
                    "Unknown Nen type '{}'. Pick one of: Enhancer, Transmuter, Emitter, Conjurer, Manipulator, Specialist.",
                    raw.trim()
                ))
            })?),
            None => None,
        };
        self.store
            .create_character(owner, &name, nen_type, self.config.starting_gp)
    }

    pub fn delete_character(&self, owner: &str, name: &str) -> Result<CharacterRecord, GameError> {
        let deleted = self.with_character(owner, name, |character| {
            if let Some(session) = self.engine.abandon(character.id) {
                warn!(
                    "{} deleted mid-fight, dropping session {}",
                    character_tag(&character),
                    session.id
                );
            }
            self.store.delete_character(character.id)
        })?;
        self.locks.forget(deleted.id);
        Ok(deleted)
    }

    pub fn list_characters(&self, owner: &str) -> Result<Vec<CharacterRecord>, GameError> {
        self.store.list_characters(owner)
    }

    pub fn rename_character(
        &self,
        owner: &str,
        name: &str,
        new_name: &str,
    ) -> Result<CharacterRecord, GameError> {
        let new_name = validate_character_name(new_name)?;
        self.with_character(owner, name, |character| {
            self.store.rename_character(character.id, &new_name)
        })
    }

    /// `None` clears the nickname.
    pub fn set_nickname(
        &self,
        owner: &str,
        name: &str,
        nickname: Option<&str>,
    ) -> Result<CharacterRecord, GameError> {
        let nickname = nickname.map(validate_nickname).transpose()?;
        self.with_character(owner, name, |character| {
            self.store.set_nickname(character.id, nickname)
        })
    }

    pub fn profile(&self, owner: &str, name: &str) -> Result<Profile, GameError> {
        self.with_character(owner, name, |character| {
            let inventory = self.store.list_inventory(character.id)?;
            let encounter = self.engine.active_session(character.id);
            Ok(Profile {
                character,
                inventory,
                encounter,
            })
        })
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    pub fn explore(
        &self,
        owner: &str,
        name: &str,
        location: &str,
    ) -> Result<ExploreReport, GameError> {
        let location = Location::parse(location).ok_or_else(|| {
            GameError::Validation(format!(
                "Unknown area '{}'. Try LOCATIONS.",
                location.trim()
            ))
        })?;
        self.with_character(owner, name, |character| {
            self.ensure_not_fighting(&character)?;
            let warning = location.level_warning(character.level);
            if warning.is_some() {
                warn!(
                    "{} entering {} under-levelled",
                    character_tag(&character),
                    location.slug()
                );
            }
            let character = self
                .store
                .update_character_stats(character.id, &StatsUpdate::location(Some(location)))?;
            Ok(ExploreReport {
                character,
                location,
                warning,
            })
        })
    }

    pub fn leave(&self, owner: &str, name: &str) -> Result<CharacterRecord, GameError> {
        self.with_character(owner, name, |character| {
            self.ensure_not_fighting(&character)?;
            if character.active_location.is_none() {
                return Err(GameError::NotInLocation);
            }
            self.store
                .update_character_stats(character.id, &StatsUpdate::location(None))
        })
    }

    // ------------------------------------------------------------------
    // Shop and inventory
    // ------------------------------------------------------------------

    pub fn buy(
        &self,
        owner: &str,
        name: &str,
        item: &str,
    ) -> Result<(CharacterRecord, ItemRecord), GameError> {
        let shop_item = find_shop_item(item)
            .ok_or_else(|| GameError::NotFound(format!("'{}' in the shop", item.trim())))?;
        self.with_character(owner, name, |character| {
            self.store
                .purchase(character.id, shop_item.price, shop_item.to_new_item())
        })
    }

    pub fn sell(&self, owner: &str, name: &str, item: &str) -> Result<SaleReport, GameError> {
        self.with_character(owner, name, |character| {
            let owned = self.owned_item(&character, item)?;
            let refund = sell_price(owned.value, self.config.sell_ratio);
            let (character, item) = self.store.sell_item(character.id, owned.id, refund)?;
            Ok(SaleReport {
                character,
                item,
                refund,
            })
        })
    }

    pub fn remove_item(&self, owner: &str, name: &str, item: &str) -> Result<ItemRecord, GameError> {
        self.with_character(owner, name, |character| {
            let owned = self.owned_item(&character, item)?;
            self.store.remove_inventory_item(character.id, owned.id)
        })
    }

    /// Use a healing item. Works while knocked out, which is how a character recovers.
    pub fn heal(&self, owner: &str, name: &str, item: &str) -> Result<HealReport, GameError> {
        self.with_character(owner, name, |character| {
            let owned = self.owned_item(&character, item)?;
            if owned.hp_effect <= 0 {
                return Err(GameError::Validation(format!(
                    "{} doesn't heal anything.",
                    owned.name
                )));
            }
            let before = character.hp;
            let (character, item) = self.store.consume_item(character.id, owned.id)?;
            Ok(HealReport {
                healed: character.hp - before,
                character,
                item,
            })
        })
    }

    fn owned_item(&self, character: &CharacterRecord, item: &str) -> Result<ItemRecord, GameError> {
        self.store
            .find_item(character.id, item)?
            .ok_or_else(|| GameError::NotFound(format!("'{}' in your inventory", item.trim())))
    }

    // ------------------------------------------------------------------
    // Exploration and combat
    // ------------------------------------------------------------------

    /// Look for loot in the current area. May trigger an ambush instead.
    pub fn search(&self, owner: &str, name: &str) -> Result<SearchOutcome, GameError> {
        self.sweep_idle();
        self.with_character(owner, name, |character| {
            self.ensure_not_fighting(&character)?;
            let location = character.active_location.ok_or(GameError::NotInLocation)?;
            if character.is_knocked_out() {
                return Err(GameError::InvalidState(format!(
                    "{} is knocked out. HEAL first.",
                    character.display_name()
                )));
            }

            let draw = self.roll_with(|dice| -> Result<SearchDraw, GameError> {
                if dice.chance(self.config.ambush_chance) {
                    if let Some(session) = self.engine.begin_ambush(&self.store, &character, dice)? {
                        return Ok(SearchDraw::Ambush(session));
                    }
                }
                Ok(match self.store.random_loot(location, dice)? {
                    Some(template) => SearchDraw::Loot {
                        template,
                        gp: dice.between(location.profile().search_gp).max(0) as u64,
                    },
                    None => SearchDraw::Nothing,
                })
            })?;
            let (loot, gp_gained) = match draw {
                SearchDraw::Ambush(session) => return Ok(SearchOutcome::Ambush(session)),
                SearchDraw::Nothing => return Ok(SearchOutcome::Nothing),
                SearchDraw::Loot { template, gp } => (template, gp),
            };
            let xp_gained = location.profile().loot_xp;
            let progress = apply_xp(character.level, character.xp, character.hp, xp_gained);
            let update = StatsUpdate {
                level: Some(progress.level),
                xp: Some(progress.xp),
                hp: Some(progress.hp),
                gp: Some(character.gp.saturating_add(gp_gained)),
                ..StatsUpdate::default()
            };
            let (character, item) =
                self.store
                    .record_victory(character.id, &update, Some(NewItem::from(&loot)))?;
            let Some(item) = item else {
                return Ok(SearchOutcome::Nothing);
            };
            metrics::inc_loot_found();
            info!(
                "{} found {} and {} GP",
                character_tag(&character),
                escape_log(&item.name),
                gp_gained
            );
            Ok(SearchOutcome::Found {
                item,
                xp_gained,
                gp_gained,
                leveled_up: progress.leveled_up,
                character,
            })
        })
    }

    /// Random enemy from the current area. `None` when nothing lives there.
    pub fn random_encounter(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<EncounterSession>, GameError> {
        self.sweep_idle();
        self.with_character(owner, name, |character| {
            self.roll_with(|dice| self.engine.begin_random(&self.store, &character, dice))
        })
    }

    pub fn fight(
        &self,
        owner: &str,
        name: &str,
        enemy: &str,
    ) -> Result<EncounterSession, GameError> {
        self.sweep_idle();
        self.with_character(owner, name, |character| {
            self.roll_with(|dice| self.engine.begin_fight(&self.store, &character, enemy, dice))
        })
    }

    /// Resolve a round of the character's current fight.
    pub fn decide(
        &self,
        owner: &str,
        name: &str,
        decision: Decision,
    ) -> Result<RoundReport, GameError> {
        self.sweep_idle();
        self.with_character(owner, name, |character| {
            let session = self
                .engine
                .active_session(character.id)
                .ok_or(GameError::NoActiveEncounter)?;
            self.roll_with(|dice| {
                self.engine
                    .submit_decision(session.id, decision, &self.store, dice)
            })
        })
    }

    pub fn attack(&self, owner: &str, name: &str) -> Result<RoundReport, GameError> {
        self.decide(owner, name, Decision::Fight)
    }

    pub fn flee(&self, owner: &str, name: &str) -> Result<RoundReport, GameError> {
        self.decide(owner, name, Decision::Flee)
    }

    // ------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------

    pub fn roll(&self, expr: &str) -> Result<DiceRoll, GameError> {
        let spec = parse_dice(expr)?;
        Ok(self.roll_with(|dice| roll_spec(spec, dice)))
    }

    pub fn choose(&self, options: &str) -> Result<String, GameError> {
        let options = parse_options(options)
            .ok_or_else(|| GameError::Validation("Give me some options: CHOOSE a, b, c".to_string()))?;
        let idx = self.roll_with(|dice| dice.pick(options.len()));
        Ok(options[idx].clone())
    }

    /// Current weather, which may have just changed.
    pub fn weather(&self) -> Weather {
        let chance = self.config.weather_change_chance;
        self.roll_with(|dice| self.weather.check(chance, dice))
    }

    /// Debug helper: jump to a level with full HP and no XP.
    pub fn set_level(
        &self,
        owner: &str,
        name: &str,
        level: u8,
    ) -> Result<CharacterRecord, GameError> {
        if !self.config.allow_debug_commands {
            return Err(GameError::InvalidState(
                "Debug commands are disabled.".to_string(),
            ));
        }
        if level > MAX_LEVEL {
            return Err(GameError::Validation(format!(
                "Level must be between 0 and {}.",
                MAX_LEVEL
            )));
        }
        self.with_character(owner, name, |character| {
            let update = StatsUpdate {
                level: Some(level),
                xp: Some(0),
                hp: Some(max_hp(level)),
                ..StatsUpdate::default()
            };
            let updated = self.store.update_character_stats(character.id, &update)?;
            warn!("{} set to level {} via debug command", character_tag(&updated), level);
            Ok(updated)
        })
    }
}
