use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::locations::Location;
use crate::game::progression::{max_hp, MAX_LEVEL};

pub const CHARACTER_SCHEMA_VERSION: u8 = 1;
pub const ITEM_SCHEMA_VERSION: u8 = 1;
pub const TEMPLATE_SCHEMA_VERSION: u8 = 1;

pub type CharacterId = u64;
pub type ItemId = u64;

/// Cosmetic aura affinity picked at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NenType {
    Enhancer,
    Transmuter,
    Emitter,
    Conjurer,
    Manipulator,
    Specialist,
}

impl NenType {
    pub const ALL: [NenType; 6] = [
        NenType::Enhancer,
        NenType::Transmuter,
        NenType::Emitter,
        NenType::Conjurer,
        NenType::Manipulator,
        NenType::Specialist,
    ];

    pub fn parse(input: &str) -> Option<NenType> {
        let wanted = input.trim().to_ascii_lowercase();
        NenType::ALL
            .into_iter()
            .find(|t| t.to_string().to_ascii_lowercase() == wanted)
    }
}

impl fmt::Display for NenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NenType::Enhancer => "Enhancer",
            NenType::Transmuter => "Transmuter",
            NenType::Emitter => "Emitter",
            NenType::Conjurer => "Conjurer",
            NenType::Manipulator => "Manipulator",
            NenType::Specialist => "Specialist",
        };
        f.write_str(name)
    }
}

/// Persisted character profile. Inventory lives in its own tree keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterRecord {
    pub id: CharacterId,
    /// Chat user that owns the character.
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub nen_type: Option<NenType>,
    pub level: u8,
    pub xp: u32,
    pub hp: i32,
    pub gp: u64,
    #[serde(default)]
    pub active_location: Option<Location>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl CharacterRecord {
    pub fn new(id: CharacterId, owner: &str, name: &str, starting_gp: u64) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner: owner.to_string(),
            name: name.to_string(),
            nickname: None,
            nen_type: None,
            level: 0,
            xp: 0,
            hp: max_hp(0),
            gp: starting_gp,
            active_location: None,
            created_at: now,
            updated_at: now,
            schema_version: CHARACTER_SCHEMA_VERSION,
        }
    }

    pub fn with_nen_type(mut self, nen_type: Option<NenType>) -> Self {
        self.nen_type = nen_type;
        self
    }

    pub fn max_hp(&self) -> i32 {
        max_hp(self.level)
    }

    /// HP 0 after a lost fight. Not permanent: healing revives.
    pub fn is_knocked_out(&self) -> bool {
        self.hp <= 0
    }

    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Clamp stats back into their valid ranges.
    pub fn normalize(&mut self) {
        self.level = self.level.min(MAX_LEVEL);
        self.hp = self.hp.clamp(0, self.max_hp());
    }
}

/// Partial stat update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsUpdate {
    pub hp: Option<i32>,
    pub level: Option<u8>,
    pub xp: Option<u32>,
    pub gp: Option<u64>,
    /// `Some(None)` clears the active location.
    pub location: Option<Option<Location>>,
}

impl StatsUpdate {
    pub fn hp(hp: i32) -> Self {
        Self {
            hp: Some(hp),
            ..Self::default()
        }
    }

    pub fn location(location: Option<Location>) -> Self {
        Self {
            location: Some(location),
            ..Self::default()
        }
    }

    pub fn apply(&self, character: &mut CharacterRecord) {
        if let Some(level) = self.level {
            character.level = level;
        }
        if let Some(xp) = self.xp {
            character.xp = xp;
        }
        if let Some(hp) = self.hp {
            character.hp = hp;
        }
        if let Some(gp) = self.gp {
            character.gp = gp;
        }
        if let Some(location) = self.location {
            character.active_location = location;
        }
        character.normalize();
        character.touch();
    }
}

/// Inventory entry owned by exactly one character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub character_id: CharacterId,
    pub name: String,
    pub description: String,
    pub value: u64,
    /// Positive heals, negative is toxic, zero is not consumable.
    pub hp_effect: i32,
    pub acquired_at: DateTime<Utc>,
    pub schema_version: u8,
}

/// Item contents before the store assigns ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub value: u64,
    pub hp_effect: i32,
}

impl NewItem {
    pub fn new(name: &str, description: &str, value: u64, hp_effect: i32) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            value,
            hp_effect,
        }
    }

    pub fn into_record(self, id: ItemId, character_id: CharacterId) -> ItemRecord {
        ItemRecord {
            id,
            character_id,
            name: self.name,
            description: self.description,
            value: self.value,
            hp_effect: self.hp_effect,
            acquired_at: Utc::now(),
            schema_version: ITEM_SCHEMA_VERSION,
        }
    }
}

impl From<&LootTemplate> for NewItem {
    fn from(loot: &LootTemplate) -> Self {
        NewItem::new(&loot.name, &loot.description, loot.value, loot.hp_effect)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnemyTemplate {
    pub name: String,
    pub description: String,
    pub level_min: u8,
    pub level_max: u8,
    pub location: Location,
    #[serde(default = "template_schema_version")]
    pub schema_version: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LootTemplate {
    pub name: String,
    pub description: String,
    pub value: u64,
    pub hp_effect: i32,
    /// Relative weight from the catalogue. Selection is uniform; kept for display.
    pub drop_rate: f64,
    pub location: Location,
    #[serde(default = "template_schema_version")]
    pub schema_version: u8,
}

fn template_schema_version() -> u8 {
    TEMPLATE_SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_character_starts_full_health() {
        let c = CharacterRecord::new(1, "u1", "Gon", 100);
        assert_eq!(c.level, 0);
        assert_eq!(c.hp, 100);
        assert_eq!(c.max_hp(), 100);
        assert_eq!(c.gp, 100);
        assert!(c.active_location.is_none());
        assert_eq!(c.display_name(), "Gon");
    }

    #[test]
    fn stats_update_clamps_hp() {
        let mut c = CharacterRecord::new(1, "u1", "Gon", 100);
        StatsUpdate::hp(500).apply(&mut c);
        assert_eq!(c.hp, 100);
        StatsUpdate::hp(-4).apply(&mut c);
        assert_eq!(c.hp, 0);
        assert!(c.is_knocked_out());

        let update = StatsUpdate {
            level: Some(40),
            hp: Some(999),
            ..StatsUpdate::default()
        };
        update.apply(&mut c);
        assert_eq!(c.level, MAX_LEVEL);
        assert_eq!(c.hp, 300);
    }

    #[test]
    fn location_update_can_clear() {
        let mut c = CharacterRecord::new(1, "u1", "Gon", 100);
        StatsUpdate::location(Some(Location::Beach)).apply(&mut c);
        assert_eq!(c.active_location, Some(Location::Beach));
        StatsUpdate::location(None).apply(&mut c);
        assert_eq!(c.active_location, None);
    }

    #[test]
    fn nen_type_parse() {
        assert_eq!(NenType::parse("enhancer"), Some(NenType::Enhancer));
        assert_eq!(NenType::parse(" SPECIALIST "), Some(NenType::Specialist));
        assert_eq!(NenType::parse("mage"), None);
    }
}
