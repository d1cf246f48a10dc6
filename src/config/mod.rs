//! # Configuration
//!
//! TOML configuration for the game bot. Two sections:
//!
//! - [`GameConfig`] - store location, starting funds and the encounter/loot tunables
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ```rust,no_run
//! use nenquest::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Data dir: {}", config.game.data_dir);
//!     Ok(())
//! }
//! ```
//!
//! ```toml
//! [game]
//! name = "NenQuest"
//! data_dir = "./data/nenquest"
//! starting_gp = 100
//! ambush_chance = 0.2
//! loot_drop_chance = 0.7
//! sell_ratio = 0.5
//! encounter_idle_timeout_secs = 900
//! weather_change_chance = 0.3
//! allow_debug_commands = false
//!
//! [logging]
//! level = "info"
//! file = "nenquest.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::game::encounter::EncounterSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub name: String,
    /// Sled database directory.
    pub data_dir: String,
    #[serde(default = "default_starting_gp")]
    pub starting_gp: u64,
    /// Chance that searching for loot starts a fight instead.
    #[serde(default = "default_ambush_chance")]
    pub ambush_chance: f64,
    /// Chance that a won fight drops an item.
    #[serde(default = "default_loot_drop_chance")]
    pub loot_drop_chance: f64,
    /// Share of an item's value refunded when selling.
    #[serde(default = "default_sell_ratio")]
    pub sell_ratio: f64,
    #[serde(default = "default_idle_timeout")]
    pub encounter_idle_timeout_secs: u64,
    /// Chance that a WEATHER check shifts the weather.
    #[serde(default = "default_weather_change_chance")]
    pub weather_change_chance: f64,
    /// Optional JSON overrides for the built-in catalogues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemy_seed_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loot_seed_file: Option<String>,
    /// Enables SETLEVEL.
    #[serde(default)]
    pub allow_debug_commands: bool,
}

fn default_starting_gp() -> u64 {
    100
}

fn default_ambush_chance() -> f64 {
    0.20
}

fn default_loot_drop_chance() -> f64 {
    0.70
}

fn default_sell_ratio() -> f64 {
    0.5
}

fn default_idle_timeout() -> u64 {
    900
}

fn default_weather_change_chance() -> f64 {
    0.30
}

const MAX_IDLE_TIMEOUT_SECS: u64 = 365 * 24 * 3600;

impl GameConfig {
    pub fn encounter_settings(&self) -> EncounterSettings {
        EncounterSettings {
            loot_drop_chance: self.loot_drop_chance,
            // capped at a year
            idle_timeout: chrono::Duration::seconds(
                self.encounter_idle_timeout_secs.min(MAX_IDLE_TIMEOUT_SECS) as i64,
            ),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: "NenQuest".to_string(),
            data_dir: "./data/nenquest".to_string(),
            starting_gp: default_starting_gp(),
            ambush_chance: default_ambush_chance(),
            loot_drop_chance: default_loot_drop_chance(),
            sell_ratio: default_sell_ratio(),
            encounter_idle_timeout_secs: default_idle_timeout(),
            weather_change_chance: default_weather_change_chance(),
            enemy_seed_file: None,
            loot_seed_file: None,
            allow_debug_commands: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("nenquest.log".to_string()),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let game = &self.game;
        if game.data_dir.trim().is_empty() {
            return Err(anyhow!("game.data_dir must not be empty"));
        }
        for (key, value) in [
            ("ambush_chance", game.ambush_chance),
            ("loot_drop_chance", game.loot_drop_chance),
            ("sell_ratio", game.sell_ratio),
            ("weather_change_chance", game.weather_change_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("game.{} must be between 0 and 1, got {}", key, value));
            }
        }
        if game.encounter_idle_timeout_secs == 0 {
            return Err(anyhow!("game.encounter_idle_timeout_secs must be positive"));
        }
        Ok(())
    }
}
