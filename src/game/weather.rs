//! Shared sky over every area.
//!
//! One weather value for the whole game. Each `WEATHER` check may shift it to
//! a random condition with the configured probability.

use std::fmt;
use std::sync::Mutex;

use log::debug;

use crate::game::dice::Dice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weather {
    Sunny,
    Rainy,
    Stormy,
    Foggy,
    Clear,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Sunny,
        Weather::Rainy,
        Weather::Stormy,
        Weather::Foggy,
        Weather::Clear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weather::Sunny => "Sunny",
            Weather::Rainy => "Rainy",
            Weather::Stormy => "Stormy",
            Weather::Foggy => "Foggy",
            Weather::Clear => "Clear",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current weather behind a lock. Starts sunny.
#[derive(Debug)]
pub struct WeatherState {
    current: Mutex<Weather>,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self {
            current: Mutex::new(Weather::Sunny),
        }
    }
}

impl WeatherState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Weather {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Maybe shift to a random condition (possibly the same one), then report it.
    pub fn check(&self, change_chance: f64, dice: &mut dyn Dice) -> Weather {
        let next = if dice.chance(change_chance) {
            Some(Weather::ALL[dice.pick(Weather::ALL.len())])
        } else {
            None
        };
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = next {
            if next != *current {
                debug!("weather: {} -> {}", *current, next);
            }
            *current = next;
        }
        *current
    }
}
