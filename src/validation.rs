//! Input validation for character names, nicknames, dice notation and option lists.

use std::collections::HashSet;
use std::fmt;

/// Character name validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("Name is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Name cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Name is reserved")]
    Reserved,
}

/// Malformed `NdM` expression.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Dice must look like 2d6 (count 'd' sides)")]
    Format,

    #[error("Roll between 1 and {max} dice")]
    Count { max: u32 },

    #[error("Dice need between 2 and {max} sides")]
    Sides { max: u32 },
}

/// Name rules configuration
#[derive(Debug, Clone)]
pub struct NameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_spaces: bool,
    pub allow_unicode: bool,
}

impl NameRules {
    /// Character names: short, chat friendly, usable as command arguments.
    pub fn character() -> Self {
        NameRules {
            min_length: 2,
            max_length: 24,
            allow_spaces: true,
            allow_unicode: true,
        }
    }

    /// Nicknames are display-only and a little longer.
    pub fn nickname() -> Self {
        NameRules {
            min_length: 1,
            max_length: 32,
            allow_spaces: true,
            allow_unicode: true,
        }
    }
}

/// Words that would be ambiguous as a character name in chat commands.
fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "system", "everyone", "here", "me", "all", "none",
        "create", "delete", "list", "rename", "nick", "profile", "explore",
        "leave", "shop", "buy", "sell", "remove", "heal", "roll", "fight",
        "attack", "flee", "encounter", "search", "help", "choose",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a name according to the given rules. Returns the accepted name.
pub fn validate_name(name: &str, rules: &NameRules) -> Result<String, NameError> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();

    if length < rules.min_length {
        return Err(NameError::TooShort {
            min: rules.min_length,
        });
    }
    if length > rules.max_length {
        return Err(NameError::TooLong {
            max: rules.max_length,
        });
    }
    if trimmed != name {
        return Err(NameError::InvalidWhitespace);
    }
    if reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(NameError::Reserved);
    }

    let mut invalid: Vec<char> = Vec::new();
    for ch in trimmed.chars() {
        let valid = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '\'' || ch == '.' {
            true
        } else if ch == ' ' {
            rules.allow_spaces
        } else if ch.is_alphanumeric() && !ch.is_ascii() {
            rules.allow_unicode
        } else {
            false
        };
        if !valid && !invalid.contains(&ch) {
            invalid.push(ch);
        }
    }
    if !invalid.is_empty() {
        let chars: String = invalid
            .into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect();
        return Err(NameError::InvalidCharacters { chars });
    }

    Ok(trimmed.to_string())
}

pub fn validate_character_name(name: &str) -> Result<String, NameError> {
    validate_name(name, &NameRules::character())
}

pub fn validate_nickname(name: &str) -> Result<String, NameError> {
    validate_name(name, &NameRules::nickname())
}

pub const MAX_DICE: u32 = 100;
pub const MAX_SIDES: u32 = 1000;

/// Parsed `NdM` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceSpec {
    pub count: u32,
    pub sides: u32,
}

impl fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

/// Parse dice notation such as `1d20`, `3D6` or `d8` (count defaults to 1).
pub fn parse_dice(input: &str) -> Result<DiceSpec, DiceError> {
    let lowered = input.trim().to_ascii_lowercase();
    let (count_part, sides_part) = lowered.split_once('d').ok_or(DiceError::Format)?;

    let count = if count_part.is_empty() {
        1
    } else {
        if !count_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(DiceError::Format);
        }
        count_part.parse::<u32>().map_err(|_| DiceError::Count { max: MAX_DICE })?
    };
    if sides_part.is_empty() || !sides_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(DiceError::Format);
    }
    let sides = sides_part
        .parse::<u32>()
        .map_err(|_| DiceError::Sides { max: MAX_SIDES })?;

    if count == 0 || count > MAX_DICE {
        return Err(DiceError::Count { max: MAX_DICE });
    }
    if !(2..=MAX_SIDES).contains(&sides) {
        return Err(DiceError::Sides { max: MAX_SIDES });
    }
    Ok(DiceSpec { count, sides })
}

/// Split a comma-separated option list, dropping blanks. Needs at least one option.
pub fn parse_options(input: &str) -> Option<Vec<String>> {
    let options: Vec<String> = input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}
