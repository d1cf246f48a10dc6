use thiserror::Error;

use crate::validation::{DiceError, NameError};

/// Coarse error categories surfaced to front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    InsufficientFunds,
    ValidationError,
    StorageUnavailable,
}

/// Errors that can arise while running characters, encounters and the store.
#[derive(Debug, Error)]
pub enum GameError {
    /// Returned when fetching a character, item or template that is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate character name.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The character has not entered any location.
    #[error("character is not in a location")]
    NotInLocation,

    /// No enemy with that name roams the character's location.
    #[error("no enemy named '{enemy}' in {location}")]
    EnemyNotFound { enemy: String, location: String },

    /// A session already exists for this character.
    #[error("an encounter is already active for this character")]
    EncounterAlreadyActive,

    /// The session id is unknown or already resolved.
    #[error("no active encounter")]
    NoActiveEncounter,

    /// Any other operation attempted from the wrong state (e.g. knocked out).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Purchase costs more than the character holds.
    #[error("insufficient funds: need {needed} GP, have {available} GP")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Malformed user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Enemy or loot seed JSON that does not parse.
    #[error("invalid seed data in {origin}: {message}")]
    SeedFormat { origin: String, message: String },

    /// Wrapper around sled's error type.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::NotFound(_) | GameError::EnemyNotFound { .. } => ErrorKind::NotFound,
            GameError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            GameError::NotInLocation
            | GameError::EncounterAlreadyActive
            | GameError::NoActiveEncounter
            | GameError::InvalidState(_) => ErrorKind::InvalidState,
            GameError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            GameError::Validation(_) | GameError::SeedFormat { .. } => ErrorKind::ValidationError,
            GameError::StorageUnavailable(_)
            | GameError::Serialization(_)
            | GameError::Io(_)
            | GameError::SchemaMismatch { .. } => ErrorKind::StorageUnavailable,
        }
    }

    /// Short chat-friendly message for the command boundary.
    pub fn user_message(&self) -> String {
        match self {
            GameError::NotFound(what) => format!("Couldn't find {}.", what),
            GameError::AlreadyExists(name) => format!("The name '{}' is already taken.", name),
            GameError::NotInLocation => {
                "You're not in any area. Use EXPLORE <name> <area> first.".to_string()
            }
            GameError::EnemyNotFound { enemy, location } => {
                format!("There's no {} around {}.", enemy, location)
            }
            GameError::EncounterAlreadyActive => {
                "You're already in a fight! ATTACK or FLEE.".to_string()
            }
            GameError::NoActiveEncounter => "You're not fighting anything.".to_string(),
            GameError::InvalidState(reason) => reason.clone(),
            GameError::InsufficientFunds { needed, available } => {
                format!("Not enough GP: need {}, you have {}.", needed, available)
            }
            GameError::Validation(reason) => reason.clone(),
            GameError::SeedFormat { origin, .. } => format!("The seed data in {} is invalid.", origin),
            _ => "The game store is unavailable right now. Try again later.".to_string(),
        }
    }
}

impl From<NameError> for GameError {
    fn from(err: NameError) -> Self {
        GameError::Validation(err.to_string())
    }
}

impl From<DiceError> for GameError {
    fn from(err: DiceError) -> Self {
        GameError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_group_state_errors() {
        assert_eq!(GameError::NotInLocation.kind(), ErrorKind::InvalidState);
        assert_eq!(GameError::EncounterAlreadyActive.kind(), ErrorKind::InvalidState);
        assert_eq!(GameError::NoActiveEncounter.kind(), ErrorKind::InvalidState);
        assert_eq!(
            GameError::EnemyNotFound {
                enemy: "Hydra".into(),
                location: "Beach".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            GameError::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::StorageUnavailable
        );
    }

    #[test]
    fn seed_format_errors_are_validation_errors() {
        let err = GameError::SeedFormat {
            origin: "loot.json".into(),
            message: "expected value at line 1 column 3".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("line 1 column 3"));
    }

    #[test]
    fn storage_failures_hide_details_from_players() {
        let err = GameError::Io(std::io::Error::other("permission denied on /var/db"));
        assert!(!err.user_message().contains("/var/db"));
    }
}
