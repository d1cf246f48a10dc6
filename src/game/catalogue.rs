//! Enemy and loot catalogues.
//!
//! The default catalogues ship as JSON in `data/seeds/` and are compiled in.
//! Operators can point the config at their own files instead; the format is the
//! same. Selection is a uniform pick among templates registered for an area.

use std::fs;
use std::path::Path;

use crate::game::dice::Dice;
use crate::game::errors::GameError;
use crate::game::locations::Location;
use crate::game::types::{EnemyTemplate, LootTemplate};

const DEFAULT_ENEMIES: &str = include_str!("../../data/seeds/enemies.json");
const DEFAULT_LOOT: &str = include_str!("../../data/seeds/loot.json");

fn parse_seed<T: serde::de::DeserializeOwned>(label: &str, contents: &str) -> Result<T, GameError> {
    serde_json::from_str(contents).map_err(|e| GameError::SeedFormat {
        origin: label.to_string(),
        message: e.to_string(),
    })
}

pub fn default_enemies() -> Result<Vec<EnemyTemplate>, GameError> {
    parse_seed("built-in enemies.json", DEFAULT_ENEMIES)
}

pub fn default_loot() -> Result<Vec<LootTemplate>, GameError> {
    parse_seed("built-in loot.json", DEFAULT_LOOT)
}

/// Load enemies from a JSON seed file.
pub fn load_enemies_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<EnemyTemplate>, GameError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_seed(&path.display().to_string(), &contents)
}

/// Load loot from a JSON seed file.
pub fn load_loot_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<LootTemplate>, GameError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_seed(&path.display().to_string(), &contents)
}

/// Uniform pick. `None` when nothing is registered.
pub fn pick<'a, T>(templates: &'a [T], dice: &mut dyn Dice) -> Option<&'a T> {
    if templates.is_empty() {
        return None;
    }
    templates.get(dice.pick(templates.len()))
}

/// Case-insensitive exact name lookup among an area's enemies.
pub fn find_enemy<'a>(templates: &'a [EnemyTemplate], name: &str) -> Option<&'a EnemyTemplate> {
    let wanted = name.trim();
    templates
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(wanted))
}

/// Distinct enemy names for an area, in catalogue order.
pub fn enemy_names(templates: &[EnemyTemplate], location: Location) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for t in templates.iter().filter(|t| t.location == location) {
        if !names.contains(&t.name) {
            names.push(t.name.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::ScriptedDice;

    #[test]
    fn built_in_catalogues_cover_every_area_with_enemies() {
        let enemies = default_enemies().expect("enemies");
        for loc in Location::ALL {
            assert!(
                enemies.iter().any(|e| e.location == loc),
                "no enemies for {}",
                loc
            );
        }
        let loot = default_loot().expect("loot");
        assert!(loot.iter().any(|l| l.location == Location::HighSchool));
        assert!(loot.iter().all(|l| l.location != Location::AshLake));
        assert!(loot.iter().any(|l| l.hp_effect < 0), "toxic items exist");
    }

    #[test]
    fn enemy_names_repeat_across_areas() {
        let enemies = default_enemies().expect("enemies");
        let brutes = enemies.iter().filter(|e| e.name == "Brute").count();
        assert!(brutes > 1);
    }

    #[test]
    fn pick_is_none_for_empty_catalogue() {
        let mut dice = ScriptedDice::new();
        let empty: Vec<LootTemplate> = Vec::new();
        assert!(pick(&empty, &mut dice).is_none());
    }

    #[test]
    fn pick_uses_dice_index() {
        let enemies: Vec<EnemyTemplate> = default_enemies()
            .expect("enemies")
            .into_iter()
            .filter(|e| e.location == Location::HighSchool)
            .collect();
        let mut dice = ScriptedDice::new().with_picks([2]);
        let chosen = pick(&enemies, &mut dice).expect("enemy");
        assert_eq!(chosen.name, enemies[2].name);
    }

    #[test]
    fn find_enemy_ignores_case() {
        let enemies = default_enemies().expect("enemies");
        let school: Vec<EnemyTemplate> = enemies
            .into_iter()
            .filter(|e| e.location == Location::HighSchool)
            .collect();
        assert!(find_enemy(&school, "library ghoul").is_some());
        assert!(find_enemy(&school, "Hydra").is_none());
        let names = enemy_names(&school, Location::HighSchool);
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn seed_file_errors_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write");
        let err = load_enemies_from_json(&path).unwrap_err();
        assert!(matches!(err, GameError::SeedFormat { .. }), "{:?}", err);
        assert_eq!(err.kind(), crate::game::errors::ErrorKind::ValidationError);
        assert!(err.to_string().contains("broken.json"));

        let missing = load_loot_from_json(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(missing.kind(), crate::game::errors::ErrorKind::StorageUnavailable);
    }
}
