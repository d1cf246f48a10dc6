//! Shared fixtures for integration tests.

use nenquest::config::GameConfig;
use nenquest::game::{GameService, GameStore, GameStoreBuilder, ScriptedDice};

/// Fresh store in a temp dir. Keep the `TempDir` alive for the test's duration.
pub fn temp_store() -> (tempfile::TempDir, GameStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = GameStoreBuilder::new(dir.path()).open().expect("open store");
    (dir, store)
}

/// Service over a fresh store with scripted dice and debug commands on.
#[allow(dead_code)]
pub fn scripted_service(dice: ScriptedDice) -> (tempfile::TempDir, GameService) {
    let (dir, store) = temp_store();
    let config = GameConfig {
        allow_debug_commands: true,
        ..GameConfig::default()
    };
    (dir, GameService::with_dice(store, config, Box::new(dice)))
}
