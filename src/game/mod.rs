//! Game core: data model, sled persistence, the encounter engine and the
//! service/command layers a chat front end talks to.

pub mod catalogue;
pub mod commands;
pub mod dice;
pub mod encounter;
pub mod errors;
pub mod locations;
pub mod progression;
pub mod service;
pub mod shop;
pub mod storage;
pub mod types;
pub mod weather;

pub use commands::{parse_command, CommandProcessor, GameCommand};
pub use dice::{Dice, RngDice, ScriptedDice};
pub use encounter::{
    Decision, EncounterEngine, EncounterOrigin, EncounterSession, RoundOutcome, RoundReport,
};
pub use errors::{ErrorKind, GameError};
pub use locations::Location;
pub use progression::{apply_xp, max_hp, xp_required, MAX_LEVEL};
pub use service::{GameService, SearchOutcome};
pub use shop::{find_shop_item, sell_price, SHOP_ITEMS};
pub use storage::{GameStore, GameStoreBuilder};
pub use types::{CharacterRecord, ItemRecord, NenType, NewItem, StatsUpdate};
pub use weather::Weather;
