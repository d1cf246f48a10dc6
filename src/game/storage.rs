use std::path::{Path, PathBuf};

use log::{debug, info};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{IVec, Transactional};

use crate::game::catalogue::{self, default_enemies, default_loot};
use crate::game::dice::Dice;
use crate::game::errors::GameError;
use crate::game::locations::Location;
use crate::game::types::{
    CharacterId, CharacterRecord, EnemyTemplate, ItemId, ItemRecord, LootTemplate, NenType,
    NewItem, StatsUpdate, CHARACTER_SCHEMA_VERSION, ITEM_SCHEMA_VERSION, TEMPLATE_SCHEMA_VERSION,
};

const TREE_CHARACTERS: &str = "characters";
const TREE_NAMES: &str = "character_names";
const TREE_INVENTORY: &str = "inventory";
const TREE_CATALOGUE: &str = "catalogue";

type TxResult<T> = Result<T, ConflictableTransactionError<GameError>>;

fn abort<T>(err: GameError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

fn flatten(err: TransactionError<GameError>) -> GameError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => GameError::StorageUnavailable(e),
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct GameStoreBuilder {
    path: PathBuf,
    seed_catalogue: bool,
    enemies: Option<Vec<EnemyTemplate>>,
    loot: Option<Vec<LootTemplate>>,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_catalogue: true,
            enemies: None,
            loot: None,
        }
    }

    /// Opt out of seeding the built-in catalogue (useful for targeted tests).
    pub fn without_catalogue_seed(mut self) -> Self {
        self.seed_catalogue = false;
        self
    }

    /// Seed with these templates instead of the built-in catalogue.
    pub fn with_catalogue(mut self, enemies: Vec<EnemyTemplate>, loot: Vec<LootTemplate>) -> Self {
        self.enemies = Some(enemies);
        self.loot = Some(loot);
        self
    }

    pub fn open(self) -> Result<GameStore, GameError> {
        let store = GameStore::open_unseeded(&self.path)?;
        if self.seed_catalogue {
            let enemies = match self.enemies {
                Some(e) => e,
                None => default_enemies()?,
            };
            let loot = match self.loot {
                Some(l) => l,
                None => default_loot()?,
            };
            store.seed_catalogue_if_needed(&enemies, &loot)?;
        }
        Ok(store)
    }
}

/// Sled-backed persistence for characters, inventories and the static catalogues.
#[derive(Clone)]
pub struct GameStore {
    db: sled::Db,
    characters: sled::Tree,
    names: sled::Tree,
    inventory: sled::Tree,
    catalogue: sled::Tree,
}

impl GameStore {
    /// Open (or create) the store rooted at `path`, seeding the built-in catalogue
    /// if no templates exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        GameStoreBuilder::new(path.as_ref()).open()
    }

    fn open_unseeded(path: &Path) -> Result<Self, GameError> {
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        let characters = db.open_tree(TREE_CHARACTERS)?;
        let names = db.open_tree(TREE_NAMES)?;
        let inventory = db.open_tree(TREE_INVENTORY)?;
        let catalogue = db.open_tree(TREE_CATALOGUE)?;
        Ok(Self {
            db,
            characters,
            names,
            inventory,
            catalogue,
        })
    }

    fn character_key(id: CharacterId) -> Vec<u8> {
        format!("characters:{:020}", id).into_bytes()
    }

    fn name_key(name: &str) -> Vec<u8> {
        format!("names:{}", name.trim().to_lowercase()).into_bytes()
    }

    fn item_prefix(character_id: CharacterId) -> Vec<u8> {
        format!("items:{:020}:", character_id).into_bytes()
    }

    fn item_key(character_id: CharacterId, item_id: ItemId) -> Vec<u8> {
        format!("items:{:020}:{:020}", character_id, item_id).into_bytes()
    }

    fn enemy_prefix(location: Location) -> Vec<u8> {
        format!("enemies:{}:", location.slug()).into_bytes()
    }

    fn loot_prefix(location: Location) -> Vec<u8> {
        format!("loot:{}:", location.slug()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(bytes)?)
    }

    fn decode_character(bytes: &[u8]) -> Result<CharacterRecord, GameError> {
        let record: CharacterRecord = Self::deserialize(bytes)?;
        if record.schema_version != CHARACTER_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "character",
                expected: CHARACTER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn decode_item(bytes: &[u8]) -> Result<ItemRecord, GameError> {
        let record: ItemRecord = Self::deserialize(bytes)?;
        if record.schema_version != ITEM_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "item",
                expected: ITEM_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn flush(&self) -> Result<(), GameError> {
        self.db.flush()?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64, GameError> {
        // sled ids start at 0; keep 0 free as a sentinel
        Ok(self.db.generate_id()? + 1)
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// Create a character. Names are unique across all owners, ignoring case.
    pub fn create_character(
        &self,
        owner: &str,
        name: &str,
        nen_type: Option<NenType>,
        starting_gp: u64,
    ) -> Result<CharacterRecord, GameError> {
        let id = self.next_id()?;
        let record = CharacterRecord::new(id, owner, name, starting_gp).with_nen_type(nen_type);
        let bytes = Self::serialize(&record)?;
        let id_bytes = Self::serialize(&id)?;
        let name_key = Self::name_key(name);
        let char_key = Self::character_key(id);

        (&self.characters, &self.names)
            .transaction(|(chars, names)| {
                if names.get(name_key.as_slice())?.is_some() {
                    return abort(GameError::AlreadyExists(name.to_string()));
                }
                names.insert(name_key.as_slice(), id_bytes.as_slice())?;
                chars.insert(char_key.as_slice(), bytes.as_slice())?;
                Ok(())
            })
            .map_err(flatten)?;
        self.flush()?;
        info!("character created: id={} owner={}", id, owner);
        Ok(record)
    }

    /// Fetch a character by owner and name.
    pub fn get_character(&self, owner: &str, name: &str) -> Result<CharacterRecord, GameError> {
        let not_found = || GameError::NotFound(format!("character '{}'", name));
        let Some(id_bytes) = self.names.get(Self::name_key(name))? else {
            return Err(not_found());
        };
        let id: CharacterId = Self::deserialize(&id_bytes)?;
        let record = self.get_character_by_id(id)?;
        if record.owner != owner {
            return Err(not_found());
        }
        Ok(record)
    }

    pub fn get_character_by_id(&self, id: CharacterId) -> Result<CharacterRecord, GameError> {
        let Some(bytes) = self.characters.get(Self::character_key(id))? else {
            return Err(GameError::NotFound(format!("character #{}", id)));
        };
        Self::decode_character(&bytes)
    }

    /// Characters owned by `owner`, oldest first.
    pub fn list_characters(&self, owner: &str) -> Result<Vec<CharacterRecord>, GameError> {
        let mut out = Vec::new();
        for entry in self.characters.scan_prefix(b"characters:") {
            let (_, bytes) = entry?;
            let record = Self::decode_character(&bytes)?;
            if record.owner == owner {
                out.push(record);
            }
        }
        Ok(out)
    }

    pub fn count_characters(&self) -> usize {
        self.characters.len()
    }

    /// Read-modify-write a character in one transaction.
    fn modify_character<F>(&self, id: CharacterId, f: F) -> Result<CharacterRecord, GameError>
    where
        F: Fn(&mut CharacterRecord) -> Result<(), GameError>,
    {
        let key = Self::character_key(id);
        let updated = self
            .characters
            .transaction(|chars| {
                let Some(bytes) = chars.get(key.as_slice())? else {
                    return abort(GameError::NotFound(format!("character #{}", id)));
                };
                let mut record =
                    Self::decode_character(&bytes).map_err(ConflictableTransactionError::Abort)?;
                f(&mut record).map_err(ConflictableTransactionError::Abort)?;
                let encoded = Self::serialize(&record).map_err(ConflictableTransactionError::Abort)?;
                chars.insert(key.as_slice(), encoded)?;
                Ok(record)
            })
            .map_err(flatten)?;
        self.flush()?;
        Ok(updated)
    }

    /// Apply a partial stat update; values are clamped to valid ranges.
    pub fn update_character_stats(
        &self,
        id: CharacterId,
        update: &StatsUpdate,
    ) -> Result<CharacterRecord, GameError> {
        self.modify_character(id, |record| {
            update.apply(record);
            Ok(())
        })
    }

    pub fn set_nickname(
        &self,
        id: CharacterId,
        nickname: Option<String>,
    ) -> Result<CharacterRecord, GameError> {
        self.modify_character(id, |record| {
            record.nickname = nickname.clone();
            record.touch();
            Ok(())
        })
    }

    /// Rename, moving the unique-name index entry atomically.
    pub fn rename_character(
        &self,
        id: CharacterId,
        new_name: &str,
    ) -> Result<CharacterRecord, GameError> {
        let char_key = Self::character_key(id);
        let new_name_key = Self::name_key(new_name);
        let id_bytes = Self::serialize(&id)?;

        let renamed = (&self.characters, &self.names)
            .transaction(|(chars, names)| {
                let Some(bytes) = chars.get(char_key.as_slice())? else {
                    return abort(GameError::NotFound(format!("character #{}", id)));
                };
                let mut record =
                    Self::decode_character(&bytes).map_err(ConflictableTransactionError::Abort)?;
                let old_name_key = Self::name_key(&record.name);
                if old_name_key != new_name_key && names.get(new_name_key.as_slice())?.is_some() {
                    return abort(GameError::AlreadyExists(new_name.to_string()));
                }
                names.remove(old_name_key.as_slice())?;
                names.insert(new_name_key.as_slice(), id_bytes.as_slice())?;
                record.name = new_name.to_string();
                record.touch();
                let encoded = Self::serialize(&record).map_err(ConflictableTransactionError::Abort)?;
                chars.insert(char_key.as_slice(), encoded)?;
                Ok(record)
            })
            .map_err(flatten)?;
        self.flush()?;
        Ok(renamed)
    }

    /// Delete a character together with its whole inventory.
    pub fn delete_character(&self, id: CharacterId) -> Result<CharacterRecord, GameError> {
        let record = self.get_character_by_id(id)?;
        let item_keys: Vec<IVec> = self
            .inventory
            .scan_prefix(Self::item_prefix(id))
            .keys()
            .collect::<Result<_, _>>()?;
        let char_key = Self::character_key(id);
        let name_key = Self::name_key(&record.name);

        (&self.characters, &self.names, &self.inventory)
            .transaction(|(chars, names, inv)| {
                for key in &item_keys {
                    inv.remove(key.clone())?;
                }
                names.remove(name_key.as_slice())?;
                chars.remove(char_key.as_slice())?;
                Ok(())
            })
            .map_err(flatten)?;
        self.flush()?;
        info!(
            "character deleted: id={} items_removed={}",
            id,
            item_keys.len()
        );
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------

    pub fn add_inventory_item(
        &self,
        character_id: CharacterId,
        item: NewItem,
    ) -> Result<ItemRecord, GameError> {
        // ownership check: no orphan items
        self.get_character_by_id(character_id)?;
        let record = item.into_record(self.next_id()?, character_id);
        let bytes = Self::serialize(&record)?;
        self.inventory
            .insert(Self::item_key(character_id, record.id), bytes)?;
        self.flush()?;
        Ok(record)
    }

    pub fn remove_inventory_item(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<ItemRecord, GameError> {
        let Some(bytes) = self.inventory.remove(Self::item_key(character_id, item_id))? else {
            return Err(GameError::NotFound(format!("item #{}", item_id)));
        };
        self.flush()?;
        Self::decode_item(&bytes)
    }

    /// Inventory in acquisition order.
    pub fn list_inventory(&self, character_id: CharacterId) -> Result<Vec<ItemRecord>, GameError> {
        let mut items = Vec::new();
        for entry in self.inventory.scan_prefix(Self::item_prefix(character_id)) {
            let (_, bytes) = entry?;
            items.push(Self::decode_item(&bytes)?);
        }
        Ok(items)
    }

    /// First inventory item whose name matches, ignoring case.
    pub fn find_item(
        &self,
        character_id: CharacterId,
        name: &str,
    ) -> Result<Option<ItemRecord>, GameError> {
        let wanted = name.trim();
        Ok(self
            .list_inventory(character_id)?
            .into_iter()
            .find(|item| item.name.eq_ignore_ascii_case(wanted)))
    }

    /// Debit `price` and add the item, or do neither.
    pub fn purchase(
        &self,
        character_id: CharacterId,
        price: u64,
        item: NewItem,
    ) -> Result<(CharacterRecord, ItemRecord), GameError> {
        let item = item.into_record(self.next_id()?, character_id);
        let item_bytes = Self::serialize(&item)?;
        let item_key = Self::item_key(character_id, item.id);
        let char_key = Self::character_key(character_id);

        let character = (&self.characters, &self.inventory)
            .transaction(|(chars, inv)| {
                let Some(bytes) = chars.get(char_key.as_slice())? else {
                    return abort(GameError::NotFound(format!("character #{}", character_id)));
                };
                let mut record =
                    Self::decode_character(&bytes).map_err(ConflictableTransactionError::Abort)?;
                if record.gp < price {
                    return abort(GameError::InsufficientFunds {
                        needed: price,
                        available: record.gp,
                    });
                }
                record.gp -= price;
                record.touch();
                let encoded = Self::serialize(&record).map_err(ConflictableTransactionError::Abort)?;
                chars.insert(char_key.as_slice(), encoded)?;
                inv.insert(item_key.as_slice(), item_bytes.as_slice())?;
                Ok(record)
            })
            .map_err(flatten)?;
        self.flush()?;
        Ok((character, item))
    }

    /// Remove an item and credit `refund`, or do neither.
    pub fn sell_item(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
        refund: u64,
    ) -> Result<(CharacterRecord, ItemRecord), GameError> {
        self.take_item_and_modify(character_id, item_id, |record, _item| {
            record.gp = record.gp.saturating_add(refund);
        })
    }

    /// Remove an item and apply its HP effect, capped at max HP.
    pub fn consume_item(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
    ) -> Result<(CharacterRecord, ItemRecord), GameError> {
        self.take_item_and_modify(character_id, item_id, |record, item| {
            record.hp = (record.hp + item.hp_effect).clamp(0, record.max_hp());
        })
    }

    fn take_item_and_modify<F>(
        &self,
        character_id: CharacterId,
        item_id: ItemId,
        f: F,
    ) -> Result<(CharacterRecord, ItemRecord), GameError>
    where
        F: Fn(&mut CharacterRecord, &ItemRecord),
    {
        let item_key = Self::item_key(character_id, item_id);
        let char_key = Self::character_key(character_id);

        let result = (&self.characters, &self.inventory)
            .transaction(|(chars, inv)| {
                let Some(item_bytes) = inv.remove(item_key.as_slice())? else {
                    return abort(GameError::NotFound(format!("item #{}", item_id)));
                };
                let item = Self::decode_item(&item_bytes).map_err(ConflictableTransactionError::Abort)?;
                let Some(bytes) = chars.get(char_key.as_slice())? else {
                    return abort(GameError::NotFound(format!("character #{}", character_id)));
                };
                let mut record =
                    Self::decode_character(&bytes).map_err(ConflictableTransactionError::Abort)?;
                f(&mut record, &item);
                record.touch();
                let encoded = Self::serialize(&record).map_err(ConflictableTransactionError::Abort)?;
                chars.insert(char_key.as_slice(), encoded)?;
                Ok((record, item))
            })
            .map_err(flatten)?;
        self.flush()?;
        Ok(result)
    }

    /// Persist a stat update and an optional new item together (victory, loot find).
    pub fn record_victory(
        &self,
        character_id: CharacterId,
        update: &StatsUpdate,
        item: Option<NewItem>,
    ) -> Result<(CharacterRecord, Option<ItemRecord>), GameError> {
        let item = match item {
            Some(item) => Some(item.into_record(self.next_id()?, character_id)),
            None => None,
        };
        let item_bytes = match &item {
            Some(item) => Some(Self::serialize(item)?),
            None => None,
        };
        let item_key = item
            .as_ref()
            .map(|item| Self::item_key(character_id, item.id));
        let char_key = Self::character_key(character_id);

        let character = (&self.characters, &self.inventory)
            .transaction(|(chars, inv)| {
                let Some(bytes) = chars.get(char_key.as_slice())? else {
                    return abort(GameError::NotFound(format!("character #{}", character_id)));
                };
                let mut record =
                    Self::decode_character(&bytes).map_err(ConflictableTransactionError::Abort)?;
                update.apply(&mut record);
                let encoded = Self::serialize(&record).map_err(ConflictableTransactionError::Abort)?;
                chars.insert(char_key.as_slice(), encoded)?;
                if let (Some(key), Some(bytes)) = (&item_key, &item_bytes) {
                    inv.insert(key.as_slice(), bytes.as_slice())?;
                }
                Ok(record)
            })
            .map_err(flatten)?;
        self.flush()?;
        Ok((character, item))
    }

    // ------------------------------------------------------------------
    // Catalogue
    // ------------------------------------------------------------------

    /// Insert the catalogue unless templates already exist. Returns how many were written.
    pub fn seed_catalogue_if_needed(
        &self,
        enemies: &[EnemyTemplate],
        loot: &[LootTemplate],
    ) -> Result<usize, GameError> {
        if !self.catalogue.is_empty() {
            return Ok(0);
        }
        self.write_catalogue(enemies, loot)
    }

    /// Drop every template and write the given catalogue.
    pub fn replace_catalogue(
        &self,
        enemies: &[EnemyTemplate],
        loot: &[LootTemplate],
    ) -> Result<usize, GameError> {
        self.catalogue.clear()?;
        self.write_catalogue(enemies, loot)
    }

    fn write_catalogue(
        &self,
        enemies: &[EnemyTemplate],
        loot: &[LootTemplate],
    ) -> Result<usize, GameError> {
        let mut batch = sled::Batch::default();
        for (idx, enemy) in enemies.iter().enumerate() {
            let mut enemy = enemy.clone();
            enemy.schema_version = TEMPLATE_SCHEMA_VERSION;
            let mut key = Self::enemy_prefix(enemy.location);
            key.extend_from_slice(format!("{:06}", idx).as_bytes());
            batch.insert(key, Self::serialize(&enemy)?);
        }
        for (idx, item) in loot.iter().enumerate() {
            let mut item = item.clone();
            item.schema_version = TEMPLATE_SCHEMA_VERSION;
            let mut key = Self::loot_prefix(item.location);
            key.extend_from_slice(format!("{:06}", idx).as_bytes());
            batch.insert(key, Self::serialize(&item)?);
        }
        self.catalogue.apply_batch(batch)?;
        self.flush()?;
        let written = enemies.len() + loot.len();
        debug!("catalogue written: {} enemies, {} loot", enemies.len(), loot.len());
        Ok(written)
    }

    pub fn enemies_in(&self, location: Location) -> Result<Vec<EnemyTemplate>, GameError> {
        let mut out = Vec::new();
        for entry in self.catalogue.scan_prefix(Self::enemy_prefix(location)) {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(&bytes)?);
        }
        Ok(out)
    }

    pub fn loot_in(&self, location: Location) -> Result<Vec<LootTemplate>, GameError> {
        let mut out = Vec::new();
        for entry in self.catalogue.scan_prefix(Self::loot_prefix(location)) {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(&bytes)?);
        }
        Ok(out)
    }

    /// Uniform random enemy for an area; `None` when the area has no enemies.
    pub fn random_enemy(
        &self,
        location: Location,
        dice: &mut dyn Dice,
    ) -> Result<Option<EnemyTemplate>, GameError> {
        let enemies = self.enemies_in(location)?;
        Ok(catalogue::pick(&enemies, dice).cloned())
    }

    /// Uniform random loot for an area; `None` means nothing to find.
    pub fn random_loot(
        &self,
        location: Location,
        dice: &mut dyn Dice,
    ) -> Result<Option<LootTemplate>, GameError> {
        let loot = self.loot_in(location)?;
        Ok(catalogue::pick(&loot, dice).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::ScriptedDice;
    use tempfile::TempDir;

    fn store() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        (dir, store)
    }

    #[test]
    fn store_round_trip_character() {
        let (_dir, store) = store();
        let created = store
            .create_character("u1", "Gon", Some(NenType::Enhancer), 100)
            .expect("create");
        let fetched = store.get_character("u1", "gon").expect("get");
        assert_eq!(fetched, created);
        assert_eq!(fetched.nen_type, Some(NenType::Enhancer));
        assert_eq!(fetched.schema_version, CHARACTER_SCHEMA_VERSION);
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let (_dir, store) = store();
        store.create_character("u1", "Gon", None, 100).expect("create");
        let err = store.create_character("u2", "GON", None, 100).unwrap_err();
        assert!(matches!(err, GameError::AlreadyExists(_)));
        assert_eq!(store.count_characters(), 1);
    }

    #[test]
    fn other_owners_cannot_fetch() {
        let (_dir, store) = store();
        store.create_character("u1", "Gon", None, 100).expect("create");
        assert!(matches!(
            store.get_character("u2", "Gon"),
            Err(GameError::NotFound(_))
        ));
    }

    #[test]
    fn purchase_is_all_or_nothing() {
        let (_dir, store) = store();
        let c = store.create_character("u1", "Gon", None, 60).expect("create");
        let (after, item) = store
            .purchase(c.id, 50, NewItem::new("Health Potion", "+25 HP", 50, 25))
            .expect("purchase");
        assert_eq!(after.gp, 10);
        assert_eq!(item.character_id, c.id);

        let err = store
            .purchase(c.id, 50, NewItem::new("Health Potion", "+25 HP", 50, 25))
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientFunds {
                needed: 50,
                available: 10
            }
        ));
        assert_eq!(store.list_inventory(c.id).expect("inv").len(), 1);
        assert_eq!(store.get_character_by_id(c.id).expect("get").gp, 10);
    }

    #[test]
    fn consume_caps_at_max_and_removes() {
        let (_dir, store) = store();
        let c = store.create_character("u1", "Gon", None, 100).expect("create");
        store
            .update_character_stats(c.id, &StatsUpdate::hp(90))
            .expect("hp");
        let item = store
            .add_inventory_item(c.id, NewItem::new("Herbs", "Medicinal herbs.", 20, 15))
            .expect("add");
        let (after, used) = store.consume_item(c.id, item.id).expect("consume");
        assert_eq!(after.hp, 100);
        assert_eq!(used.id, item.id);
        assert!(store.list_inventory(c.id).expect("inv").is_empty());
        assert!(matches!(
            store.consume_item(c.id, item.id),
            Err(GameError::NotFound(_))
        ));
    }

    #[test]
    fn rename_moves_the_name_index() {
        let (_dir, store) = store();
        let c = store.create_character("u1", "Gon", None, 100).expect("create");
        store.create_character("u1", "Killua", None, 100).expect("create");
        assert!(matches!(
            store.rename_character(c.id, "killua"),
            Err(GameError::AlreadyExists(_))
        ));
        store.rename_character(c.id, "Gon Freecss").expect("rename");
        assert!(store.get_character("u1", "Gon").is_err());
        assert_eq!(
            store.get_character("u1", "gon freecss").expect("get").id,
            c.id
        );
        // same name with different case is allowed
        store.rename_character(c.id, "GON FREECSS").expect("recase");
    }

    #[test]
    fn delete_cascades_inventory() {
        let (_dir, store) = store();
        let c = store.create_character("u1", "Gon", None, 100).expect("create");
        let other = store.create_character("u1", "Killua", None, 100).expect("create");
        store
            .add_inventory_item(c.id, NewItem::new("Shell", "A small seashell.", 5, 0))
            .expect("add");
        store
            .add_inventory_item(c.id, NewItem::new("Towel", "A worn-out beach towel.", 5, 0))
            .expect("add");
        store
            .add_inventory_item(other.id, NewItem::new("Shell", "A small seashell.", 5, 0))
            .expect("add");

        store.delete_character(c.id).expect("delete");
        assert!(matches!(
            store.get_character("u1", "Gon"),
            Err(GameError::NotFound(_))
        ));
        assert!(store.list_inventory(c.id).expect("inv").is_empty());
        assert_eq!(store.list_inventory(other.id).expect("inv").len(), 1);
        // the name is free again
        store.create_character("u1", "Gon", None, 100).expect("recreate");
    }

    #[test]
    fn catalogue_seeding_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = GameStoreBuilder::new(dir.path()).open().expect("store");
            assert_eq!(
                store.enemies_in(Location::HighSchool).expect("enemies").len(),
                5
            );
        }
        let store = GameStoreBuilder::new(dir.path())
            .without_catalogue_seed()
            .open()
            .expect("reopen");
        let written = store
            .seed_catalogue_if_needed(&default_enemies().expect("e"), &default_loot().expect("l"))
            .expect("seed");
        assert_eq!(written, 0);
        assert_eq!(
            store.enemies_in(Location::HighSchool).expect("enemies").len(),
            5
        );
    }

    #[test]
    fn random_picks_are_location_scoped() {
        let (_dir, store) = store();
        let mut dice = ScriptedDice::new().with_picks([0, 0]);
        let enemy = store
            .random_enemy(Location::Beach, &mut dice)
            .expect("enemy")
            .expect("some");
        assert_eq!(enemy.location, Location::Beach);
        assert!(store
            .random_loot(Location::AshLake, &mut dice)
            .expect("loot")
            .is_none());
    }

    #[test]
    fn reward_writes_stats_and_item_together() {
        let (_dir, store) = store();
        let c = store.create_character("u1", "Gon", None, 100).expect("create");
        let update = StatsUpdate {
            xp: Some(20),
            ..StatsUpdate::default()
        };
        let (after, item) = store
            .record_victory(c.id, &update, Some(NewItem::new("Notebook", "Blank.", 5, 0)))
            .expect("reward");
        assert_eq!(after.xp, 20);
        let item = item.expect("item");
        assert_eq!(store.list_inventory(c.id).expect("inv"), vec![item]);
    }
}
