use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sled::IVec;

use super::errors::MudError;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;

const TREE_PLAYERS: &str = "mud_players";
const TREE_PLAYER_NAMES: &str = "mud_player_names";
const TREE_KV: &str = "mud_kv";

/// Persisted part of a player. Everything else about a session lives only in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Assigned by the store on first save; zero until then.
    pub id: u64,
    pub name: String,
    pub money: i64,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(name: &str, money: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.to_string(),
            money,
            created_at: now,
            last_seen: now,
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

/// Storage collaborator used at session creation and teardown only.
pub trait PlayerStore: Send + Sync {
    fn exists(&self, name: &str) -> Result<bool, MudError>;

    fn load(&self, name: &str) -> Result<PlayerRecord, MudError>;

    /// Insert or update `record`, assigning its id if it has none. Returns the id.
    fn save(&self, record: &mut PlayerRecord) -> Result<u64, MudError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), MudError>;
}

/// Sled-backed player records keyed by id, with a lowercase name index.
pub struct SledPlayerStore {
    db: sled::Db,
    players: sled::Tree,
    names: sled::Tree,
    kv: sled::Tree,
}

impl SledPlayerStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MudError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let names = db.open_tree(TREE_PLAYER_NAMES)?;
        let kv = db.open_tree(TREE_KV)?;
        debug!("opened player store at {}", path_ref.display());
        Ok(Self {
            db,
            players,
            names,
            kv,
        })
    }

    fn name_key(name: &str) -> Vec<u8> {
        name.to_lowercase().into_bytes()
    }

    fn id_from(bytes: &IVec) -> Result<u64, MudError> {
        let raw: [u8; 8] = bytes[..].try_into().map_err(|_| {
            MudError::Invariant(format!("name index entry has {} bytes", bytes.len()))
        })?;
        Ok(u64::from_be_bytes(raw))
    }

    /// Get a value previously stored with [`PlayerStore::set`].
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MudError> {
        Ok(self.kv.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

impl PlayerStore for SledPlayerStore {
    fn exists(&self, name: &str) -> Result<bool, MudError> {
        Ok(self.names.contains_key(Self::name_key(name))?)
    }

    fn load(&self, name: &str) -> Result<PlayerRecord, MudError> {
        let Some(id_bytes) = self.names.get(Self::name_key(name))? else {
            return Err(MudError::NotFound(format!("player: {}", name)));
        };
        let id = Self::id_from(&id_bytes)?;
        let Some(bytes) = self.players.get(id.to_be_bytes())? else {
            return Err(MudError::NotFound(format!("player id: {}", id)));
        };
        let record: PlayerRecord = bincode::deserialize(&bytes)?;
        if record.schema_version != PLAYER_SCHEMA_VERSION {
            return Err(MudError::SchemaMismatch {
                entity: "player",
                expected: PLAYER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn save(&self, record: &mut PlayerRecord) -> Result<u64, MudError> {
        if record.id == 0 {
            // sled ids start at zero, which we reserve for "unsaved"
            record.id = self.db.generate_id()? + 1;
        }
        record.schema_version = PLAYER_SCHEMA_VERSION;
        let bytes = bincode::serialize(record)?;
        self.players.insert(record.id.to_be_bytes(), bytes)?;
        self.names
            .insert(Self::name_key(&record.name), record.id.to_be_bytes().to_vec())?;
        self.players.flush()?;
        self.names.flush()?;
        Ok(record.id)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), MudError> {
        self.kv.insert(key.as_bytes(), value)?;
        self.kv.flush()?;
        Ok(())
    }
}

/// Load the record for `name`, or create and save a fresh one with `starting_money`.
pub fn create_or_load_player(
    store: &dyn PlayerStore,
    name: &str,
    starting_money: i64,
) -> Result<PlayerRecord, MudError> {
    if store.exists(name)? {
        let mut record = store.load(name)?;
        record.touch();
        return Ok(record);
    }
    let mut record = PlayerRecord::new(name, starting_money);
    store.save(&mut record)?;
    let key = format!("created:{}", name.to_lowercase());
    if let Err(e) = store.set(&key, record.created_at.to_rfc3339().as_bytes()) {
        warn!("could not note creation time for {}: {}", name, e);
    }
    Ok(record)
}
