use std::path::{Path, PathBuf};

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionResult, TransactionalTree,
};
use sled::Transactional;

use crate::game::errors::GameError;
use crate::game::types::{
    CompletionFilter, CompletionRecord, GuildRecord, QuestRecord, TaskFilter, TaskRecord,
    UserRecord, COMPLETION_SCHEMA_VERSION, GUILD_SCHEMA_VERSION, QUEST_SCHEMA_VERSION,
    TASK_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

const TREE_USERS: &str = "users";
const TREE_USER_EMAILS: &str = "users_by_email";
const TREE_USER_NAMES: &str = "users_by_name";
const TREE_GUILDS: &str = "guilds";
const TREE_TASKS: &str = "tasks";
const TREE_COMPLETIONS: &str = "completions";
const TREE_QUESTS: &str = "quests";

/// Records persisted by [`GameStore`], keyed by their id.
pub(crate) trait StoredRecord: Serialize + DeserializeOwned {
    const ENTITY: &'static str;
    const SCHEMA_VERSION: u8;

    fn id(&self) -> &str;
    fn schema_version(&self) -> u8;
    fn set_schema_version(&mut self, version: u8);
}

macro_rules! stored_record {
    ($ty:ty, $entity:literal, $version:expr) => {
        impl StoredRecord for $ty {
            const ENTITY: &'static str = $entity;
            const SCHEMA_VERSION: u8 = $version;

            fn id(&self) -> &str {
                &self.id
            }

            fn schema_version(&self) -> u8 {
                self.schema_version
            }

            fn set_schema_version(&mut self, version: u8) {
                self.schema_version = version;
            }
        }
    };
}

stored_record!(UserRecord, "user", USER_SCHEMA_VERSION);
stored_record!(GuildRecord, "guild", GUILD_SCHEMA_VERSION);
stored_record!(TaskRecord, "task", TASK_SCHEMA_VERSION);
stored_record!(CompletionRecord, "completion", COMPLETION_SCHEMA_VERSION);
stored_record!(QuestRecord, "quest", QUEST_SCHEMA_VERSION);

pub(crate) fn encode<T: StoredRecord>(record: &T) -> Result<Vec<u8>, GameError> {
    Ok(bincode::serialize(record)?)
}

pub(crate) fn decode<T: StoredRecord>(bytes: &[u8]) -> Result<T, GameError> {
    let record: T = bincode::deserialize(bytes)?;
    if record.schema_version() != T::SCHEMA_VERSION {
        return Err(GameError::SchemaMismatch {
            entity: T::ENTITY,
            expected: T::SCHEMA_VERSION,
            found: record.schema_version(),
        });
    }
    Ok(record)
}

fn index_key(value: &str) -> Vec<u8> {
    value.trim().to_lowercase().into_bytes()
}

/// Read a record inside a transaction, aborting with the decode error if the
/// bytes are unreadable.
pub(crate) fn tx_get<T: StoredRecord>(
    tree: &TransactionalTree,
    id: &str,
) -> ConflictableTransactionResult<Option<T>, GameError> {
    let Some(bytes) = tree.get(id.as_bytes())? else {
        return Ok(None);
    };
    decode(&bytes)
        .map(Some)
        .map_err(ConflictableTransactionError::Abort)
}

/// Like [`tx_get`] but aborts with `NotFound` when the record is absent.
pub(crate) fn tx_require<T: StoredRecord>(
    tree: &TransactionalTree,
    id: &str,
) -> ConflictableTransactionResult<T, GameError> {
    tx_get(tree, id)?.ok_or_else(|| abort(GameError::not_found(T::ENTITY, id)))
}

pub(crate) fn tx_put<T: StoredRecord>(
    tree: &TransactionalTree,
    record: &T,
) -> ConflictableTransactionResult<(), GameError> {
    let bytes = encode(record).map_err(ConflictableTransactionError::Abort)?;
    tree.insert(record.id().as_bytes(), bytes)?;
    Ok(())
}

pub(crate) fn abort(err: GameError) -> ConflictableTransactionError<GameError> {
    ConflictableTransactionError::Abort(err)
}

pub(crate) fn finish<A>(result: TransactionResult<A, GameError>) -> Result<A, GameError> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(err)) => Err(err),
        Err(TransactionError::Storage(err)) => Err(GameError::Sled(err)),
    }
}

/// Number of stored records per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub users: usize,
    pub guilds: usize,
    pub tasks: usize,
    pub completions: usize,
    pub quests: usize,
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct GameStoreBuilder {
    path: PathBuf,
    cache_capacity: Option<u64>,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache_capacity: None,
        }
    }

    /// Override sled's page cache size in bytes.
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = Some(bytes);
        self
    }

    pub fn open(self) -> Result<GameStore, GameError> {
        std::fs::create_dir_all(&self.path)?;
        let mut config = sled::Config::new().path(&self.path);
        if let Some(bytes) = self.cache_capacity {
            config = config.cache_capacity(bytes);
        }
        GameStore::from_db(config.open()?)
    }
}

/// Sled-backed persistence for users, guilds, tasks, completions and quests.
pub struct GameStore {
    db: sled::Db,
    users: sled::Tree,
    user_emails: sled::Tree,
    user_names: sled::Tree,
    guilds: sled::Tree,
    tasks: sled::Tree,
    completions: sled::Tree,
    quests: sled::Tree,
}

impl GameStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        GameStoreBuilder::new(path.as_ref()).open()
    }

    fn from_db(db: sled::Db) -> Result<Self, GameError> {
        Ok(Self {
            users: db.open_tree(TREE_USERS)?,
            user_emails: db.open_tree(TREE_USER_EMAILS)?,
            user_names: db.open_tree(TREE_USER_NAMES)?,
            guilds: db.open_tree(TREE_GUILDS)?,
            tasks: db.open_tree(TREE_TASKS)?,
            completions: db.open_tree(TREE_COMPLETIONS)?,
            quests: db.open_tree(TREE_QUESTS)?,
            db,
        })
    }

    pub(crate) fn users_tree(&self) -> &sled::Tree {
        &self.users
    }

    pub(crate) fn guilds_tree(&self) -> &sled::Tree {
        &self.guilds
    }

    pub(crate) fn tasks_tree(&self) -> &sled::Tree {
        &self.tasks
    }

    pub(crate) fn completions_tree(&self) -> &sled::Tree {
        &self.completions
    }

    pub(crate) fn quests_tree(&self) -> &sled::Tree {
        &self.quests
    }

    /// Flush every tree to disk.
    pub fn flush(&self) -> Result<(), GameError> {
        self.db.flush()?;
        Ok(())
    }

    /// Flush after a committed transaction. The commit already happened, so a
    /// failed flush is logged rather than reported as a failed operation.
    pub(crate) fn flush_committed(&self) {
        if let Err(e) = self.db.flush() {
            warn!("Flush after commit failed: {}", e);
        }
    }

    fn put<T: StoredRecord>(&self, tree: &sled::Tree, mut record: T) -> Result<(), GameError> {
        record.set_schema_version(T::SCHEMA_VERSION);
        let bytes = encode(&record)?;
        tree.insert(record.id().as_bytes(), bytes)?;
        tree.flush()?;
        Ok(())
    }

    fn get<T: StoredRecord>(&self, tree: &sled::Tree, id: &str) -> Result<T, GameError> {
        let Some(bytes) = tree.get(id.as_bytes())? else {
            return Err(GameError::not_found(T::ENTITY, id));
        };
        decode(&bytes)
    }

    fn scan<T: StoredRecord>(&self, tree: &sled::Tree) -> Result<Vec<T>, GameError> {
        tree.iter()
            .map(|entry| {
                let (_key, value) = entry?;
                decode(&value)
            })
            .collect()
    }

    fn remove<T: StoredRecord>(&self, tree: &sled::Tree, id: &str) -> Result<T, GameError> {
        let Some(bytes) = tree.remove(id.as_bytes())? else {
            return Err(GameError::not_found(T::ENTITY, id));
        };
        tree.flush()?;
        decode(&bytes)
    }

    /// Insert a new user, atomically claiming its username and email.
    pub fn insert_user(&self, mut user: UserRecord) -> Result<UserRecord, GameError> {
        user.schema_version = USER_SCHEMA_VERSION;
        let email_key = index_key(&user.email);
        let name_key = index_key(&user.username);
        let result = (&self.users, &self.user_emails, &self.user_names).transaction(
            |(users, emails, names)| -> ConflictableTransactionResult<(), GameError> {
                if emails.get(email_key.as_slice())?.is_some() {
                    return Err(abort(GameError::Conflict(format!(
                        "email already registered: {}",
                        user.email
                    ))));
                }
                if names.get(name_key.as_slice())?.is_some() {
                    return Err(abort(GameError::Conflict(format!(
                        "username already taken: {}",
                        user.username
                    ))));
                }
                tx_put(users, &user)?;
                emails.insert(email_key.as_slice(), user.id.as_bytes())?;
                names.insert(name_key.as_slice(), user.id.as_bytes())?;
                Ok(())
            },
        );
        finish(result)?;
        self.flush_committed();
        Ok(user)
    }

    /// Overwrite an existing user record. Username and email are not re-indexed.
    pub fn put_user(&self, mut user: UserRecord) -> Result<(), GameError> {
        user.touch();
        self.put(&self.users, user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, GameError> {
        self.get(&self.users, user_id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, GameError> {
        let Some(id) = self.user_emails.get(index_key(email))? else {
            return Ok(None);
        };
        let id = String::from_utf8_lossy(&id);
        self.get_user(&id).map(Some)
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>, GameError> {
        self.scan(&self.users)
    }

    pub fn put_guild(&self, guild: GuildRecord) -> Result<(), GameError> {
        self.put(&self.guilds, guild)
    }

    pub fn get_guild(&self, guild_id: &str) -> Result<GuildRecord, GameError> {
        self.get(&self.guilds, guild_id)
    }

    pub fn guild_exists(&self, guild_id: &str) -> Result<bool, GameError> {
        Ok(self.guilds.contains_key(guild_id.as_bytes())?)
    }

    pub fn list_guilds(&self) -> Result<Vec<GuildRecord>, GameError> {
        let mut guilds: Vec<GuildRecord> = self.scan(&self.guilds)?;
        guilds.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(guilds)
    }

    /// Insert or overwrite a task definition.
    pub fn put_task(&self, task: TaskRecord) -> Result<(), GameError> {
        self.put(&self.tasks, task)
    }

    pub fn get_task(&self, task_id: &str) -> Result<TaskRecord, GameError> {
        self.get(&self.tasks, task_id)
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, GameError> {
        let all: Vec<TaskRecord> = self.scan(&self.tasks)?;
        let mut tasks: Vec<TaskRecord> = all
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    pub fn delete_task(&self, task_id: &str) -> Result<TaskRecord, GameError> {
        self.remove(&self.tasks, task_id)
    }

    pub fn get_completion(&self, completion_id: &str) -> Result<CompletionRecord, GameError> {
        self.get(&self.completions, completion_id)
    }

    /// Completions matching `filter`, newest first.
    pub fn list_completions(
        &self,
        filter: &CompletionFilter,
    ) -> Result<Vec<CompletionRecord>, GameError> {
        let all: Vec<CompletionRecord> = self.scan(&self.completions)?;
        let mut completions: Vec<CompletionRecord> = all
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        completions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(completions)
    }

    pub fn put_quest(&self, quest: QuestRecord) -> Result<(), GameError> {
        self.put(&self.quests, quest)
    }

    pub fn get_quest(&self, quest_id: &str) -> Result<QuestRecord, GameError> {
        self.get(&self.quests, quest_id)
    }

    pub fn list_quests(&self, guild_id: Option<&str>) -> Result<Vec<QuestRecord>, GameError> {
        let all: Vec<QuestRecord> = self.scan(&self.quests)?;
        let mut quests: Vec<QuestRecord> = all
            .into_iter()
            .filter(|q| guild_id.map_or(true, |g| q.guild_id == g))
            .collect();
        quests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(quests)
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            users: self.users.len(),
            guilds: self.guilds.len(),
            tasks: self.tasks.len(),
            completions: self.completions.len(),
            quests: self.quests.len(),
        }
    }
}
