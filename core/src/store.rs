//! Learner session store with explicit persistence.
//!
//! # Design
//! `UserStore` is created once at application start with `load`, passed to
//! whatever needs the current user, and written back with `save`. Mutations
//! only touch memory. Only `user` and `isAuthenticated` are persisted; the
//! transient error field never reaches storage.
//!
//! Storage is a string key/value `Storage` trait so the same store runs
//! against an in-memory map in tests and a directory of JSON files on disk.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Key under which the session is persisted.
pub const STORAGE_KEY: &str = "mcat-user-storage";

const STORAGE_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("persisted session is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable string key/value storage.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// A signed-in learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_score: Option<u16>,
}

/// Fields of `UserStore` that survive a restart.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    user: Option<User>,
    is_authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    state: PersistedState,
    version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStore {
    user: Option<User>,
    is_authenticated: bool,
    error: Option<String>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the session from `storage`. A missing entry yields an empty
    /// store; a corrupt one is reported rather than silently discarded.
    pub fn load(storage: &dyn Storage) -> Result<Self, StoreError> {
        let Some(raw) = storage.get(STORAGE_KEY)? else {
            debug!("no persisted session");
            return Ok(Self::default());
        };
        let persisted: Persisted = serde_json::from_str(&raw)?;
        if persisted.version != STORAGE_VERSION {
            warn!(version = persisted.version, "unexpected session version, loading anyway");
        }
        Ok(Self {
            user: persisted.state.user,
            is_authenticated: persisted.state.is_authenticated,
            error: None,
        })
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StoreError> {
        let persisted = Persisted {
            state: PersistedState {
                user: self.user.clone(),
                is_authenticated: self.is_authenticated,
            },
            version: STORAGE_VERSION,
        };
        storage.set(STORAGE_KEY, &serde_json::to_string(&persisted)?)
    }

    /// Removes the persisted session entirely.
    pub fn clear(storage: &mut dyn Storage) -> Result<(), StoreError> {
        storage.remove(STORAGE_KEY)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn login(&mut self, user: User) {
        self.user = Some(user);
        self.is_authenticated = true;
        self.error = None;
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.is_authenticated = false;
        self.error = None;
    }

    /// Applies `update` to the signed-in user. Returns false when nobody is
    /// signed in.
    pub fn update_user(&mut self, update: impl FnOnce(&mut User)) -> bool {
        match self.user.as_mut() {
            Some(user) => {
                update(user);
                true
            }
            None => false,
        }
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learner() -> User {
        User {
            id: Uuid::nil(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            target_score: Some(515),
        }
    }

    #[test]
    fn load_from_empty_storage() {
        let store = UserStore::load(&MemoryStorage::new()).unwrap();
        assert!(store.user().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn save_writes_only_user_and_auth_flag() {
        let mut storage = MemoryStorage::new();
        let mut store = UserStore::new();
        store.login(learner());
        store.set_error(Some("token expired".to_string()));
        store.save(&mut storage).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&storage.get(STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["version"], 0);
        assert_eq!(raw["state"]["isAuthenticated"], true);
        assert_eq!(raw["state"]["user"]["name"], "Ada");
        assert_eq!(raw["state"]["user"]["targetScore"], 515);
        assert_eq!(raw["state"].as_object().unwrap().len(), 2);

        let restored = UserStore::load(&storage).unwrap();
        assert_eq!(restored.user(), Some(&learner()));
        assert!(restored.is_authenticated());
        assert!(restored.error().is_none());
    }

    #[test]
    fn mutations_do_not_persist_until_saved() {
        let mut storage = MemoryStorage::new();
        let mut store = UserStore::new();
        store.login(learner());
        assert!(storage.get(STORAGE_KEY).unwrap().is_none());

        store.save(&mut storage).unwrap();
        store.logout();
        assert!(UserStore::load(&storage).unwrap().is_authenticated());
    }

    #[test]
    fn update_user_requires_signed_in_user() {
        let mut store = UserStore::new();
        assert!(!store.update_user(|u| u.name = "x".to_string()));
        store.login(learner());
        assert!(store.update_user(|u| u.target_score = Some(520)));
        assert_eq!(store.user().unwrap().target_score, Some(520));
    }

    #[test]
    fn corrupt_entry_is_an_error() {
        let mut storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "{not json").unwrap();
        assert!(matches!(UserStore::load(&storage), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn file_storage_round_trip_and_clear() {
        let dir = std::env::temp_dir().join(format!("prep-core-store-{}", Uuid::new_v4()));
        let mut storage = FileStorage::new(&dir);
        assert!(storage.get(STORAGE_KEY).unwrap().is_none());

        let mut store = UserStore::new();
        store.login(learner());
        store.save(&mut storage).unwrap();
        assert!(dir.join("mcat-user-storage.json").exists());
        assert_eq!(UserStore::load(&storage).unwrap(), store);

        UserStore::clear(&mut storage).unwrap();
        UserStore::clear(&mut storage).unwrap();
        assert!(UserStore::load(&storage).unwrap().user().is_none());
        let _ = std::fs::remove_dir_all(dir);
    }
}
