//! # Storage
//!
//! Persisted state and resources read their seed from, and write changes back to, a
//! [`Storage`]. Storage backends are external collaborators; the container only knows
//! them by name.
//!
//! ## Keys
//!
//! A primitive is persisted under a *logical* key of the form `"{storage}:{raw}"`. The
//! storage part is optional and defaults to [`DEFAULT_STORAGE`]. The physical key handed
//! to the backend is `"{ModelType name}/{raw}"`, so two model types never collide:
//!
//! | Logical key | Storage | Physical key (model `counter`) |
//! |-------------|---------|--------------------------------|
//! | `count` | `default` | `counter/count` |
//! | `session:count` | `session` | `counter/count` |

use crate::ModelError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;

/// Name of the storage that is always installed.
pub const DEFAULT_STORAGE: &str = "default";

/// A key/value persistence backend.
pub trait Storage {
    fn has(&self, key: &str) -> bool;
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
}

/// In-memory storage. Cloning shares the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entry, builder style.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.borrow_mut().insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn has(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }
}

/// The named storages of a container tree. Child containers share their parent's set.
#[derive(Clone)]
pub struct Storages {
    entries: Rc<RefCell<IndexMap<String, Rc<dyn Storage>>>>,
}

impl Default for Storages {
    fn default() -> Self {
        Self::new()
    }
}

impl Storages {
    /// A set holding only a fresh [`MemoryStorage`] as the default storage.
    pub fn new() -> Self {
        let mut entries: IndexMap<String, Rc<dyn Storage>> = IndexMap::new();
        entries.insert(DEFAULT_STORAGE.to_string(), Rc::new(MemoryStorage::new()));
        Self {
            entries: Rc::new(RefCell::new(entries)),
        }
    }

    /// Installs (or replaces) a named storage.
    pub fn insert(&self, name: impl Into<String>, storage: Rc<dyn Storage>) {
        self.entries.borrow_mut().insert(name.into(), storage);
    }

    pub fn get(&self, name: &str) -> Result<Rc<dyn Storage>, ModelError> {
        self.entries
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownStorage(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl std::fmt::Debug for Storages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.borrow().keys()).finish()
    }
}

/// A parsed logical key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageKey {
    pub storage: String,
    pub raw: String,
}

impl StorageKey {
    pub fn parse(logical: &str) -> Self {
        match logical.split_once(':') {
            Some((storage, raw)) if !storage.is_empty() => Self {
                storage: storage.to_string(),
                raw: raw.to_string(),
            },
            Some((_, raw)) => Self {
                storage: DEFAULT_STORAGE.to_string(),
                raw: raw.to_string(),
            },
            None => Self {
                storage: DEFAULT_STORAGE.to_string(),
                raw: logical.to_string(),
            },
        }
    }

    pub fn physical(&self, model: &str) -> String {
        format!("{}/{}", model, self.raw)
    }
}

/// A resolved storage slot for one persisted primitive.
#[derive(Clone)]
pub(crate) struct StorageBinding {
    storage: Rc<dyn Storage>,
    key: String,
}

impl StorageBinding {
    pub(crate) fn resolve(storages: &Storages, model: &str, logical: &str) -> Result<Self, ModelError> {
        let parsed = StorageKey::parse(logical);
        Ok(Self {
            storage: storages.get(&parsed.storage)?,
            key: parsed.physical(model),
        })
    }

    pub(crate) fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, ModelError> {
        if !self.storage.has(&self.key) {
            return Ok(None);
        }
        let Some(value) = self.storage.get(&self.key) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ModelError::StorageDecode {
                key: self.key.clone(),
                source,
            })
    }

    /// Writes happen from change notifications, so encoding failures are logged.
    pub(crate) fn write<T: Serialize>(&self, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.storage.set(&self.key, value),
            Err(error) => warn!(key = %self.key, error = %error, "Failed to persist value"),
        }
    }
}
