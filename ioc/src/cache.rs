//! Key-value stores the container restores its tables from and flushes them to.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::args::Instance;
use crate::error::{Error, Result};

/// Cache key holding the alias table.
pub const ALIASES_KEY: &str = "aliases";
/// Cache key holding the singleton table.
pub const SINGLETONS_KEY: &str = "singletons";

/// A value a [`Cache`] can hold.
#[derive(Clone)]
pub enum CacheValue {
  Aliases(HashMap<String, String>),
  Singletons(HashMap<String, Instance>),
}

impl fmt::Debug for CacheValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CacheValue::Aliases(map) => f.debug_tuple("Aliases").field(map).finish(),
      CacheValue::Singletons(map) => {
        let mut ids: Vec<&String> = map.keys().collect();
        ids.sort();
        f.debug_tuple("Singletons").field(&ids).finish()
      }
    }
  }
}

/// The storage collaborator a container persists into.
pub trait Cache: Send + Sync {
  fn get(&self, key: &str) -> Option<CacheValue>;
  fn set(&self, key: &str, value: CacheValue) -> Result<()>;
  fn has(&self, key: &str) -> bool;
}

/// A process-local, non-persistent cache.
///
/// Clones share the same store, so a container built over a clone sees what
/// an earlier container flushed.
#[derive(Clone, Default)]
pub struct MemoryCache {
  entries: Arc<DashMap<String, CacheValue>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Cache for MemoryCache {
  fn get(&self, key: &str) -> Option<CacheValue> {
    self.entries.get(key).map(|entry| entry.value().clone())
  }

  fn set(&self, key: &str, value: CacheValue) -> Result<()> {
    self.entries.insert(key.to_owned(), value);
    Ok(())
  }

  fn has(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }
}

/// A cache that persists alias tables to a JSON file.
///
/// Singleton instances cannot be serialized; they are kept in memory for the
/// life of this value and never written, so they do not survive a restart.
pub struct JsonFileCache {
  path: PathBuf,
  tables: Mutex<HashMap<String, HashMap<String, String>>>,
  instances: DashMap<String, HashMap<String, Instance>>,
}

impl JsonFileCache {
  /// Opens the cache at `path`. A missing file is an empty cache.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let tables = if path.exists() {
      let bytes = fs::read(&path)?;
      serde_json::from_slice(&bytes).map_err(|source| Error::CacheFormat {
        path: path.clone(),
        source,
      })?
    } else {
      HashMap::new()
    };

    Ok(Self {
      path,
      tables: Mutex::new(tables),
      instances: DashMap::new(),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn write(&self, tables: &HashMap<String, HashMap<String, String>>) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
      }
    }
    let bytes = serde_json::to_vec_pretty(tables).map_err(|source| Error::CacheFormat {
      path: self.path.clone(),
      source,
    })?;
    fs::write(&self.path, bytes)?;
    Ok(())
  }
}

impl Cache for JsonFileCache {
  fn get(&self, key: &str) -> Option<CacheValue> {
    if let Some(instances) = self.instances.get(key) {
      return Some(CacheValue::Singletons(instances.value().clone()));
    }
    self.tables.lock().get(key).cloned().map(CacheValue::Aliases)
  }

  fn set(&self, key: &str, value: CacheValue) -> Result<()> {
    match value {
      CacheValue::Aliases(map) => {
        let mut tables = self.tables.lock();
        tables.insert(key.to_owned(), map);
        self.write(&tables)?;
        debug!(path = %self.path.display(), key, "persisted table to cache file");
      }
      CacheValue::Singletons(map) => {
        debug!(key, count = map.len(), "keeping singleton table in memory only");
        self.instances.insert(key.to_owned(), map);
      }
    }
    Ok(())
  }

  fn has(&self, key: &str) -> bool {
    self.instances.contains_key(key) || self.tables.lock().contains_key(key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_cache_clones_share_state() {
    let cache = MemoryCache::new();
    let clone = cache.clone();
    let mut aliases = HashMap::new();
    aliases.insert("Greeter".to_owned(), "EnglishGreeter".to_owned());

    cache.set(ALIASES_KEY, CacheValue::Aliases(aliases)).unwrap();

    assert!(clone.has(ALIASES_KEY));
    assert!(!clone.has(SINGLETONS_KEY));
    match clone.get(ALIASES_KEY) {
      Some(CacheValue::Aliases(map)) => assert_eq!(map["Greeter"], "EnglishGreeter"),
      other => panic!("unexpected cache value: {:?}", other),
    }
  }
}
