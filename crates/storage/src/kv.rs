//! The key-value collaborator the registry table and document store sit on.

use crate::errors::{Result, StoreError};
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Name of the sled tree used when none is given.
pub const DEFAULT_TREE: &str = "did_registry";

/// Minimal durable key-value contract.
///
/// `close` is idempotent; every other call on a closed store fails with
/// [`StoreError::Closed`].
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()>;
    fn has(&self, key: &[u8]) -> Result<bool>;
    fn delete(&self, key: &[u8]) -> Result<()>;
    fn close(&self) -> Result<()>;
}

/// Sled-backed implementation
///
/// Closing flushes and drops this handle's `Db` and `Tree`, so the file lock
/// is released once no other handle shares the database.
pub struct SledStore {
    inner: RwLock<Option<(Db, Tree)>>,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = open_db(path)?;
        Self::from_db(db, DEFAULT_TREE)
    }

    /// Opens `tree` inside an already opened database.
    pub fn from_db(db: Db, tree: &str) -> Result<Self> {
        let tree = db.open_tree(tree)?;
        Ok(Self {
            inner: RwLock::new(Some((db, tree))),
        })
    }

    /// A store that is removed from disk when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, DEFAULT_TREE)
    }

    pub fn flush(&self) -> Result<()> {
        match self.inner.read().as_ref() {
            Some((db, _)) => {
                db.flush()?;
                Ok(())
            }
            None => Err(StoreError::Closed),
        }
    }

    fn with_tree<T>(&self, f: impl FnOnce(&Tree) -> sled::Result<T>) -> Result<T> {
        match self.inner.read().as_ref() {
            Some((_, tree)) => Ok(f(tree)?),
            None => Err(StoreError::Closed),
        }
    }
}

/// Opens a sled database without the background flusher thread.
///
/// Writes reach disk on [`KvStore::close`] or an explicit flush, and the
/// file lock goes away with the last handle.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Db> {
    Ok(sled::Config::new()
        .path(path)
        .flush_every_ms(None)
        .open()?)
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_tree(|tree| tree.get(key).map(|v| v.map(|v| v.to_vec())))
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.with_tree(|tree| tree.insert(key, value).map(|_| ()))
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        self.with_tree(|tree| tree.contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.with_tree(|tree| tree.remove(key).map(|_| ()))
    }

    fn close(&self) -> Result<()> {
        let Some((db, tree)) = self.inner.write().take() else {
            return Ok(());
        };
        db.flush()?;
        drop(tree);
        drop(db);
        Ok(())
    }
}

/// In-memory testing backend
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all keys, in order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.entries.read().keys().cloned().collect()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        self.entries.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.entries.read().contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.entries.write().remove(key);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
