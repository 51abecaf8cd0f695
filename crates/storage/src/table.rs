//! Registry table: compact on-chain records keyed by identifier.

use crate::errors::{Result, StoreError};
use crate::keys;
use crate::kv::KvStore;
use didreg_types::{codec, Did, DidKind, TableItem};
use std::sync::Arc;
use tracing::debug;

/// State table of a registry.
///
/// Every call is a single read-modify-write on one key; nothing here is
/// transactional across keys.
pub trait RegistryTable: Send + Sync {
    fn has_item(&self, did: &Did) -> Result<bool>;
    /// Fails with `AlreadyExists` if a record for the id is present.
    fn create_item(&self, item: &TableItem) -> Result<()>;
    /// Fails with `NotFound` if no record for the id is present.
    fn update_item(&self, item: &TableItem) -> Result<()>;
    fn get_item(&self, did: &Did, kind: DidKind) -> Result<TableItem>;
    /// Removes the record whether or not it exists.
    fn delete_item(&self, did: &Did) -> Result<()>;
    /// Admin list persisted under a reserved key, `None` if never stored.
    fn load_admins(&self, scope: &str) -> Result<Option<Vec<Did>>>;
    fn store_admins(&self, scope: &str, admins: &[Did]) -> Result<()>;
    fn close(&self) -> Result<()>;
}

pub struct KvTable {
    store: Arc<dyn KvStore>,
}

impl KvTable {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn put_item(&self, key: &[u8], item: &TableItem) -> Result<()> {
        let bytes = item.marshal()?;
        self.store.put(key, bytes)
    }
}

impl RegistryTable for KvTable {
    fn has_item(&self, did: &Did) -> Result<bool> {
        self.store.has(&keys::table_key(did))
    }

    fn create_item(&self, item: &TableItem) -> Result<()> {
        let did = item.id();
        if did.is_empty() {
            return Err(StoreError::InvalidArgument(
                "table item id must not be empty".to_string(),
            ));
        }
        let key = keys::table_key(did);
        if self.store.has(&key)? {
            return Err(StoreError::AlreadyExists {
                key: did.to_string(),
            });
        }
        self.put_item(&key, item)?;
        debug!(did = %did, status = %item.status(), "table item created");
        Ok(())
    }

    fn update_item(&self, item: &TableItem) -> Result<()> {
        let did = item.id();
        let key = keys::table_key(did);
        if !self.store.has(&key)? {
            return Err(StoreError::NotFound {
                key: did.to_string(),
            });
        }
        self.put_item(&key, item)?;
        debug!(did = %did, status = %item.status(), "table item updated");
        Ok(())
    }

    fn get_item(&self, did: &Did, kind: DidKind) -> Result<TableItem> {
        let bytes = self
            .store
            .get(&keys::table_key(did))?
            .ok_or_else(|| StoreError::NotFound {
                key: did.to_string(),
            })?;
        Ok(TableItem::unmarshal(kind, &bytes)?)
    }

    fn delete_item(&self, did: &Did) -> Result<()> {
        self.store.delete(&keys::table_key(did))?;
        debug!(did = %did, "table item deleted");
        Ok(())
    }

    fn load_admins(&self, scope: &str) -> Result<Option<Vec<Did>>> {
        self.store
            .get(&keys::admins_key(scope))?
            .map(|bytes| codec::unmarshal(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    fn store_admins(&self, scope: &str, admins: &[Did]) -> Result<()> {
        let bytes = codec::marshal(&admins)?;
        self.store.put(&keys::admins_key(scope), bytes)?;
        debug!(scope, count = admins.len(), "admin list stored");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.store.close()
    }
}
