//! Document store used by registries running in internal document mode.

use crate::errors::{Result, StoreError};
use crate::keys;
use crate::kv::KvStore;
use didreg_types::{Did, DidKind, Document};
use std::sync::Arc;
use tracing::debug;

/// Base address used when none is configured.
pub const DEFAULT_BASE_ADDR: &str = ".";

/// Full documents keyed by identifier.
///
/// `create` and `update` return the document address that the registry
/// records into the table item.
pub trait DocDb: Send + Sync {
    fn has(&self, did: &Did) -> Result<bool>;
    fn create(&self, doc: &Document) -> Result<String>;
    fn update(&self, doc: &Document) -> Result<String>;
    fn get(&self, did: &Did, kind: DidKind) -> Result<Document>;
    fn delete(&self, did: &Did) -> Result<()>;
    fn close(&self) -> Result<()>;
}

pub struct KvDocDb {
    store: Arc<dyn KvStore>,
    base_addr: String,
}

impl KvDocDb {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_base_addr(store, DEFAULT_BASE_ADDR)
    }

    pub fn with_base_addr(store: Arc<dyn KvStore>, base_addr: impl Into<String>) -> Self {
        Self {
            store,
            base_addr: base_addr.into(),
        }
    }

    /// Deterministic location of the document for `did`.
    pub fn address_of(&self, did: &Did) -> String {
        format!("{}/{}", self.base_addr, did)
    }

    fn write(&self, doc: &Document) -> Result<String> {
        let bytes = doc.marshal()?;
        self.store.put(&keys::doc_key(doc.id()), bytes)?;
        Ok(self.address_of(doc.id()))
    }
}

impl DocDb for KvDocDb {
    fn has(&self, did: &Did) -> Result<bool> {
        self.store.has(&keys::doc_key(did))
    }

    fn create(&self, doc: &Document) -> Result<String> {
        let did = doc.id();
        if did.is_empty() {
            return Err(StoreError::InvalidArgument(
                "document id must not be empty".to_string(),
            ));
        }
        if self.has(did)? {
            return Err(StoreError::AlreadyExists {
                key: did.to_string(),
            });
        }
        let addr = self.write(doc)?;
        debug!(did = %did, addr = %addr, "document created");
        Ok(addr)
    }

    fn update(&self, doc: &Document) -> Result<String> {
        let did = doc.id();
        if !self.has(did)? {
            return Err(StoreError::NotFound {
                key: did.to_string(),
            });
        }
        let addr = self.write(doc)?;
        debug!(did = %did, addr = %addr, "document updated");
        Ok(addr)
    }

    fn get(&self, did: &Did, kind: DidKind) -> Result<Document> {
        let bytes = self
            .store
            .get(&keys::doc_key(did))?
            .ok_or_else(|| StoreError::NotFound {
                key: did.to_string(),
            })?;
        Ok(Document::unmarshal(kind, &bytes)?)
    }

    fn delete(&self, did: &Did) -> Result<()> {
        self.store.delete(&keys::doc_key(did))?;
        debug!(did = %did, "document deleted");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.store.close()
    }
}
