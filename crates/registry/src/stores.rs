//! Wiring of registry tables and document stores onto a [`KvStore`].

use crate::config::{DocMode, RegistryConfig};
use didreg_storage::{DocDb, KvDocDb, KvStore, KvTable, MemoryStore, RegistryTable};
use std::sync::Arc;

/// Table plus, in internal mode, a document store, both over `store`.
///
/// Table records and documents live under distinct key prefixes so one
/// store can back both. Separate registries need separate stores.
pub fn layered(
    config: &RegistryConfig,
    store: Arc<dyn KvStore>,
) -> (Box<dyn RegistryTable>, Option<Box<dyn DocDb>>) {
    let docs: Option<Box<dyn DocDb>> = match config.mode {
        DocMode::Internal => Some(Box::new(KvDocDb::with_base_addr(
            Arc::clone(&store),
            config.doc_base_addr.clone(),
        ))),
        DocMode::External => None,
    };
    let table: Box<dyn RegistryTable> = Box::new(KvTable::new(store));
    (table, docs)
}

pub fn memory() -> Arc<dyn KvStore> {
    Arc::new(MemoryStore::new())
}
