//! Storage layer of the DID registry.
//!
//! [`KvStore`] is the durable key-value collaborator. [`KvTable`] keeps the
//! compact per-identifier table records and [`KvDocDb`] keeps full
//! documents; both can be layered over the same store.

pub mod docdb;
pub mod errors;
pub mod keys;
pub mod kv;
pub mod table;

pub use docdb::{DocDb, KvDocDb, DEFAULT_BASE_ADDR};
pub use errors::{Result, StoreError};
pub use kv::{open_db, KvStore, MemoryStore, SledStore, DEFAULT_TREE};
pub use table::{KvTable, RegistryTable};
