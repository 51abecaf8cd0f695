//! Value types of the DID registry: identifiers, documents, table items
//! and lifecycle statuses, plus their deterministic encoding.

pub mod codec;
pub mod did;
pub mod doc;
pub mod doc_info;
pub mod errors;
pub mod item;
pub mod status;

pub use codec::{content_hash, ContentHash, HASH_LEN};
pub use did::*;
pub use doc::*;
pub use doc_info::*;
pub use errors::*;
pub use item::*;
pub use status::*;
