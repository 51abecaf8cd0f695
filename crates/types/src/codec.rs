//! Deterministic binary encoding and content hashing.
//!
//! Documents and items are encoded with bincode's default configuration
//! (little endian, fixed width integers). The encoding has no maps and no
//! floating point fields, so `marshal(unmarshal(bytes)) == bytes` holds for
//! every value produced here. Content hashes are SHA-256 over these bytes.

use crate::errors::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Length in bytes of a content hash.
pub const HASH_LEN: usize = 32;

pub type ContentHash = [u8; HASH_LEN];

pub fn marshal<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub fn unmarshal<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn content_hash(bytes: &[u8]) -> ContentHash {
    Sha256::digest(bytes).into()
}
