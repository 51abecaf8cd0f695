//! Key layout inside the backing store.
//!
//! Every record kind has its own fixed prefix, so a registry table and a
//! document store may share one physical store without colliding.

use didreg_types::Did;

pub const TABLE_PREFIX: &str = "tbl/";
pub const DOC_PREFIX: &str = "doc/";
pub const ADMINS_PREFIX: &str = "meta/admins/";

pub fn table_key(did: &Did) -> Vec<u8> {
    prefixed(TABLE_PREFIX, did.as_str())
}

pub fn doc_key(did: &Did) -> Vec<u8> {
    prefixed(DOC_PREFIX, did.as_str())
}

pub fn admins_key(scope: &str) -> Vec<u8> {
    prefixed(ADMINS_PREFIX, scope)
}

fn prefixed(prefix: &str, rest: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + rest.len());
    key.extend_from_slice(prefix.as_bytes());
    key.extend_from_slice(rest.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_disjoint() {
        let did = Did::new("did:x:app1:.");
        assert_eq!(table_key(&did), b"tbl/did:x:app1:.".to_vec());
        assert_eq!(doc_key(&did), b"doc/did:x:app1:.".to_vec());
        assert_ne!(table_key(&did), doc_key(&did));
        assert_eq!(admins_key("chain"), b"meta/admins/chain".to_vec());
    }
}
