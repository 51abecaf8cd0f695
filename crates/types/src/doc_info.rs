use crate::did::Did;
use crate::doc::Document;
use serde::{Deserialize, Serialize};

/// Caller supplied reference to a document.
///
/// In external document mode only `id`, `addr` and `hash` are used and the
/// registry trusts them verbatim. In internal mode `content` carries the
/// document the registry stores and hashes itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    pub id: Did,
    #[serde(default)]
    pub addr: String,
    #[serde(default, with = "hex")]
    pub hash: Vec<u8>,
    #[serde(default)]
    pub content: Option<Document>,
}

impl DocInfo {
    pub fn external(id: Did, addr: impl Into<String>, hash: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            addr: addr.into(),
            hash: hash.into(),
            content: None,
        }
    }

    pub fn internal(doc: impl Into<Document>) -> Self {
        let doc = doc.into();
        Self {
            id: doc.id().clone(),
            addr: String::new(),
            hash: Vec::new(),
            content: Some(doc),
        }
    }
}

/// Where a registered document lives and what it hashes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocPointer {
    pub addr: String,
    #[serde(with = "hex")]
    pub hash: Vec<u8>,
}
