//! Full identity documents.

use crate::codec::{self, ContentHash};
use crate::did::{Did, DidKind};
use crate::errors::{Result, TypesError};
use serde::{Deserialize, Serialize};

/// Public key entry of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    pub id: String,
    pub key_type: String,
    pub public_key_pem: String,
}

/// Authentication rule: a set of key ids plus an optional combination
/// strategy such as `"1-of-4"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    pub public_key: Vec<String>,
    #[serde(default)]
    pub strategy: Option<String>,
}

/// Fields shared by chain and account documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicDoc {
    pub id: Did,
    pub doc_type: DidKind,
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub controller: Option<Did>,
    #[serde(default)]
    pub public_key: Vec<PubKey>,
    #[serde(default)]
    pub authentication: Vec<Auth>,
}

impl BasicDoc {
    pub fn new(id: Did, doc_type: DidKind, created: u64) -> Self {
        Self {
            id,
            doc_type,
            created,
            updated: created,
            controller: None,
            public_key: Vec::new(),
            authentication: Vec::new(),
        }
    }
}

/// Document describing a chain method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDoc {
    pub base: BasicDoc,
    /// Opaque extension data.
    #[serde(default, with = "serde_bytes")]
    pub extra: Vec<u8>,
}

impl ChainDoc {
    pub fn new(id: Did, created: u64) -> Self {
        Self {
            base: BasicDoc::new(id, DidKind::Chain, created),
            extra: Vec::new(),
        }
    }
}

/// Document describing an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDoc {
    pub base: BasicDoc,
    #[serde(default)]
    pub service: String,
}

impl AccountDoc {
    pub fn new(id: Did, created: u64) -> Self {
        Self {
            base: BasicDoc::new(id, DidKind::Account, created),
            service: String::new(),
        }
    }
}

/// A chain or account document.
///
/// Only the inner document is encoded when marshaling; the variant is
/// recovered from the type tag the caller supplies to [`Document::unmarshal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Document {
    Chain(ChainDoc),
    Account(AccountDoc),
}

impl Document {
    pub fn base(&self) -> &BasicDoc {
        match self {
            Document::Chain(doc) => &doc.base,
            Document::Account(doc) => &doc.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BasicDoc {
        match self {
            Document::Chain(doc) => &mut doc.base,
            Document::Account(doc) => &mut doc.base,
        }
    }

    pub fn id(&self) -> &Did {
        &self.base().id
    }

    pub fn kind(&self) -> DidKind {
        match self {
            Document::Chain(_) => DidKind::Chain,
            Document::Account(_) => DidKind::Account,
        }
    }

    /// Checks that the document may be registered into a registry of `expected` kind.
    pub fn validate(&self, expected: DidKind) -> Result<()> {
        let base = self.base();
        let invalid = |reason: String| TypesError::InvalidDocument {
            did: base.id.to_string(),
            reason,
        };
        if self.kind() != expected || base.doc_type != expected {
            return Err(invalid(format!(
                "expected a {expected} document, got a {} document tagged {}",
                self.kind(),
                base.doc_type
            )));
        }
        if base.created == 0 {
            return Err(invalid("created timestamp must be set".to_string()));
        }
        base.id
            .ensure_kind(expected)
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        match self {
            Document::Chain(doc) => codec::marshal(doc),
            Document::Account(doc) => codec::marshal(doc),
        }
    }

    pub fn unmarshal(kind: DidKind, bytes: &[u8]) -> Result<Self> {
        Ok(match kind {
            DidKind::Chain => Document::Chain(codec::unmarshal(bytes)?),
            DidKind::Account => Document::Account(codec::unmarshal(bytes)?),
        })
    }

    /// SHA-256 over the marshaled document.
    pub fn hash(&self) -> Result<ContentHash> {
        Ok(codec::content_hash(&self.marshal()?))
    }

    pub fn as_chain(&self) -> Option<&ChainDoc> {
        match self {
            Document::Chain(doc) => Some(doc),
            Document::Account(_) => None,
        }
    }

    pub fn as_account(&self) -> Option<&AccountDoc> {
        match self {
            Document::Account(doc) => Some(doc),
            Document::Chain(_) => None,
        }
    }

    pub fn into_chain(self) -> Option<ChainDoc> {
        match self {
            Document::Chain(doc) => Some(doc),
            Document::Account(_) => None,
        }
    }

    pub fn into_account(self) -> Option<AccountDoc> {
        match self {
            Document::Account(doc) => Some(doc),
            Document::Chain(_) => None,
        }
    }
}

impl From<ChainDoc> for Document {
    fn from(doc: ChainDoc) -> Self {
        Document::Chain(doc)
    }
}

impl From<AccountDoc> for Document {
    fn from(doc: AccountDoc) -> Self {
        Document::Account(doc)
    }
}
