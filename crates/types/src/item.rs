//! Compact on-chain table records.

use crate::codec;
use crate::did::{Did, DidKind};
use crate::errors::Result;
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// Fields shared by chain and account table items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicItem {
    pub id: Did,
    /// Where the full document is stored; opaque to the registry.
    pub doc_addr: String,
    /// Content hash of the full document.
    #[serde(with = "serde_bytes")]
    pub doc_hash: Vec<u8>,
    pub status: Status,
}

impl BasicItem {
    pub fn new(id: Did, status: Status) -> Self {
        Self {
            id,
            status,
            ..Default::default()
        }
    }
}

/// Table record of a chain method, remembering who applied for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainItem {
    pub base: BasicItem,
    pub owner: Did,
}

/// Table record of an account identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountItem {
    pub base: BasicItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableItem {
    Chain(ChainItem),
    Account(AccountItem),
}

impl TableItem {
    pub fn base(&self) -> &BasicItem {
        match self {
            TableItem::Chain(item) => &item.base,
            TableItem::Account(item) => &item.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BasicItem {
        match self {
            TableItem::Chain(item) => &mut item.base,
            TableItem::Account(item) => &mut item.base,
        }
    }

    pub fn id(&self) -> &Did {
        &self.base().id
    }

    pub fn status(&self) -> Status {
        self.base().status
    }

    pub fn kind(&self) -> DidKind {
        match self {
            TableItem::Chain(_) => DidKind::Chain,
            TableItem::Account(_) => DidKind::Account,
        }
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        match self {
            TableItem::Chain(item) => codec::marshal(item),
            TableItem::Account(item) => codec::marshal(item),
        }
    }

    pub fn unmarshal(kind: DidKind, bytes: &[u8]) -> Result<Self> {
        Ok(match kind {
            DidKind::Chain => TableItem::Chain(codec::unmarshal(bytes)?),
            DidKind::Account => TableItem::Account(codec::unmarshal(bytes)?),
        })
    }

    pub fn into_chain(self) -> Option<ChainItem> {
        match self {
            TableItem::Chain(item) => Some(item),
            TableItem::Account(_) => None,
        }
    }

    pub fn into_account(self) -> Option<AccountItem> {
        match self {
            TableItem::Account(item) => Some(item),
            TableItem::Chain(_) => None,
        }
    }
}

impl From<ChainItem> for TableItem {
    fn from(item: ChainItem) -> Self {
        TableItem::Chain(item)
    }
}

impl From<AccountItem> for TableItem {
    fn from(item: AccountItem) -> Self {
        TableItem::Account(item)
    }
}
