//! Registry of account identifiers (`did:<root>:<sub>:<address>`).
//!
//! Accounts skip the application step: `register` takes an identifier
//! straight from `Initial` to `Normal`.

use crate::base::{RegistryBase, Resolution};
use crate::config::{DocMode, RegistryConfig};
use crate::errors::{RegistryError, Result};
use crate::policy::{AccessPolicy, Action};
use crate::stores;
use didreg_storage::{DocDb, KvStore, RegistryTable};
use didreg_types::{
    AccountDoc, AccountItem, Did, DidKind, DocInfo, DocPointer, Status, TypesError,
};
use std::sync::Arc;
use tracing::{debug, info};

const REGISTRABLE: &[Status] = &[Status::Initial];
const UPDATABLE: &[Status] = &[Status::Normal];

pub struct AccountDidRegistry {
    base: RegistryBase,
    genesis: Option<DocInfo>,
    self_chain_did: Option<Did>,
}

impl AccountDidRegistry {
    /// `docs` must be present exactly when `config.mode` is internal.
    pub fn new(
        config: RegistryConfig,
        table: Box<dyn RegistryTable>,
        docs: Option<Box<dyn DocDb>>,
    ) -> Result<Self> {
        let base = RegistryBase::new(DidKind::Account, &config, table, docs)?;
        let mut registry = Self {
            base,
            genesis: config.genesis,
            self_chain_did: None,
        };
        if let Some(genesis) = &registry.genesis {
            if registry.base.has("new", &genesis.id)? {
                debug!(did = %genesis.id, "genesis account already registered");
                registry.self_chain_did = genesis.id.chain_did();
            }
        }
        Ok(registry)
    }

    pub fn from_store(config: RegistryConfig, store: Arc<dyn KvStore>) -> Result<Self> {
        let (table, docs) = stores::layered(&config, store);
        Self::new(config, table, docs)
    }

    pub fn in_memory(config: RegistryConfig) -> Result<Self> {
        Self::from_store(config, stores::memory())
    }

    pub fn with_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.base.set_policy(Box::new(policy));
        self
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn mode(&self) -> DocMode {
        self.base.mode()
    }

    /// Registers the genesis account on behalf of the first admin and
    /// records the chain it lives under.
    pub fn setup_genesis(&mut self) -> Result<()> {
        let genesis = self
            .genesis
            .clone()
            .ok_or(RegistryError::GenesisNotConfigured("no genesis account document"))?;
        let admin = self
            .base
            .admins()
            .first()
            .cloned()
            .ok_or(RegistryError::GenesisNotConfigured("no admins"))?;
        let _enter = self.base.span.clone().entered();

        self.register_info(&admin, &genesis)
            .map_err(RegistryError::genesis("register"))?;
        self.base
            .persist_admins()
            .map_err(RegistryError::genesis("persist_admins"))?;
        self.self_chain_did = genesis.id.chain_did();
        info!(did = %genesis.id, admin = %admin, "genesis account registered");
        Ok(())
    }

    /// The account identifier this registry was configured with.
    pub fn self_id(&self) -> Option<&Did> {
        self.genesis.as_ref().map(|g| &g.id)
    }

    /// Chain of the genesis account, known once genesis has run.
    pub fn self_chain_did(&self) -> Option<&Did> {
        self.self_chain_did.as_ref()
    }

    pub fn admins(&self) -> &[Did] {
        self.base.admins()
    }

    pub fn has_admin(&self, did: &Did) -> bool {
        self.base.has_admin(did)
    }

    pub fn add_admin(&mut self, admin: Did) -> Result<()> {
        self.base.add_admin(admin)
    }

    pub fn remove_admin(&mut self, admin: &Did) -> Result<()> {
        self.base.remove_admin(admin)
    }

    /// Registers an externally stored document. External mode only.
    pub fn register(
        &mut self,
        caller: &Did,
        account_did: &Did,
        addr: impl Into<String>,
        hash: impl Into<Vec<u8>>,
    ) -> Result<DocPointer> {
        self.require_mode("register", DocMode::External)?;
        self.register_info(caller, &DocInfo::external(account_did.clone(), addr, hash))
    }

    /// Stores and registers `doc`. Internal mode only.
    pub fn register_with_doc(&mut self, caller: &Did, doc: AccountDoc) -> Result<DocPointer> {
        self.require_mode("register_with_doc", DocMode::Internal)?;
        self.register_info(caller, &DocInfo::internal(doc))
    }

    pub fn register_info(&mut self, caller: &Did, info: &DocInfo) -> Result<DocPointer> {
        let _enter = self.base.span.enter();
        self.base
            .commit_document("register", Action::Register, caller, info, REGISTRABLE)
    }

    pub fn update(
        &mut self,
        caller: &Did,
        account_did: &Did,
        addr: impl Into<String>,
        hash: impl Into<Vec<u8>>,
    ) -> Result<DocPointer> {
        self.require_mode("update", DocMode::External)?;
        self.update_info(caller, &DocInfo::external(account_did.clone(), addr, hash))
    }

    pub fn update_with_doc(&mut self, caller: &Did, doc: AccountDoc) -> Result<DocPointer> {
        self.require_mode("update_with_doc", DocMode::Internal)?;
        self.update_info(caller, &DocInfo::internal(doc))
    }

    pub fn update_info(&mut self, caller: &Did, info: &DocInfo) -> Result<DocPointer> {
        let _enter = self.base.span.enter();
        self.base
            .commit_document("update", Action::Update, caller, info, UPDATABLE)
    }

    pub fn freeze(&mut self, caller: &Did, account_did: &Did) -> Result<()> {
        let _enter = self.base.span.enter();
        self.base.set_frozen(caller, account_did, true)
    }

    pub fn unfreeze(&mut self, caller: &Did, account_did: &Did) -> Result<()> {
        let _enter = self.base.span.enter();
        self.base.set_frozen(caller, account_did, false)
    }

    pub fn delete(&mut self, caller: &Did, account_did: &Did) -> Result<()> {
        let _enter = self.base.span.enter();
        self.base.delete(caller, account_did)
    }

    /// `None` when the identifier has no record.
    pub fn resolve(
        &self,
        account_did: &Did,
    ) -> Result<Option<Resolution<AccountItem, AccountDoc>>> {
        let Some(found) = self.base.resolve(account_did)? else {
            return Ok(None);
        };
        let mismatch = || RegistryError::Invalid {
            op: "resolve",
            source: TypesError::InvalidDocument {
                did: account_did.to_string(),
                reason: "stored record is not an account".to_string(),
            },
        };
        Ok(Some(Resolution {
            item: found.item.into_account().ok_or_else(mismatch)?,
            doc: found
                .doc
                .map(|doc| doc.into_account().ok_or_else(mismatch))
                .transpose()?,
        }))
    }

    pub fn has_account_did(&self, account_did: &Did) -> Result<bool> {
        self.base.has("has_account_did", account_did)
    }

    /// `Initial` for identifiers without a record.
    pub fn status(&self, account_did: &Did) -> Result<Status> {
        self.base.status(account_did)
    }

    pub fn close(&self) -> Result<()> {
        self.base.close()
    }

    fn require_mode(&self, op: &'static str, mode: DocMode) -> Result<()> {
        let current = self.base.mode();
        if current == mode {
            Ok(())
        } else {
            Err(RegistryError::ModeMismatch { op, mode: current })
        }
    }
}
