//! Registry of chain identifiers (`did:<root>:<sub>:.`).
//!
//! A chain identifier goes through an admin-audited application before it
//! can register a document:
//!
//! ```text
//! Initial -> ApplyAudit -> ApplySuccess -> Normal <-> Frozen
//!                 |             ^
//!                 v             |
//!            ApplyFailed -------+
//! ```

use crate::base::{RegistryBase, Resolution};
use crate::config::{DocMode, RegistryConfig};
use crate::errors::{RegistryError, Result};
use crate::policy::{AccessPolicy, Action};
use crate::stores;
use didreg_storage::{DocDb, KvStore, RegistryTable};
use didreg_types::{
    BasicItem, ChainDoc, ChainItem, Did, DidKind, DocInfo, DocPointer, Status, TypesError,
};
use std::sync::Arc;
use tracing::info;

const AUDITABLE: &[Status] = &[Status::ApplyAudit, Status::ApplyFailed];
const REGISTRABLE: &[Status] = &[Status::ApplySuccess];
const UPDATABLE: &[Status] = &[Status::Normal];

pub struct ChainDidRegistry {
    base: RegistryBase,
    genesis: Option<DocInfo>,
}

impl ChainDidRegistry {
    /// `docs` must be present exactly when `config.mode` is internal.
    pub fn new(
        config: RegistryConfig,
        table: Box<dyn RegistryTable>,
        docs: Option<Box<dyn DocDb>>,
    ) -> Result<Self> {
        let base = RegistryBase::new(DidKind::Chain, &config, table, docs)?;
        Ok(Self {
            base,
            genesis: config.genesis,
        })
    }

    /// Table and (in internal mode) documents layered over one store.
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

    /// Bootstraps the registry's own chain identifier: the first admin
    /// applies for it, approves it and registers the genesis document.
    pub fn setup_genesis(&mut self) -> Result<()> {
        let genesis = self
            .genesis
            .clone()
            .ok_or(RegistryError::GenesisNotConfigured("no genesis chain document"))?;
        let admin = self
            .base
            .admins()
            .first()
            .cloned()
            .ok_or(RegistryError::GenesisNotConfigured("no admins"))?;
        let _enter = self.base.span.clone().entered();

        self.apply(&admin, &genesis.id)
            .map_err(RegistryError::genesis("apply"))?;
        self.audit_apply(&admin, &genesis.id, true)
            .map_err(RegistryError::genesis("audit_apply"))?;
        self.register_info(&admin, &genesis)
            .map_err(RegistryError::genesis("register"))?;
        self.base
            .persist_admins()
            .map_err(RegistryError::genesis("persist_admins"))?;
        info!(did = %genesis.id, admin = %admin, "genesis chain registered");
        Ok(())
    }

    /// The chain identifier this registry was configured with.
    pub fn self_id(&self) -> Option<&Did> {
        self.genesis.as_ref().map(|g| &g.id)
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

    /// Applies for a new chain identifier on behalf of `caller`, who becomes
    /// its owner.
    pub fn apply(&mut self, caller: &Did, chain_did: &Did) -> Result<()> {
        const OP: &str = "apply";
        let _enter = self.base.span.enter();
        self.base.ensure_kind(OP, chain_did)?;
        let existing = self.base.find_item(OP, chain_did)?;
        self.base
            .authorize(caller, Action::Apply, chain_did, existing.as_ref())?;
        if let Some(item) = existing {
            return Err(RegistryError::InvalidStatusTransition {
                op: OP,
                did: chain_did.clone(),
                current: item.status(),
                expected: &[Status::Initial],
            });
        }

        let item = ChainItem {
            base: BasicItem::new(chain_did.clone(), Status::ApplyAudit),
            owner: caller.clone(),
        };
        self.base.create_item(OP, &item.into())?;
        info!(did = %chain_did, caller = %caller, "chain did applied");
        Ok(())
    }

    /// Approves or rejects a pending application. A rejected application
    /// may be audited again.
    pub fn audit_apply(&mut self, caller: &Did, chain_did: &Did, approve: bool) -> Result<()> {
        const OP: &str = "audit_apply";
        let _enter = self.base.span.enter();
        let item = self.base.find_item(OP, chain_did)?;
        self.base
            .authorize(caller, Action::AuditApply, chain_did, item.as_ref())?;
        let item = RegistryBase::present(OP, chain_did, item)?;
        RegistryBase::require_status(OP, chain_did, item.status(), AUDITABLE)?;

        let status = if approve {
            Status::ApplySuccess
        } else {
            Status::ApplyFailed
        };
        self.base.write_status(OP, item, status)?;
        info!(did = %chain_did, caller = %caller, approve, "chain did application audited");
        Ok(())
    }

    /// Registers an externally stored document. External mode only.
    pub fn register(
        &mut self,
        caller: &Did,
        chain_did: &Did,
        addr: impl Into<String>,
        hash: impl Into<Vec<u8>>,
    ) -> Result<DocPointer> {
        self.require_mode("register", DocMode::External)?;
        self.register_info(caller, &DocInfo::external(chain_did.clone(), addr, hash))
    }

    /// Stores and registers `doc`. Internal mode only.
    pub fn register_with_doc(&mut self, caller: &Did, doc: ChainDoc) -> Result<DocPointer> {
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
        chain_did: &Did,
        addr: impl Into<String>,
        hash: impl Into<Vec<u8>>,
    ) -> Result<DocPointer> {
        self.require_mode("update", DocMode::External)?;
        self.update_info(caller, &DocInfo::external(chain_did.clone(), addr, hash))
    }

    pub fn update_with_doc(&mut self, caller: &Did, doc: ChainDoc) -> Result<DocPointer> {
        self.require_mode("update_with_doc", DocMode::Internal)?;
        self.update_info(caller, &DocInfo::internal(doc))
    }

    pub fn update_info(&mut self, caller: &Did, info: &DocInfo) -> Result<DocPointer> {
        let _enter = self.base.span.enter();
        self.base
            .commit_document("update", Action::Update, caller, info, UPDATABLE)
    }

    /// Forces the status of an existing chain identifier.
    pub fn audit(&mut self, caller: &Did, chain_did: &Did, status: Status) -> Result<()> {
        let _enter = self.base.span.enter();
        self.base.audit(caller, chain_did, status)
    }

    pub fn freeze(&mut self, caller: &Did, chain_did: &Did) -> Result<()> {
        let _enter = self.base.span.enter();
        self.base.set_frozen(caller, chain_did, true)
    }

    pub fn unfreeze(&mut self, caller: &Did, chain_did: &Did) -> Result<()> {
        let _enter = self.base.span.enter();
        self.base.set_frozen(caller, chain_did, false)
    }

    pub fn delete(&mut self, caller: &Did, chain_did: &Did) -> Result<()> {
        let _enter = self.base.span.enter();
        self.base.delete(caller, chain_did)
    }

    /// `None` when the identifier has no record.
    pub fn resolve(&self, chain_did: &Did) -> Result<Option<Resolution<ChainItem, ChainDoc>>> {
        let Some(found) = self.base.resolve(chain_did)? else {
            return Ok(None);
        };
        let mismatch = || RegistryError::Invalid {
            op: "resolve",
            source: TypesError::InvalidDocument {
                did: chain_did.to_string(),
                reason: "stored record is not a chain".to_string(),
            },
        };
        Ok(Some(Resolution {
            item: found.item.into_chain().ok_or_else(mismatch)?,
            doc: found
                .doc
                .map(|doc| doc.into_chain().ok_or_else(mismatch))
                .transpose()?,
        }))
    }

    pub fn has_chain_did(&self, chain_did: &Did) -> Result<bool> {
        self.base.has("has_chain_did", chain_did)
    }

    /// `Initial` for identifiers without a record.
    pub fn status(&self, chain_did: &Did) -> Result<Status> {
        self.base.status(chain_did)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::policy::RoleBasedPolicy;
    use didreg_types::{content_hash, Document};

    fn admin() -> Did {
        Did::new("did:bitxhub:relayroot:0x00000001")
    }

    fn app() -> Did {
        Did::new("did:bitxhub:appchain001:.")
    }

    fn caller() -> Did {
        Did::new("did:bitxhub:relayroot:0x12345678")
    }

    fn external() -> ChainDidRegistry {
        ChainDidRegistry::in_memory(
            RegistryConfig::default()
                .with_admin(admin())
                .with_genesis(DocInfo::external(
                    Did::new("did:bitxhub:relayroot:."),
                    "/ipfs/genesis",
                    vec![0xaa; 32],
                )),
        )
        .unwrap()
    }

    fn internal() -> ChainDidRegistry {
        let genesis = ChainDoc::new(Did::new("did:bitxhub:relayroot:."), 1);
        ChainDidRegistry::in_memory(
            RegistryConfig::default()
                .with_mode(DocMode::Internal)
                .with_admin(admin())
                .with_genesis(DocInfo::internal(genesis)),
        )
        .unwrap()
    }

    fn approved(registry: &mut ChainDidRegistry) {
        registry.apply(&caller(), &app()).unwrap();
        registry.audit_apply(&admin(), &app(), true).unwrap();
    }

    #[test]
    fn test_new_checks_doc_store_against_mode() {
        let store = stores::memory();
        let (table, docs) = stores::layered(&RegistryConfig::default(), store.clone());
        assert!(docs.is_none());
        let err = ChainDidRegistry::new(
            RegistryConfig::default().with_mode(DocMode::Internal),
            table,
            None,
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);

        let internal = RegistryConfig::default().with_mode(DocMode::Internal);
        let (table, docs) = stores::layered(&internal, store);
        let err = ChainDidRegistry::new(RegistryConfig::default(), table, docs)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_setup_genesis_registers_self() {
        let mut registry = external();
        registry.setup_genesis().unwrap();
        let genesis = Did::new("did:bitxhub:relayroot:.");
        assert_eq!(registry.self_id(), Some(&genesis));
        assert_eq!(registry.status(&genesis).unwrap(), Status::Normal);

        let resolved = registry.resolve(&genesis).unwrap().unwrap();
        assert_eq!(resolved.item.owner, admin());
        assert_eq!(resolved.item.base.doc_addr, "/ipfs/genesis");
        assert!(resolved.doc.is_none());
    }

    #[test]
    fn test_setup_genesis_requires_genesis_and_admins() {
        let mut registry = ChainDidRegistry::in_memory(RegistryConfig::default()).unwrap();
        assert_eq!(registry.setup_genesis().unwrap_err().kind(), ErrorKind::Genesis);

        let mut registry = ChainDidRegistry::in_memory(RegistryConfig::default().with_genesis(
            DocInfo::external(Did::new("did:x:root:."), "/g", vec![1]),
        ))
        .unwrap();
        assert_eq!(registry.setup_genesis().unwrap_err().kind(), ErrorKind::Genesis);
    }

    #[test]
    fn test_setup_genesis_twice_fails() {
        let mut registry = external();
        registry.setup_genesis().unwrap();
        let err = registry.setup_genesis().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Genesis);
        assert!(matches!(
            err,
            RegistryError::Genesis { stage: "apply", .. }
        ));
    }

    #[test]
    fn test_apply_rejects_malformed_and_account_ids() {
        let mut registry = external();
        for bad in ["", "did:x:app1", "did:x:app1:0x1", "foo:x:app1:."] {
            let err = registry.apply(&caller(), &Did::new(bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFormat, "{bad}");
        }
        assert!(!registry.has_chain_did(&Did::new("did:x:app1:0x1")).unwrap());
    }

    #[test]
    fn test_apply_twice_fails() {
        let mut registry = external();
        registry.apply(&caller(), &app()).unwrap();
        assert_eq!(registry.status(&app()).unwrap(), Status::ApplyAudit);
        let err = registry.apply(&caller(), &app()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
    }

    #[test]
    fn test_audit_apply_paths() {
        let mut registry = external();
        let err = registry.audit_apply(&admin(), &app(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        registry.apply(&caller(), &app()).unwrap();
        registry.audit_apply(&admin(), &app(), false).unwrap();
        assert_eq!(registry.status(&app()).unwrap(), Status::ApplyFailed);

        // a rejected application can be audited again
        registry.audit_apply(&admin(), &app(), true).unwrap();
        assert_eq!(registry.status(&app()).unwrap(), Status::ApplySuccess);

        let err = registry.audit_apply(&admin(), &app(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
    }

    #[test]
    fn test_register_requires_apply_success() {
        let mut registry = external();
        let err = registry
            .register(&caller(), &app(), "/ext/app", vec![1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);

        registry.apply(&caller(), &app()).unwrap();
        let err = registry
            .register(&caller(), &app(), "/ext/app", vec![1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);

        registry.audit_apply(&admin(), &app(), true).unwrap();
        let pointer = registry
            .register(&caller(), &app(), "/ext/app", vec![1])
            .unwrap();
        assert_eq!(pointer.addr, "/ext/app");
        assert_eq!(pointer.hash, vec![1]);
        assert_eq!(registry.status(&app()).unwrap(), Status::Normal);

        let err = registry
            .register(&caller(), &app(), "/ext/app", vec![1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
    }

    #[test]
    fn test_update_external() {
        let mut registry = external();
        approved(&mut registry);
        let err = registry.update(&caller(), &app(), "/ext/v2", vec![2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);

        registry.register(&caller(), &app(), "/ext/v1", vec![1]).unwrap();
        registry.update(&caller(), &app(), "/ext/v2", vec![2]).unwrap();
        let item = registry.resolve(&app()).unwrap().unwrap().item;
        assert_eq!(item.base.doc_addr, "/ext/v2");
        assert_eq!(item.base.doc_hash, vec![2]);
        assert_eq!(item.owner, caller());
    }

    #[test]
    fn test_internal_register_hashes_document() {
        let mut registry = internal();
        approved(&mut registry);
        let mut doc = ChainDoc::new(app(), 10);
        doc.extra = b"relay".to_vec();

        let pointer = registry.register_with_doc(&caller(), doc.clone()).unwrap();
        let expected = content_hash(&Document::from(doc.clone()).marshal().unwrap());
        assert_eq!(pointer.hash, expected.to_vec());
        assert_eq!(pointer.addr, format!("./{}", app()));

        let resolved = registry.resolve(&app()).unwrap().unwrap();
        assert_eq!(resolved.doc, Some(doc.clone()));
        assert_eq!(resolved.item.base.doc_hash, expected.to_vec());

        doc.base.updated = 20;
        let pointer = registry.update_with_doc(&caller(), doc.clone()).unwrap();
        assert_ne!(pointer.hash, expected.to_vec());
        assert_eq!(registry.resolve(&app()).unwrap().unwrap().doc, Some(doc));
    }

    #[test]
    fn test_internal_rejects_invalid_documents() {
        let mut registry = internal();
        approved(&mut registry);

        let err = registry
            .register_with_doc(&caller(), ChainDoc::new(app(), 0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);

        let account_doc = ChainDoc::new(Did::new("did:bitxhub:appchain001:0x1"), 1);
        let err = registry
            .register_with_doc(&caller(), account_doc)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);

        let mut info = DocInfo::internal(ChainDoc::new(app(), 1));
        info.id = Did::new("did:bitxhub:other:.");
        let err = registry.register_info(&caller(), &info).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert_eq!(registry.status(&app()).unwrap(), Status::ApplySuccess);
    }

    #[test]
    fn test_mode_mismatch() {
        let mut registry = internal();
        approved(&mut registry);
        let err = registry
            .register(&caller(), &app(), "/ext/app", vec![1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModeMismatch);
        let err = registry
            .register_info(&caller(), &DocInfo::external(app(), "/ext/app", vec![1]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModeMismatch);

        let mut registry = external();
        approved(&mut registry);
        let err = registry
            .register_with_doc(&caller(), ChainDoc::new(app(), 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModeMismatch);
        assert_eq!(registry.status(&app()).unwrap(), Status::ApplySuccess);
    }

    #[test]
    fn test_audit_forces_status() {
        let mut registry = external();
        let err = registry.audit(&admin(), &app(), Status::Normal).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        registry.apply(&caller(), &app()).unwrap();
        registry.audit(&admin(), &app(), Status::Normal).unwrap();
        assert_eq!(registry.status(&app()).unwrap(), Status::Normal);

        let err = registry.audit(&admin(), &app(), Status::Initial).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
        assert_eq!(registry.status(&app()).unwrap(), Status::Normal);
    }

    #[test]
    fn test_freeze_unfreeze() {
        let mut registry = external();
        assert_eq!(
            registry.freeze(&admin(), &app()).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        approved(&mut registry);
        assert_eq!(
            registry.freeze(&admin(), &app()).unwrap_err().kind(),
            ErrorKind::InvalidStatusTransition
        );

        registry.register(&caller(), &app(), "/ext/app", vec![1]).unwrap();
        registry.freeze(&admin(), &app()).unwrap();
        registry.freeze(&admin(), &app()).unwrap();
        assert_eq!(registry.status(&app()).unwrap(), Status::Frozen);

        let err = registry.update(&caller(), &app(), "/ext/v2", vec![2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);

        registry.unfreeze(&admin(), &app()).unwrap();
        registry.unfreeze(&admin(), &app()).unwrap();
        assert_eq!(registry.status(&app()).unwrap(), Status::Normal);
    }

    #[test]
    fn test_delete_then_reapply() {
        let mut registry = internal();
        approved(&mut registry);
        registry
            .register_with_doc(&caller(), ChainDoc::new(app(), 1))
            .unwrap();

        registry.freeze(&admin(), &app()).unwrap();
        let err = registry.delete(&caller(), &app()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);

        registry.unfreeze(&admin(), &app()).unwrap();
        registry.delete(&caller(), &app()).unwrap();
        assert!(!registry.has_chain_did(&app()).unwrap());
        assert_eq!(registry.status(&app()).unwrap(), Status::Initial);
        assert!(registry.resolve(&app()).unwrap().is_none());
        assert_eq!(
            registry.delete(&caller(), &app()).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        approved(&mut registry);
        registry
            .register_with_doc(&caller(), ChainDoc::new(app(), 2))
            .unwrap();
        assert_eq!(registry.status(&app()).unwrap(), Status::Normal);
    }

    #[test]
    fn test_admin_management() {
        let mut registry = external();
        assert_eq!(registry.admins(), &[admin()]);
        assert_eq!(
            registry.add_admin(admin()).unwrap_err().kind(),
            ErrorKind::AlreadyAdmin
        );
        assert_eq!(
            registry.add_admin(Did::new("nope")).unwrap_err().kind(),
            ErrorKind::InvalidFormat
        );

        registry.add_admin(caller()).unwrap();
        assert!(registry.has_admin(&caller()));
        assert_eq!(registry.admins(), &[admin(), caller()]);

        registry.remove_admin(&admin()).unwrap();
        assert_eq!(registry.admins(), &[caller()]);
        assert_eq!(
            registry.remove_admin(&admin()).unwrap_err().kind(),
            ErrorKind::NotAdmin
        );
    }

    #[test]
    fn test_role_based_policy_guards_chain_lifecycle() {
        let mut registry = external().with_policy(RoleBasedPolicy);
        let stranger = Did::new("did:bitxhub:relayroot:0xdeadbeef");

        registry.apply(&caller(), &app()).unwrap();
        let err = registry.audit_apply(&caller(), &app(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        registry.audit_apply(&admin(), &app(), true).unwrap();

        let err = registry
            .register(&stranger, &app(), "/ext/app", vec![1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(registry.status(&app()).unwrap(), Status::ApplySuccess);
        registry.register(&caller(), &app(), "/ext/app", vec![1]).unwrap();

        assert_eq!(
            registry.freeze(&caller(), &app()).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            registry.delete(&stranger, &app()).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        registry.delete(&caller(), &app()).unwrap();
    }
}
