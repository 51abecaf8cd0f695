//! State shared by the chain and account registries: table, document
//! backend, admin list and the status machine steps they have in common.

use crate::config::{DocMode, RegistryConfig};
use crate::errors::{ConfigError, RegistryError, Result};
use crate::policy::{AccessPolicy, AccessRequest, Action, Ownership, TrustCaller};
use didreg_storage::{DocDb, RegistryTable};
use didreg_types::{
    AccountItem, BasicItem, ChainItem, Did, DidKind, DocInfo, DocPointer, Document, Status,
    TableItem, TypesError,
};
use tracing::{debug, info, info_span, warn, Span};

const FREEZABLE: &[Status] = &[Status::Normal, Status::Frozen];
const DELETABLE: &[Status] = &[
    Status::Initial,
    Status::ApplyAudit,
    Status::ApplyFailed,
    Status::ApplySuccess,
    Status::Normal,
];

/// A table item together with the document it points at, if the registry
/// holds documents itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<I, D> {
    pub item: I,
    pub doc: Option<D>,
}

pub(crate) struct RegistryBase {
    kind: DidKind,
    name: String,
    table: Box<dyn RegistryTable>,
    docs: Option<Box<dyn DocDb>>,
    admins: Vec<Did>,
    policy: Box<dyn AccessPolicy>,
    pub(crate) span: Span,
}

impl RegistryBase {
    pub(crate) fn new(
        kind: DidKind,
        config: &RegistryConfig,
        table: Box<dyn RegistryTable>,
        docs: Option<Box<dyn DocDb>>,
    ) -> Result<Self> {
        config.validate(kind)?;
        match (config.mode, docs.is_some()) {
            (DocMode::Internal, false) => return Err(ConfigError::MissingDocStore.into()),
            (DocMode::External, true) => return Err(ConfigError::UnexpectedDocStore.into()),
            _ => {}
        }

        let scope = kind.as_str();
        let persisted = table
            .load_admins(scope)
            .map_err(|e| RegistryError::store("load_admins", &Did::default(), e))?;
        let admins = match persisted {
            Some(admins) => {
                debug!(scope, count = admins.len(), "restored persisted admins");
                admins
            }
            None => config.admins.clone(),
        };

        let span = info_span!("did_registry", registry = %config.name, kind = %kind);
        Ok(Self {
            kind,
            name: config.name.clone(),
            table,
            docs,
            admins,
            policy: Box::new(TrustCaller),
            span,
        })
    }

    pub(crate) fn set_policy(&mut self, policy: Box<dyn AccessPolicy>) {
        self.policy = policy;
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn mode(&self) -> DocMode {
        if self.docs.is_some() {
            DocMode::Internal
        } else {
            DocMode::External
        }
    }

    // ---- admins ----

    pub(crate) fn admins(&self) -> &[Did] {
        &self.admins
    }

    pub(crate) fn has_admin(&self, did: &Did) -> bool {
        self.admins.contains(did)
    }

    pub(crate) fn add_admin(&mut self, admin: Did) -> Result<()> {
        let _enter = self.span.enter();
        if !admin.is_valid_format() {
            return Err(RegistryError::Invalid {
                op: "add_admin",
                source: TypesError::InvalidFormat {
                    did: admin.to_string(),
                    reason: "malformed admin identifier".to_string(),
                },
            });
        }
        if self.has_admin(&admin) {
            return Err(RegistryError::AlreadyAdmin(admin));
        }
        self.admins.push(admin.clone());
        self.persist_admins()?;
        info!(admin = %admin, "admin added");
        Ok(())
    }

    pub(crate) fn remove_admin(&mut self, admin: &Did) -> Result<()> {
        let _enter = self.span.enter();
        let Some(pos) = self.admins.iter().position(|a| a == admin) else {
            return Err(RegistryError::NotAdmin(admin.clone()));
        };
        self.admins.remove(pos);
        self.persist_admins()?;
        info!(admin = %admin, "admin removed");
        Ok(())
    }

    pub(crate) fn persist_admins(&self) -> Result<()> {
        self.table
            .store_admins(self.kind.as_str(), &self.admins)
            .map_err(|e| RegistryError::store("store_admins", &Did::default(), e))
    }

    // ---- lookups ----

    pub(crate) fn has(&self, op: &'static str, did: &Did) -> Result<bool> {
        self.table
            .has_item(did)
            .map_err(|e| RegistryError::store(op, did, e))
    }

    pub(crate) fn find_item(&self, op: &'static str, did: &Did) -> Result<Option<TableItem>> {
        if !self.has(op, did)? {
            return Ok(None);
        }
        self.table
            .get_item(did, self.kind)
            .map(Some)
            .map_err(|e| RegistryError::store(op, did, e))
    }

    pub(crate) fn present(
        op: &'static str,
        did: &Did,
        item: Option<TableItem>,
    ) -> Result<TableItem> {
        item.ok_or_else(|| RegistryError::NotFound {
            op,
            did: did.clone(),
        })
    }

    /// Status of an identifier; `Initial` when no record exists.
    pub(crate) fn status(&self, did: &Did) -> Result<Status> {
        Ok(self
            .find_item("status", did)?
            .map(|item| item.status())
            .unwrap_or_default())
    }

    pub(crate) fn resolve(&self, did: &Did) -> Result<Option<Resolution<TableItem, Document>>> {
        let Some(item) = self.find_item("resolve", did)? else {
            return Ok(None);
        };
        let store_err = |e| RegistryError::store("resolve", did, e);
        let doc = match &self.docs {
            Some(docs) if docs.has(did).map_err(store_err)? => {
                Some(docs.get(did, self.kind).map_err(store_err)?)
            }
            _ => None,
        };
        Ok(Some(Resolution { item, doc }))
    }

    // ---- state changes ----

    pub(crate) fn authorize(
        &self,
        caller: &Did,
        action: Action,
        target: &Did,
        item: Option<&TableItem>,
    ) -> Result<()> {
        let ownership = match item {
            Some(TableItem::Chain(item)) => Ownership::Applicant(&item.owner),
            Some(TableItem::Account(_)) => Ownership::SelfAddressed,
            None if self.kind == DidKind::Account => Ownership::SelfAddressed,
            None => Ownership::Unknown,
        };
        let request = AccessRequest {
            caller,
            action,
            target,
            caller_is_admin: self.has_admin(caller),
            ownership,
        };
        self.policy.authorize(&request).map_err(|reason| {
            warn!(caller = %caller, did = %target, %action, %reason, "access denied");
            RegistryError::Forbidden {
                caller: caller.clone(),
                action,
                did: target.clone(),
                reason,
            }
        })
    }

    pub(crate) fn ensure_kind(&self, op: &'static str, did: &Did) -> Result<()> {
        did.ensure_kind(self.kind)
            .map_err(|source| RegistryError::Invalid { op, source })
    }

    pub(crate) fn require_status(
        op: &'static str,
        did: &Did,
        current: Status,
        expected: &'static [Status],
    ) -> Result<()> {
        if expected.contains(&current) {
            Ok(())
        } else {
            Err(RegistryError::InvalidStatusTransition {
                op,
                did: did.clone(),
                current,
                expected,
            })
        }
    }

    pub(crate) fn create_item(&self, op: &'static str, item: &TableItem) -> Result<()> {
        self.table
            .create_item(item)
            .map_err(|e| RegistryError::store(op, item.id(), e))
    }

    pub(crate) fn update_item(&self, op: &'static str, item: &TableItem) -> Result<()> {
        self.table
            .update_item(item)
            .map_err(|e| RegistryError::store(op, item.id(), e))
    }

    pub(crate) fn write_status(
        &self,
        op: &'static str,
        mut item: TableItem,
        status: Status,
    ) -> Result<()> {
        item.base_mut().status = status;
        self.update_item(op, &item)
    }

    /// Picks the identifier and, in internal mode, the document a
    /// [`DocInfo`] refers to.
    fn target_of<'a>(
        &self,
        op: &'static str,
        info: &'a DocInfo,
    ) -> Result<(Did, Option<&'a Document>)> {
        if self.docs.is_none() {
            self.ensure_kind(op, &info.id)?;
            return Ok((info.id.clone(), None));
        }
        let doc = info.content.as_ref().ok_or(RegistryError::ModeMismatch {
            op,
            mode: DocMode::Internal,
        })?;
        doc.validate(self.kind)
            .map_err(|source| RegistryError::Invalid { op, source })?;
        if !info.id.is_empty() && &info.id != doc.id() {
            return Err(RegistryError::Invalid {
                op,
                source: TypesError::InvalidDocument {
                    did: doc.id().to_string(),
                    reason: format!("document does not belong to {}", info.id),
                },
            });
        }
        Ok((doc.id().clone(), Some(doc)))
    }

    /// Registers or updates the document behind `info`: status check, then
    /// the document store, then the table item which moves to `Normal`.
    pub(crate) fn commit_document(
        &self,
        op: &'static str,
        action: Action,
        caller: &Did,
        info: &DocInfo,
        expected: &'static [Status],
    ) -> Result<DocPointer> {
        let (did, doc) = self.target_of(op, info)?;
        let existing = self.find_item(op, &did)?;
        self.authorize(caller, action, &did, existing.as_ref())?;
        let current = existing.as_ref().map(|i| i.status()).unwrap_or_default();
        Self::require_status(op, &did, current, expected)?;

        let pointer = match (&self.docs, doc) {
            (Some(docs), Some(doc)) => {
                let addr = if current == Status::Normal {
                    docs.update(doc)
                } else {
                    docs.create(doc)
                }
                .map_err(|e| RegistryError::store(op, &did, e))?;
                let hash = doc
                    .hash()
                    .map_err(|source| RegistryError::Invalid { op, source })?;
                DocPointer {
                    addr,
                    hash: hash.to_vec(),
                }
            }
            _ => DocPointer {
                addr: info.addr.clone(),
                hash: info.hash.clone(),
            },
        };

        let is_new = existing.is_none();
        let mut item = existing.unwrap_or_else(|| self.new_item(&did, caller));
        let base = item.base_mut();
        base.doc_addr = pointer.addr.clone();
        base.doc_hash = pointer.hash.clone();
        base.status = Status::Normal;
        if is_new {
            self.create_item(op, &item)?;
        } else {
            self.update_item(op, &item)?;
        }
        info!(did = %did, caller = %caller, addr = %pointer.addr, "{op} committed");
        Ok(pointer)
    }

    fn new_item(&self, did: &Did, caller: &Did) -> TableItem {
        let base = BasicItem::new(did.clone(), Status::Initial);
        match self.kind {
            DidKind::Chain => ChainItem {
                base,
                owner: caller.clone(),
            }
            .into(),
            DidKind::Account => AccountItem { base }.into(),
        }
    }

    /// Forces an existing record into any status but `Initial`.
    pub(crate) fn audit(&self, caller: &Did, did: &Did, status: Status) -> Result<()> {
        const OP: &str = "audit";
        let item = self.find_item(OP, did)?;
        self.authorize(caller, Action::Audit, did, item.as_ref())?;
        let item = Self::present(OP, did, item)?;
        if status == Status::Initial {
            return Err(RegistryError::ForbiddenTarget {
                op: OP,
                did: did.clone(),
                target: status,
            });
        }
        let previous = item.status();
        self.write_status(OP, item, status)?;
        info!(did = %did, caller = %caller, from = %previous, to = %status, "status audited");
        Ok(())
    }

    /// Freeze or unfreeze; already being in `target` is a no-op.
    pub(crate) fn set_frozen(&self, caller: &Did, did: &Did, frozen: bool) -> Result<()> {
        let (op, action, target) = if frozen {
            ("freeze", Action::Freeze, Status::Frozen)
        } else {
            ("unfreeze", Action::UnFreeze, Status::Normal)
        };
        let item = self.find_item(op, did)?;
        self.authorize(caller, action, did, item.as_ref())?;
        let item = Self::present(op, did, item)?;
        let current = item.status();
        Self::require_status(op, did, current, FREEZABLE)?;
        if current == target {
            debug!(did = %did, status = %current, "{op} is a no-op");
            return Ok(());
        }
        self.write_status(op, item, target)?;
        info!(did = %did, caller = %caller, "{op} applied");
        Ok(())
    }

    /// Removes the document, then the table record. Frozen records stay.
    pub(crate) fn delete(&self, caller: &Did, did: &Did) -> Result<()> {
        const OP: &str = "delete";
        let item = self.find_item(OP, did)?;
        self.authorize(caller, Action::Delete, did, item.as_ref())?;
        let item = Self::present(OP, did, item)?;
        Self::require_status(OP, did, item.status(), DELETABLE)?;
        if let Some(docs) = &self.docs {
            docs.delete(did)
                .map_err(|e| RegistryError::store(OP, did, e))?;
        }
        self.table
            .delete_item(did)
            .map_err(|e| RegistryError::store(OP, did, e))?;
        info!(did = %did, caller = %caller, "identifier deleted");
        Ok(())
    }

    pub(crate) fn close(&self) -> Result<()> {
        let _enter = self.span.enter();
        if let Some(docs) = &self.docs {
            docs.close()
                .map_err(|e| RegistryError::store("close", &Did::default(), e))?;
        }
        self.table
            .close()
            .map_err(|e| RegistryError::store("close", &Did::default(), e))?;
        debug!("registry closed");
        Ok(())
    }
}
