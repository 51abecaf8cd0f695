//! Caller authorization hook.
//!
//! The registries consult an [`AccessPolicy`] before any state change. The
//! default, [`TrustCaller`], admits everything and leaves authorization to
//! whatever wraps the registry. [`RoleBasedPolicy`] enforces the admin and
//! owner roles directly.

use didreg_types::Did;
use std::fmt;

/// State-changing registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Apply,
    AuditApply,
    Register,
    Update,
    Audit,
    Freeze,
    UnFreeze,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Apply => "apply",
            Action::AuditApply => "audit_apply",
            Action::Register => "register",
            Action::Update => "update",
            Action::Audit => "audit",
            Action::Freeze => "freeze",
            Action::UnFreeze => "unfreeze",
            Action::Delete => "delete",
        }
    }

    /// Governance actions that only an admin may take.
    pub fn is_governance(&self) -> bool {
        matches!(
            self,
            Action::AuditApply | Action::Audit | Action::Freeze | Action::UnFreeze
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who owns the targeted identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership<'a> {
    /// Chain identifiers belong to the caller that applied for them.
    Applicant(&'a Did),
    /// Account identifiers belong to the caller holding the same address.
    SelfAddressed,
    /// No record exists yet.
    Unknown,
}

/// Everything a policy gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub caller: &'a Did,
    pub action: Action,
    pub target: &'a Did,
    pub caller_is_admin: bool,
    pub ownership: Ownership<'a>,
}

impl AccessRequest<'_> {
    /// `true` when ownership is unknown, so the status checks decide.
    pub fn caller_owns_target(&self) -> bool {
        match self.ownership {
            Ownership::Applicant(owner) => owner == self.caller,
            Ownership::SelfAddressed => {
                self.caller == self.target
                    || matches!(
                        (self.caller.address(), self.target.address()),
                        (Some(a), Some(b)) if a == b && !self.caller.is_chain_did()
                    )
            }
            Ownership::Unknown => true,
        }
    }
}

pub trait AccessPolicy: Send + Sync {
    /// Returns the reason for a denial.
    fn authorize(&self, request: &AccessRequest<'_>) -> Result<(), String>;
}

/// Admits every caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustCaller;

impl AccessPolicy for TrustCaller {
    fn authorize(&self, _request: &AccessRequest<'_>) -> Result<(), String> {
        Ok(())
    }
}

/// Admins govern, owners manage their own identifiers, anyone may apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleBasedPolicy;

impl AccessPolicy for RoleBasedPolicy {
    fn authorize(&self, request: &AccessRequest<'_>) -> Result<(), String> {
        if request.action == Action::Apply || request.caller_is_admin {
            return Ok(());
        }
        if request.action.is_governance() {
            return Err("caller is not an admin".to_string());
        }
        if request.caller_owns_target() {
            Ok(())
        } else {
            Err("caller neither owns the identifier nor is an admin".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(
        caller: &'a Did,
        action: Action,
        target: &'a Did,
        caller_is_admin: bool,
        ownership: Ownership<'a>,
    ) -> AccessRequest<'a> {
        AccessRequest {
            caller,
            action,
            target,
            caller_is_admin,
            ownership,
        }
    }

    #[test]
    fn test_trust_caller_admits_everything() {
        let caller = Did::new("did:x:app:0xbad");
        let target = Did::new("did:x:app1:.");
        for action in [Action::AuditApply, Action::Delete, Action::Freeze] {
            let req = request(&caller, action, &target, false, Ownership::Unknown);
            assert!(TrustCaller.authorize(&req).is_ok());
        }
    }

    #[test]
    fn test_role_based_governance_requires_admin() {
        let admin = Did::new("did:x:root:0x1");
        let user = Did::new("did:x:app:0x2");
        let target = Did::new("did:x:app1:.");
        let owned = Ownership::Applicant(&user);

        let req = request(&user, Action::Freeze, &target, false, owned);
        assert!(RoleBasedPolicy.authorize(&req).is_err());
        let req = request(&admin, Action::Freeze, &target, true, owned);
        assert!(RoleBasedPolicy.authorize(&req).is_ok());
        let req = request(&user, Action::Apply, &target, false, Ownership::Unknown);
        assert!(RoleBasedPolicy.authorize(&req).is_ok());
    }

    #[test]
    fn test_role_based_owner_rules() {
        let owner = Did::new("did:x:app:0x2");
        let other = Did::new("did:x:app:0x3");
        let chain = Did::new("did:x:app1:.");

        let req = request(&owner, Action::Register, &chain, false, Ownership::Applicant(&owner));
        assert!(RoleBasedPolicy.authorize(&req).is_ok());
        let req = request(&other, Action::Register, &chain, false, Ownership::Applicant(&owner));
        assert!(RoleBasedPolicy.authorize(&req).is_err());

        let account = Did::new("did:x:app1:0x2");
        let req = request(&owner, Action::Update, &account, false, Ownership::SelfAddressed);
        assert!(req.caller_owns_target());
        let req = request(&other, Action::Update, &account, false, Ownership::SelfAddressed);
        assert!(RoleBasedPolicy.authorize(&req).is_err());
    }
}
