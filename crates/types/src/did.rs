//! Decentralized identifier strings.
//!
//! An identifier always has four colon separated segments:
//! `did:<root-method>:<sub-method>:<address>`. Chain level identifiers use
//! `.` as their address (`did:bitxhub:appchain001:.`), account level
//! identifiers carry a concrete address (`did:bitxhub:appchain001:0x12ab`).

use crate::errors::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literal first segment of every identifier.
pub const DID_SCHEME: &str = "did";
/// Address segment marking a chain level identifier.
pub const CHAIN_ADDRESS: &str = ".";

/// Which registry an identifier, document or table item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidKind {
    /// Method level identifier, one per participating chain.
    Chain,
    /// Account level identifier minted under a chain method.
    Account,
}

impl DidKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DidKind::Chain => "chain",
            DidKind::Account => "account",
        }
    }
}

impl fmt::Display for DidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decentralized identifier.
///
/// The wrapped string is not validated on construction so that malformed
/// input can still be carried into error messages; use [`Did::is_valid_format`]
/// or the [`FromStr`] impl when validation is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    pub fn new(did: impl Into<String>) -> Self {
        Self(did.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn segments(&self) -> Option<[&str; 4]> {
        let mut parts = self.0.split(':');
        let segments = [parts.next()?, parts.next()?, parts.next()?, parts.next()?];
        if parts.next().is_some() {
            return None;
        }
        if segments[0] != DID_SCHEME || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(segments)
    }

    /// True iff the string has exactly four non-empty segments and starts with `did`.
    pub fn is_valid_format(&self) -> bool {
        self.segments().is_some()
    }

    pub fn root_method(&self) -> Option<&str> {
        self.segments().map(|s| s[1])
    }

    pub fn sub_method(&self) -> Option<&str> {
        self.segments().map(|s| s[2])
    }

    pub fn address(&self) -> Option<&str> {
        self.segments().map(|s| s[3])
    }

    /// The chain level identifier this identifier lives under.
    pub fn chain_did(&self) -> Option<Did> {
        self.segments()
            .map(|s| Did(format!("{}:{}:{}:{}", DID_SCHEME, s[1], s[2], CHAIN_ADDRESS)))
    }

    pub fn is_chain_did(&self) -> bool {
        self.address() == Some(CHAIN_ADDRESS)
    }

    pub fn is_account_did(&self) -> bool {
        matches!(self.address(), Some(addr) if addr != CHAIN_ADDRESS)
    }

    /// Kind of registry this identifier belongs to, `None` if malformed.
    pub fn kind(&self) -> Option<DidKind> {
        match self.address()? {
            CHAIN_ADDRESS => Some(DidKind::Chain),
            _ => Some(DidKind::Account),
        }
    }

    /// Validates the identifier against the expected registry kind.
    pub fn ensure_kind(&self, expected: DidKind) -> Result<(), TypesError> {
        match self.kind() {
            Some(kind) if kind == expected => Ok(()),
            Some(kind) => Err(TypesError::InvalidFormat {
                did: self.0.clone(),
                reason: format!("expected a {expected} identifier, got a {kind} identifier"),
            }),
            None => Err(TypesError::InvalidFormat {
                did: self.0.clone(),
                reason: "expected did:<root-method>:<sub-method>:<address>".to_string(),
            }),
        }
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let did = Did::new(s);
        if !did.is_valid_format() {
            return Err(TypesError::InvalidFormat {
                did: s.to_string(),
                reason: "expected did:<root-method>:<sub-method>:<address>".to_string(),
            });
        }
        Ok(did)
    }
}

impl From<&str> for Did {
    fn from(value: &str) -> Self {
        Did::new(value)
    }
}

impl From<String> for Did {
    fn from(value: String) -> Self {
        Did(value)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_formats() {
        assert!(Did::new("did:bitxhub:appchain001:.").is_valid_format());
        assert!(Did::new("did:bitxhub:appchain001:0x12ab").is_valid_format());
        assert!(!Did::new("did:bitxhub:appchain001").is_valid_format());
        assert!(!Did::new("did:bitxhub::0x12ab").is_valid_format());
        assert!(!Did::new("dad:bitxhub:appchain001:.").is_valid_format());
        assert!(!Did::new("did:bitxhub:appchain001:0x1:extra").is_valid_format());
        assert!(!Did::new("").is_valid_format());
    }

    #[test]
    fn test_projections() {
        let did = Did::new("did:bitxhub:appchain001:0x12ab");
        assert_eq!(did.root_method(), Some("bitxhub"));
        assert_eq!(did.sub_method(), Some("appchain001"));
        assert_eq!(did.address(), Some("0x12ab"));
        assert_eq!(
            did.chain_did(),
            Some(Did::new("did:bitxhub:appchain001:."))
        );
        assert_eq!(did.kind(), Some(DidKind::Account));
        assert!(did.is_account_did());
        assert!(!did.is_chain_did());

        let bad = Did::new("not-a-did");
        assert_eq!(bad.root_method(), None);
        assert_eq!(bad.chain_did(), None);
        assert_eq!(bad.kind(), None);
    }

    #[test]
    fn test_chain_did_of_chain_did_is_itself() {
        let did = Did::new("did:bitxhub:relayroot:.");
        assert_eq!(did.chain_did(), Some(did.clone()));
        assert_eq!(did.kind(), Some(DidKind::Chain));
    }

    #[test]
    fn test_ensure_kind() {
        let chain = Did::new("did:x:app1:.");
        assert!(chain.ensure_kind(DidKind::Chain).is_ok());
        assert!(matches!(
            chain.ensure_kind(DidKind::Account),
            Err(TypesError::InvalidFormat { .. })
        ));
        assert!(Did::new("did:x").ensure_kind(DidKind::Chain).is_err());
    }

    #[test]
    fn test_from_str_rejects_malformed() {
        assert!("did:x:app1:0x1".parse::<Did>().is_ok());
        assert!("did:x:app1".parse::<Did>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let did = Did::new("did:x:app1:.");
        let json = serde_json::to_string(&did).unwrap();
        assert_eq!(json, "\"did:x:app1:.\"");
    }

    proptest! {
        #[test]
        fn format_matches_segment_rule(s in "(did|di|x)?(:[a-z.0-9]{0,3}){0,5}") {
            let parts: Vec<&str> = s.split(':').collect();
            let expected = parts.len() == 4
                && parts[0] == "did"
                && parts.iter().all(|p| !p.is_empty());
            prop_assert_eq!(Did::new(s.clone()).is_valid_format(), expected);
        }

        #[test]
        fn wellformed_identifiers_validate(
            root in "[a-z0-9]{1,8}",
            sub in "[a-z0-9]{1,8}",
            addr in "(\\.|0x[0-9a-f]{1,8})",
        ) {
            let did = Did::new(format!("did:{root}:{sub}:{addr}"));
            prop_assert!(did.is_valid_format());
            prop_assert_eq!(did.root_method(), Some(root.as_str()));
            let chain = did.chain_did().unwrap();
            prop_assert!(chain.is_chain_did());
        }
    }
}
