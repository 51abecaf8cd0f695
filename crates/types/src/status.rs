use crate::errors::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a registered identifier.
///
/// Numeric codes follow the on-chain convention: a trailing 1 means
/// "under audit", a trailing 5 means "audit failed" or suspended and a
/// trailing 0 means the identifier is in good standing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Absent or reset.
    #[default]
    Initial,
    /// Chain level only: application waiting for an admin decision.
    ApplyAudit,
    /// Chain level only: application rejected, may be audited again.
    ApplyFailed,
    /// Chain level only: application approved, waiting for registration.
    ApplySuccess,
    /// Active and resolvable.
    Normal,
    /// Suspended by an admin.
    Frozen,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Initial,
        Status::ApplyAudit,
        Status::ApplyFailed,
        Status::ApplySuccess,
        Status::Normal,
        Status::Frozen,
    ];

    pub fn code(&self) -> i32 {
        match self {
            Status::Initial => 0,
            Status::ApplyAudit => 1,
            Status::ApplyFailed => 5,
            Status::ApplySuccess => 10,
            Status::Normal => 200,
            Status::Frozen => 205,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        Status::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or(TypesError::UnknownStatus(code))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Initial => "initial",
            Status::ApplyAudit => "apply_audit",
            Status::ApplyFailed => "apply_failed",
            Status::ApplySuccess => "apply_success",
            Status::Normal => "normal",
            Status::Frozen => "frozen",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_reversible() {
        for status in Status::ALL {
            assert_eq!(Status::from_code(status.code()).unwrap(), status);
        }
        assert!(matches!(
            Status::from_code(101),
            Err(TypesError::UnknownStatus(101))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::Frozen.to_string(), "frozen(205)");
        assert_eq!(Status::default(), Status::Initial);
    }
}
