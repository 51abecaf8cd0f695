//! Error types for the DID registries

use crate::config::DocMode;
use crate::policy::Action;
use didreg_storage::StoreError;
use didreg_types::{Did, Status, TypesError};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of registry failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidFormat,
    AlreadyExists,
    NotFound,
    InvalidStatusTransition,
    NotAdmin,
    AlreadyAdmin,
    Forbidden,
    ModeMismatch,
    Serialization,
    Storage,
    Config,
    Genesis,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("malformed admin identifier: {0}")]
    InvalidAdmin(Did),

    #[error("duplicate admin identifier: {0}")]
    DuplicateAdmin(Did),

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("internal document mode requires a document store")]
    MissingDocStore,

    #[error("external document mode does not use a document store")]
    UnexpectedDocStore,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{op}: {source}")]
    Invalid {
        op: &'static str,
        #[source]
        source: TypesError,
    },

    #[error("{op}: {did} not found")]
    NotFound { op: &'static str, did: Did },

    #[error("{op}: {did} already exists")]
    AlreadyExists { op: &'static str, did: Did },

    #[error("{op}: {did} is under status {current}, expected one of {expected:?}")]
    InvalidStatusTransition {
        op: &'static str,
        did: Did,
        current: Status,
        expected: &'static [Status],
    },

    #[error("{op}: status of {did} cannot be forced to {target}")]
    ForbiddenTarget {
        op: &'static str,
        did: Did,
        target: Status,
    },

    #[error("{0} is not an admin")]
    NotAdmin(Did),

    #[error("{0} is already an admin")]
    AlreadyAdmin(Did),

    #[error("{caller} may not {action} {did}: {reason}")]
    Forbidden {
        caller: Did,
        action: Action,
        did: Did,
        reason: String,
    },

    #[error("{op}: not supported in {mode} document mode")]
    ModeMismatch { op: &'static str, mode: DocMode },

    #[error("{op} {did}: {source}")]
    Store {
        op: &'static str,
        did: Did,
        #[source]
        source: StoreError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("genesis is not configured: {0}")]
    GenesisNotConfigured(&'static str),

    #[error("genesis {stage} failed: {source}")]
    Genesis {
        stage: &'static str,
        #[source]
        source: Box<RegistryError>,
    },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Invalid { source, .. } => match source {
                TypesError::Codec(_) => ErrorKind::Serialization,
                _ => ErrorKind::InvalidFormat,
            },
            RegistryError::NotFound { .. } => ErrorKind::NotFound,
            RegistryError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            RegistryError::InvalidStatusTransition { .. }
            | RegistryError::ForbiddenTarget { .. } => ErrorKind::InvalidStatusTransition,
            RegistryError::NotAdmin(_) => ErrorKind::NotAdmin,
            RegistryError::AlreadyAdmin(_) => ErrorKind::AlreadyAdmin,
            RegistryError::Forbidden { .. } => ErrorKind::Forbidden,
            RegistryError::ModeMismatch { .. } => ErrorKind::ModeMismatch,
            RegistryError::Store { source, .. } => match source {
                StoreError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::InvalidArgument(_) => ErrorKind::InvalidFormat,
                StoreError::Codec(_) => ErrorKind::Serialization,
                StoreError::Database(_) | StoreError::Closed => ErrorKind::Storage,
            },
            RegistryError::Config(_) => ErrorKind::Config,
            RegistryError::GenesisNotConfigured(_) | RegistryError::Genesis { .. } => {
                ErrorKind::Genesis
            }
        }
    }

    /// Wraps a storage failure with the operation and identifier, lifting
    /// presence mismatches into their own variants.
    pub(crate) fn store(op: &'static str, did: &Did, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { .. } => RegistryError::NotFound {
                op,
                did: did.clone(),
            },
            StoreError::AlreadyExists { .. } => RegistryError::AlreadyExists {
                op,
                did: did.clone(),
            },
            source => RegistryError::Store {
                op,
                did: did.clone(),
                source,
            },
        }
    }

    pub(crate) fn genesis(stage: &'static str) -> impl FnOnce(RegistryError) -> RegistryError {
        move |source| RegistryError::Genesis {
            stage,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
