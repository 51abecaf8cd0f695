//! Chain and account DID registries.
//!
//! Each registry drives the status machine of its identifiers over a
//! [`RegistryTable`](didreg_storage::RegistryTable) and, in internal
//! document mode, a [`DocDb`](didreg_storage::DocDb):
//!
//! - [`ChainDidRegistry`] governs chain identifiers through an audited
//!   application (`apply`, `audit_apply`) before registration.
//! - [`AccountDidRegistry`] registers account identifiers directly.
//!
//! Registries are not internally synchronized; see [`SharedRegistry`] for the
//! locking wrapper.

mod base;

pub mod account;
pub mod chain;
pub mod config;
pub mod errors;
pub mod policy;
pub mod shared;
pub mod stores;

pub use account::AccountDidRegistry;
pub use base::Resolution;
pub use chain::ChainDidRegistry;
pub use config::{DocMode, RegistryConfig};
pub use errors::{ConfigError, ErrorKind, RegistryError, Result};
pub use policy::{AccessPolicy, AccessRequest, Action, Ownership, RoleBasedPolicy, TrustCaller};
pub use shared::{shared, SharedRegistry};
