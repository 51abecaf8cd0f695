//! Thread-safe handle around a registry.
//!
//! Every registry operation is a read-check-write sequence over several
//! keys, so concurrent callers must be serialized. One coarse lock per
//! registry keeps the observable ordering identical to sequential replay.

use parking_lot::Mutex;
use std::sync::Arc;

pub type SharedRegistry<R> = Arc<Mutex<R>>;

pub fn shared<R>(registry: R) -> SharedRegistry<R> {
    Arc::new(Mutex::new(registry))
}
