//! Backend selection as a closed set of tagged variants.
//!
//! The backend is chosen once at construction time via [`BackendKind`]; there
//! is no runtime type inspection. Both variants expose the same four
//! operations with the same contract.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::store::StoreError;
use crate::store::direct::DirectCounter;
use crate::store::pooled::PooledCounter;

/// Which counter backend to construct.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// Open a fresh connection per operation.
    Direct,
    /// Forward operations to the connection-pool actor.
    Pooled,
}

/// A counter store bound to one backend.
///
/// # Contract
///
/// - `increase_and_get` is atomic with respect to any number of concurrent
///   callers on the same identity; the first-ever call returns 1.
/// - `set` is an unconditional upsert and may lower or reset a count; there
///   is deliberately no global monotonicity guarantee.
/// - `get` returns 0 for an identity never seen; that is not an error.
/// - `list_keys` returns the full key set, never a truncated page.
#[derive(Debug, Clone)]
pub enum CounterStore {
    Direct(DirectCounter),
    Pooled(PooledCounter),
}

impl CounterStore {
    /// Atomically add 1 to the counter and return the post-increment value.
    pub async fn increase_and_get(&self, identity: &str) -> Result<u64, StoreError> {
        match self {
            Self::Direct(counter) => counter.increase_and_get(identity).await,
            Self::Pooled(counter) => counter.increase_and_get(identity).await,
        }
    }

    /// Unconditionally set the counter to `value`.
    pub async fn set(&self, identity: &str, value: u64) -> Result<(), StoreError> {
        match self {
            Self::Direct(counter) => counter.set(identity, value).await,
            Self::Pooled(counter) => counter.set(identity, value).await,
        }
    }

    /// Current value of the counter, or 0 if the identity has never been seen.
    pub async fn get(&self, identity: &str) -> Result<u64, StoreError> {
        match self {
            Self::Direct(counter) => counter.get(identity).await,
            Self::Pooled(counter) => counter.get(identity).await,
        }
    }

    /// Every known identity, as a full snapshot in unspecified order.
    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Direct(counter) => counter.list_keys().await,
            Self::Pooled(counter) => counter.list_keys().await,
        }
    }

    /// The kind of backend behind this store.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Direct(_) => BackendKind::Direct,
            Self::Pooled(_) => BackendKind::Pooled,
        }
    }
}
