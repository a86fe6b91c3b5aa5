//! Direct-connection backend: open, operate, close.
//!
//! Every call pays the full connection-setup cost in exchange for zero shared
//! mutable state. Under high concurrency this can exhaust the backing store's
//! connection limit; the pooled backend exists to trade that resource
//! pressure for one serialization point.

use sqlx::Connection as _;

use crate::store::StoreError;
use crate::store::db::SqliteConnector;
use crate::store::ops;
use crate::store::types::validate_identity;

/// Counter backend that opens a fresh connection per operation.
#[derive(Clone)]
pub struct DirectCounter {
    connector: SqliteConnector,
}

impl std::fmt::Debug for DirectCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectCounter").finish_non_exhaustive()
    }
}

impl DirectCounter {
    pub(crate) fn new(connector: SqliteConnector) -> Self {
        Self { connector }
    }

    /// Atomically add 1 to the counter and return the post-increment value.
    /// The first-ever call for an identity returns 1.
    pub async fn increase_and_get(&self, identity: &str) -> Result<u64, StoreError> {
        validate_identity(identity)?;
        let mut conn = self.connector.connect().await?;
        let result = ops::increase_and_get(&mut conn, identity).await;
        let _ = conn.close().await;
        result
    }

    /// Unconditionally set the counter to `value`. May lower or reset it;
    /// callers relying on monotonic counts must never call this.
    pub async fn set(&self, identity: &str, value: u64) -> Result<(), StoreError> {
        validate_identity(identity)?;
        let mut conn = self.connector.connect().await?;
        let result = ops::set_count(&mut conn, identity, value).await;
        let _ = conn.close().await;
        result
    }

    /// Current value of the counter, or 0 if the identity has never been seen.
    pub async fn get(&self, identity: &str) -> Result<u64, StoreError> {
        validate_identity(identity)?;
        let mut conn = self.connector.connect().await?;
        let result = ops::get_count(&mut conn, identity).await;
        let _ = conn.close().await;
        result
    }

    /// Every known identity, as a full snapshot in unspecified order.
    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connector.connect().await?;
        let result = ops::list_keys(&mut conn).await;
        let _ = conn.close().await;
        result
    }
}
