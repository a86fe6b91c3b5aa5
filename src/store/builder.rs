//! Store builder and handles.
//!
//! Construction picks the backend once; the handles own the actor's lifetime
//! for the pooled backend and provide graceful shutdown with explicit
//! teardown of the pooled connection.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::StoreError;
use crate::store::actor::{Command, PoolActor};
use crate::store::backend::{BackendKind, CounterStore};
use crate::store::db::{self, SqliteConnector};
use crate::store::direct::DirectCounter;
use crate::store::pooled::PooledCounter;

/// Default capacity of the pool actor's command channel.
///
/// Bounds the number of queued operations; senders beyond it wait for a slot
/// rather than growing an unbounded backlog.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Builder for constructing a counter store.
#[derive(Debug, Clone)]
pub struct StoreBuilder {
    url: String,
    backend: BackendKind,
    channel_capacity: usize,
    connect_timeout: Duration,
    busy_timeout: Duration,
}

impl StoreBuilder {
    /// Create a builder for a store URL, e.g., `sqlite:data/tally.db`.
    ///
    /// Defaults to the pooled backend.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backend: BackendKind::Pooled,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            connect_timeout: db::DEFAULT_CONNECT_TIMEOUT,
            busy_timeout: db::DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Select the backend kind.
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Set the pool actor's command channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the deadline for one connection attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the busy timeout for write contention between connections.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Build the store and return its handles.
    ///
    /// No connection is opened here; the first operation pays for it. Must be
    /// called within a tokio runtime when the pooled backend is selected.
    pub fn build(self) -> Result<StoreHandles, StoreError> {
        let connector = SqliteConnector::new(&self.url)?
            .connect_timeout(self.connect_timeout)
            .busy_timeout(self.busy_timeout);

        match self.backend {
            BackendKind::Direct => Ok(StoreHandles {
                store: CounterStore::Direct(DirectCounter::new(connector)),
                admin: None,
                actor_handle: None,
            }),
            BackendKind::Pooled => {
                let (actor_handle, tx) = PoolActor::spawn(connector, self.channel_capacity);
                Ok(StoreHandles {
                    store: CounterStore::Pooled(PooledCounter::new(tx.clone())),
                    admin: Some(StoreAdmin { tx }),
                    actor_handle: Some(actor_handle),
                })
            }
        }
    }
}

/// Administration handle for the pool actor.
#[derive(Clone)]
pub struct StoreAdmin {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for StoreAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreAdmin").finish_non_exhaustive()
    }
}

impl StoreAdmin {
    /// Discard the actor's cached connection handle.
    ///
    /// The next operation reconnects from scratch. Used to recover from a
    /// handle known to be broken and to exercise the reconnect path in tests.
    pub async fn invalidate_connection(&self) -> Result<(), StoreError> {
        self.tx
            .send(Command::Invalidate)
            .await
            .map_err(|_| StoreError::ActorClosed)
    }

    /// Request graceful shutdown of the actor.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| StoreError::ActorClosed)
    }
}

/// Handles to a constructed counter store.
pub struct StoreHandles {
    /// The store itself; clone freely into request handlers.
    pub store: CounterStore,
    admin: Option<StoreAdmin>,
    actor_handle: Option<JoinHandle<()>>,
}

impl StoreHandles {
    /// Administration handle. Present only for the pooled backend.
    pub fn admin(&self) -> Option<&StoreAdmin> {
        self.admin.as_ref()
    }

    /// Gracefully shut down the store.
    ///
    /// For the pooled backend this tells the actor to close its connection
    /// and waits for the task to finish. In-flight operations complete first;
    /// the direct backend has nothing to tear down.
    pub async fn shutdown(mut self) -> Result<(), StoreError> {
        if let Some(admin) = self.admin.take() {
            admin.shutdown().await?;
        }
        if let Some(handle) = self.actor_handle.take() {
            handle
                .await
                .map_err(|_| StoreError::Internal("failed to join pool actor task".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for StoreHandles {
    fn drop(&mut self) {
        // Best effort if shutdown() was never called; the actor also stops
        // once every sender is gone.
        if let Some(admin) = self.admin.take() {
            let _ = admin.tx.try_send(Command::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn db_url(dir: &tempfile::TempDir, name: &str) -> String {
        format!("sqlite:{}", dir.path().join(name).display())
    }

    #[tokio::test]
    async fn test_build_pooled_roundtrip() {
        let dir = tempdir().unwrap();
        let handles = StoreBuilder::new(db_url(&dir, "pooled.db"))
            .channel_capacity(64)
            .build()
            .unwrap();

        assert_eq!(handles.store.kind(), BackendKind::Pooled);
        assert!(handles.admin().is_some());

        assert_eq!(handles.store.increase_and_get("r").await.unwrap(), 1);
        assert_eq!(handles.store.get("r").await.unwrap(), 1);

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_build_direct_roundtrip() {
        let dir = tempdir().unwrap();
        let handles = StoreBuilder::new(db_url(&dir, "direct.db"))
            .backend(BackendKind::Direct)
            .build()
            .unwrap();

        assert_eq!(handles.store.kind(), BackendKind::Direct);
        assert!(handles.admin().is_none());

        handles.store.set("r", 4).await.unwrap();
        assert_eq!(handles.store.get("r").await.unwrap(), 4);

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_counts_shared_across_backends() {
        // Both backends address the same store; a count written through one
        // is visible through the other.
        let dir = tempdir().unwrap();
        let url = db_url(&dir, "shared.db");

        let pooled = StoreBuilder::new(&url).build().unwrap();
        let direct = StoreBuilder::new(&url)
            .backend(BackendKind::Direct)
            .build()
            .unwrap();

        assert_eq!(pooled.store.increase_and_get("shared").await.unwrap(), 1);
        assert_eq!(direct.store.increase_and_get("shared").await.unwrap(), 2);
        assert_eq!(pooled.store.get("shared").await.unwrap(), 2);

        pooled.shutdown().await.unwrap();
        direct.shutdown().await.unwrap();
    }
}
