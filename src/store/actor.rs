//! Connection-pool actor: one task owning one live connection.
//!
//! The actor drains an MPSC command channel one message at a time, which
//! gives the serialization the pooled backend relies on for free: there is
//! never more than one connection attempt in flight, never two physical store
//! calls interleaved on the handle, and operations complete in submission
//! order. The connection is established lazily by the first operation and
//! re-established lazily after a failure; there is no background reconnection
//! loop.

use sqlx::Connection as _;
use sqlx::SqliteConnection;
use strum_macros::AsRefStr;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::store::StoreError;
use crate::store::db::SqliteConnector;
use crate::store::ops;

// =============================================================================
// Messages
// =============================================================================

/// One counter operation, as submitted over the command channel.
#[derive(Debug)]
pub(crate) enum Request {
    IncreaseAndGet { identity: String },
    Set { identity: String, value: u64 },
    Get { identity: String },
    ListKeys,
}

/// Successful outcome of a [`Request`].
#[derive(Debug)]
pub(crate) enum Response {
    Count(u64),
    Unit,
    Keys(Vec<String>),
}

/// Commands accepted by the pool actor.
#[derive(Debug)]
pub(crate) enum Command {
    /// Perform one store operation and reply with its result.
    Op {
        request: Request,
        reply: oneshot::Sender<Result<Response, StoreError>>,
    },
    /// Discard the cached connection handle; the next operation reconnects.
    Invalidate,
    /// Graceful shutdown.
    Shutdown,
}

// =============================================================================
// State machine
// =============================================================================

/// Connection lifecycle state of the pool actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum PoolState {
    /// No connection attempted yet. Initial state.
    Uninitialized,
    /// A connection attempt is in flight.
    Connecting,
    /// A usable connection handle is cached.
    Ready,
    /// A cached handle was found broken; a new attempt begins.
    Reconnecting,
    /// Connection attempts exhausted for the current request. Transient:
    /// the actor reports the failure and returns to `Uninitialized`.
    Failed,
}

// =============================================================================
// Actor
// =============================================================================

/// Actor owning exactly one connection to the backing store.
pub(crate) struct PoolActor {
    connector: SqliteConnector,
    rx: mpsc::Receiver<Command>,
    conn: Option<SqliteConnection>,
    state: PoolState,
}

impl PoolActor {
    /// Spawn the actor task.
    ///
    /// Returns the task handle and the command sender. The connection is not
    /// opened here; the first operation pays for it.
    pub(crate) fn spawn(
        connector: SqliteConnector,
        channel_capacity: usize,
    ) -> (JoinHandle<()>, mpsc::Sender<Command>) {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let actor = PoolActor {
            connector,
            rx,
            conn: None,
            state: PoolState::Uninitialized,
        };
        let handle = tokio::spawn(actor.run());
        (handle, tx)
    }

    async fn run(mut self) {
        tracing::info!("pool actor started");

        while let Some(cmd) = self.rx.recv().await {
            if self.handle_command(cmd).await {
                break;
            }
        }

        self.teardown().await;
        tracing::info!("pool actor stopped");
    }

    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Op { request, reply } => {
                let result = self.execute(&request).await;
                // The caller may have stopped waiting; its result is simply
                // discarded.
                let _ = reply.send(result);
            }
            Command::Invalidate => {
                if self.conn.is_some() {
                    tracing::warn!("cached connection invalidated");
                    self.discard(PoolState::Reconnecting).await;
                }
            }
            Command::Shutdown => {
                tracing::info!("pool actor shutting down");
                return true;
            }
        }
        false
    }

    /// Run one operation, reconnecting and retrying once if a previously
    /// cached handle turns out to be broken.
    async fn execute(&mut self, request: &Request) -> Result<Response, StoreError> {
        let had_cached = self.conn.is_some();

        let conn = self.ensure_connected().await?;
        let err = match Self::run_once(conn, request).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        if !err.is_connection_loss() {
            return Err(err);
        }
        if !had_cached {
            // The connection was freshly established for this request;
            // another attempt would learn nothing new.
            self.discard(PoolState::Uninitialized).await;
            return Err(err);
        }

        tracing::warn!(error = %err, "cached connection broken, reconnecting");
        self.discard(PoolState::Reconnecting).await;

        let conn = self.ensure_connected().await?;
        match Self::run_once(conn, request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                if err.is_connection_loss() {
                    self.discard(PoolState::Uninitialized).await;
                }
                Err(err)
            }
        }
    }

    async fn run_once(
        conn: &mut SqliteConnection,
        request: &Request,
    ) -> Result<Response, StoreError> {
        match request {
            Request::IncreaseAndGet { identity } => ops::increase_and_get(conn, identity)
                .await
                .map(Response::Count),
            Request::Set { identity, value } => ops::set_count(conn, identity, *value)
                .await
                .map(|()| Response::Unit),
            Request::Get { identity } => ops::get_count(conn, identity).await.map(Response::Count),
            Request::ListKeys => ops::list_keys(conn).await.map(Response::Keys),
        }
    }

    /// Return the cached connection, establishing it first if absent.
    async fn ensure_connected(&mut self) -> Result<&mut SqliteConnection, StoreError> {
        if self.conn.is_none() {
            if self.state != PoolState::Reconnecting {
                self.set_state(PoolState::Connecting);
            }
            match self.connector.connect().await {
                Ok(conn) => {
                    self.conn = Some(conn);
                    self.set_state(PoolState::Ready);
                }
                Err(err) => {
                    // Report failure and return to the initial state so a
                    // later call retries from scratch. No tight retry loop.
                    self.set_state(PoolState::Failed);
                    self.set_state(PoolState::Uninitialized);
                    return Err(err);
                }
            }
        }

        match self.conn.as_mut() {
            Some(conn) => Ok(conn),
            None => Err(StoreError::Internal(
                "connection missing after connect".to_string(),
            )),
        }
    }

    /// Drop the cached handle and move to `next`.
    async fn discard(&mut self, next: PoolState) {
        if let Some(conn) = self.conn.take() {
            // Best effort; the handle may already be broken.
            let _ = conn.close().await;
        }
        self.set_state(next);
    }

    async fn teardown(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(err) = conn.close().await {
                tracing::debug!(error = %err, "connection close failed during shutdown");
            }
        }
        self.set_state(PoolState::Uninitialized);
    }

    fn set_state(&mut self, next: PoolState) {
        if self.state != next {
            tracing::debug!(from = self.state.as_ref(), to = next.as_ref(), "pool state");
            self.state = next;
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

    async fn send_op(tx: &mpsc::Sender<Command>, request: Request) -> Result<Response, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(Command::Op {
            request,
            reply: reply_tx,
        })
        .await
        .unwrap();
        reply_rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_actor_lifecycle() {
        let dir = tempdir().unwrap();
        let connector = SqliteConnector::new(&db_url(&dir, "lifecycle.db")).unwrap();
        let (handle, tx) = PoolActor::spawn(connector, 16);

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_in_submission_order() {
        let dir = tempdir().unwrap();
        let connector = SqliteConnector::new(&db_url(&dir, "ops.db")).unwrap();
        let (handle, tx) = PoolActor::spawn(connector, 16);

        let resp = send_op(
            &tx,
            Request::IncreaseAndGet {
                identity: "a".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(resp, Response::Count(1)));

        let resp = send_op(
            &tx,
            Request::IncreaseAndGet {
                identity: "a".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(resp, Response::Count(2)));

        let resp = send_op(
            &tx,
            Request::Set {
                identity: "b".to_string(),
                value: 9,
            },
        )
        .await
        .unwrap();
        assert!(matches!(resp, Response::Unit));

        let resp = send_op(&tx, Request::ListKeys).await.unwrap();
        match resp {
            Response::Keys(mut keys) => {
                keys.sort();
                assert_eq!(keys, vec!["a", "b"]);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_then_reconnect() {
        let dir = tempdir().unwrap();
        let connector = SqliteConnector::new(&db_url(&dir, "reconnect.db")).unwrap();
        let (handle, tx) = PoolActor::spawn(connector, 16);

        let resp = send_op(
            &tx,
            Request::IncreaseAndGet {
                identity: "x".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(resp, Response::Count(1)));

        // Simulate connection loss; the next operation must reconnect and
        // see the previously stored count intact.
        tx.send(Command::Invalidate).await.unwrap();

        let resp = send_op(
            &tx,
            Request::IncreaseAndGet {
                identity: "x".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(resp, Response::Count(2)));

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_departed_caller_does_not_stall_actor() {
        let dir = tempdir().unwrap();
        let connector = SqliteConnector::new(&db_url(&dir, "departed.db")).unwrap();
        let (handle, tx) = PoolActor::spawn(connector, 16);

        // Caller gives up immediately: reply receiver is dropped before the
        // operation completes. The actor must run it to completion anyway.
        let (reply_tx, reply_rx) = oneshot::channel();
        drop(reply_rx);
        tx.send(Command::Op {
            request: Request::IncreaseAndGet {
                identity: "gone".to_string(),
            },
            reply: reply_tx,
        })
        .await
        .unwrap();

        let resp = send_op(
            &tx,
            Request::Get {
                identity: "gone".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(resp, Response::Count(1)));

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_connect_does_not_poison_actor() {
        let dir = tempdir().unwrap();
        // Parent directory does not exist yet, so every connection attempt
        // fails until it is created.
        let parent = dir.path().join("late");
        let url = format!("sqlite:{}", parent.join("counters.db").display());
        let connector = SqliteConnector::new(&url).unwrap();
        let (handle, tx) = PoolActor::spawn(connector, 16);

        let result = send_op(
            &tx,
            Request::IncreaseAndGet {
                identity: "p".to_string(),
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(StoreError::Connection(_) | StoreError::ConnectTimeout(_))
        ));

        // The store becomes reachable; the same actor must retry from
        // scratch instead of staying failed.
        std::fs::create_dir_all(&parent).unwrap();
        let resp = send_op(
            &tx,
            Request::IncreaseAndGet {
                identity: "p".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(resp, Response::Count(1)));

        tx.send(Command::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_senders_dropped_stops_actor() {
        let dir = tempdir().unwrap();
        let connector = SqliteConnector::new(&db_url(&dir, "drop.db")).unwrap();
        let (handle, tx) = PoolActor::spawn(connector, 16);

        drop(tx);
        handle.await.unwrap();
    }
}
