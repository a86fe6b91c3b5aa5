//! Pooled backend: a thin handle forwarding operations to the pool actor.
//!
//! The handle holds no connection, only the actor's command sender, so it is
//! cheap to clone into every request handler. Results and failures from the
//! actor are relayed verbatim.

use tokio::sync::{mpsc, oneshot};

use crate::store::StoreError;
use crate::store::actor::{Command, Request, Response};
use crate::store::types::validate_identity;

/// Counter backend that submits operations to the connection-pool actor.
#[derive(Clone)]
pub struct PooledCounter {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for PooledCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledCounter").finish_non_exhaustive()
    }
}

impl PooledCounter {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    async fn call(&self, request: Request) -> Result<Response, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Op {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        reply_rx.await.map_err(|_| StoreError::ActorClosed)?
    }

    /// Atomically add 1 to the counter and return the post-increment value.
    /// The first-ever call for an identity returns 1.
    pub async fn increase_and_get(&self, identity: &str) -> Result<u64, StoreError> {
        validate_identity(identity)?;
        match self
            .call(Request::IncreaseAndGet {
                identity: identity.to_string(),
            })
            .await?
        {
            Response::Count(count) => Ok(count),
            other => Err(StoreError::Internal(format!(
                "unexpected reply to increase_and_get: {other:?}"
            ))),
        }
    }

    /// Unconditionally set the counter to `value`. May lower or reset it;
    /// callers relying on monotonic counts must never call this.
    pub async fn set(&self, identity: &str, value: u64) -> Result<(), StoreError> {
        validate_identity(identity)?;
        match self
            .call(Request::Set {
                identity: identity.to_string(),
                value,
            })
            .await?
        {
            Response::Unit => Ok(()),
            other => Err(StoreError::Internal(format!(
                "unexpected reply to set: {other:?}"
            ))),
        }
    }

    /// Current value of the counter, or 0 if the identity has never been seen.
    pub async fn get(&self, identity: &str) -> Result<u64, StoreError> {
        validate_identity(identity)?;
        match self
            .call(Request::Get {
                identity: identity.to_string(),
            })
            .await?
        {
            Response::Count(count) => Ok(count),
            other => Err(StoreError::Internal(format!(
                "unexpected reply to get: {other:?}"
            ))),
        }
    }

    /// Every known identity, as a full snapshot in unspecified order.
    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        match self.call(Request::ListKeys).await? {
            Response::Keys(keys) => Ok(keys),
            other => Err(StoreError::Internal(format!(
                "unexpected reply to list_keys: {other:?}"
            ))),
        }
    }
}
