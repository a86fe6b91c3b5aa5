//! Store-specific error types.
//!
//! All store operations return [`StoreError`] on failure. The variants map to
//! the retry semantics callers care about: connection-class failures and
//! operation-class failures are retryable, malformed requests are not.
//! An absent identity is never an error (`get` returns 0 for it).

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cannot establish or maintain the connection to the backing store.
    ///
    /// Retryable. The pool actor discards its cached handle on this.
    #[error("connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A connection attempt exceeded its deadline.
    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The store rejected or failed an otherwise-valid operation. Retryable.
    #[error("operation error: {0}")]
    Operation(#[source] sqlx::Error),

    /// The request payload is invalid (e.g., empty identity). Not retryable
    /// without a caller-side fix; fatal to that single call only.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Stored data failed validation at the store boundary
    /// (e.g., a negative count).
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// The connection-pool actor is not running.
    #[error("connection-pool actor is not running")]
    ActorClosed,

    /// Internal error (e.g., reply protocol mismatch, task join failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Classify an sqlx error into connection-class vs operation-class.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_connection_failure(&err) {
            Self::Connection(err)
        } else {
            Self::Operation(err)
        }
    }

    /// Whether this failure means the cached connection handle is unusable.
    pub(crate) fn is_connection_loss(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::ConnectTimeout(_))
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectTimeout(_) | Self::Operation(_) | Self::ActorClosed
        )
    }
}

/// Errors that indicate the connection itself is broken, as opposed to the
/// store rejecting one operation.
fn is_connection_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
