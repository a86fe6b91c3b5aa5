//! Database connection layer.
//!
//! Currently supports SQLite. The abstraction is intentionally minimal:
//! [`SqliteConnector`] knows how to open one tuned connection; who owns that
//! connection and for how long is decided by the backends.

mod sqlite;

pub use sqlite::{DEFAULT_BUSY_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, SqliteConnector};
