//! SQLite connection opener using sqlx.
//!
//! Unlike a conventional pool, this module only knows how to establish a
//! single connection. The direct backend opens one per call; the pool actor
//! opens one and caches it.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Connection, SqliteConnection};

use crate::store::StoreError;
use crate::store::schema::init_schema;

/// Default deadline for one connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default busy timeout for write contention between independent connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens tuned single connections to one SQLite database.
///
/// # Configuration
///
/// - WAL journal mode so independent connections can operate concurrently
/// - Normal synchronous mode for performance with durability
/// - Create database if not exists
#[derive(Clone)]
pub struct SqliteConnector {
    options: SqliteConnectOptions,
    connect_timeout: Duration,
}

impl std::fmt::Debug for SqliteConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnector").finish_non_exhaustive()
    }
}

impl SqliteConnector {
    /// Create a connector for a SQLite URL, e.g., `sqlite:data/tally.db`.
    pub fn new(url: &str) -> Result<Self, StoreError> {
        // sqlx treats an unrecognized scheme as a literal file path; reject
        // it here before create_if_missing turns the URL into a file name.
        if let Some((scheme, _)) = url.split_once(':') {
            if !scheme.eq_ignore_ascii_case("sqlite") {
                return Err(StoreError::Connection(sqlx::Error::Configuration(
                    format!("unsupported database url scheme '{scheme}', expected sqlite").into(),
                )));
            }
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::Connection)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .create_if_missing(true);

        Ok(Self {
            options,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Set the deadline for one connection attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the busy timeout applied to each opened connection.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.clone().busy_timeout(timeout);
        self
    }

    /// Open a single connection and initialize the schema on it.
    ///
    /// Every failure on this path is connection-class: the caller has no
    /// usable handle afterwards.
    pub async fn connect(&self) -> Result<SqliteConnection, StoreError> {
        let attempt = SqliteConnection::connect_with(&self.options);
        let mut conn = tokio::time::timeout(self.connect_timeout, attempt)
            .await
            .map_err(|_| StoreError::ConnectTimeout(self.connect_timeout))?
            .map_err(StoreError::Connection)?;

        init_schema(&mut conn).await?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let connector = SqliteConnector::new("sqlite::memory:").unwrap();
        let mut conn = connector.connect().await.unwrap();

        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&mut conn).await.unwrap();
        assert_eq!(row.0, 1);

        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_initializes_schema() {
        let connector = SqliteConnector::new("sqlite::memory:").unwrap();
        let mut conn = connector.connect().await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'counters'",
        )
        .fetch_one(&mut conn)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_non_sqlite_scheme_rejected() {
        for url in ["postgres://nope", "mysql:counters", "redis://localhost:6379"] {
            let result = SqliteConnector::new(url);
            assert!(
                matches!(result, Err(StoreError::Connection(_))),
                "expected connection error for {url}"
            );
        }

        // Valid forms still pass: scheme-qualified and bare paths.
        assert!(SqliteConnector::new("sqlite::memory:").is_ok());
        assert!(SqliteConnector::new("sqlite:data/tally.db").is_ok());
        assert!(SqliteConnector::new("data/tally.db").is_ok());
    }
}
