//! Database schema definitions.

use sqlx::SqliteConnection;

use crate::store::StoreError;

/// SQL statement for creating the counters table.
///
/// One row per identity; the unique key is the identity itself. The CHECK
/// constraint enforces the non-negative count invariant at the store.
pub const COUNTERS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS counters (
    identity TEXT PRIMARY KEY,
    count    BIGINT NOT NULL DEFAULT 0 CHECK (count >= 0)
);
"#;

/// Initialize the database schema.
///
/// Idempotent; runs on every fresh connection so that both backends can open
/// a previously empty database file.
pub async fn init_schema(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(COUNTERS_TABLE_DDL)
        .execute(&mut *conn)
        .await
        .map_err(StoreError::from_sqlx)?;

    tracing::debug!("counters schema initialized");
    Ok(())
}
