//! Counter operations against one live connection.
//!
//! Shared by the direct backend and the pool actor, so that both perform the
//! exact same single-statement operations. `increase_and_get` and `set_count`
//! are single atomic upserts at the store; they are never a separate read
//! followed by a separate write, which is what makes concurrent increments
//! lose no updates regardless of interleaving.

use sqlx::SqliteConnection;

use crate::store::StoreError;
use crate::store::types::{CounterRecord, count_from_db, count_to_db};

/// Atomic increment/upsert returning the post-increment value.
const INCREASE_AND_GET_SQL: &str = "
INSERT INTO counters (identity, count) VALUES (?1, 1)
ON CONFLICT(identity) DO UPDATE SET count = count + 1
RETURNING count
";

/// Unconditional upsert. Last writer wins.
const SET_SQL: &str = "
INSERT INTO counters (identity, count) VALUES (?1, ?2)
ON CONFLICT(identity) DO UPDATE SET count = excluded.count
";

const GET_SQL: &str = "SELECT identity, count FROM counters WHERE identity = ?1";

const LIST_KEYS_SQL: &str = "SELECT identity FROM counters";

/// Add 1 to the counter, creating it first if absent, and return the
/// post-increment value. The first-ever call for an identity returns 1.
pub(crate) async fn increase_and_get(
    conn: &mut SqliteConnection,
    identity: &str,
) -> Result<u64, StoreError> {
    let raw: i64 = sqlx::query_scalar(INCREASE_AND_GET_SQL)
        .bind(identity)
        .fetch_one(&mut *conn)
        .await
        .map_err(StoreError::from_sqlx)?;
    count_from_db(raw)
}

/// Unconditionally set the counter to `value`, creating it if absent.
///
/// This may lower or reset the count; callers relying on monotonic counts
/// must never call it.
pub(crate) async fn set_count(
    conn: &mut SqliteConnection,
    identity: &str,
    value: u64,
) -> Result<(), StoreError> {
    let raw = count_to_db(value)?;
    sqlx::query(SET_SQL)
        .bind(identity)
        .bind(raw)
        .execute(&mut *conn)
        .await
        .map_err(StoreError::from_sqlx)?;
    Ok(())
}

/// Current value of the counter, or 0 if the identity has never been seen.
pub(crate) async fn get_count(
    conn: &mut SqliteConnection,
    identity: &str,
) -> Result<u64, StoreError> {
    let row: Option<(String, i64)> = sqlx::query_as(GET_SQL)
        .bind(identity)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StoreError::from_sqlx)?;
    match row {
        Some((identity, raw)) => {
            let record = CounterRecord::from_row(identity, raw)?;
            Ok(record.count)
        }
        None => Ok(0),
    }
}

/// Every identity with a record, in unspecified order.
///
/// One statement, fully drained: the returned set is a complete snapshot,
/// never a truncated page.
pub(crate) async fn list_keys(conn: &mut SqliteConnection) -> Result<Vec<String>, StoreError> {
    sqlx::query_scalar(LIST_KEYS_SQL)
        .fetch_all(&mut *conn)
        .await
        .map_err(StoreError::from_sqlx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::init_schema;
    use sqlx::Connection;

    async fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        init_schema(&mut conn).await.unwrap();
        conn
    }

    #[tokio::test]
    async fn test_first_increase_returns_one() {
        let mut conn = test_conn().await;
        assert_eq!(increase_and_get(&mut conn, "fresh").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sequential_increases() {
        let mut conn = test_conn().await;
        assert_eq!(increase_and_get(&mut conn, "seq").await.unwrap(), 1);
        assert_eq!(increase_and_get(&mut conn, "seq").await.unwrap(), 2);
        assert_eq!(increase_and_get(&mut conn, "seq").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let mut conn = test_conn().await;
        set_count(&mut conn, "k", 7).await.unwrap();
        assert_eq!(get_count(&mut conn, "k").await.unwrap(), 7);

        set_count(&mut conn, "k", 0).await.unwrap();
        assert_eq!(get_count(&mut conn, "k").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_absent_returns_zero() {
        let mut conn = test_conn().await;
        assert_eq!(get_count(&mut conn, "never-written").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_breaks_monotonicity() {
        let mut conn = test_conn().await;
        assert_eq!(increase_and_get(&mut conn, "x").await.unwrap(), 1);
        set_count(&mut conn, "x", 0).await.unwrap();
        assert_eq!(get_count(&mut conn, "x").await.unwrap(), 0);
        assert_eq!(increase_and_get(&mut conn, "x").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_keys_full_snapshot() {
        let mut conn = test_conn().await;
        increase_and_get(&mut conn, "a").await.unwrap();
        set_count(&mut conn, "b", 5).await.unwrap();
        increase_and_get(&mut conn, "c").await.unwrap();

        let mut keys = list_keys(&mut conn).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_value_overflow_is_malformed() {
        let mut conn = test_conn().await;
        let result = set_count(&mut conn, "big", u64::MAX).await;
        assert!(matches!(result, Err(StoreError::MalformedRequest(_))));
    }
}
