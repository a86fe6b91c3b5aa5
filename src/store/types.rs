//! Core data types and boundary validation for the counter store.
//!
//! The persisted unit is [`CounterRecord`]: one row per distinct identity.
//! Counts are exposed as `u64` and stored as SQLite `BIGINT`; the conversion
//! helpers here reject values that cannot survive the round trip instead of
//! trusting stored data.

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// A named counter as persisted in the `counters` table.
///
/// `identity` is caller-supplied and opaque to the store; no structure is
/// assumed. There is at most one record per distinct identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Unique key naming one tracked counter.
    pub identity: String,
    /// Current value. Non-negative.
    pub count: u64,
}

impl CounterRecord {
    /// Build a record from a raw stored row, validating it at the boundary.
    pub(crate) fn from_row(identity: String, raw_count: i64) -> Result<Self, StoreError> {
        Ok(Self {
            count: count_from_db(raw_count)?,
            identity,
        })
    }
}

/// Validate a caller-supplied identity.
///
/// Identities are opaque, but an empty key would collapse distinct callers
/// onto one row, so it is rejected as a malformed request.
pub(crate) fn validate_identity(identity: &str) -> Result<(), StoreError> {
    if identity.is_empty() {
        return Err(StoreError::MalformedRequest(
            "identity must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Convert a stored `BIGINT` count into the exposed `u64`.
///
/// A negative stored value violates the schema contract and is rejected
/// rather than coerced.
pub(crate) fn count_from_db(raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw)
        .map_err(|_| StoreError::InvalidData(format!("negative stored count: {raw}")))
}

/// Convert a caller-supplied count into the stored `BIGINT`.
pub(crate) fn count_to_db(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| {
        StoreError::MalformedRequest(format!("count {value} exceeds the storable range"))
    })
}
