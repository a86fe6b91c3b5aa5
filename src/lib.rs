//! Tally - Named Counter Store
//!
//! Tracks small named integer counters (e.g. "visits to repo X") on behalf of
//! many concurrent, short-lived request handlers, backed by an external
//! persistent store whose connection is expensive to establish.
//!
//! # Architecture
//!
//! - **CounterStore**: four operations (`increase_and_get`, `set`, `get`,
//!   `list_keys`), uniform across backends
//! - **Direct backend**: a fresh connection per operation
//! - **Pooled backend**: operations forwarded to a single actor owning one
//!   persistent connection, serialized through a command channel
//! - **Config**: YAML configuration with validation and env expansion
//!
//! # Example
//!
//! ```rust,ignore
//! use tally::{BackendKind, StoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tally::StoreError> {
//!     let handles = StoreBuilder::new("sqlite:data/tally.db")
//!         .backend(BackendKind::Pooled)
//!         .build()?;
//!
//!     let count = handles.store.increase_and_get("github-repo-visit-a-b").await?;
//!     println!("visits: {count}");
//!
//!     handles.shutdown().await
//! }
//! ```

pub mod config;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use store::{
    BackendKind, CounterRecord, CounterStore, DirectCounter, PoolState, PooledCounter, StoreAdmin,
    StoreBuilder, StoreError, StoreHandles,
};
