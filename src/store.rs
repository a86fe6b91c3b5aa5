//! Counter Store
//!
//! Named integer counters backed by an external store, with two
//! interchangeable backends chosen at construction time:
//!
//! - **Direct**: open connection, perform one atomic operation, close.
//!   No shared state; full connection-setup cost per call.
//! - **Pooled**: forward operations to a single long-lived actor owning one
//!   persistent connection, serializing operations and reconnecting lazily
//!   when the connection breaks.
//!
//! # Components
//!
//! - [`CounterStore`]: the four-operation contract, uniform across backends
//! - [`DirectCounter`] / [`PooledCounter`]: the backends
//! - [`PoolState`]: the pool actor's connection lifecycle states
//! - [`StoreBuilder`] / [`StoreHandles`] / [`StoreAdmin`]: construction and
//!   lifecycle management

mod actor;
mod backend;
mod builder;
pub mod db;
mod direct;
mod error;
mod ops;
mod pooled;
mod schema;
mod types;

pub use actor::PoolState;
pub use backend::{BackendKind, CounterStore};
pub use builder::{DEFAULT_CHANNEL_CAPACITY, StoreAdmin, StoreBuilder, StoreHandles};
pub use direct::DirectCounter;
pub use error::StoreError;
pub use pooled::PooledCounter;
pub use types::CounterRecord;
