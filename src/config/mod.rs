//! Configuration module.
//!
//! Provides YAML-based configuration loading and validation for the counter
//! store: connection URL, backend selection, channel capacity, and timeouts.

mod app;
mod validation;

pub use app::StoreConfig;
pub use validation::{ConfigError, expand_env_vars, parse_duration};
